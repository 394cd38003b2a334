//! Rule matching
//!
//! Evaluates each rule's triggers against the classified patterns. A rule
//! fires only when every trigger holds; each holding trigger is explained by
//! a [`MatchedCondition`] carrying a readable description and a strength.

use crate::config::EngineConfig;
use crate::metrics::Metric;
use crate::types::{
    DataPattern, ExpertiseRule, Frequency, MatchedCondition, MetricSample, Period, RuleTrigger,
    TriggerValue,
};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Strength of a bare satisfaction
const BASE_STRENGTH: f64 = 0.5;

/// Matcher for evaluating rules against patterns
pub struct RuleMatcher;

impl RuleMatcher {
    /// Evaluate a rule; `Some` with one condition per trigger when all hold
    pub fn match_rule(
        rule: &ExpertiseRule,
        patterns: &[DataPattern],
        analysis_date: NaiveDate,
        config: &EngineConfig,
    ) -> Option<Vec<MatchedCondition>> {
        let period = Period::ending_on(analysis_date, rule.period_days())?;

        let mut conditions = Vec::with_capacity(rule.triggers.len());
        for trigger in &rule.triggers {
            let samples = samples_in(patterns, trigger.metric, period);
            match Self::evaluate_trigger(trigger, &samples, period, config) {
                Some(condition) => conditions.push(condition),
                None => {
                    trace!(rule = %rule.id, metric = %trigger.metric, "trigger does not hold");
                    return None;
                }
            }
        }

        debug!(rule = %rule.id, conditions = conditions.len(), "rule matched");
        Some(conditions)
    }

    /// Evaluate one trigger over date-ordered samples inside `period`
    pub fn evaluate_trigger(
        trigger: &RuleTrigger,
        samples: &[&MetricSample],
        period: Period,
        config: &EngineConfig,
    ) -> Option<MatchedCondition> {
        if samples.is_empty() {
            return None;
        }

        match trigger.frequency {
            Frequency::Daily => {
                let values: Vec<f64> = samples.iter().map(|s| s.value.as_f64()).collect();
                let (satisfied, evaluated) = count_satisfied(trigger, &values);
                (satisfied >= trigger.threshold).then(|| MatchedCondition {
                    metric: trigger.metric,
                    frequency: Frequency::Daily,
                    description: format!(
                        "{} {} {} on {satisfied}/{evaluated} days",
                        trigger.metric,
                        trigger.operator.symbol(),
                        format_target(trigger.value)
                    ),
                    observed: f64::from(satisfied),
                    satisfied_count: Some(satisfied),
                    evaluated_count: Some(evaluated),
                    strength: count_strength(satisfied, evaluated, trigger.threshold),
                })
            }
            Frequency::Weekly => {
                let weekly = weekly_means(samples, config.min_samples_per_week);
                let (satisfied, evaluated) = count_satisfied(trigger, &weekly);
                (evaluated > 0 && satisfied >= trigger.threshold).then(|| MatchedCondition {
                    metric: trigger.metric,
                    frequency: Frequency::Weekly,
                    description: format!(
                        "weekly average {} {} {} in {satisfied}/{evaluated} weeks",
                        trigger.metric,
                        trigger.operator.symbol(),
                        format_target(trigger.value)
                    ),
                    observed: f64::from(satisfied),
                    satisfied_count: Some(satisfied),
                    evaluated_count: Some(evaluated),
                    strength: count_strength(satisfied, evaluated, trigger.threshold),
                })
            }
            Frequency::Cumulative => {
                let sum: f64 = samples.iter().map(|s| s.value.as_f64()).sum();
                let average = sum / samples.len() as f64;
                let target = trigger.value.as_f64();
                trigger.operator.compare(average, target).then(|| MatchedCondition {
                    metric: trigger.metric,
                    frequency: Frequency::Cumulative,
                    description: format!(
                        "{} average {} {} {} over {} days",
                        trigger.metric,
                        format_observed(trigger.metric, average),
                        trigger.operator.symbol(),
                        format_target(trigger.value),
                        period.days()
                    ),
                    observed: average,
                    satisfied_count: None,
                    evaluated_count: None,
                    strength: margin_strength(trigger.metric, average, target, config),
                })
            }
        }
    }
}

/// Samples of a metric's pattern that fall inside `period`
fn samples_in(patterns: &[DataPattern], metric: Metric, period: Period) -> Vec<&MetricSample> {
    patterns
        .iter()
        .filter(|p| p.metric == metric)
        .flat_map(|p| p.values.iter())
        .filter(|s| period.contains(s.date))
        .collect()
}

/// (qualifying, evaluated) counts of a trigger's comparison over values
fn count_satisfied(trigger: &RuleTrigger, values: &[f64]) -> (u32, u32) {
    let target = trigger.value.as_f64();
    let satisfied = values
        .iter()
        .filter(|v| trigger.operator.compare(**v, target))
        .count();
    (saturate(satisfied), saturate(values.len()))
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Means of each ISO week with at least `min_samples` samples, in week order
fn weekly_means(samples: &[&MetricSample], min_samples: usize) -> Vec<f64> {
    let mut weeks: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for sample in samples {
        let week = sample.date.iso_week();
        weeks
            .entry((week.year(), week.week()))
            .or_default()
            .push(sample.value.as_f64());
    }

    weeks
        .into_values()
        .filter(|values| values.len() >= min_samples)
        .map(|values| values.iter().sum::<f64>() / values.len() as f64)
        .collect()
}

/// Strength from the surplus of qualifying units over the threshold
fn count_strength(satisfied: u32, evaluated: u32, threshold: u32) -> f64 {
    let headroom = evaluated.saturating_sub(threshold);
    if headroom == 0 {
        return BASE_STRENGTH;
    }
    let surplus = satisfied.saturating_sub(threshold);
    let fraction = (f64::from(surplus) / f64::from(headroom)).min(1.0);
    BASE_STRENGTH + (1.0 - BASE_STRENGTH) * fraction
}

/// Strength from the distance to the target, saturating at the noise delta
fn margin_strength(metric: Metric, observed: f64, target: f64, config: &EngineConfig) -> f64 {
    let noise = metric.noise_delta(config.trend_delta_fraction);
    if noise <= 0.0 {
        return 1.0;
    }
    let fraction = ((observed - target).abs() / noise).min(1.0);
    BASE_STRENGTH + (1.0 - BASE_STRENGTH) * fraction
}

fn format_target(value: TriggerValue) -> String {
    match value {
        TriggerValue::Flag(flag) => flag.to_string(),
        TriggerValue::Number(v) => v.to_string(),
    }
}

fn format_observed(metric: Metric, value: f64) -> String {
    if metric.is_boolean() {
        format!("{value:.2}")
    } else {
        format!("{value:.1}")
    }
}
