//! Analysis orchestration
//!
//! This module provides the public entry points of the engine. It runs the
//! full pipeline from a user's daily records to a [`UserAnalysis`].

use crate::classifier::TrendClassifier;
use crate::composer::AdviceComposer;
use crate::config::EngineConfig;
use crate::error::{AnalysisError, ConfigError, RuleConfigError};
use crate::extractor::MetricExtractor;
use crate::matcher::RuleMatcher;
use crate::risk::RiskAggregator;
use crate::rules::RuleBase;
use crate::scoring::Scorer;
use crate::types::{DailyRecord, DataPattern, Period, TriggeredRule, UserAnalysis};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Analyze one user's record window against a rule base.
///
/// # Arguments
/// * `user_id` - Identifier copied into the analysis and every advice
/// * `records` - Daily records in any order; only those inside the window are used
/// * `rules` - Validated rule base
/// * `config` - Engine configuration
/// * `at` - Analysis instant; its UTC date ends the analysis window
///
/// # Returns
/// The full analysis. No triggered rules is a valid result with low risk.
///
/// # Example
/// ```no_run
/// use chrono::Utc;
/// use wellbeing_advice::{analyze_user, DailyRecord, EngineConfig, RuleBase};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let rules = RuleBase::builtin()?;
/// let records: Vec<DailyRecord> = serde_json::from_str(&std::fs::read_to_string("records.json")?)?;
/// let analysis = analyze_user("user-1", &records, &rules, &EngineConfig::default(), Utc::now())?;
/// println!("{:?}", analysis.risk_level);
/// # Ok(())
/// # }
/// ```
pub fn analyze_user(
    user_id: &str,
    records: &[DailyRecord],
    rules: &RuleBase,
    config: &EngineConfig,
    at: DateTime<Utc>,
) -> Result<UserAnalysis, AnalysisError> {
    config
        .validate()
        .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;

    let analysis_date = at.date_naive();
    let window_days = rules.window_days(config.default_window_days);
    let period = window_ending(analysis_date, window_days)?;

    // Stage 1: Extract per-metric samples
    let window = MetricExtractor::extract_window(records, period);
    debug!(user = user_id, metrics = window.series.len(), "samples extracted");

    // Stage 2: Classify patterns
    let (patterns, classifier_warnings) = TrendClassifier::classify_window(&window, period, config)?;
    ensure_unique_patterns(&patterns)?;

    // Stage 3: Match rules, then score and compose against the rule's own period
    let mut triggered_rules: Vec<TriggeredRule> = Vec::new();
    let mut recommendations = Vec::new();
    for rule in rules.rules() {
        let Some(conditions) = RuleMatcher::match_rule(rule, &patterns, analysis_date, config) else {
            continue;
        };

        let rule_period = window_ending(analysis_date, rule.period_days())?;
        let rule_patterns = TrendClassifier::narrow(&patterns, rule_period, config)?;

        let triggered = TriggeredRule {
            rule: rule.clone(),
            trigger_date: analysis_date,
            confidence: Scorer::confidence(rule, &conditions, &rule_patterns, config),
            matched_conditions: conditions,
        };

        // Stage 4: Compose advice
        let priority = Scorer::priority(rule, &rule_patterns);
        recommendations.push(AdviceComposer::compose(
            &triggered,
            &rule_patterns,
            user_id,
            at,
            priority,
        ));
        triggered_rules.push(triggered);
    }
    AdviceComposer::order(&mut recommendations);

    // Stage 5: Aggregate risk
    let risk_level = RiskAggregator::aggregate(&triggered_rules);

    let mut warnings = window.warnings;
    warnings.extend(classifier_warnings);

    info!(
        user = user_id,
        %analysis_date,
        patterns = patterns.len(),
        triggered = triggered_rules.len(),
        risk = ?risk_level,
        warnings = warnings.len(),
        "analysis complete"
    );

    Ok(UserAnalysis {
        user_id: user_id.to_string(),
        analysis_date,
        patterns,
        triggered_rules,
        risk_level,
        recommendations,
        warnings,
    })
}

fn window_ending(end: NaiveDate, days: u32) -> Result<Period, AnalysisError> {
    Period::ending_on(end, days).ok_or_else(|| {
        AnalysisError::InvalidWindow(format!("{days} days ending on {end} is out of range"))
    })
}

fn ensure_unique_patterns(patterns: &[DataPattern]) -> Result<(), AnalysisError> {
    let mut seen = HashSet::new();
    for pattern in patterns {
        if !seen.insert(pattern.metric) {
            return Err(AnalysisError::DuplicatePattern(pattern.metric));
        }
    }
    Ok(())
}

/// One user's records, as supplied to batch analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecords {
    pub user_id: String,
    pub records: Vec<DailyRecord>,
}

/// Outcome of one user in a batch
#[derive(Debug)]
pub struct BatchEntry {
    pub user_id: String,
    pub result: Result<UserAnalysis, AnalysisError>,
}

/// Reusable engine holding a shared, read-only rule base.
///
/// Cloning is cheap and clones share the rule base, so one engine can be
/// handed to many workers.
#[derive(Debug, Clone)]
pub struct AdviceEngine {
    rules: Arc<RuleBase>,
    config: EngineConfig,
}

impl AdviceEngine {
    /// Create an engine with default configuration
    pub fn new(rules: Arc<RuleBase>) -> Self {
        Self {
            rules,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine with a validated configuration
    pub fn with_config(rules: Arc<RuleBase>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { rules, config })
    }

    /// Create an engine over the built-in rule base
    pub fn builtin() -> Result<Self, RuleConfigError> {
        Ok(Self::new(Arc::new(RuleBase::builtin()?)))
    }

    pub fn rules(&self) -> &RuleBase {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze one user
    pub fn analyze(
        &self,
        user_id: &str,
        records: &[DailyRecord],
        at: DateTime<Utc>,
    ) -> Result<UserAnalysis, AnalysisError> {
        analyze_user(user_id, records, &self.rules, &self.config, at)
    }

    /// Analyze many users at the same instant.
    ///
    /// Results come back in input order; a failed user does not affect the others.
    pub fn analyze_batch(&self, users: &[UserRecords], at: DateTime<Utc>) -> Vec<BatchEntry> {
        let run = |user: &UserRecords| BatchEntry {
            user_id: user.user_id.clone(),
            result: self.analyze(&user.user_id, &user.records, at),
        };

        #[cfg(feature = "parallel")]
        let entries = {
            use rayon::prelude::*;
            users.par_iter().map(run).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let entries = users.iter().map(run).collect();

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::types::{
        AnalysisWarning, BreakSlot, ConcernLevel, Domain, FocusLog, RiskLevel, SleepLog, Trend,
        WellbeingLog,
    };
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use pretty_assertions::assert_eq;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn at(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, n, 21, 0, 0).unwrap()
    }

    struct Day {
        energy: f64,
        sleep: f64,
        breaks: usize,
        sport: Option<f64>,
        social: bool,
        focus: f64,
        fatigue: f64,
    }

    fn record(date: NaiveDate, d: &Day) -> DailyRecord {
        let slots = (0..d.breaks)
            .map(|i| BreakSlot {
                start: NaiveTime::from_hms_opt(10 + i as u32, 0, 0).unwrap(),
                duration_minutes: Some(10),
            })
            .collect();

        DailyRecord {
            date,
            sleep: Some(SleepLog {
                bedtime: Some(NaiveTime::from_hms_opt(23, 0, 0).unwrap()),
                wake_time: None,
                duration_hours: d.sleep,
            }),
            focus: Some(FocusLog {
                focus_hours: d.focus,
                fatigue: d.fatigue,
            }),
            tasks: vec![],
            wellbeing: Some(WellbeingLog {
                break_slots: Some(slots),
                sport_hours: d.sport,
                leisure_hours: None,
                social_interaction: Some(d.social),
                energy: d.energy,
            }),
        }
    }

    fn burnout_week() -> Vec<DailyRecord> {
        let energy = [2.0, 1.5, 2.0, 1.5, 1.5, 1.5, 1.2];
        let sleep = [6.0, 5.5, 5.0, 5.5, 6.0, 5.0, 5.5];
        let breaks = [1, 0, 1, 0, 1, 0, 0];
        (0..7)
            .map(|i| {
                record(
                    day(i as u32 + 1),
                    &Day {
                        energy: energy[i],
                        sleep: sleep[i],
                        breaks: breaks[i],
                        sport: None,
                        social: true,
                        focus: 8.0,
                        fatigue: 3.0,
                    },
                )
            })
            .collect()
    }

    fn balanced_day(date: NaiveDate, social: bool) -> DailyRecord {
        record(
            date,
            &Day {
                energy: 4.2,
                sleep: 7.8,
                breaks: 3,
                sport: Some(1.0),
                social,
                focus: 6.0,
                fatigue: 2.0,
            },
        )
    }

    fn engine() -> AdviceEngine {
        AdviceEngine::builtin().unwrap()
    }

    #[test]
    fn test_burnout_scenario() {
        let analysis = engine().analyze("user-1", &burnout_week(), at(7)).unwrap();

        assert_eq!(analysis.pattern(Metric::Energy).unwrap().concern_level, ConcernLevel::High);
        assert_eq!(analysis.pattern(Metric::SleepDuration).unwrap().concern_level, ConcernLevel::High);
        assert!(analysis
            .triggered_rules
            .iter()
            .any(|t| t.rule.domain == Domain::OccupationalHealth));
        assert!(analysis.risk_level >= RiskLevel::High);
        assert_eq!(analysis.risk_level, RiskLevel::Critical);

        let ids: Vec<&str> = analysis.recommendations.iter().map(|a| a.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "occupational-health-burnout",
                "psychology-low-energy",
                "psychology-sleep-deprivation",
                "ergonomics-insufficient-breaks",
            ]
        );
        assert_eq!(analysis.recommendations[0].priority, 4);
        assert!(analysis
            .recommendations
            .iter()
            .all(|a| a.user_id == "user-1" && a.follow_up_date.is_some()));
    }

    #[test]
    fn test_balanced_scenario() {
        let records: Vec<DailyRecord> = (1..=7).map(|d| balanced_day(day(d), d != 4)).collect();
        let analysis = engine().analyze("user-2", &records, at(7)).unwrap();

        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.recommendations.is_empty());
        assert!(analysis.triggered_rules.is_empty());
        assert_eq!(analysis.pattern(Metric::Energy).unwrap().concern_level, ConcernLevel::None);

        let social = analysis.pattern(Metric::SocialInteraction).unwrap();
        assert!((social.average - 6.0 / 7.0).abs() < 1e-9);
        assert_eq!(social.concern_level, ConcernLevel::None);
    }

    #[test]
    fn test_insufficient_data_scenario() {
        let records = vec![balanced_day(day(7), true)];
        let analysis = engine().analyze("user-3", &records, at(7)).unwrap();

        assert!(!analysis.patterns.is_empty());
        for pattern in &analysis.patterns {
            assert_eq!(pattern.trend, Trend::Stable);
            assert!(pattern.insufficient_data);
            assert!(pattern.confidence < 0.5);
        }
        let insufficient = analysis
            .warnings
            .iter()
            .filter(|w| matches!(w, AnalysisWarning::InsufficientData { .. }))
            .count();
        assert_eq!(insufficient, analysis.patterns.len());
    }

    #[test]
    fn test_single_day_never_fires_weekly_rule() {
        let rules = RuleBase::from_json(
            &serde_json::json!([{
                "id": "weekly-fatigue",
                "domain": "occupational-health",
                "name": "Weekly fatigue",
                "description": "High weekly fatigue",
                "triggers": [
                    { "metric": "fatigue", "operator": ">=", "value": 4, "frequency": "weekly", "threshold": 1 }
                ],
                "analysis_period_weeks": 1,
                "severity": "alert",
                "advice": {
                    "title": "Fatigue",
                    "problem": "Fatigue is high",
                    "explanation": "Rest",
                    "actions": [],
                    "follow_up": { "recheck_after_days": 7 }
                },
                "evidence_level": "scientific",
                "source": "Test"
            }])
            .to_string(),
        )
        .unwrap();

        let mut record = balanced_day(day(7), true);
        record.focus = Some(FocusLog {
            focus_hours: 6.0,
            fatigue: 5.0,
        });

        let analysis =
            analyze_user("user-4", &[record], &rules, &EngineConfig::default(), at(7)).unwrap();
        assert!(analysis.triggered_rules.is_empty());
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_and_semantics_needs_both_metrics() {
        let base = RuleBase::builtin().unwrap();
        let burnout = base.get("occupational-health-burnout").unwrap().clone();
        let rules = RuleBase::from_rules(vec![burnout]).unwrap();

        let full = burnout_week();
        let analysis = analyze_user("u", &full, &rules, &EngineConfig::default(), at(7)).unwrap();
        assert_eq!(analysis.triggered_rules.len(), 1);
        assert_eq!(analysis.triggered_rules[0].matched_conditions.len(), 2);

        let without_sleep: Vec<DailyRecord> = full
            .into_iter()
            .map(|mut r| {
                r.sleep = None;
                r
            })
            .collect();
        let analysis =
            analyze_user("u", &without_sleep, &rules, &EngineConfig::default(), at(7)).unwrap();
        assert!(analysis.triggered_rules.is_empty());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let engine = engine();
        let records = burnout_week();
        let first = engine.analyze("user-1", &records, at(7)).unwrap();
        let second = engine.analyze("user-1", &records, at(7)).unwrap();
        assert_eq!(first, second);

        let mut shuffled = records.clone();
        shuffled.reverse();
        let third = engine.analyze("user-1", &shuffled, at(7)).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_records_outside_window_ignored() {
        let mut records = burnout_week();
        records.push(balanced_day(day(20), true));
        let analysis = engine().analyze("user-1", &records, at(7)).unwrap();
        assert_eq!(analysis.pattern(Metric::Energy).unwrap().sample_count, 7);
    }

    #[test]
    fn test_batch_preserves_order() {
        let users = vec![
            UserRecords {
                user_id: "burnout".to_string(),
                records: burnout_week(),
            },
            UserRecords {
                user_id: "balanced".to_string(),
                records: (1..=7).map(|d| balanced_day(day(d), true)).collect(),
            },
            UserRecords {
                user_id: "empty".to_string(),
                records: vec![],
            },
        ];

        let results = engine().analyze_batch(&users, at(7));
        let ids: Vec<&str> = results.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["burnout", "balanced", "empty"]);

        let risks: Vec<RiskLevel> = results
            .iter()
            .map(|r| r.result.as_ref().unwrap().risk_level)
            .collect();
        assert_eq!(risks, vec![RiskLevel::Critical, RiskLevel::Low, RiskLevel::Low]);
        assert!(results[2].result.as_ref().unwrap().patterns.is_empty());
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AdviceEngine>();

        let engine = engine();
        let clone = engine.clone();
        assert!(Arc::ptr_eq(&engine.rules, &clone.rules));
    }

    #[test]
    fn test_advice_values_match_rule_period() {
        // Good first week, poor second week; the low-energy rule looks at one week
        let records: Vec<DailyRecord> = (1..=14)
            .map(|d| {
                let mut r = balanced_day(day(d), true);
                if let Some(w) = r.wellbeing.as_mut() {
                    w.energy = if d <= 7 { 4.5 } else { 1.5 };
                }
                r
            })
            .collect();

        let analysis = engine().analyze("user-1", &records, at(14)).unwrap();

        let full = analysis.pattern(Metric::Energy).unwrap();
        assert!((full.average - 3.0).abs() < 1e-9);

        let advice = analysis
            .recommendations
            .iter()
            .find(|a| a.rule_id == "psychology-low-energy")
            .unwrap();
        assert_eq!(
            advice.advice.problem,
            "Your energy averaged 1.5 between 2024-03-08 and 2024-03-14 (energy < 2.5 on 7/7 days)."
        );
        assert_eq!(advice.priority, 3);
    }

    #[test]
    fn test_priority_uses_rule_period_trend() {
        // Week one is fine, week two slides from low to very low energy
        let energy = [4.5, 4.5, 4.5, 4.5, 4.5, 4.5, 4.5, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0];
        let records: Vec<DailyRecord> = (1..=14)
            .map(|d| {
                let mut r = balanced_day(day(d), true);
                if let Some(w) = r.wellbeing.as_mut() {
                    w.energy = energy[d as usize - 1];
                }
                r
            })
            .collect();

        let analysis = engine().analyze("user-1", &records, at(14)).unwrap();

        let advice = analysis
            .recommendations
            .iter()
            .find(|a| a.rule_id == "psychology-low-energy")
            .unwrap();
        assert_eq!(advice.priority, 4);
    }

    #[test]
    fn test_weekly_rule_fires_on_any_weekday() {
        // 2024-03-18 is a Monday; windows end mid-week and start mid-week
        for end in 17..=24 {
            let records: Vec<DailyRecord> = (end - 13..=end)
                .map(|d| {
                    let mut r = balanced_day(day(d), true);
                    r.focus = Some(FocusLog {
                        focus_hours: 6.0,
                        fatigue: 4.5,
                    });
                    r
                })
                .collect();

            let analysis = engine().analyze("user-1", &records, at(end)).unwrap();
            let fired = analysis
                .triggered_rules
                .iter()
                .find(|t| t.rule.id == "occupational-health-chronic-fatigue");
            assert!(fired.is_some(), "chronic fatigue did not fire for window ending {}", day(end));
            assert_eq!(
                fired.unwrap().matched_conditions[0].satisfied_count,
                fired.unwrap().matched_conditions[0].evaluated_count
            );
        }
    }

    #[test]
    fn test_one_shot_rejects_invalid_config() {
        let rules = RuleBase::builtin().unwrap();
        let config = EngineConfig {
            min_samples_per_week: 0,
            ..EngineConfig::default()
        };
        let result = analyze_user("user-1", &burnout_week(), &rules, &config, at(7));
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let rules = Arc::new(RuleBase::builtin().unwrap());
        let config = EngineConfig {
            min_samples_per_week: 0,
            ..EngineConfig::default()
        };
        assert!(AdviceEngine::with_config(rules, config).is_err());
    }
}
