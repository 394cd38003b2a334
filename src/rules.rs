//! Rule base loading and validation
//!
//! The rule base is static configuration: it is parsed once, validated in
//! full, and then shared read-only by every analysis run. Anything wrong with
//! a rule is reported here as a [`RuleConfigError`] and never mid-analysis.

use crate::error::RuleConfigError;
use crate::metrics::Metric;
use crate::types::{Domain, ExpertiseRule, Frequency, Operator, RuleTrigger, TriggerValue};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Built-in rule base shipped with the crate
const BUILTIN_RULES: &str = include_str!("../data/default_rules.json");

/// Longest period a rule may look back over
pub const MAX_ANALYSIS_PERIOD_WEEKS: u32 = 52;

/// Validated, read-only collection of expertise rules
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBase {
    rules: Vec<ExpertiseRule>,
}

impl RuleBase {
    /// Parse a JSON array of rules and validate it
    pub fn from_json(json: &str) -> Result<Self, RuleConfigError> {
        let rules: Vec<ExpertiseRule> = serde_json::from_str(json)?;
        Self::from_rules(rules)
    }

    /// Validate an already-built rule list
    pub fn from_rules(rules: Vec<ExpertiseRule>) -> Result<Self, RuleConfigError> {
        validate_rules(&rules)?;
        debug!(rules = rules.len(), "rule base loaded");
        Ok(Self { rules })
    }

    /// The default rule base embedded in the crate
    pub fn builtin() -> Result<Self, RuleConfigError> {
        Self::from_json(BUILTIN_RULES)
    }

    pub fn rules(&self) -> &[ExpertiseRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ExpertiseRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Domains covered by at least one rule
    pub fn domains(&self) -> BTreeSet<Domain> {
        self.rules.iter().map(|r| r.domain).collect()
    }

    /// Metrics referenced by at least one trigger
    pub fn metrics(&self) -> BTreeSet<Metric> {
        self.rules
            .iter()
            .flat_map(|r| r.triggers.iter().map(|t| t.metric))
            .collect()
    }

    /// Days of history the longest rule needs, or `default_days` if longer
    pub fn window_days(&self, default_days: u32) -> u32 {
        self.rules
            .iter()
            .map(ExpertiseRule::period_days)
            .fold(default_days, u32::max)
    }
}

fn validate_rules(rules: &[ExpertiseRule]) -> Result<(), RuleConfigError> {
    if rules.is_empty() {
        return Err(RuleConfigError::EmptyRuleBase);
    }

    let mut ids = HashSet::new();
    for rule in rules {
        if !ids.insert(rule.id.as_str()) {
            return Err(RuleConfigError::DuplicateRuleId(rule.id.clone()));
        }
        validate_rule(rule)?;
    }
    Ok(())
}

fn validate_rule(rule: &ExpertiseRule) -> Result<(), RuleConfigError> {
    if rule.triggers.is_empty() {
        return Err(RuleConfigError::NoTriggers {
            rule_id: rule.id.clone(),
        });
    }
    if !(1..=MAX_ANALYSIS_PERIOD_WEEKS).contains(&rule.analysis_period_weeks) {
        return Err(RuleConfigError::InvalidPeriod {
            rule_id: rule.id.clone(),
            weeks: rule.analysis_period_weeks,
            max: MAX_ANALYSIS_PERIOD_WEEKS,
        });
    }

    for trigger in &rule.triggers {
        validate_trigger(rule, trigger).map_err(|reason| RuleConfigError::InvalidTrigger {
            rule_id: rule.id.clone(),
            metric: trigger.metric,
            reason,
        })?;
    }

    let follow_up = &rule.advice.follow_up;
    if follow_up.recheck_after_days == 0 {
        return Err(RuleConfigError::InvalidFollowUp {
            rule_id: rule.id.clone(),
            reason: "recheck_after_days must be at least 1".to_string(),
        });
    }
    if let Some(threshold) = follow_up.escalation_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RuleConfigError::InvalidFollowUp {
                rule_id: rule.id.clone(),
                reason: format!("escalation_threshold {threshold} is outside [0, 1]"),
            });
        }
    }
    Ok(())
}

fn validate_trigger(rule: &ExpertiseRule, trigger: &RuleTrigger) -> Result<(), String> {
    match (trigger.metric.is_boolean(), trigger.value) {
        (false, TriggerValue::Flag(_)) => {
            return Err("boolean value on a numeric metric".to_string());
        }
        (_, TriggerValue::Number(v)) if !v.is_finite() => {
            return Err(format!("value {v} is not finite"));
        }
        (true, TriggerValue::Flag(_)) => {
            if trigger.frequency != Frequency::Daily {
                return Err("boolean value requires daily frequency; use a proportion instead".to_string());
            }
            if !matches!(trigger.operator, Operator::Eq | Operator::Ne) {
                return Err(format!(
                    "operator {} is not allowed on a boolean value",
                    trigger.operator.symbol()
                ));
            }
        }
        (true, TriggerValue::Number(v)) => {
            if trigger.frequency == Frequency::Daily {
                return Err("daily trigger on a boolean metric needs a boolean value".to_string());
            }
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("proportion {v} is outside [0, 1]"));
            }
        }
        (false, TriggerValue::Number(_)) => {}
    }

    let reachable = match trigger.frequency {
        Frequency::Daily => rule.period_days(),
        Frequency::Weekly => rule.analysis_period_weeks,
        Frequency::Cumulative => return Ok(()),
    };
    if trigger.threshold == 0 || trigger.threshold > reachable {
        return Err(format!(
            "threshold {} is outside 1..={reachable} for a {}-week period",
            trigger.threshold, rule.analysis_period_weeks
        ));
    }
    Ok(())
}
