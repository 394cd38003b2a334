//! Error types for the wellbeing advice engine
//!
//! Configuration problems are fatal and surface only when a rule base or
//! engine config is loaded. Per-record and per-metric problems never become
//! errors; they are recovered locally and reported as
//! [`AnalysisWarning`](crate::types::AnalysisWarning)s instead.

use crate::metrics::Metric;
use thiserror::Error;

/// Errors raised while loading or validating a rule base
#[derive(Debug, Error)]
pub enum RuleConfigError {
    #[error("Invalid rule base JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rule base contains no rules")]
    EmptyRuleBase,

    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(String),

    #[error("Rule {rule_id} has no triggers")]
    NoTriggers { rule_id: String },

    #[error("Rule {rule_id} has an analysis period of {weeks} weeks, expected 1..={max}")]
    InvalidPeriod { rule_id: String, weeks: u32, max: u32 },

    #[error("Rule {rule_id}, trigger on {metric}: {reason}")]
    InvalidTrigger {
        rule_id: String,
        metric: Metric,
        reason: String,
    },

    #[error("Rule {rule_id} has an invalid follow-up: {reason}")]
    InvalidFollowUp { rule_id: String, reason: String },
}

/// Errors that fail a single user's analysis run
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("No concern band contains {value} for metric {metric}")]
    UnclassifiableValue { metric: Metric, value: f64 },

    #[error("Duplicate pattern for metric {0}")]
    DuplicatePattern(Metric),

    #[error("Invalid analysis window: {0}")]
    InvalidWindow(String),

    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}

/// Errors raised while loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid engine config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid engine config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
