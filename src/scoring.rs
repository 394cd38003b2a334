//! Confidence and priority scoring for triggered rules

use crate::config::EngineConfig;
use crate::types::{
    ConcernLevel, DataPattern, EvidenceLevel, ExpertiseRule, MatchedCondition, Severity, Trend,
};

/// Highest priority an advice can carry
pub const MAX_PRIORITY: u8 = 5;

/// Scorer for triggered rules
pub struct Scorer;

impl Scorer {
    /// Mean trigger strength weighted by evidence, clamped to [0, 1].
    ///
    /// Halved (by the configured penalty) when any pattern the rule reads
    /// had insufficient data.
    pub fn confidence(
        rule: &ExpertiseRule,
        conditions: &[MatchedCondition],
        patterns: &[DataPattern],
        config: &EngineConfig,
    ) -> f64 {
        if conditions.is_empty() {
            return 0.0;
        }
        let strength =
            conditions.iter().map(|c| c.strength).sum::<f64>() / conditions.len() as f64;
        let mut confidence = strength * evidence_weight(rule.evidence_level);

        let thin_data = rule.triggers.iter().any(|t| {
            patterns
                .iter()
                .any(|p| p.metric == t.metric && p.insufficient_data)
        });
        if thin_data {
            confidence *= config.insufficient_data_penalty;
        }

        confidence.clamp(0.0, 1.0)
    }

    /// Severity base, +1 when the primary metric is high and declining
    pub fn priority(rule: &ExpertiseRule, patterns: &[DataPattern]) -> u8 {
        let base = severity_priority(rule.severity);
        let compounding = rule.primary_metric().is_some_and(|metric| {
            patterns.iter().any(|p| {
                p.metric == metric
                    && p.concern_level == ConcernLevel::High
                    && p.trend == Trend::Declining
            })
        });

        if compounding {
            (base + 1).min(MAX_PRIORITY)
        } else {
            base
        }
    }
}

pub fn evidence_weight(level: EvidenceLevel) -> f64 {
    match level {
        EvidenceLevel::Scientific => 1.0,
        EvidenceLevel::ExpertConsensus => 0.8,
        EvidenceLevel::GoodPractice => 0.6,
    }
}

pub fn severity_priority(severity: Severity) -> u8 {
    match severity {
        Severity::Info => 1,
        Severity::Attention => 2,
        Severity::Alert => 3,
        Severity::Critical => 5,
    }
}
