//! Risk aggregation across triggered rules

use crate::types::{Domain, RiskLevel, TriggeredRule};
use std::collections::BTreeSet;

/// Distinct triggered domains that escalate the verdict by one level
pub const CORROBORATING_DOMAINS: usize = 3;

pub struct RiskAggregator;

impl RiskAggregator {
    /// Highest triggered severity as a risk level, escalated once when
    /// enough independent domains fired together. No rules means low risk.
    pub fn aggregate(triggered: &[TriggeredRule]) -> RiskLevel {
        let Some(worst) = triggered.iter().map(|t| t.rule.severity).max() else {
            return RiskLevel::Low;
        };

        let level = RiskLevel::from(worst);
        if triggered_domains(triggered).len() >= CORROBORATING_DOMAINS {
            level.escalate()
        } else {
            level
        }
    }
}

pub fn triggered_domains(triggered: &[TriggeredRule]) -> BTreeSet<Domain> {
    triggered.iter().map(|t| t.rule.domain).collect()
}
