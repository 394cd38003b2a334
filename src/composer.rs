//! Advice composition
//!
//! Instantiates a triggered rule's advice template for one user: fills the
//! placeholders with the values that matched, attaches a medical disclaimer
//! where the domain or severity calls for one, and schedules the follow-up.

use crate::types::{
    AdviceStatus, AdviceTemplate, DataPattern, Domain, GeneratedAdvice, Period, Severity,
    TriggeredRule,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

/// Namespace for deterministic advice ids
const ADVICE_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_53c2_9e0b_4d8a_b7c4_2f1e_8d90_a3b5);

/// Disclaimer attached when a rule requires one and its template has none
pub const DEFAULT_MEDICAL_DISCLAIMER: &str = "This advice is informational and does not replace \
     assessment by a qualified health professional. If symptoms persist or worsen, consult a doctor.";

/// Composer for turning triggered rules into user-facing advice
pub struct AdviceComposer;

impl AdviceComposer {
    /// Build advice for a triggered rule.
    ///
    /// `patterns` should cover the rule's own period, so placeholder values
    /// match the dates and conditions printed beside them.
    pub fn compose(
        triggered: &TriggeredRule,
        patterns: &[DataPattern],
        user_id: &str,
        generated_at: DateTime<Utc>,
        priority: u8,
    ) -> GeneratedAdvice {
        let rule = &triggered.rule;
        let analysis_date = generated_at.date_naive();
        let context = TemplateContext::new(triggered, patterns, analysis_date);

        let requires_medical_disclaimer = requires_disclaimer(rule.domain, rule.severity);
        let mut advice = AdviceTemplate {
            problem: context.render(&rule.advice.problem),
            explanation: context.render(&rule.advice.explanation),
            ..rule.advice.clone()
        };
        if requires_medical_disclaimer && advice.medical_disclaimer.is_none() {
            advice.medical_disclaimer = Some(DEFAULT_MEDICAL_DISCLAIMER.to_string());
        }

        let follow_up_date = analysis_date
            .checked_add_days(Days::new(u64::from(rule.advice.follow_up.recheck_after_days)));

        GeneratedAdvice {
            id: advice_id(user_id, &rule.id, generated_at),
            rule_id: rule.id.clone(),
            user_id: user_id.to_string(),
            generated_at,
            priority,
            severity: rule.severity,
            domain: rule.domain,
            confidence: triggered.confidence,
            advice,
            requires_medical_disclaimer,
            status: AdviceStatus::Active,
            follow_up_date,
        }
    }

    /// Priority descending, then severity descending, then rule id
    pub fn order(recommendations: &mut [GeneratedAdvice]) {
        recommendations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.severity.cmp(&a.severity))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
    }
}

pub fn requires_disclaimer(domain: Domain, severity: Severity) -> bool {
    domain == Domain::ComplementaryMedicine || severity == Severity::Critical
}

/// Same user, rule and instant always yield the same id
pub fn advice_id(user_id: &str, rule_id: &str, generated_at: DateTime<Utc>) -> Uuid {
    let name = format!("{user_id}/{rule_id}/{}", generated_at.to_rfc3339());
    Uuid::new_v5(&ADVICE_NAMESPACE, name.as_bytes())
}

/// Values available to template placeholders
struct TemplateContext {
    replacements: Vec<(&'static str, String)>,
}

impl TemplateContext {
    fn new(triggered: &TriggeredRule, patterns: &[DataPattern], analysis_date: NaiveDate) -> Self {
        let rule = &triggered.rule;
        let mut replacements = Vec::new();

        if let Some(metric) = rule.primary_metric() {
            replacements.push(("{metric}", metric.as_str().replace('_', " ")));

            if let Some(pattern) = patterns.iter().find(|p| p.metric == metric) {
                replacements.push(("{average}", format!("{:.1}", pattern.average)));
                if let Some(pct) = pattern.percentage {
                    replacements.push(("{percentage}", format!("{pct:.0}")));
                }
            }
        }

        replacements.push(("{period_days}", rule.period_days().to_string()));
        if let Some(period) = Period::ending_on(analysis_date, rule.period_days()) {
            replacements.push(("{period_start}", period.start.to_string()));
            replacements.push(("{period_end}", period.end.to_string()));
        }

        let conditions: Vec<&str> = triggered
            .matched_conditions
            .iter()
            .map(|c| c.description.as_str())
            .collect();
        replacements.push(("{conditions}", conditions.join("; ")));

        Self { replacements }
    }

    /// Substitute known placeholders; unknown ones are left as written
    fn render(&self, text: &str) -> String {
        self.replacements
            .iter()
            .fold(text.to_string(), |acc, (key, value)| acc.replace(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::rules::RuleBase;
    use crate::types::{ConcernLevel, ExpertiseRule, Frequency, MatchedCondition, ReferenceValues, Trend};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 20, 0, 0).unwrap()
    }

    fn builtin(id: &str) -> ExpertiseRule {
        RuleBase::builtin().unwrap().get(id).unwrap().clone()
    }

    fn triggered(rule: ExpertiseRule) -> TriggeredRule {
        TriggeredRule {
            rule,
            trigger_date: at().date_naive(),
            matched_conditions: vec![MatchedCondition {
                metric: Metric::Energy,
                frequency: Frequency::Daily,
                description: "energy < 2.5 on 6/7 days".to_string(),
                observed: 6.0,
                satisfied_count: Some(6),
                evaluated_count: Some(7),
                strength: 0.83,
            }],
            confidence: 0.83,
        }
    }

    fn energy_pattern() -> DataPattern {
        DataPattern {
            metric: Metric::Energy,
            period: Period::ending_on(at().date_naive(), 7).unwrap(),
            trend: Trend::Declining,
            values: vec![],
            average: 1.64,
            percentage: None,
            concern_level: ConcernLevel::High,
            reference_values: ReferenceValues {
                optimal: 4.0,
                acceptable: 3.0,
                concerning: 2.0,
            },
            sample_count: 7,
            confidence: 1.0,
            insufficient_data: false,
        }
    }

    #[test]
    fn test_placeholders_substituted() {
        let advice = AdviceComposer::compose(
            &triggered(builtin("psychology-low-energy")),
            &[energy_pattern()],
            "user-1",
            at(),
            4,
        );

        assert_eq!(
            advice.advice.problem,
            "Your energy averaged 1.6 between 2024-03-01 and 2024-03-07 (energy < 2.5 on 6/7 days)."
        );
        assert_eq!(advice.priority, 4);
        assert_eq!(advice.status, AdviceStatus::Active);
        assert_eq!(advice.follow_up_date, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert!(!advice.requires_medical_disclaimer);
        assert_eq!(advice.advice.medical_disclaimer, None);
    }

    #[test]
    fn test_unknown_placeholder_left_intact() {
        let mut rule = builtin("psychology-low-energy");
        rule.advice.problem = "{metric} and {mood} over {period_days} days".to_string();
        let advice = AdviceComposer::compose(&triggered(rule), &[], "user-1", at(), 3);
        assert_eq!(advice.advice.problem, "energy and {mood} over 7 days");
    }

    #[test]
    fn test_disclaimer_attached() {
        let movement = AdviceComposer::compose(
            &triggered(builtin("complementary-medicine-movement")),
            &[],
            "user-1",
            at(),
            1,
        );
        assert!(movement.requires_medical_disclaimer);
        assert_eq!(
            movement.advice.medical_disclaimer.as_deref(),
            Some(DEFAULT_MEDICAL_DISCLAIMER)
        );

        let mut critical = builtin("psychology-low-energy");
        critical.severity = Severity::Critical;
        critical.advice.medical_disclaimer = Some("See a doctor.".to_string());
        let advice = AdviceComposer::compose(&triggered(critical), &[], "user-1", at(), 5);
        assert!(advice.requires_medical_disclaimer);
        assert_eq!(advice.advice.medical_disclaimer.as_deref(), Some("See a doctor."));
    }

    #[test]
    fn test_ids_are_deterministic() {
        let a = advice_id("user-1", "rule-a", at());
        assert_eq!(a, advice_id("user-1", "rule-a", at()));
        assert_ne!(a, advice_id("user-2", "rule-a", at()));
        assert_ne!(a, advice_id("user-1", "rule-b", at()));
    }

    #[test]
    fn test_ordering() {
        let compose = |id: &str, priority: u8| {
            AdviceComposer::compose(&triggered(builtin(id)), &[], "user-1", at(), priority)
        };
        let mut advice = vec![
            compose("complementary-medicine-movement", 1),
            compose("psychology-sleep-deprivation", 3),
            compose("ergonomics-insufficient-breaks", 3),
            compose("occupational-health-burnout", 3),
            compose("occupational-health-chronic-fatigue", 5),
        ];
        AdviceComposer::order(&mut advice);

        let ids: Vec<&str> = advice.iter().map(|a| a.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "occupational-health-chronic-fatigue",
                "occupational-health-burnout",
                "psychology-sleep-deprivation",
                "ergonomics-insufficient-breaks",
                "complementary-medicine-movement",
            ]
        );
    }
}
