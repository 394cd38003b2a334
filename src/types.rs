//! Core types for the wellbeing advice engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: daily records, metric samples, classified patterns, the static rule
//! base, triggered rules, generated advice and the final analysis.

use crate::metrics::Metric;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Input records
// ============================================================================

/// One calendar day of self-reported values for a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Day this record describes
    pub date: NaiveDate,
    /// Sleep timing and duration
    #[serde(default)]
    pub sleep: Option<SleepLog>,
    /// Focus hours and fatigue rating
    #[serde(default)]
    pub focus: Option<FocusLog>,
    /// Tasks planned or done that day
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Breaks, leisure, social contact and energy
    #[serde(default)]
    pub wellbeing: Option<WellbeingLog>,
}

/// Sleep entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepLog {
    /// Time the user went to bed
    #[serde(default)]
    pub bedtime: Option<NaiveTime>,
    /// Time the user woke up
    #[serde(default)]
    pub wake_time: Option<NaiveTime>,
    /// Total sleep in hours (0 = not logged)
    #[serde(default)]
    pub duration_hours: f64,
}

/// Focus entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusLog {
    /// Hours of focused work (0 = not logged)
    #[serde(default)]
    pub focus_hours: f64,
    /// Fatigue rating on a 1-5 scale (0 = not logged)
    #[serde(default)]
    pub fatigue: f64,
}

/// A task entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub completed: bool,
}

/// A break taken during the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakSlot {
    pub start: NaiveTime,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// Wellbeing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellbeingLog {
    /// Breaks taken; absent means not logged, empty means no breaks
    #[serde(default)]
    pub break_slots: Option<Vec<BreakSlot>>,
    /// Hours of sport
    #[serde(default)]
    pub sport_hours: Option<f64>,
    /// Hours of leisure
    #[serde(default)]
    pub leisure_hours: Option<f64>,
    /// Whether the user had meaningful social contact
    #[serde(default)]
    pub social_interaction: Option<bool>,
    /// Energy score on a 1-5 scale (0 = not logged)
    #[serde(default)]
    pub energy: f64,
}

// ============================================================================
// Samples and patterns
// ============================================================================

/// Value of a single metric sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Flag(bool),
    Number(f64),
}

impl SampleValue {
    /// Numeric view of the value; flags normalize to 0/1
    pub fn as_f64(&self) -> f64 {
        match self {
            SampleValue::Flag(true) => 1.0,
            SampleValue::Flag(false) => 0.0,
            SampleValue::Number(v) => *v,
        }
    }
}

/// One metric value for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric: Metric,
    pub date: NaiveDate,
    pub value: SampleValue,
}

/// Direction a metric moved across the analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Ordinal concern of a classified metric (higher is always worse)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernLevel {
    None,
    Low,
    Medium,
    High,
}

impl ConcernLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcernLevel::None => "none",
            ConcernLevel::Low => "low",
            ConcernLevel::Medium => "medium",
            ConcernLevel::High => "high",
        }
    }
}

/// Threshold edges surfaced for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValues {
    /// Edge of the no-concern band
    pub optimal: f64,
    /// Edge between low and medium concern
    pub acceptable: f64,
    /// Edge between medium and high concern
    pub concerning: f64,
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Period of `days` days ending on `end` (inclusive)
    pub fn ending_on(end: NaiveDate, days: u32) -> Option<Self> {
        let span = days.checked_sub(1)?;
        let start = end.checked_sub_days(chrono::Days::new(u64::from(span)))?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered
    pub fn days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1).max(0) as u32
    }
}

/// Classified pattern for one metric over the analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPattern {
    pub metric: Metric,
    /// Analysis window the pattern covers
    pub period: Period,
    pub trend: Trend,
    /// Samples inside the window, ordered by date
    pub values: Vec<MetricSample>,
    /// Mean value; for boolean metrics the proportion of true days (0-1)
    pub average: f64,
    /// Proportion of true days as a percentage (boolean metrics only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    pub concern_level: ConcernLevel,
    pub reference_values: ReferenceValues,
    /// Number of samples in the window
    pub sample_count: usize,
    /// Data coverage confidence (0-1)
    pub confidence: f64,
    /// Fewer than two samples: trend is not meaningful
    pub insufficient_data: bool,
}

// ============================================================================
// Rule base
// ============================================================================

/// Expertise domain a rule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    Psychology,
    OccupationalHealth,
    Ergonomics,
    ComplementaryMedicine,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Psychology => "psychology",
            Domain::OccupationalHealth => "occupational-health",
            Domain::Ergonomics => "ergonomics",
            Domain::ComplementaryMedicine => "complementary-medicine",
        }
    }
}

/// Rule severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Attention,
    Alert,
    Critical,
}

/// Strength of the evidence behind a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceLevel {
    Scientific,
    ExpertConsensus,
    GoodPractice,
}

/// Comparison operator of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=", alias = "≠")]
    Ne,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
        }
    }

    /// Evaluate `observed <op> target`
    pub fn compare(&self, observed: f64, target: f64) -> bool {
        match self {
            Operator::Lt => observed < target,
            Operator::Le => observed <= target,
            Operator::Gt => observed > target,
            Operator::Ge => observed >= target,
            Operator::Eq => (observed - target).abs() < f64::EPSILON,
            Operator::Ne => (observed - target).abs() >= f64::EPSILON,
        }
    }
}

/// How a trigger aggregates the window before comparing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Count individual qualifying days
    Daily,
    /// Count qualifying calendar weeks
    Weekly,
    /// Compare the whole-window aggregate once
    Cumulative,
}

/// Comparison target of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerValue {
    Flag(bool),
    Number(f64),
}

impl TriggerValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            TriggerValue::Flag(true) => 1.0,
            TriggerValue::Flag(false) => 0.0,
            TriggerValue::Number(v) => *v,
        }
    }
}

fn default_threshold() -> u32 {
    1
}

/// A single comparison condition on one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTrigger {
    pub metric: Metric,
    pub operator: Operator,
    pub value: TriggerValue,
    pub frequency: Frequency,
    /// Number of qualifying days or weeks required (ignored for cumulative)
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

/// Urgency bucket of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionCategory {
    Immediate,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Challenging,
}

/// A concrete step the user can take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionableAdvice {
    pub action: String,
    pub category: ActionCategory,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_required: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Article,
    Exercise,
    App,
    Professional,
}

/// Further reading or help
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// When and how to re-evaluate advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    /// Days after the analysis at which to re-check
    pub recheck_after_days: u32,
    /// Metrics expected to improve if the advice is followed
    #[serde(default)]
    pub improvement_metrics: Vec<Metric>,
    /// Fraction of non-improvement (0-1) after which the advice should escalate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_threshold: Option<f64>,
}

/// Advice text bound to a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceTemplate {
    pub title: String,
    /// Problem statement; may contain placeholders
    pub problem: String,
    /// Explanation; may contain placeholders
    pub explanation: String,
    pub actions: Vec<ActionableAdvice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_disclaimer: Option<String>,
    pub follow_up: FollowUp,
}

/// A named, domain-tagged set of AND-combined triggers bound to advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertiseRule {
    pub id: String,
    pub domain: Domain,
    pub name: String,
    pub description: String,
    pub triggers: Vec<RuleTrigger>,
    /// Length of the window this rule looks at
    pub analysis_period_weeks: u32,
    pub severity: Severity,
    pub advice: AdviceTemplate,
    pub evidence_level: EvidenceLevel,
    pub source: String,
}

impl ExpertiseRule {
    /// Metric of the first trigger, used for priority adjustment and templating
    pub fn primary_metric(&self) -> Option<Metric> {
        self.triggers.first().map(|t| t.metric)
    }

    pub fn period_days(&self) -> u32 {
        self.analysis_period_weeks.saturating_mul(7)
    }
}

// ============================================================================
// Output
// ============================================================================

/// Explanation of one satisfied trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedCondition {
    pub metric: Metric,
    pub frequency: Frequency,
    /// Human-readable description, e.g. "energy < 2 on 5/7 days"
    pub description: String,
    /// Aggregate compared for cumulative triggers, qualifying count otherwise
    pub observed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfied_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated_count: Option<u32>,
    /// 0.5 for bare satisfaction up to 1.0 for full margin
    pub strength: f64,
}

/// A rule that fired in an analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub rule: ExpertiseRule,
    pub trigger_date: NaiveDate,
    pub matched_conditions: Vec<MatchedCondition>,
    /// Confidence in the match (0-1)
    pub confidence: f64,
}

/// Lifecycle state of generated advice, owned by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AdviceStatus {
    /// Whether a collaborator may move advice from `self` to `next`
    pub fn can_transition_to(&self, next: AdviceStatus) -> bool {
        matches!(
            (self, next),
            (AdviceStatus::Active, AdviceStatus::Acknowledged)
                | (AdviceStatus::Active, AdviceStatus::Resolved)
                | (AdviceStatus::Active, AdviceStatus::Dismissed)
                | (AdviceStatus::Acknowledged, AdviceStatus::Resolved)
                | (AdviceStatus::Acknowledged, AdviceStatus::Dismissed)
        )
    }
}

/// Advice instantiated for one user from a triggered rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAdvice {
    pub id: Uuid,
    pub rule_id: String,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    /// 1 (lowest) to 5 (highest)
    pub priority: u8,
    pub severity: Severity,
    pub domain: Domain,
    pub confidence: f64,
    pub advice: AdviceTemplate,
    pub requires_medical_disclaimer: bool,
    pub status: AdviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<NaiveDate>,
}

/// Aggregated risk verdict for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Next level up, saturating at critical
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }
}

impl From<Severity> for RiskLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => RiskLevel::Low,
            Severity::Attention => RiskLevel::Medium,
            Severity::Alert => RiskLevel::High,
            Severity::Critical => RiskLevel::Critical,
        }
    }
}

/// Recoverable issue noticed during an analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// A record or sample was incomplete or invalid and was skipped
    DataQuality {
        date: NaiveDate,
        #[serde(skip_serializing_if = "Option::is_none")]
        metric: Option<Metric>,
        reason: String,
    },
    /// A metric had fewer than two samples in the window
    InsufficientData { metric: Metric, samples: usize },
}

/// Result of analyzing one user's record window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnalysis {
    pub user_id: String,
    pub analysis_date: NaiveDate,
    pub patterns: Vec<DataPattern>,
    pub triggered_rules: Vec<TriggeredRule>,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<GeneratedAdvice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalysisWarning>,
}

impl UserAnalysis {
    /// Pattern for a metric, if one was produced
    pub fn pattern(&self, metric: Metric) -> Option<&DataPattern> {
        self.patterns.iter().find(|p| p.metric == metric)
    }
}
