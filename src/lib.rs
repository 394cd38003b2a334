//! Wellbeing Advice - Longitudinal pattern analysis for self-reported wellbeing records
//!
//! The engine turns a window of daily records into classified metric patterns,
//! evaluates a static expertise rule base against them, and returns ranked,
//! explainable advice with an overall risk verdict. It is a pure computation:
//! no I/O, no clock reads, no state between runs.
//!
//! ## Pipeline
//!
//! records → [`MetricExtractor`] → [`TrendClassifier`] → [`RuleMatcher`]
//! → [`Scorer`] → [`AdviceComposer`] → [`RiskAggregator`] → [`UserAnalysis`]

pub mod classifier;
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod metrics;
pub mod risk;
pub mod rules;
pub mod scoring;
pub mod thresholds;
pub mod types;

pub use classifier::TrendClassifier;
pub use composer::AdviceComposer;
pub use config::EngineConfig;
pub use engine::{analyze_user, AdviceEngine, BatchEntry, UserRecords};
pub use error::{AnalysisError, ConfigError, RuleConfigError};
pub use extractor::MetricExtractor;
pub use matcher::RuleMatcher;
pub use metrics::Metric;
pub use risk::RiskAggregator;
pub use rules::RuleBase;
pub use scoring::Scorer;
pub use types::{
    AnalysisWarning, ConcernLevel, DailyRecord, DataPattern, GeneratedAdvice, RiskLevel, Trend,
    TriggeredRule, UserAnalysis,
};

/// Engine version, reported by the CLI alongside analyses
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
