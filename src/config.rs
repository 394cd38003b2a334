//! Engine configuration
//!
//! Tunable constants of the analysis. Defaults reproduce the documented
//! behavior; a JSON document may override any subset of fields.

use crate::error::ConfigError;
use crate::metrics::DEFAULT_TREND_DELTA_FRACTION;
use serde::{Deserialize, Serialize};

/// Window used when the rule base is empty
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Longest window the engine config may ask for
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Minimum samples a calendar week needs before a weekly trigger can evaluate it
pub const DEFAULT_MIN_SAMPLES_PER_WEEK: usize = 3;

/// Confidence multiplier applied when a metric has fewer than two samples
pub const DEFAULT_INSUFFICIENT_DATA_PENALTY: f64 = 0.5;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Analysis window length when no rule asks for a longer one
    pub default_window_days: u32,
    /// Fraction of a metric's typical range below which a trend is "stable"
    pub trend_delta_fraction: f64,
    /// Minimum samples per ISO week for weekly triggers
    pub min_samples_per_week: usize,
    /// Confidence multiplier for metrics with insufficient data
    pub insufficient_data_penalty: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_window_days: DEFAULT_WINDOW_DAYS,
            trend_delta_fraction: DEFAULT_TREND_DELTA_FRACTION,
            min_samples_per_week: DEFAULT_MIN_SAMPLES_PER_WEEK,
            insufficient_data_penalty: DEFAULT_INSUFFICIENT_DATA_PENALTY,
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.default_window_days) {
            return Err(ConfigError::InvalidValue {
                field: "default_window_days",
                reason: format!("{} is outside 1..={MAX_WINDOW_DAYS}", self.default_window_days),
            });
        }
        if !(0.0..1.0).contains(&self.trend_delta_fraction) {
            return Err(ConfigError::InvalidValue {
                field: "trend_delta_fraction",
                reason: format!("{} is outside [0, 1)", self.trend_delta_fraction),
            });
        }
        if self.min_samples_per_week == 0 || self.min_samples_per_week > 7 {
            return Err(ConfigError::InvalidValue {
                field: "min_samples_per_week",
                reason: format!("{} is outside 1..=7", self.min_samples_per_week),
            });
        }
        if !(0.0..=1.0).contains(&self.insufficient_data_penalty) {
            return Err(ConfigError::InvalidValue {
                field: "insufficient_data_penalty",
                reason: format!("{} is outside [0, 1]", self.insufficient_data_penalty),
            });
        }
        Ok(())
    }
}
