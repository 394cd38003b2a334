//! Tracked metric definitions
//!
//! The metric set is closed: rules can only reference metrics the engine knows
//! how to extract and classify. Polarity lives here and nowhere else, so every
//! consumer of a [`DataPattern`](crate::types::DataPattern) sees the same
//! normalized convention: a higher concern level is always worse.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wellbeing metric tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Energy,
    Fatigue,
    SleepDuration,
    Bedtime,
    WorkHours,
    TaskLoad,
    Breaks,
    SportLeisure,
    SocialInteraction,
}

/// Value type of a metric's samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Numeric,
    Boolean,
}

/// Direction in which a metric gets better
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Polarity {
    HigherIsBetter,
    HigherIsWorse,
    /// Healthy values sit inside a band; deviations on either side are worse
    OptimalBand { low: f64, high: f64 },
}

/// Fraction of a metric's typical range below which a change counts as noise
pub const DEFAULT_TREND_DELTA_FRACTION: f64 = 0.05;

impl Metric {
    /// All tracked metrics, in pattern output order
    pub const ALL: [Metric; 9] = [
        Metric::Energy,
        Metric::Fatigue,
        Metric::SleepDuration,
        Metric::Bedtime,
        Metric::WorkHours,
        Metric::TaskLoad,
        Metric::Breaks,
        Metric::SportLeisure,
        Metric::SocialInteraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Energy => "energy",
            Metric::Fatigue => "fatigue",
            Metric::SleepDuration => "sleep_duration",
            Metric::Bedtime => "bedtime",
            Metric::WorkHours => "work_hours",
            Metric::TaskLoad => "task_load",
            Metric::Breaks => "breaks",
            Metric::SportLeisure => "sport_leisure",
            Metric::SocialInteraction => "social_interaction",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::SocialInteraction => MetricKind::Boolean,
            _ => MetricKind::Numeric,
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.kind() == MetricKind::Boolean
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            Metric::Energy | Metric::Breaks | Metric::SportLeisure | Metric::SocialInteraction => {
                Polarity::HigherIsBetter
            }
            Metric::Fatigue | Metric::Bedtime | Metric::WorkHours | Metric::TaskLoad => {
                Polarity::HigherIsWorse
            }
            Metric::SleepDuration => Polarity::OptimalBand { low: 7.0, high: 9.0 },
        }
    }

    /// Typical (min, max) range of daily values, used to size the trend noise floor
    pub fn typical_range(&self) -> (f64, f64) {
        match self {
            Metric::Energy | Metric::Fatigue => (0.0, 5.0),
            Metric::SleepDuration => (0.0, 12.0),
            Metric::Bedtime => (20.0, 28.0),
            Metric::WorkHours => (0.0, 14.0),
            Metric::TaskLoad => (0.0, 15.0),
            Metric::Breaks => (0.0, 6.0),
            Metric::SportLeisure => (0.0, 3.0),
            Metric::SocialInteraction => (0.0, 1.0),
        }
    }

    /// Smallest change considered meaningful for this metric
    pub fn noise_delta(&self, fraction: f64) -> f64 {
        let (min, max) = self.typical_range();
        (max - min) * fraction
    }

    /// Polarity-normalized badness of a value: larger is always worse.
    ///
    /// Only differences are meaningful, except for optimal-band metrics where
    /// zero means the value sits inside the healthy band.
    pub fn badness(&self, value: f64) -> f64 {
        match self.polarity() {
            Polarity::HigherIsBetter => -value,
            Polarity::HigherIsWorse => value,
            Polarity::OptimalBand { low, high } => {
                if value < low {
                    low - value
                } else if value > high {
                    value - high
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
