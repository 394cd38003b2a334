//! Per-metric concern threshold tables
//!
//! Each table partitions the real line into non-overlapping bands listed in
//! ascending value order. Bands on the "too low" side of a metric are
//! lower-inclusive (`[a, b)`); on the "too high" side the printed edge belongs
//! to the healthier band, so those bands are upper-inclusive (`(a, b]`).

use crate::metrics::Metric;
use crate::types::{ConcernLevel, ReferenceValues};
use std::ops::{Bound, RangeBounds};

use Bound::{Excluded, Included, Unbounded};
use ConcernLevel::{High, Low, Medium};

/// A single concern band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub level: ConcernLevel,
    pub lower: Bound<f64>,
    pub upper: Bound<f64>,
}

impl Band {
    const fn new(level: ConcernLevel, lower: Bound<f64>, upper: Bound<f64>) -> Self {
        Self {
            level,
            lower,
            upper,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.lower, self.upper).contains(&value)
    }
}

/// Threshold table for one metric
#[derive(Debug, Clone, Copy)]
pub struct ThresholdTable {
    pub metric: Metric,
    pub bands: &'static [Band],
    pub reference: ReferenceValues,
}

const ENERGY: &[Band] = &[
    Band::new(High, Unbounded, Excluded(2.0)),
    Band::new(Medium, Included(2.0), Excluded(3.0)),
    Band::new(Low, Included(3.0), Excluded(4.0)),
    Band::new(ConcernLevel::None, Included(4.0), Unbounded),
];

const FATIGUE: &[Band] = &[
    Band::new(ConcernLevel::None, Unbounded, Excluded(2.0)),
    Band::new(Low, Included(2.0), Excluded(3.0)),
    Band::new(Medium, Included(3.0), Excluded(4.0)),
    Band::new(High, Included(4.0), Unbounded),
];

const SLEEP_DURATION: &[Band] = &[
    Band::new(High, Unbounded, Excluded(6.0)),
    Band::new(Medium, Included(6.0), Excluded(6.5)),
    Band::new(Low, Included(6.5), Excluded(7.0)),
    Band::new(ConcernLevel::None, Included(7.0), Included(9.0)),
    Band::new(Low, Excluded(9.0), Included(9.5)),
    Band::new(Medium, Excluded(9.5), Included(10.0)),
    Band::new(High, Excluded(10.0), Unbounded),
];

const BEDTIME: &[Band] = &[
    Band::new(ConcernLevel::None, Unbounded, Included(23.5)),
    Band::new(Low, Excluded(23.5), Included(24.5)),
    Band::new(Medium, Excluded(24.5), Included(25.5)),
    Band::new(High, Excluded(25.5), Unbounded),
];

const WORK_HOURS: &[Band] = &[
    Band::new(ConcernLevel::None, Unbounded, Included(7.0)),
    Band::new(Low, Excluded(7.0), Included(8.0)),
    Band::new(Medium, Excluded(8.0), Included(9.0)),
    Band::new(High, Excluded(9.0), Unbounded),
];

const TASK_LOAD: &[Band] = &[
    Band::new(ConcernLevel::None, Unbounded, Included(6.0)),
    Band::new(Low, Excluded(6.0), Included(9.0)),
    Band::new(Medium, Excluded(9.0), Included(12.0)),
    Band::new(High, Excluded(12.0), Unbounded),
];

const BREAKS: &[Band] = &[
    Band::new(High, Unbounded, Excluded(1.0)),
    Band::new(Medium, Included(1.0), Excluded(2.0)),
    Band::new(Low, Included(2.0), Excluded(3.0)),
    Band::new(ConcernLevel::None, Included(3.0), Unbounded),
];

const SPORT_LEISURE: &[Band] = &[
    Band::new(High, Unbounded, Excluded(0.25)),
    Band::new(Medium, Included(0.25), Excluded(0.5)),
    Band::new(Low, Included(0.5), Excluded(1.0)),
    Band::new(ConcernLevel::None, Included(1.0), Unbounded),
];

const SOCIAL_INTERACTION: &[Band] = &[
    Band::new(High, Unbounded, Excluded(0.3)),
    Band::new(Medium, Included(0.3), Excluded(0.5)),
    Band::new(Low, Included(0.5), Excluded(0.7)),
    Band::new(ConcernLevel::None, Included(0.7), Unbounded),
];

const fn reference(optimal: f64, acceptable: f64, concerning: f64) -> ReferenceValues {
    ReferenceValues {
        optimal,
        acceptable,
        concerning,
    }
}

/// Look up the threshold table for a metric
pub fn table_for(metric: Metric) -> ThresholdTable {
    let (bands, reference) = match metric {
        Metric::Energy => (ENERGY, reference(4.0, 3.0, 2.0)),
        Metric::Fatigue => (FATIGUE, reference(2.0, 3.0, 4.0)),
        Metric::SleepDuration => (SLEEP_DURATION, reference(7.0, 6.5, 6.0)),
        Metric::Bedtime => (BEDTIME, reference(23.5, 24.5, 25.5)),
        Metric::WorkHours => (WORK_HOURS, reference(7.0, 8.0, 9.0)),
        Metric::TaskLoad => (TASK_LOAD, reference(6.0, 9.0, 12.0)),
        Metric::Breaks => (BREAKS, reference(3.0, 2.0, 1.0)),
        Metric::SportLeisure => (SPORT_LEISURE, reference(1.0, 0.5, 0.25)),
        Metric::SocialInteraction => (SOCIAL_INTERACTION, reference(0.7, 0.5, 0.3)),
    };

    ThresholdTable {
        metric,
        bands,
        reference,
    }
}

impl ThresholdTable {
    /// Concern level of a value; `None` only for values no band contains (NaN)
    pub fn classify(&self, value: f64) -> Option<ConcernLevel> {
        self.bands
            .iter()
            .find(|band| band.contains(value))
            .map(|band| band.level)
    }

    /// Number of bands containing a value (exactly one for any real number)
    pub fn matching_bands(&self, value: f64) -> usize {
        self.bands.iter().filter(|band| band.contains(value)).count()
    }
}
