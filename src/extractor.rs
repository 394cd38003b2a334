//! Metric extraction
//!
//! This module turns raw daily records into flat, dated metric samples.
//! - Zero sentinels ("not logged") are excluded, never treated as real zeros
//! - Out-of-range values are dropped with a data-quality warning
//! - Malformed or duplicate records are skipped without aborting the window

use crate::metrics::Metric;
use crate::types::{AnalysisWarning, DailyRecord, MetricSample, Period, SampleValue};
use chrono::{NaiveDate, NaiveTime, Timelike};
use std::collections::{BTreeMap, HashSet};
use tracing::{trace, warn};

/// Upper bound on a 1-5 rating
const MAX_RATING: f64 = 5.0;

/// Hours in a day, upper bound for any duration field
const HOURS_PER_DAY: f64 = 24.0;

/// Samples and warnings produced from a single record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub samples: Vec<MetricSample>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Samples of a whole window grouped per metric, each series ordered by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSamples {
    pub series: BTreeMap<Metric, Vec<MetricSample>>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Extractor for turning daily records into metric samples
pub struct MetricExtractor;

impl MetricExtractor {
    /// Extract samples from one record
    pub fn extract(record: &DailyRecord) -> Extraction {
        let mut out = Extraction::default();
        let date = record.date;

        if record.sleep.is_none()
            && record.focus.is_none()
            && record.wellbeing.is_none()
            && record.tasks.is_empty()
        {
            push_warning(
                &mut out.warnings,
                date,
                None,
                "record has no sleep, focus, task or wellbeing data".to_string(),
            );
            return out;
        }

        if let Some(sleep) = &record.sleep {
            let duration = if sleep.duration_hours != 0.0 {
                Some(sleep.duration_hours)
            } else {
                match (sleep.bedtime, sleep.wake_time) {
                    (Some(bed), Some(wake)) => Some(hours_between(bed, wake)),
                    _ => None,
                }
            };
            if let Some(hours) = duration {
                if let Some(v) = checked(&mut out.warnings, date, Metric::SleepDuration, hours, HOURS_PER_DAY) {
                    out.push_number(Metric::SleepDuration, date, v);
                }
            }
            if let Some(bed) = sleep.bedtime {
                out.push_number(Metric::Bedtime, date, bedtime_hours(bed));
            }
        }

        if let Some(focus) = &record.focus {
            if focus.focus_hours != 0.0 {
                if let Some(v) = checked(&mut out.warnings, date, Metric::WorkHours, focus.focus_hours, HOURS_PER_DAY) {
                    out.push_number(Metric::WorkHours, date, v);
                }
            }
            if focus.fatigue != 0.0 {
                if let Some(v) = checked(&mut out.warnings, date, Metric::Fatigue, focus.fatigue, MAX_RATING) {
                    out.push_number(Metric::Fatigue, date, v);
                }
            }
        }

        if !record.tasks.is_empty() {
            out.push_number(Metric::TaskLoad, date, record.tasks.len() as f64);
        }

        if let Some(wellbeing) = &record.wellbeing {
            if let Some(slots) = &wellbeing.break_slots {
                out.push_number(Metric::Breaks, date, slots.len() as f64);
            }

            if wellbeing.sport_hours.is_some() || wellbeing.leisure_hours.is_some() {
                let total = wellbeing.sport_hours.unwrap_or(0.0) + wellbeing.leisure_hours.unwrap_or(0.0);
                if let Some(v) = checked(&mut out.warnings, date, Metric::SportLeisure, total, HOURS_PER_DAY) {
                    out.push_number(Metric::SportLeisure, date, v);
                }
            }

            if let Some(flag) = wellbeing.social_interaction {
                out.samples.push(MetricSample {
                    metric: Metric::SocialInteraction,
                    date,
                    value: SampleValue::Flag(flag),
                });
            }

            if wellbeing.energy != 0.0 {
                if let Some(v) = checked(&mut out.warnings, date, Metric::Energy, wellbeing.energy, MAX_RATING) {
                    out.push_number(Metric::Energy, date, v);
                }
            }
        }

        out
    }

    /// Extract every record inside `period`, grouping samples per metric.
    ///
    /// Records are sorted by date first; a second record for an already-seen
    /// date is skipped with a warning so a metric never has two samples per day.
    pub fn extract_window(records: &[DailyRecord], period: Period) -> WindowSamples {
        let mut ordered: Vec<&DailyRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.date);

        let mut window = WindowSamples::default();
        let mut seen: HashSet<NaiveDate> = HashSet::new();

        for record in ordered {
            if !period.contains(record.date) {
                trace!(date = %record.date, "record outside analysis window ignored");
                continue;
            }
            if !seen.insert(record.date) {
                push_warning(
                    &mut window.warnings,
                    record.date,
                    None,
                    "duplicate record for date skipped".to_string(),
                );
                continue;
            }

            let extraction = Self::extract(record);
            window.warnings.extend(extraction.warnings);
            for sample in extraction.samples {
                window.series.entry(sample.metric).or_default().push(sample);
            }
        }

        window
    }
}

impl Extraction {
    fn push_number(&mut self, metric: Metric, date: NaiveDate, value: f64) {
        self.samples.push(MetricSample {
            metric,
            date,
            value: SampleValue::Number(value),
        });
    }
}

fn push_warning(
    warnings: &mut Vec<AnalysisWarning>,
    date: NaiveDate,
    metric: Option<Metric>,
    reason: String,
) {
    warn!(%date, metric = ?metric, %reason, "data quality issue");
    warnings.push(AnalysisWarning::DataQuality {
        date,
        metric,
        reason,
    });
}

/// Accept a value in `(0, max]`, otherwise record a warning
fn checked(
    warnings: &mut Vec<AnalysisWarning>,
    date: NaiveDate,
    metric: Metric,
    value: f64,
    max: f64,
) -> Option<f64> {
    if !value.is_finite() {
        push_warning(warnings, date, Some(metric), "value is not a finite number".to_string());
        return None;
    }
    if !(0.0..=max).contains(&value) {
        push_warning(
            warnings,
            date,
            Some(metric),
            format!("value {value} is outside 0-{max}"),
        );
        return None;
    }
    Some(value)
}

/// Duration from bedtime to wake time, wrapping past midnight
fn hours_between(bed: NaiveTime, wake: NaiveTime) -> f64 {
    let minutes = (wake - bed).num_minutes();
    let minutes = if minutes <= 0 { minutes + 24 * 60 } else { minutes };
    minutes as f64 / 60.0
}

/// Bedtime as hours on a continuous evening scale (00:30 becomes 24.5)
fn bedtime_hours(bed: NaiveTime) -> f64 {
    let hours = f64::from(bed.hour()) + f64::from(bed.minute()) / 60.0;
    if hours < 12.0 {
        hours + 24.0
    } else {
        hours
    }
}
