//! Trend classification
//!
//! Turns each metric's sample series into a [`DataPattern`]: the window
//! average (or proportion of true days), a first-half versus second-half trend
//! with a noise floor, and a concern level from the metric's threshold table.

use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::extractor::WindowSamples;
use crate::metrics::Metric;
use crate::thresholds::table_for;
use crate::types::{AnalysisWarning, DataPattern, MetricSample, Period, Trend};
use tracing::warn;

/// Minimum samples for a trend to carry meaning
pub const MIN_TREND_SAMPLES: usize = 2;

/// Classifier for turning sample series into data patterns
pub struct TrendClassifier;

impl TrendClassifier {
    /// Classify every metric with at least one sample, in metric order
    pub fn classify_window(
        window: &WindowSamples,
        period: Period,
        config: &EngineConfig,
    ) -> Result<(Vec<DataPattern>, Vec<AnalysisWarning>), AnalysisError> {
        let mut patterns = Vec::with_capacity(window.series.len());
        let mut warnings = Vec::new();

        for (metric, samples) in &window.series {
            if samples.is_empty() {
                continue;
            }
            let pattern = Self::classify(*metric, samples, period, config)?;
            if pattern.insufficient_data {
                warn!(metric = %metric, samples = pattern.sample_count, "insufficient data for trend");
                warnings.push(AnalysisWarning::InsufficientData {
                    metric: *metric,
                    samples: pattern.sample_count,
                });
            }
            patterns.push(pattern);
        }

        Ok((patterns, warnings))
    }

    /// Re-classify patterns over a sub-period of their window.
    ///
    /// Metrics with no samples inside `period` are dropped.
    pub fn narrow(
        patterns: &[DataPattern],
        period: Period,
        config: &EngineConfig,
    ) -> Result<Vec<DataPattern>, AnalysisError> {
        patterns
            .iter()
            .filter_map(|pattern| {
                if pattern.period == period {
                    return Some(Ok(pattern.clone()));
                }
                let samples: Vec<MetricSample> = pattern
                    .values
                    .iter()
                    .filter(|s| period.contains(s.date))
                    .cloned()
                    .collect();
                (!samples.is_empty())
                    .then(|| Self::classify(pattern.metric, &samples, period, config))
            })
            .collect()
    }

    /// Classify one metric's non-empty, date-ordered samples
    pub fn classify(
        metric: Metric,
        samples: &[MetricSample],
        period: Period,
        config: &EngineConfig,
    ) -> Result<DataPattern, AnalysisError> {
        let table = table_for(metric);
        let average = mean(samples).ok_or_else(|| {
            AnalysisError::InvalidWindow(format!("no samples to classify for {metric}"))
        })?;
        let concern_level = table
            .classify(average)
            .ok_or(AnalysisError::UnclassifiableValue {
                metric,
                value: average,
            })?;

        let sample_count = samples.len();
        let insufficient_data = sample_count < MIN_TREND_SAMPLES;
        let trend = if insufficient_data {
            Trend::Stable
        } else {
            compute_trend(metric, samples, config.trend_delta_fraction)
        };

        let coverage = (sample_count as f64 / f64::from(period.days().max(1))).min(1.0);
        let confidence = if insufficient_data {
            coverage * config.insufficient_data_penalty
        } else {
            coverage
        };

        Ok(DataPattern {
            metric,
            period,
            trend,
            values: samples.to_vec(),
            average,
            percentage: metric.is_boolean().then(|| average * 100.0),
            concern_level,
            reference_values: table.reference,
            sample_count,
            confidence,
            insufficient_data,
        })
    }
}

/// Mean of sample values; booleans contribute 0/1
pub fn mean(samples: &[MetricSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| s.value.as_f64()).sum();
    Some(sum / samples.len() as f64)
}

/// Compare the first half of the window to the second half
fn compute_trend(metric: Metric, samples: &[MetricSample], delta_fraction: f64) -> Trend {
    let (first, second) = samples.split_at(samples.len() / 2);
    let (Some(before), Some(after)) = (mean(first), mean(second)) else {
        return Trend::Stable;
    };

    if (after - before).abs() < metric.noise_delta(delta_fraction) {
        return Trend::Stable;
    }

    let (was, now) = (metric.badness(before), metric.badness(after));
    if now < was {
        Trend::Improving
    } else if now > was {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConcernLevel, SampleValue};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn week() -> Period {
        Period::ending_on(day(7), 7).unwrap()
    }

    fn series(metric: Metric, values: &[f64]) -> Vec<MetricSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricSample {
                metric,
                date: day(i as u32 + 1),
                value: SampleValue::Number(*v),
            })
            .collect()
    }

    fn classify(metric: Metric, values: &[f64]) -> DataPattern {
        TrendClassifier::classify(metric, &series(metric, values), week(), &EngineConfig::default())
            .unwrap()
    }

    #[test]
    fn test_energy_declining() {
        let pattern = classify(Metric::Energy, &[4.0, 4.0, 4.0, 3.0, 2.0, 2.0, 2.0]);
        assert_eq!(pattern.trend, Trend::Declining);
        assert!((pattern.average - 3.0).abs() < 1e-9);
        assert_eq!(pattern.concern_level, ConcernLevel::Low);
        assert!(!pattern.insufficient_data);
        assert!((pattern.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_work_hours_decreasing_is_improving() {
        let pattern = classify(Metric::WorkHours, &[10.0, 10.0, 10.0, 8.0, 7.0, 7.0]);
        assert_eq!(pattern.trend, Trend::Improving);
    }

    #[test]
    fn test_small_changes_are_stable() {
        let pattern = classify(Metric::Energy, &[3.0, 3.1, 3.0, 3.2, 3.1, 3.2]);
        assert_eq!(pattern.trend, Trend::Stable);
    }

    #[test]
    fn test_sleep_moving_into_band_improves() {
        let pattern = classify(Metric::SleepDuration, &[5.0, 5.5, 5.0, 7.5, 8.0, 7.5]);
        assert_eq!(pattern.trend, Trend::Improving);

        let oversleep = classify(Metric::SleepDuration, &[8.0, 8.0, 8.0, 10.5, 11.0, 11.0]);
        assert_eq!(oversleep.trend, Trend::Declining);
    }

    #[test]
    fn test_single_sample_is_stable_with_penalty() {
        let pattern = classify(Metric::Energy, &[1.0]);
        assert_eq!(pattern.trend, Trend::Stable);
        assert!(pattern.insufficient_data);
        assert!((pattern.confidence - (1.0 / 7.0) * 0.5).abs() < 1e-9);
        assert_eq!(pattern.concern_level, ConcernLevel::High);
    }

    #[test]
    fn test_boolean_proportion() {
        let samples: Vec<MetricSample> = [true, true, false, true, false, false, false]
            .iter()
            .enumerate()
            .map(|(i, b)| MetricSample {
                metric: Metric::SocialInteraction,
                date: day(i as u32 + 1),
                value: SampleValue::Flag(*b),
            })
            .collect();

        let pattern = TrendClassifier::classify(
            Metric::SocialInteraction,
            &samples,
            week(),
            &EngineConfig::default(),
        )
        .unwrap();

        assert!((pattern.average - 3.0 / 7.0).abs() < 1e-9);
        assert!((pattern.percentage.unwrap() - 300.0 / 7.0).abs() < 1e-9);
        assert_eq!(pattern.concern_level, ConcernLevel::Medium);
        assert_eq!(pattern.trend, Trend::Declining);
    }

    #[test]
    fn test_reference_values_attached() {
        let pattern = classify(Metric::Breaks, &[3.0, 3.0]);
        assert_eq!(pattern.reference_values.optimal, 3.0);
        assert_eq!(pattern.reference_values.concerning, 1.0);
    }

    #[test]
    fn test_narrow_reclassifies_sub_period() {
        let mut values = vec![4.5; 7];
        values.extend([1.5; 7]);
        let samples = series(Metric::Energy, &values);
        let fortnight = Period::ending_on(day(14), 14).unwrap();
        let config = EngineConfig::default();
        let full = TrendClassifier::classify(Metric::Energy, &samples, fortnight, &config).unwrap();
        assert!((full.average - 3.0).abs() < 1e-9);
        assert_eq!(full.concern_level, ConcernLevel::Low);

        let last_week = Period::ending_on(day(14), 7).unwrap();
        let narrowed = TrendClassifier::narrow(&[full.clone()], last_week, &config).unwrap();
        assert_eq!(narrowed.len(), 1);
        assert!((narrowed[0].average - 1.5).abs() < 1e-9);
        assert_eq!(narrowed[0].concern_level, ConcernLevel::High);
        assert_eq!(narrowed[0].trend, Trend::Stable);
        assert_eq!(narrowed[0].sample_count, 7);
        assert_eq!(narrowed[0].period, last_week);

        let before = Period::ending_on(day(28), 7).unwrap();
        assert!(TrendClassifier::narrow(&[full], before, &config).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_lowering_energy_never_lowers_concern(
            values in proptest::collection::vec(1.0f64..5.0, 1..7),
            drop in 0.0f64..1.0,
        ) {
            let lowered: Vec<f64> = values.iter().map(|v| v - drop).collect();
            let before = classify(Metric::Energy, &values);
            let after = classify(Metric::Energy, &lowered);
            prop_assert!(after.concern_level >= before.concern_level);
        }
    }
}
