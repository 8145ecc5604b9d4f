//! Descriptive glucose statistics
//!
//! Aggregate statistics over a query window: mean, population standard
//! deviation, coefficient of variation, time in range, and extrema.
//!
//! # Clinical Background
//!
//! Time in range (TIR) is the share of readings inside 70-180 mg/dL and is
//! the headline CGM metric in consensus guidelines (>70% is the usual goal).
//! The coefficient of variation (CV = SD/mean) summarizes glycemic
//! stability; CV under 36% is generally considered stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::{CgmError, Result};
use crate::models::GlucoseSeries;

/// Aggregate statistics for a glucose series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Arithmetic mean glucose in mg/dL
    pub average: f64,

    /// Minimum reading in the window
    pub min: f64,

    /// Maximum reading in the window
    pub max: f64,

    /// Population standard deviation (divide by N)
    pub standard_deviation: f64,

    /// Coefficient of variation as a percentage (SD/mean x 100)
    pub coefficient_of_variation: f64,

    /// Percentage of readings within [70, 180] mg/dL inclusive
    pub time_in_range_percent: f64,

    /// Number of readings analyzed
    pub reading_count: usize,

    /// First and last reading timestamps
    pub date_range: (DateTime<Utc>, DateTime<Utc>),
}

/// Computes aggregate descriptive statistics over a glucose series
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Compute descriptive statistics for a non-empty series.
    ///
    /// Ordering does not affect any of these aggregates, so no resort is
    /// needed here (the series constructor already sorted).
    pub fn compute_statistics(series: &GlucoseSeries) -> Result<StatisticsReport> {
        if series.is_empty() {
            return Err(CgmError::InsufficientData {
                analysis: "glucose statistics",
                required: 1,
                actual: 0,
            });
        }

        let values: Vec<f64> = series.values().collect();
        let average = values.iter().mean();
        let standard_deviation = values.iter().population_std_dev();

        // mean of 0 cannot occur with valid glucose values, but guard the
        // division anyway and report CV as 0 rather than NaN
        let coefficient_of_variation = if average == 0.0 {
            0.0
        } else {
            standard_deviation / average * 100.0
        };

        let (min, max) = values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

        let in_range = series.readings().iter().filter(|r| r.is_in_range()).count();
        let time_in_range_percent = in_range as f64 / values.len() as f64 * 100.0;

        let date_range = series.date_range().expect("non-empty series has a range");

        debug!(
            readings = values.len(),
            average, time_in_range_percent, "computed glucose statistics"
        );

        Ok(StatisticsReport {
            average,
            min,
            max,
            standard_deviation,
            coefficient_of_variation,
            time_in_range_percent,
            reading_count: values.len(),
            date_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GlucoseReading;
    use chrono::TimeZone;

    fn series_from(values: &[f64]) -> GlucoseSeries {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        GlucoseSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    GlucoseReading::new(start + chrono::Duration::minutes(5 * i as i64), v)
                })
                .collect(),
        )
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let err = StatisticsEngine::compute_statistics(&GlucoseSeries::new(vec![])).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_constant_series() {
        // Scenario A: 60 readings at constant 120 mg/dL
        let series = series_from(&vec![120.0; 60]);
        let report = StatisticsEngine::compute_statistics(&series).unwrap();

        assert_eq!(report.average, 120.0);
        assert_eq!(report.min, 120.0);
        assert_eq!(report.max, 120.0);
        assert_eq!(report.standard_deviation, 0.0);
        assert_eq!(report.coefficient_of_variation, 0.0);
        assert_eq!(report.time_in_range_percent, 100.0);
        assert_eq!(report.reading_count, 60);
    }

    #[test]
    fn test_population_standard_deviation() {
        // [100, 120, 140]: mean 120, population variance = (400+0+400)/3
        let series = series_from(&[100.0, 120.0, 140.0]);
        let report = StatisticsEngine::compute_statistics(&series).unwrap();

        assert_eq!(report.average, 120.0);
        let expected_sd = (800.0f64 / 3.0).sqrt();
        assert!((report.standard_deviation - expected_sd).abs() < 1e-9);
        assert!((report.coefficient_of_variation - expected_sd / 120.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_in_range_inclusive_bounds() {
        // 70 and 180 are in range; 69 and 181 are not
        let series = series_from(&[70.0, 180.0, 69.0, 181.0]);
        let report = StatisticsEngine::compute_statistics(&series).unwrap();
        assert_eq!(report.time_in_range_percent, 50.0);
    }

    #[test]
    fn test_order_independence() {
        // aggregate stats are unchanged under shuffling
        let sorted = series_from(&[90.0, 110.0, 130.0, 150.0]);
        let shuffled = series_from(&[150.0, 90.0, 130.0, 110.0]);
        let a = StatisticsEngine::compute_statistics(&sorted).unwrap();
        let b = StatisticsEngine::compute_statistics(&shuffled).unwrap();
        assert_eq!(a.average, b.average);
        assert_eq!(a.standard_deviation, b.standard_deviation);
        assert_eq!(a.time_in_range_percent, b.time_in_range_percent);
        assert_eq!(a.min, b.min);
        assert_eq!(a.max, b.max);
    }
}
