//! Glycemic variability indices and hour-of-day patterns
//!
//! # Clinical Background
//!
//! Mean and time-in-range hide how much glucose swings. Three indices
//! summarize the swinging:
//!
//! - **MAG (Mean Absolute Glucose)**: average magnitude of change between
//!   consecutive readings. Chronology matters; the analyzer re-sorts before
//!   differencing.
//! - **J-Index**: `0.001 x (mean + SD)^2`, a combined measure of level and
//!   spread.
//! - **ADRR-like risk score**: per-reading log transform
//!   `10 x |ln(v / 112.5)|^1.084`, averaged across the series. This applies
//!   one formula regardless of whether the reading sits above or below the
//!   112.5 mg/dL reference point. The textbook ADRR weights low and high
//!   excursions separately; this simplified single-sided form is kept
//!   deliberately for compatibility with existing consumers.
//!
//! Hourly buckets expose the day's shape: per hour-of-day count, mean, and
//! percent in range. Empty hours report `count = 0, average = 0` (a sentinel
//! existing renderers rely on), never null.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::models::GlucoseSeries;

/// ADRR reference glucose in mg/dL
const ADRR_REFERENCE: f64 = 112.5;
/// Exponent of the ADRR risk transform
const ADRR_EXPONENT: f64 = 1.084;

/// Per-hour-of-day aggregate bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPattern {
    /// Hour of day, 0-23
    pub hour: u32,

    /// Number of readings in this hour across all days
    pub count: usize,

    /// Mean glucose for the hour; 0 when the bucket is empty
    pub average: f64,

    /// Percent of readings in [70, 180]; 0 when the bucket is empty
    pub in_range_percent: f64,
}

/// Variability indices plus hourly pattern buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityReport {
    /// Mean absolute glucose change between consecutive readings;
    /// `None` with fewer than 2 readings
    pub mag: Option<f64>,

    /// J-Index: 0.001 x (mean + SD)^2
    pub j_index: f64,

    /// Simplified ADRR-like mean risk score
    pub adrr: f64,

    /// One bucket per hour of day, always 24 entries
    pub hourly_patterns: Vec<HourlyPattern>,
}

/// Computes clinical variability indices over a glucose series
pub struct VariabilityAnalyzer;

impl VariabilityAnalyzer {
    /// Compute MAG, J-Index, ADRR, and hourly buckets.
    ///
    /// An empty series yields a report of zeros with `mag = None` rather
    /// than an error; callers treat it as an empty chart.
    pub fn compute_variability(series: &GlucoseSeries) -> VariabilityReport {
        // GlucoseSeries sorts on construction; MAG and anything else that
        // differences consecutive readings depends on that ordering.
        let values: Vec<f64> = series.values().collect();

        let mag = Self::mean_absolute_glucose(&values);
        let j_index = Self::j_index(&values);
        let adrr = Self::adrr_risk(&values);
        let hourly_patterns = Self::hourly_patterns(series);

        debug!(readings = values.len(), ?mag, j_index, adrr, "computed variability");

        VariabilityReport {
            mag,
            j_index,
            adrr,
            hourly_patterns,
        }
    }

    /// MAG: mean of |v[i] - v[i-1]| over consecutive chronological pairs
    fn mean_absolute_glucose(values: &[f64]) -> Option<f64> {
        if values.len() < 2 {
            return None;
        }
        let total: f64 = values.windows(2).map(|pair| (pair[1] - pair[0]).abs()).sum();
        Some(total / (values.len() - 1) as f64)
    }

    fn j_index(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mean = values.iter().mean();
        let sd = values.iter().population_std_dev();
        0.001 * (mean + sd).powi(2)
    }

    /// Per-reading risk `10 x |ln(v/112.5)|^1.084`, averaged.
    ///
    /// The absolute value keeps the fractional power defined below the
    /// reference point; see the module docs for why the single-sided form
    /// is intentional.
    fn adrr_risk(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let total: f64 = values
            .iter()
            .map(|&v| 10.0 * (v / ADRR_REFERENCE).ln().abs().powf(ADRR_EXPONENT))
            .sum();
        total / values.len() as f64
    }

    fn hourly_patterns(series: &GlucoseSeries) -> Vec<HourlyPattern> {
        let mut counts = [0usize; 24];
        let mut sums = [0.0f64; 24];
        let mut in_range = [0usize; 24];

        for reading in series.readings() {
            let h = reading.hour() as usize;
            counts[h] += 1;
            sums[h] += reading.value_mg_dl;
            if reading.is_in_range() {
                in_range[h] += 1;
            }
        }

        (0..24)
            .map(|h| {
                // empty buckets keep the 0/0 sentinel, not null
                let (average, in_range_percent) = if counts[h] == 0 {
                    (0.0, 0.0)
                } else {
                    (
                        sums[h] / counts[h] as f64,
                        in_range[h] as f64 / counts[h] as f64 * 100.0,
                    )
                };
                HourlyPattern {
                    hour: h as u32,
                    count: counts[h],
                    average,
                    in_range_percent,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GlucoseReading;
    use chrono::{TimeZone, Utc};

    fn series_every_5min(values: &[f64]) -> GlucoseSeries {
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
    fn test_mag_requires_two_readings() {
        let report = VariabilityAnalyzer::compute_variability(&series_every_5min(&[120.0]));
        assert_eq!(report.mag, None);
    }

    #[test]
    fn test_mag_of_known_series() {
        // |110-100| + |95-110| + |120-95| = 10 + 15 + 25 = 50, over 3 pairs
        let report =
            VariabilityAnalyzer::compute_variability(&series_every_5min(&[100.0, 110.0, 95.0, 120.0]));
        assert!((report.mag.unwrap() - 50.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mag_resorts_chronologically() {
        // Same values handed over out of order must produce the same MAG,
        // because the series re-sorts before differencing.
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        let t = |i: i64| start + chrono::Duration::minutes(5 * i);

        let ordered = GlucoseSeries::new(vec![
            GlucoseReading::new(t(0), 100.0),
            GlucoseReading::new(t(1), 110.0),
            GlucoseReading::new(t(2), 95.0),
        ]);
        let scrambled = GlucoseSeries::new(vec![
            GlucoseReading::new(t(2), 95.0),
            GlucoseReading::new(t(0), 100.0),
            GlucoseReading::new(t(1), 110.0),
        ]);

        let a = VariabilityAnalyzer::compute_variability(&ordered);
        let b = VariabilityAnalyzer::compute_variability(&scrambled);
        assert_eq!(a.mag, b.mag);
    }

    #[test]
    fn test_j_index_constant_series() {
        // constant 120 -> SD 0 -> J = 0.001 * (120 + 0)^2 = 14.4
        let report = VariabilityAnalyzer::compute_variability(&series_every_5min(&[120.0; 60]));
        assert!((report.j_index - 14.4).abs() < 1e-9);
        assert_eq!(report.mag, Some(0.0));
    }

    #[test]
    fn test_adrr_at_reference_is_zero() {
        let report = VariabilityAnalyzer::compute_variability(&series_every_5min(&[112.5; 10]));
        assert!(report.adrr.abs() < 1e-12);
    }

    #[test]
    fn test_adrr_is_finite_below_reference() {
        // Readings below 112.5 make ln negative; the transform must still
        // produce a finite positive risk, not NaN.
        let report = VariabilityAnalyzer::compute_variability(&series_every_5min(&[60.0, 70.0, 80.0]));
        assert!(report.adrr.is_finite());
        assert!(report.adrr > 0.0);
    }

    #[test]
    fn test_adrr_known_value() {
        // Single reading at 225: 10 * ln(2)^1.084
        let report = VariabilityAnalyzer::compute_variability(&series_every_5min(&[225.0]));
        let expected = 10.0 * (2.0f64).ln().powf(1.084);
        assert!((report.adrr - expected).abs() < 1e-9);
    }

    #[test]
    fn test_hourly_sentinel_for_empty_buckets() {
        // All readings at 08:xx; the other 23 buckets keep the sentinel
        let report = VariabilityAnalyzer::compute_variability(&series_every_5min(&[100.0, 110.0]));
        assert_eq!(report.hourly_patterns.len(), 24);

        let eight = &report.hourly_patterns[8];
        assert_eq!(eight.count, 2);
        assert_eq!(eight.average, 105.0);
        assert_eq!(eight.in_range_percent, 100.0);

        let midnight = &report.hourly_patterns[0];
        assert_eq!(midnight.count, 0);
        assert_eq!(midnight.average, 0.0);
        assert_eq!(midnight.in_range_percent, 0.0);
    }

    #[test]
    fn test_empty_series_yields_empty_report() {
        let report = VariabilityAnalyzer::compute_variability(&GlucoseSeries::new(vec![]));
        assert_eq!(report.mag, None);
        assert_eq!(report.j_index, 0.0);
        assert_eq!(report.adrr, 0.0);
        assert_eq!(report.hourly_patterns.len(), 24);
    }
}
