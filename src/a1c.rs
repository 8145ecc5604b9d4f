//! Estimated A1C from average glucose
//!
//! # Clinical Background
//!
//! A1C (glycated hemoglobin) reflects average glucose over roughly three
//! months. The ADA/NGSP regression maps average glucose to an estimated
//! A1C percentage:
//!
//! ```text
//! eA1C = (average_glucose_mg_dl + 46.7) / 28.7
//! ```
//!
//! The estimate is banded into the categories clinicians use when framing
//! targets (most adults aim below 7.0%). The trend series re-runs the
//! formula per calendar month so period-over-period movement is visible.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::{CgmError, Result};
use crate::models::GlucoseSeries;

/// Minimum readings before an estimate is meaningful
pub const MIN_READINGS: usize = 50;

/// A1C control category; cut points are fixed clinical bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum A1cCategory {
    /// Below 6.0%
    Excellent,
    /// 6.0% to below 6.5%
    Good,
    /// 6.5% to below 7.5%
    Fair,
    /// 7.5% to below 9.0%
    Poor,
    /// 9.0% and above
    VeryPoor,
}

impl fmt::Display for A1cCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            A1cCategory::Excellent => "excellent",
            A1cCategory::Good => "good",
            A1cCategory::Fair => "fair",
            A1cCategory::Poor => "poor",
            A1cCategory::VeryPoor => "very poor",
        };
        write!(f, "{}", label)
    }
}

impl A1cCategory {
    /// Band an estimated A1C percentage; ordered, first match wins
    pub fn from_a1c(a1c: f64) -> Self {
        if a1c < 6.0 {
            A1cCategory::Excellent
        } else if a1c < 6.5 {
            A1cCategory::Good
        } else if a1c < 7.5 {
            A1cCategory::Fair
        } else if a1c < 9.0 {
            A1cCategory::Poor
        } else {
            A1cCategory::VeryPoor
        }
    }

    /// Fixed guidance string per category
    pub fn recommendation(&self) -> &'static str {
        match self {
            A1cCategory::Excellent => {
                "Excellent glucose control. Maintain your current routine and review at your next visit."
            }
            A1cCategory::Good => {
                "Good control, near non-diabetic range. Keep up current habits and watch for lows."
            }
            A1cCategory::Fair => {
                "Control is near the common 7.0% target. Small adjustments to meals or timing may help."
            }
            A1cCategory::Poor => {
                "Above target. Review your management plan with your care team."
            }
            A1cCategory::VeryPoor => {
                "Well above target, with elevated long-term risk. Contact your care team to adjust treatment."
            }
        }
    }
}

/// One trailing-period sample of the A1C trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A1cTrendPoint {
    /// Calendar period, formatted YYYY-MM
    pub period: String,

    pub estimated_a1c: f64,

    pub average_glucose: f64,

    pub reading_count: usize,
}

/// Estimated A1C report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A1cReport {
    /// Estimated A1C percentage for the whole window
    pub estimated_a1c: f64,

    /// Average glucose the estimate derives from (mg/dL)
    pub average_glucose: f64,

    pub category: A1cCategory,

    pub recommendation: String,

    /// Monthly estimates across the window, oldest first
    pub trend_series: Vec<A1cTrendPoint>,

    /// Percent change between the two most recent periods, when both exist
    pub period_change_percent: Option<f64>,
}

/// Maps windowed average glucose to an estimated A1C
pub struct A1cEstimator;

impl A1cEstimator {
    /// ADA/NGSP estimate from an average glucose value
    pub fn a1c_from_average(average_glucose: f64) -> f64 {
        (average_glucose + 46.7) / 28.7
    }

    /// Estimate A1C over the series window.
    ///
    /// Fails with [`CgmError::InsufficientData`] under 50 readings, the
    /// same clinical floor the dawn detector uses.
    pub fn estimate_a1c(series: &GlucoseSeries) -> Result<A1cReport> {
        if series.len() < MIN_READINGS {
            return Err(CgmError::InsufficientData {
                analysis: "A1C estimation",
                required: MIN_READINGS,
                actual: series.len(),
            });
        }

        let values: Vec<f64> = series.values().collect();
        let average_glucose = values.iter().sum::<f64>() / values.len() as f64;
        let estimated_a1c = Self::a1c_from_average(average_glucose);
        let category = A1cCategory::from_a1c(estimated_a1c);

        let trend_series = Self::monthly_trend(series);
        let period_change_percent = match trend_series.as_slice() {
            [.., previous, latest] if previous.estimated_a1c != 0.0 => Some(
                (latest.estimated_a1c - previous.estimated_a1c) / previous.estimated_a1c * 100.0,
            ),
            _ => None,
        };

        debug!(estimated_a1c, average_glucose, %category, "estimated A1C");

        Ok(A1cReport {
            estimated_a1c,
            average_glucose,
            category,
            recommendation: category.recommendation().to_string(),
            trend_series,
            period_change_percent,
        })
    }

    /// Re-run the estimate per calendar month of the window
    fn monthly_trend(series: &GlucoseSeries) -> Vec<A1cTrendPoint> {
        let mut months: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
        for reading in series.readings() {
            let key = (reading.timestamp.year(), reading.timestamp.month());
            let entry = months.entry(key).or_insert((0.0, 0));
            entry.0 += reading.value_mg_dl;
            entry.1 += 1;
        }

        months
            .into_iter()
            .map(|((year, month), (sum, count))| {
                let average = sum / count as f64;
                A1cTrendPoint {
                    period: format!("{:04}-{:02}", year, month),
                    estimated_a1c: Self::a1c_from_average(average),
                    average_glucose: average,
                    reading_count: count,
                }
            })
            .collect()
    }
}
