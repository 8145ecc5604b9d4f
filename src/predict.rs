//! Short-horizon glucose trend prediction and risk alerting
//!
//! Fits an ordinary least-squares line through the most recent readings and
//! extrapolates a few steps ahead. The regression runs against reading
//! index, not wall-clock time, which assumes the roughly uniform ~5-minute
//! CGM cadence; irregular gaps bias the slope, and that simplification is
//! deliberate.
//!
//! The headline prediction folds in two additive adjustments on top of the
//! regression: an insulin-on-board discount and a nudge toward the user's
//! historical average at the forecast hour. Both are surfaced individually
//! in the report so consumers can show why the number moved.
//!
//! Absence of a prediction is an expected steady state for sparse data, so
//! the predictor returns `None` below 3 readings instead of an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::iob::IobModel;
use crate::models::{GlucoseSeries, GLUCOSE_CEILING, GLUCOSE_FLOOR};

/// Trend category derived from the fitted slope (mg/dL per step)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendCategory {
    Rising,
    Stable,
    Falling,
}

impl fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendCategory::Rising => "rising",
            TrendCategory::Stable => "stable",
            TrendCategory::Falling => "falling",
        };
        write!(f, "{}", label)
    }
}

/// Alert urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Moderate,
    High,
}

/// Direction of the glucose excursion an alert warns about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    Hypoglycemia,
    Hyperglycemia,
}

/// A single risk alert; at most one is raised per prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseAlert {
    pub kind: RiskKind,
    pub level: RiskLevel,
    pub message: String,
}

/// Contributions folded into the headline prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFactors {
    /// Fitted slope in mg/dL per step
    pub current_trend: f64,

    /// Expected drop from insulin on board (negative or zero, mg/dL)
    pub iob_impact: f64,

    /// Pull toward the historical same-hour average (mg/dL)
    pub pattern_influence: f64,

    /// 100 - confidence
    pub uncertainty: f64,
}

/// Short-horizon prediction report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Composite prediction at the full horizon, clamped to [40, 400]
    pub predicted_glucose: f64,

    /// Full forecast horizon in minutes
    pub time_horizon_minutes: i64,

    /// Raw regression value per step, each clamped to [40, 400]
    pub step_predictions: Vec<f64>,

    pub trend: TrendCategory,

    /// Heuristic confidence: clamp(100 - |slope| x 10, 60, 95)
    pub confidence: f64,

    pub factors: PredictionFactors,

    /// Zero or one alert; first matching risk rule wins
    pub alerts: Vec<GlucoseAlert>,
}

/// Tuning for the trend predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Readings fed into the regression window
    pub window_size: usize,

    /// Assumed minutes between consecutive readings
    pub step_minutes: i64,

    /// Steps extrapolated beyond the last reading
    pub horizon_steps: usize,

    /// Expected glucose drop per unit of insulin on board over the horizon
    pub iob_drop_per_unit: f64,

    /// Weight of the same-hour historical pull, 0.0-1.0
    pub pattern_weight: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig {
            window_size: 20,
            step_minutes: 5,
            horizon_steps: 6,
            iob_drop_per_unit: 3.0,
            pattern_weight: 0.1,
        }
    }
}

/// Fits and extrapolates short-horizon glucose trends
pub struct TrendPredictor {
    config: PredictorConfig,
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendPredictor {
    pub fn new() -> Self {
        TrendPredictor {
            config: PredictorConfig::default(),
        }
    }

    pub fn with_config(config: PredictorConfig) -> Self {
        TrendPredictor { config }
    }

    /// Predict glucose over the configured horizon.
    ///
    /// Returns `None` with fewer than 3 readings: no line fits two points
    /// meaningfully, and callers render "gathering data" rather than an
    /// error state.
    pub fn predict(&self, series: &GlucoseSeries, iob: &dyn IobModel) -> Option<PredictionReport> {
        if series.len() < 3 {
            debug!(readings = series.len(), "too few readings to predict");
            return None;
        }

        let window = series.last_n(self.config.window_size);
        let values: Vec<f64> = window.iter().map(|r| r.value_mg_dl).collect();
        let (slope, intercept) = Self::fit_line(&values);

        let n = values.len();
        let step_predictions: Vec<f64> = (1..=self.config.horizon_steps)
            .map(|k| {
                let raw = intercept + slope * (n - 1 + k) as f64;
                raw.clamp(GLUCOSE_FLOOR, GLUCOSE_CEILING)
            })
            .collect();

        let trend = if slope > 0.5 {
            TrendCategory::Rising
        } else if slope < -0.5 {
            TrendCategory::Falling
        } else {
            TrendCategory::Stable
        };

        let confidence = (100.0 - slope.abs() * 10.0).clamp(60.0, 95.0);

        let current = values[n - 1];
        let last_reading = window.last().expect("window is non-empty");

        let units_on_board = iob.iob_at(last_reading.timestamp);
        let iob_impact = -(units_on_board * self.config.iob_drop_per_unit);

        let horizon_minutes = self.config.step_minutes * self.config.horizon_steps as i64;
        let forecast_at = last_reading.timestamp + chrono::Duration::minutes(horizon_minutes);
        let pattern_influence = self.pattern_influence(series, window.len(), forecast_at, current);

        let composite = step_predictions
            .last()
            .copied()
            .unwrap_or(current)
            + iob_impact
            + pattern_influence;
        let predicted_glucose = composite.clamp(GLUCOSE_FLOOR, GLUCOSE_CEILING);

        let alerts = Self::risk_alerts(current, slope);

        debug!(
            slope,
            predicted_glucose,
            confidence,
            alerts = alerts.len(),
            "fitted short-horizon prediction"
        );

        Some(PredictionReport {
            predicted_glucose,
            time_horizon_minutes: horizon_minutes,
            step_predictions,
            trend,
            confidence,
            factors: PredictionFactors {
                current_trend: slope,
                iob_impact,
                pattern_influence,
                uncertainty: 100.0 - confidence,
            },
            alerts,
        })
    }

    /// OLS of value against reading index; returns (slope, intercept)
    fn fit_line(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
        let sum_y: f64 = values.iter().sum();
        let sum_xy: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
        let sum_xx: f64 = (0..values.len()).map(|i| (i * i) as f64).sum();

        let denominator = n * sum_xx - sum_x * sum_x;
        if denominator.abs() < 1e-10 {
            return (0.0, values.iter().sum::<f64>() / n);
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;
        (slope, intercept)
    }

    /// Pull toward the historical mean at the forecast hour.
    ///
    /// Only readings outside the regression window count as history; with
    /// no history at that hour the influence is zero.
    fn pattern_influence(
        &self,
        series: &GlucoseSeries,
        window_len: usize,
        forecast_at: chrono::DateTime<chrono::Utc>,
        current: f64,
    ) -> f64 {
        use chrono::Timelike;

        let history_len = series.len() - window_len;
        if history_len == 0 {
            return 0.0;
        }

        let hour = forecast_at.hour();
        let historical = &series.readings()[..history_len];
        let same_hour: Vec<f64> = historical
            .iter()
            .filter(|r| r.hour() == hour)
            .map(|r| r.value_mg_dl)
            .collect();

        if same_hour.is_empty() {
            return 0.0;
        }

        let hour_mean = same_hour.iter().sum::<f64>() / same_hour.len() as f64;
        self.config.pattern_weight * (hour_mean - current)
    }

    /// Priority-ordered risk rules; only the first match is surfaced
    fn risk_alerts(current: f64, slope: f64) -> Vec<GlucoseAlert> {
        let alert = if current < 80.0 && slope < -1.0 {
            Some(GlucoseAlert {
                kind: RiskKind::Hypoglycemia,
                level: RiskLevel::High,
                message: format!(
                    "Glucose {:.0} mg/dL and falling fast. Risk of hypoglycemia within 30 minutes.",
                    current
                ),
            })
        } else if current < 100.0 && slope < -0.5 {
            Some(GlucoseAlert {
                kind: RiskKind::Hypoglycemia,
                level: RiskLevel::Moderate,
                message: format!(
                    "Glucose {:.0} mg/dL and trending down. Watch for hypoglycemia.",
                    current
                ),
            })
        } else if current > 200.0 && slope > 1.0 {
            Some(GlucoseAlert {
                kind: RiskKind::Hyperglycemia,
                level: RiskLevel::High,
                message: format!(
                    "Glucose {:.0} mg/dL and climbing fast. Risk of significant hyperglycemia.",
                    current
                ),
            })
        } else if current > 160.0 && slope > 0.5 {
            Some(GlucoseAlert {
                kind: RiskKind::Hyperglycemia,
                level: RiskLevel::Moderate,
                message: format!(
                    "Glucose {:.0} mg/dL and trending up. Watch for hyperglycemia.",
                    current
                ),
            })
        } else {
            None
        };
        alert.into_iter().collect()
    }
}
