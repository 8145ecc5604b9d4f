//! Analysis facade and storage boundary
//!
//! The analyzers are pure functions over an immutable series, so a full
//! report is an embarrassingly parallel fan-out: fetch the series once,
//! run every analyzer against it, join. Storage stays behind the
//! [`GlucoseRepository`] trait; anything network- or disk-bound belongs to
//! the implementor, and the engine never re-fetches per analyzer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::a1c::{A1cEstimator, A1cReport};
use crate::config::AnalysisConfig;
use crate::dawn::{DawnPhenomenonDetector, DawnPhenomenonReport};
use crate::error::Result;
use crate::iob::{IobModel, LinearDecayIob, NoInsulin};
use crate::models::{GlucoseSeries, InsulinDoseEvent};
use crate::predict::{PredictionReport, TrendPredictor};
use crate::stats::{StatisticsEngine, StatisticsReport};
use crate::variability::{VariabilityAnalyzer, VariabilityReport};

/// Storage collaborator: fetches pre-normalized series for a user window.
///
/// Implementations own timeouts, retries, and connection management. The
/// engine calls each method at most once per analysis request.
pub trait GlucoseRepository {
    fn fetch_glucose_series(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<GlucoseSeries>;

    fn fetch_insulin_doses(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<InsulinDoseEvent>>;
}

/// All analyzer outputs for one request.
///
/// Statistics and variability are present whenever any readings exist;
/// dawn and A1C degrade to `None` below their 50-reading minimums, and the
/// prediction is `None` below 3 readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub statistics: Option<StatisticsReport>,
    pub variability: VariabilityReport,
    pub dawn_phenomenon: Option<DawnPhenomenonReport>,
    pub prediction: Option<PredictionReport>,
    pub a1c: Option<A1cReport>,
}

/// Runs the full analyzer suite over a fetched series
pub struct AnalysisEngine {
    config: AnalysisConfig,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine {
    pub fn new() -> Self {
        AnalysisEngine {
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        AnalysisEngine { config }
    }

    /// Fetch once from the repository, then analyze.
    ///
    /// The dose fetch is skipped entirely when the glucose window is empty.
    pub fn analyze_user<R: GlucoseRepository>(
        &self,
        repository: &R,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FullReport> {
        let series = repository.fetch_glucose_series(user_id, start, end)?;
        if series.is_empty() {
            info!(user_id, "no readings in window; returning empty report");
            return Ok(self.analyze(&series, &NoInsulin));
        }

        let doses = repository.fetch_insulin_doses(user_id, start, end)?;
        let iob = LinearDecayIob::new(doses);
        Ok(self.analyze(&series, &iob))
    }

    /// Fan all five analyzers out over one immutable series.
    ///
    /// Analyzers have no ordering dependency, so the fan-out nests
    /// `rayon::join`; inputs are shared immutably and every report is
    /// freshly allocated.
    pub fn analyze(&self, series: &GlucoseSeries, iob: &dyn IobModel) -> FullReport {
        let days = self.config.dawn_days_to_analyze;
        let predictor = TrendPredictor::with_config(self.config.predictor.clone());

        let ((statistics, variability), (dawn, (prediction, a1c))) = rayon::join(
            || {
                rayon::join(
                    || StatisticsEngine::compute_statistics(series).ok(),
                    || VariabilityAnalyzer::compute_variability(series),
                )
            },
            || {
                rayon::join(
                    || match DawnPhenomenonDetector::analyze_dawn_phenomenon(series, days) {
                        Ok(report) => Some(report),
                        Err(err) => {
                            warn!(error = %err, "dawn phenomenon analysis skipped");
                            None
                        }
                    },
                    || {
                        rayon::join(
                            || predictor.predict(series, iob),
                            || match A1cEstimator::estimate_a1c(series) {
                                Ok(report) => Some(report),
                                Err(err) => {
                                    warn!(error = %err, "A1C estimation skipped");
                                    None
                                }
                            },
                        )
                    },
                )
            },
        );

        FullReport {
            statistics,
            variability,
            dawn_phenomenon: dawn,
            prediction,
            a1c,
        }
    }
}
