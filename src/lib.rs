// Library interface for cgmrs modules
// This allows integration tests to access the core functionality

pub mod a1c;
pub mod config;
pub mod dawn;
pub mod engine;
pub mod error;
pub mod iob;
pub mod logging;
pub mod models;
pub mod predict;
pub mod stats;
pub mod variability;

// Re-export commonly used types for convenience
pub use a1c::{A1cCategory, A1cEstimator, A1cReport};
pub use dawn::{DawnPhenomenonDetector, DawnPhenomenonReport, DawnSeverity, DawnTrend};
pub use engine::{AnalysisEngine, FullReport, GlucoseRepository};
pub use error::{CgmError, Result};
pub use iob::{IobModel, LinearDecayIob, NoInsulin};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{
    GlucoseReading, GlucoseSeries, InsulinDoseEvent, InsulinKind, ReadingSource, TrendDirection,
};
pub use predict::{PredictionReport, PredictorConfig, TrendPredictor};
pub use stats::{StatisticsEngine, StatisticsReport};
pub use variability::{VariabilityAnalyzer, VariabilityReport};
