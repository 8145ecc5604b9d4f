//! Unified error hierarchy for cgmrs
//!
//! The analytic core has a deliberately small taxonomy: the only expected
//! failure mode is an analyzer being handed fewer readings than its clinical
//! minimum. Everything else (config, IO) belongs to the surrounding tooling.

use thiserror::Error;

/// Top-level error type for all cgmrs operations
#[derive(Debug, Error)]
pub enum CgmError {
    /// Minimum reading count for an analysis was not met
    #[error("Insufficient data for {analysis}: need {required} readings, got {actual}")]
    InsufficientData {
        analysis: &'static str,
        required: usize,
        actual: usize,
    },

    /// Date range is inverted or otherwise unusable
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    /// Input failed validation before analysis
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (load/parse/save)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors from config/log file handling
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cgmrs operations
pub type Result<T> = std::result::Result<T, CgmError>;

impl CgmError {
    /// Whether the error represents an expected "not enough data yet" state
    /// that front-ends should render as an empty state, not a failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, CgmError::InsufficientData { .. })
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CgmError::InsufficientData {
                analysis, required, ..
            } => {
                format!(
                    "Not enough glucose data yet for {}. Keep your sensor connected until at least {} readings are available.",
                    analysis, required
                )
            }
            CgmError::Configuration(_) => {
                "Unable to load configuration. Please check your config file.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
