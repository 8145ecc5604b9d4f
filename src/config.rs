//! Application configuration
//!
//! Analyzer tuning lives in explicit config structs handed to constructors;
//! nothing here is global or mutable at module level. The CLI persists the
//! whole tree as TOML under the user config directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::predict::PredictorConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Analyzer tuning
    pub analysis: AnalysisConfig,

    /// Logging settings
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Tuning shared across the analyzer suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Calendar days the dawn detector looks back over
    pub dawn_days_to_analyze: usize,

    /// Trend predictor tuning
    pub predictor: PredictorConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            dawn_days_to_analyze: 14,
            predictor: PredictorConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();
        AppConfig {
            metadata: ConfigMetadata {
                version: "1".to_string(),
                created_at: now,
                updated_at: now,
            },
            analysis: AnalysisConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file location: `<user config dir>/cgmrs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cgmrs").join("config.toml"))
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from the given path, the default location, or fall back to
    /// defaults when no file exists
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Persist as TOML, creating parent directories as needed
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.metadata.updated_at = Utc::now();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, contents)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }
}
