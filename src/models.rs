//! Core data model for CGM analytics
//!
//! # Clinical Background
//!
//! Continuous glucose monitors report interstitial glucose roughly every
//! five minutes, in mg/dL. Sensors clamp their reporting range to about
//! 40-400 mg/dL; values outside that band are physiologically implausible
//! and flagged as outliers, but retained so consumers can decide how to
//! display them.
//!
//! Timestamps are the device's local clock, normalized to [`DateTime<Utc>`]
//! by the ingestion layer before they reach this crate. All hour-of-day and
//! calendar-date bucketing reads those fields directly, which keeps every
//! analyzer deterministic regardless of the host timezone.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the physiologically plausible sensor range (mg/dL)
pub const GLUCOSE_FLOOR: f64 = 40.0;
/// Upper bound of the physiologically plausible sensor range (mg/dL)
pub const GLUCOSE_CEILING: f64 = 400.0;
/// Lower bound of the clinical target range (mg/dL)
pub const TARGET_RANGE_LOW: f64 = 70.0;
/// Upper bound of the clinical target range (mg/dL)
pub const TARGET_RANGE_HIGH: f64 = 180.0;

/// Sensor-reported rate-of-change category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    RisingFast,
    Rising,
    Flat,
    Falling,
    FallingFast,
    #[default]
    Unknown,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::RisingFast => "rising fast",
            TrendDirection::Rising => "rising",
            TrendDirection::Flat => "flat",
            TrendDirection::Falling => "falling",
            TrendDirection::FallingFast => "falling fast",
            TrendDirection::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Provenance of a reading. Display-only; analytics ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    #[default]
    Device,
    Manual,
}

/// A single timestamped glucose reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// Device instant; the canonical ordering key
    pub timestamp: DateTime<Utc>,

    /// Glucose concentration in mg/dL
    pub value_mg_dl: f64,

    /// Sensor trend arrow, when the device reports one
    #[serde(default)]
    pub trend: TrendDirection,

    /// Device feed vs manual fingerstick entry
    #[serde(default)]
    pub source: ReadingSource,
}

impl GlucoseReading {
    pub fn new(timestamp: DateTime<Utc>, value_mg_dl: f64) -> Self {
        GlucoseReading {
            timestamp,
            value_mg_dl,
            trend: TrendDirection::Unknown,
            source: ReadingSource::Device,
        }
    }

    /// Whether the value falls outside the plausible sensor range.
    /// Outliers are kept, never dropped; consumers flag them.
    pub fn is_outlier(&self) -> bool {
        self.value_mg_dl < GLUCOSE_FLOOR || self.value_mg_dl > GLUCOSE_CEILING
    }

    /// Whether the value sits inside the clinical target range, inclusive
    pub fn is_in_range(&self) -> bool {
        self.value_mg_dl >= TARGET_RANGE_LOW && self.value_mg_dl <= TARGET_RANGE_HIGH
    }

    /// Local hour of day (0-23) for pattern bucketing
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Calendar date for day bucketing
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Kind of insulin delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsulinKind {
    Bolus,
    Basal,
}

/// A single insulin dose, consumed by the trend predictor for IOB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulinDoseEvent {
    pub timestamp: DateTime<Utc>,
    /// Units delivered; positive
    pub units: f64,
    pub kind: InsulinKind,
}

/// Time-ordered, immutable glucose series for one user over a query window.
///
/// Callers are expected to supply readings in chronological order, but the
/// constructor re-sorts defensively: consecutive-difference metrics (MAG,
/// regression slope) are meaningless on an unsorted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSeries {
    readings: Vec<GlucoseReading>,
}

impl GlucoseSeries {
    /// Build a series, sorting by timestamp
    pub fn new(mut readings: Vec<GlucoseReading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        GlucoseSeries { readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn readings(&self) -> &[GlucoseReading] {
        &self.readings
    }

    /// Glucose values in chronological order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().map(|r| r.value_mg_dl)
    }

    pub fn first(&self) -> Option<&GlucoseReading> {
        self.readings.first()
    }

    pub fn last(&self) -> Option<&GlucoseReading> {
        self.readings.last()
    }

    /// Earliest and latest timestamps, when non-empty
    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.readings.first(), self.readings.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    /// Sub-series within [start, end] inclusive
    pub fn window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> GlucoseSeries {
        let readings = self
            .readings
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        // already sorted
        GlucoseSeries { readings }
    }

    /// The most recent `n` readings, chronological order preserved
    pub fn last_n(&self, n: usize) -> &[GlucoseReading] {
        let skip = self.readings.len().saturating_sub(n);
        &self.readings[skip..]
    }
}
