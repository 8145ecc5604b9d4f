//! Dawn phenomenon detection
//!
//! # Clinical Background
//!
//! The dawn phenomenon is an early-morning glucose rise driven by the
//! overnight release of counter-regulatory hormones (growth hormone,
//! cortisol). It shows up as a gap between the overnight low and the waking
//! glucose. Detection here is a fixed-threshold heuristic: a day exhibits
//! the phenomenon when the rise from the overnight low to the waking window
//! is at least 30 mg/dL.
//!
//! The detector segments a series into calendar days, averages glucose in
//! four nightly windows per day, classifies each day against the threshold,
//! and aggregates into severity, weekday pattern, and a recent trend.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::{CgmError, Result};
use crate::models::{GlucoseReading, GlucoseSeries};

/// Rise from overnight low to waking glucose that classifies a day as
/// exhibiting dawn phenomenon (mg/dL)
pub const DAWN_RISE_THRESHOLD: f64 = 30.0;

/// Minimum total readings required before the detector will run
pub const MIN_READINGS: usize = 50;

/// Valid days required before a recent-trend comparison is attempted
const TREND_MIN_VALID_DAYS: usize = 14;

/// Percentage-point shift that moves the recent trend off `Stable`
const TREND_SHIFT_POINTS: f64 = 10.0;

/// Severity of the dawn phenomenon across the analyzed period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DawnSeverity {
    None,
    Mild,
    Moderate,
    Severe,
}

impl fmt::Display for DawnSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DawnSeverity::None => "none",
            DawnSeverity::Mild => "mild",
            DawnSeverity::Moderate => "moderate",
            DawnSeverity::Severe => "severe",
        };
        write!(f, "{}", label)
    }
}

impl DawnSeverity {
    /// Band severity from the share of affected days and the average rise.
    ///
    /// First match wins; either a low percentage or a low average rise is
    /// enough to pull severity down a band.
    pub fn from_metrics(percentage: f64, average_rise: f64) -> Self {
        if percentage < 20.0 || average_rise < 30.0 {
            DawnSeverity::None
        } else if percentage < 40.0 || average_rise < 50.0 {
            DawnSeverity::Mild
        } else if percentage < 70.0 || average_rise < 80.0 {
            DawnSeverity::Moderate
        } else {
            DawnSeverity::Severe
        }
    }

    /// Fixed guidance strings keyed by severity tier
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            DawnSeverity::None => &[
                "No consistent early-morning rise detected. Keep your current overnight routine.",
            ],
            DawnSeverity::Mild => &[
                "A mild early-morning rise appears on some days. Consider logging bedtime snacks to spot triggers.",
                "Review evening meal timing; late carbohydrates can amplify the morning rise.",
            ],
            DawnSeverity::Moderate => &[
                "A moderate dawn phenomenon pattern is present. Discuss overnight basal timing with your care team.",
                "Avoid late-evening snacks high in carbohydrates.",
                "Light evening exercise may blunt the overnight rise.",
            ],
            DawnSeverity::Severe => &[
                "A pronounced dawn phenomenon pattern is present on most days. Bring this report to your care team.",
                "Ask about adjusting overnight basal rates or long-acting insulin timing.",
                "Consider a continuous overnight wear schedule so no early-morning data is missed.",
            ],
        }
    }
}

/// Direction of the dawn pattern over the most recent two weeks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DawnTrend {
    Improving,
    Stable,
    Worsening,
}

/// Averages extracted from the four nightly windows of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DawnDayAnalysis {
    pub date: NaiveDate,

    /// Average glucose 22:00-23:59, when readings exist
    pub bedtime: Option<f64>,

    /// Average glucose 00:00-02:00
    pub midnight: Option<f64>,

    /// Average glucose 04:00-06:00
    pub early_morning: Option<f64>,

    /// Average glucose 06:00-08:00
    pub waking: Option<f64>,

    /// Waking minus overnight low; `None` when either side is missing
    pub dawn_rise: Option<f64>,

    /// Whether the rise met the 30 mg/dL threshold
    pub has_dawn_phenomenon: bool,
}

/// Per-day-of-week aggregate (Sunday = 0 .. Saturday = 6)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPattern {
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: u32,

    /// Classifiable days that fell on this weekday
    pub day_count: usize,

    /// Percent of those days with dawn phenomenon
    pub dawn_percentage: f64,

    /// Average rise over days with a positive rise; 0 when none
    pub average_rise: f64,
}

/// Multi-day dawn phenomenon report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DawnPhenomenonReport {
    /// Calendar days with any readings in the analyzed window
    pub days_analyzed: usize,

    /// Days where a rise was computable (waking + an overnight window)
    pub valid_days: usize,

    /// Days classified as exhibiting dawn phenomenon
    pub dawn_phenomenon_days: usize,

    /// dawn days / valid days x 100; 0 when no day was classifiable
    pub dawn_phenomenon_percentage: f64,

    /// Mean rise over days with a positive rise; 0 when none
    pub average_dawn_rise: f64,

    /// Largest positive rise observed; 0 when none
    pub max_dawn_rise: f64,

    pub severity: DawnSeverity,

    /// One bucket per weekday, always 7 entries, Sunday first
    pub weekly_pattern: Vec<WeekdayPattern>,

    /// Last 7 valid days vs the preceding 7
    pub recent_trend: DawnTrend,

    /// Guidance strings for the severity tier
    pub recommendations: Vec<String>,

    /// Per-day detail rows, oldest first
    pub days: Vec<DawnDayAnalysis>,
}

/// Local-time window bounds, inclusive on both ends
struct NightWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl NightWindow {
    fn new(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        NightWindow {
            start: NaiveTime::from_hms_opt(start_h, start_m, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end_h, end_m, 59).unwrap(),
        }
    }

    fn average(&self, readings: &[&GlucoseReading]) -> Option<f64> {
        let values: Vec<f64> = readings
            .iter()
            .filter(|r| {
                let t = r.timestamp.time();
                t >= self.start && t <= self.end
            })
            .map(|r| r.value_mg_dl)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

/// Detects and grades the dawn phenomenon over a multi-day series
pub struct DawnPhenomenonDetector;

impl DawnPhenomenonDetector {
    /// Analyze up to `days_to_analyze` most recent calendar days.
    ///
    /// Fails with [`CgmError::InsufficientData`] under 50 total readings;
    /// overnight coverage across several days is needed before the
    /// classification means anything.
    pub fn analyze_dawn_phenomenon(
        series: &GlucoseSeries,
        days_to_analyze: usize,
    ) -> Result<DawnPhenomenonReport> {
        if series.len() < MIN_READINGS {
            return Err(CgmError::InsufficientData {
                analysis: "dawn phenomenon",
                required: MIN_READINGS,
                actual: series.len(),
            });
        }

        // group by calendar date, keeping chronological day order
        let mut day_buckets: BTreeMap<NaiveDate, Vec<&GlucoseReading>> = BTreeMap::new();
        for reading in series.readings() {
            day_buckets.entry(reading.date()).or_default().push(reading);
        }

        // keep only the most recent N days
        let skip = day_buckets.len().saturating_sub(days_to_analyze);
        let recent_days: Vec<(NaiveDate, Vec<&GlucoseReading>)> =
            day_buckets.into_iter().skip(skip).collect();

        let days: Vec<DawnDayAnalysis> = recent_days
            .iter()
            .map(|(date, readings)| Self::analyze_day(*date, readings))
            .collect();

        let valid: Vec<&DawnDayAnalysis> =
            days.iter().filter(|d| d.dawn_rise.is_some()).collect();
        let dawn_days = valid.iter().filter(|d| d.has_dawn_phenomenon).count();

        let dawn_percentage = if valid.is_empty() {
            0.0
        } else {
            dawn_days as f64 / valid.len() as f64 * 100.0
        };

        // rise averages only consider days with a positive rise
        let positive_rises: Vec<f64> = valid
            .iter()
            .filter_map(|d| d.dawn_rise)
            .filter(|&r| r > 0.0)
            .collect();
        let average_dawn_rise = if positive_rises.is_empty() {
            0.0
        } else {
            positive_rises.iter().sum::<f64>() / positive_rises.len() as f64
        };
        let max_dawn_rise = positive_rises.iter().fold(0.0f64, |acc, &r| acc.max(r));

        let severity = DawnSeverity::from_metrics(dawn_percentage, average_dawn_rise);
        let weekly_pattern = Self::weekly_pattern(&valid);
        let recent_trend = Self::recent_trend(&valid);

        debug!(
            days_analyzed = days.len(),
            valid_days = valid.len(),
            dawn_days,
            dawn_percentage,
            %severity,
            "analyzed dawn phenomenon"
        );

        Ok(DawnPhenomenonReport {
            days_analyzed: days.len(),
            valid_days: valid.len(),
            dawn_phenomenon_days: dawn_days,
            dawn_phenomenon_percentage: dawn_percentage,
            average_dawn_rise,
            max_dawn_rise,
            severity,
            weekly_pattern,
            recent_trend,
            recommendations: severity
                .recommendations()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            days,
        })
    }

    /// Extract the four nightly window averages and classify one day
    fn analyze_day(date: NaiveDate, readings: &[&GlucoseReading]) -> DawnDayAnalysis {
        let bedtime_window = NightWindow::new(22, 0, 23, 59);
        let midnight_window = NightWindow::new(0, 0, 2, 0);
        let early_window = NightWindow::new(4, 0, 6, 0);
        let waking_window = NightWindow::new(6, 0, 8, 0);

        let bedtime = bedtime_window.average(readings);
        let midnight = midnight_window.average(readings);
        let early_morning = early_window.average(readings);
        let waking = waking_window.average(readings);

        // overnight low: min of the two windows when both present,
        // otherwise whichever exists
        let overnight_low = match (midnight, early_morning) {
            (Some(m), Some(e)) => Some(m.min(e)),
            (Some(m), None) => Some(m),
            (None, Some(e)) => Some(e),
            (None, None) => None,
        };

        let dawn_rise = match (waking, overnight_low) {
            (Some(w), Some(low)) => Some(w - low),
            _ => None,
        };

        DawnDayAnalysis {
            date,
            bedtime,
            midnight,
            early_morning,
            waking,
            dawn_rise,
            has_dawn_phenomenon: dawn_rise.map_or(false, |r| r >= DAWN_RISE_THRESHOLD),
        }
    }

    /// Bucket classifiable days by day of week, Sunday = 0
    fn weekly_pattern(valid: &[&DawnDayAnalysis]) -> Vec<WeekdayPattern> {
        let mut counts = [0usize; 7];
        let mut dawn_counts = [0usize; 7];
        let mut rise_sums = [0.0f64; 7];
        let mut rise_counts = [0usize; 7];

        for day in valid {
            let wd = day.date.weekday().num_days_from_sunday() as usize;
            counts[wd] += 1;
            if day.has_dawn_phenomenon {
                dawn_counts[wd] += 1;
            }
            if let Some(rise) = day.dawn_rise {
                if rise > 0.0 {
                    rise_sums[wd] += rise;
                    rise_counts[wd] += 1;
                }
            }
        }

        (0..7)
            .map(|wd| WeekdayPattern {
                weekday: wd as u32,
                day_count: counts[wd],
                dawn_percentage: if counts[wd] == 0 {
                    0.0
                } else {
                    dawn_counts[wd] as f64 / counts[wd] as f64 * 100.0
                },
                average_rise: if rise_counts[wd] == 0 {
                    0.0
                } else {
                    rise_sums[wd] / rise_counts[wd] as f64
                },
            })
            .collect()
    }

    /// Compare the last 7 classifiable days against the preceding 7
    fn recent_trend(valid: &[&DawnDayAnalysis]) -> DawnTrend {
        if valid.len() < TREND_MIN_VALID_DAYS {
            return DawnTrend::Stable;
        }

        let pct = |days: &[&DawnDayAnalysis]| {
            days.iter().filter(|d| d.has_dawn_phenomenon).count() as f64 / days.len() as f64 * 100.0
        };

        let recent = &valid[valid.len() - 7..];
        let previous = &valid[valid.len() - 14..valid.len() - 7];
        let diff = pct(recent) - pct(previous);

        if diff <= -TREND_SHIFT_POINTS {
            DawnTrend::Improving
        } else if diff >= TREND_SHIFT_POINTS {
            DawnTrend::Worsening
        } else {
            DawnTrend::Stable
        }
    }
}
