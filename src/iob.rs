//! Insulin-on-board models
//!
//! IOB is the estimated insulin still active from prior doses. The trend
//! predictor only needs a number of units remaining at a given instant, so
//! the model is a trait; hosts with a pump-specific curve can plug their
//! own in.
//!
//! The built-in model decays each dose linearly to zero over its action
//! duration (rapid-acting bolus about 4 hours, basal about 24). Linear
//! decay overstates early tail activity versus a biexponential curve, but
//! matches how the surrounding application discounts the "iob impact"
//! factor.

use chrono::{DateTime, Duration, Utc};

use crate::models::{InsulinDoseEvent, InsulinKind};

/// Estimates insulin units still active at an instant
pub trait IobModel: Sync {
    /// Units of insulin remaining on board at `at`
    fn iob_at(&self, at: DateTime<Utc>) -> f64;
}

/// Model for users with no insulin data: always zero on board
pub struct NoInsulin;

impl IobModel for NoInsulin {
    fn iob_at(&self, _at: DateTime<Utc>) -> f64 {
        0.0
    }
}

/// Linear per-dose decay over a per-kind action duration
pub struct LinearDecayIob {
    doses: Vec<InsulinDoseEvent>,
    bolus_duration: Duration,
    basal_duration: Duration,
}

impl LinearDecayIob {
    /// Build with default action durations (bolus 4 h, basal 24 h)
    pub fn new(doses: Vec<InsulinDoseEvent>) -> Self {
        Self::with_durations(doses, Duration::hours(4), Duration::hours(24))
    }

    pub fn with_durations(
        doses: Vec<InsulinDoseEvent>,
        bolus_duration: Duration,
        basal_duration: Duration,
    ) -> Self {
        LinearDecayIob {
            doses,
            bolus_duration,
            basal_duration,
        }
    }

    fn duration_for(&self, kind: InsulinKind) -> Duration {
        match kind {
            InsulinKind::Bolus => self.bolus_duration,
            InsulinKind::Basal => self.basal_duration,
        }
    }
}

impl IobModel for LinearDecayIob {
    fn iob_at(&self, at: DateTime<Utc>) -> f64 {
        self.doses
            .iter()
            .filter(|dose| dose.timestamp <= at)
            .map(|dose| {
                let duration = self.duration_for(dose.kind);
                let age = at - dose.timestamp;
                if age >= duration {
                    0.0
                } else {
                    let remaining =
                        1.0 - age.num_seconds() as f64 / duration.num_seconds() as f64;
                    dose.units * remaining
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_no_insulin_is_zero() {
        assert_eq!(NoInsulin.iob_at(at(12, 0)), 0.0);
    }

    #[test]
    fn test_bolus_decays_linearly() {
        let model = LinearDecayIob::new(vec![InsulinDoseEvent {
            timestamp: at(8, 0),
            units: 4.0,
            kind: InsulinKind::Bolus,
        }]);

        assert!((model.iob_at(at(8, 0)) - 4.0).abs() < 1e-9);
        // halfway through a 4 h action window
        assert!((model.iob_at(at(10, 0)) - 2.0).abs() < 1e-9);
        assert_eq!(model.iob_at(at(12, 0)), 0.0);
        assert_eq!(model.iob_at(at(18, 0)), 0.0);
    }

    #[test]
    fn test_future_doses_do_not_count() {
        let model = LinearDecayIob::new(vec![InsulinDoseEvent {
            timestamp: at(14, 0),
            units: 6.0,
            kind: InsulinKind::Bolus,
        }]);
        assert_eq!(model.iob_at(at(12, 0)), 0.0);
    }

    #[test]
    fn test_doses_stack() {
        let model = LinearDecayIob::new(vec![
            InsulinDoseEvent {
                timestamp: at(8, 0),
                units: 4.0,
                kind: InsulinKind::Bolus,
            },
            InsulinDoseEvent {
                timestamp: at(9, 0),
                units: 2.0,
                kind: InsulinKind::Bolus,
            },
        ]);
        // at 10:00: first dose 50% left (2.0), second 75% left (1.5)
        assert!((model.iob_at(at(10, 0)) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_basal_uses_longer_duration() {
        let model = LinearDecayIob::new(vec![InsulinDoseEvent {
            timestamp: at(0, 0),
            units: 24.0,
            kind: InsulinKind::Basal,
        }]);
        // 6 h into a 24 h window: 75% remains
        assert!((model.iob_at(at(6, 0)) - 18.0).abs() < 1e-9);
    }
}
