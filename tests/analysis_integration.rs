use cgmrs::engine::{AnalysisEngine, GlucoseRepository};
use cgmrs::error::Result;
use cgmrs::iob::{LinearDecayIob, NoInsulin};
use cgmrs::models::{GlucoseReading, GlucoseSeries, InsulinDoseEvent, InsulinKind};
use cgmrs::{
    A1cEstimator, DawnPhenomenonDetector, DawnSeverity, StatisticsEngine, TrendPredictor,
    VariabilityAnalyzer,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Integration tests covering complete analysis workflows over synthetic
/// multi-day CGM data.

fn reading(ts: DateTime<Utc>, value: f64) -> GlucoseReading {
    GlucoseReading::new(ts, value)
}

/// One reading every 5 minutes starting at `start`
fn uniform_series(start: DateTime<Utc>, count: usize, value: f64) -> GlucoseSeries {
    GlucoseSeries::new(
        (0..count)
            .map(|i| reading(start + Duration::minutes(5 * i as i64), value))
            .collect(),
    )
}

/// A week of full-coverage days shaped like a realistic profile: flat
/// nights at `night`, a breakfast spike toward `peak`, settling by evening.
fn realistic_week(night: f64, peak: f64) -> GlucoseSeries {
    let mut readings = Vec::new();
    for day in 0..7i64 {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap() + Duration::days(day);
        for i in 0..288i64 {
            let ts = midnight + Duration::minutes(5 * i);
            let hour = (i * 5 / 60) as f64;
            // crude daily curve: night plateau, morning rise, afternoon decay
            let value = if hour < 6.0 {
                night
            } else if hour < 9.0 {
                night + (peak - night) * (hour - 6.0) / 3.0
            } else {
                night + (peak - night) * (1.0 - (hour - 9.0) / 15.0).max(0.0)
            };
            readings.push(reading(ts, value));
        }
    }
    GlucoseSeries::new(readings)
}

#[test]
fn scenario_a_constant_series() {
    // 60 readings at constant 120 mg/dL, one per 5 minutes
    let start = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
    let series = uniform_series(start, 60, 120.0);

    let stats = StatisticsEngine::compute_statistics(&series).unwrap();
    assert_eq!(stats.average, 120.0);
    assert_eq!(stats.min, 120.0);
    assert_eq!(stats.max, 120.0);
    assert_eq!(stats.standard_deviation, 0.0);
    assert_eq!(stats.coefficient_of_variation, 0.0);
    assert_eq!(stats.time_in_range_percent, 100.0);

    let variability = VariabilityAnalyzer::compute_variability(&series);
    assert_eq!(variability.mag, Some(0.0));

    let prediction = TrendPredictor::new().predict(&series, &NoInsulin).unwrap();
    assert_eq!(prediction.trend.to_string(), "stable");
    assert_eq!(prediction.step_predictions.len(), 6);
    for &p in &prediction.step_predictions {
        assert!((p - 120.0).abs() < 1e-9);
    }
}

#[test]
fn scenario_b_persistent_dawn_rise() {
    // 7 consecutive days with midnight around 90 and waking around 150
    let mut readings = Vec::new();
    for day in 0..7i64 {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap() + Duration::days(day);
        for i in 0..5i64 {
            readings.push(reading(midnight + Duration::minutes(20 * i), 90.0));
        }
        for i in 0..5i64 {
            readings.push(reading(
                midnight + Duration::hours(6) + Duration::minutes(5 + 20 * i),
                150.0,
            ));
        }
    }
    let series = GlucoseSeries::new(readings);

    let report = DawnPhenomenonDetector::analyze_dawn_phenomenon(&series, 14).unwrap();
    assert_eq!(report.dawn_phenomenon_percentage, 100.0);
    assert!((report.average_dawn_rise - 60.0).abs() < 1e-9);
    assert_eq!(report.severity, DawnSeverity::Severe);
}

#[test]
fn scenario_c_falling_glucose_high_risk() {
    // current 65 with the last three readings [90, 78, 65]
    let start = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
    let series = GlucoseSeries::new(vec![
        reading(start, 90.0),
        reading(start + Duration::minutes(5), 78.0),
        reading(start + Duration::minutes(10), 65.0),
    ]);

    let report = TrendPredictor::new().predict(&series, &NoInsulin).unwrap();
    assert_eq!(report.alerts.len(), 1);
    let alert = &report.alerts[0];
    assert_eq!(format!("{:?}", alert.kind), "Hypoglycemia");
    assert_eq!(format!("{:?}", alert.level), "High");
}

#[test]
fn insufficient_data_boundaries_are_exact() {
    // 49 readings fail dawn and A1C; 50 succeed
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let series_49 = uniform_series(start, 49, 120.0);
    let series_50 = uniform_series(start, 50, 120.0);

    assert!(DawnPhenomenonDetector::analyze_dawn_phenomenon(&series_49, 14)
        .unwrap_err()
        .is_insufficient_data());
    assert!(A1cEstimator::estimate_a1c(&series_49)
        .unwrap_err()
        .is_insufficient_data());

    assert!(DawnPhenomenonDetector::analyze_dawn_phenomenon(&series_50, 14).is_ok());
    assert!(A1cEstimator::estimate_a1c(&series_50).is_ok());
}

#[test]
fn full_engine_over_realistic_week() {
    let series = realistic_week(95.0, 190.0);
    let engine = AnalysisEngine::new();
    let report = engine.analyze(&series, &NoInsulin);

    let stats = report.statistics.as_ref().unwrap();
    assert!(stats.average > 95.0 && stats.average < 190.0);
    assert!(stats.time_in_range_percent > 0.0);

    let dawn = report.dawn_phenomenon.as_ref().unwrap();
    assert_eq!(dawn.days_analyzed, 7);
    // waking window (06:00-08:00) averages above the flat 95 night
    assert!(dawn.average_dawn_rise > 0.0);

    assert!(report.prediction.is_some());
    assert!(report.a1c.is_some());
}

#[test]
fn engine_fetches_once_per_request() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRepository {
        series_fetches: AtomicUsize,
        dose_fetches: AtomicUsize,
    }

    impl GlucoseRepository for CountingRepository {
        fn fetch_glucose_series(
            &self,
            _user_id: &str,
            start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<GlucoseSeries> {
            self.series_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(uniform_series(start, 100, 130.0))
        }

        fn fetch_insulin_doses(
            &self,
            _user_id: &str,
            start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<InsulinDoseEvent>> {
            self.dose_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![InsulinDoseEvent {
                timestamp: start,
                units: 2.0,
                kind: InsulinKind::Bolus,
            }])
        }
    }

    let repo = CountingRepository {
        series_fetches: AtomicUsize::new(0),
        dose_fetches: AtomicUsize::new(0),
    };
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let report = AnalysisEngine::new()
        .analyze_user(&repo, "user-1", start, start + Duration::days(1))
        .unwrap();

    assert_eq!(repo.series_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(repo.dose_fetches.load(Ordering::SeqCst), 1);
    assert!(report.statistics.is_some());
}

#[test]
fn iob_lowers_the_forecast() {
    let start = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
    let series = uniform_series(start, 30, 160.0);
    let last_ts = start + Duration::minutes(5 * 29);

    let iob = LinearDecayIob::new(vec![InsulinDoseEvent {
        timestamp: last_ts,
        units: 3.0,
        kind: InsulinKind::Bolus,
    }]);

    let predictor = TrendPredictor::new();
    let with_iob = predictor.predict(&series, &iob).unwrap();
    let without = predictor.predict(&series, &NoInsulin).unwrap();
    assert!(with_iob.predicted_glucose < without.predicted_glucose);
    assert!(with_iob.factors.iob_impact < 0.0);
}

#[test]
fn reports_serialize_to_json() {
    let series = realistic_week(100.0, 180.0);
    let report = AnalysisEngine::new().analyze(&series, &NoInsulin);

    let json = serde_json::to_string(&report).unwrap();
    let parsed: cgmrs::FullReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn dawn_weekly_pattern_indexes_sunday_first() {
    // 2024-03-03 was a Sunday; a dawn-positive Sunday must land in bucket 0
    let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
    assert_eq!(
        sunday.format("%A").to_string(),
        "Sunday",
        "fixture date must be a Sunday"
    );

    let mut readings = Vec::new();
    for day in 0..7i64 {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap() + Duration::days(day);
        for i in 0..4i64 {
            readings.push(reading(midnight + Duration::minutes(30 * i), 90.0));
        }
        for i in 0..4i64 {
            readings.push(reading(
                midnight + Duration::hours(6) + Duration::minutes(10 + 25 * i),
                // only the Sunday gets a dawn-sized rise
                if day == 0 { 160.0 } else { 100.0 },
            ));
        }
    }
    let report =
        DawnPhenomenonDetector::analyze_dawn_phenomenon(&GlucoseSeries::new(readings), 14).unwrap();

    assert_eq!(report.weekly_pattern[0].dawn_percentage, 100.0);
    for bucket in &report.weekly_pattern[1..] {
        assert_eq!(bucket.dawn_percentage, 0.0);
    }
}
