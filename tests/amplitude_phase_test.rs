//! Integration tests for amplitude and phase comparisons between records.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hydro_tidal::analysis::{
    AmplitudePhaseAnalyzer, TidalHLConfig, amplitude_diff, match_nearest, phase_diff,
    tidal_highs_lows,
};
use hydro_tidal::{Interval, TimeSeries};
use std::f64::consts::PI;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn hours(h: i64) -> NaiveDateTime {
    t0() + TimeDelta::hours(h)
}

fn tide(amplitude: f64, lag_minutes: f64) -> TimeSeries {
    let values = (0..384)
        .map(|i| {
            let minutes = i as f64 * 15.0;
            amplitude * (2.0 * PI * (minutes - lag_minutes) / 720.0).cos()
        })
        .collect();
    TimeSeries::single_regular("stage", t0(), Interval::minutes(15), values)
}

fn series(points: &[(i64, f64)]) -> TimeSeries {
    TimeSeries::from_points("x", points.iter().map(|(h, v)| (hours(*h), *v))).unwrap()
}

#[test]
fn test_lagged_damped_record() {
    let config = TidalHLConfig::default();
    let observed = tidal_highs_lows(&tide(1.0, 0.0), &config).unwrap();
    let modelled = tidal_highs_lows(&tide(0.8, 30.0), &config).unwrap();

    let phase =
        phase_diff(&modelled.highs, &modelled.lows, &observed.highs, &observed.lows).unwrap();
    // 7 highs and 6 lows of the observed record
    assert_eq!(phase.len(), 13);
    for v in phase.values().unwrap() {
        assert!((v - 30.0).abs() < 1e-9, "phase difference {v}");
    }

    let (amp_model, amp_observed) = (modelled.amplitude().unwrap(), observed.amplitude().unwrap());
    let diff = amplitude_diff(&amp_model, &amp_observed, true).unwrap();
    assert_eq!(diff.len(), 12);
    for v in diff.values().unwrap() {
        assert!((v + 20.0).abs() < 1e-6, "percent amplitude difference {v}");
    }
}

#[test]
fn test_far_apart_events_give_missing_not_error() {
    let highs1 = series(&[(0, 1.0), (12, 1.0)]);
    let lows1 = series(&[(6, -1.0)]);
    let highs2 = series(&[(100, 1.0)]);
    let lows2 = series(&[(106, -1.0)]);

    let phase = phase_diff(&highs2, &lows2, &highs1, &lows1).unwrap();
    assert_eq!(phase.len(), 3);
    assert!(phase.values().unwrap().iter().all(|v| v.is_nan()));

    let amp1 = series(&[(6, 2.0)]);
    let amp2 = series(&[(106, 2.0)]);
    let diff = amplitude_diff(&amp1, &amp2, false).unwrap();
    assert_eq!(diff.len(), 2);
    assert!(diff.values().unwrap().iter().all(|v| v.is_nan()));

    assert!(match_nearest(&amp1, &amp2, TimeDelta::hours(2)).unwrap().is_empty());
}

#[test]
fn test_tolerance_is_inclusive() {
    let amp1 = series(&[(0, 3.0)]);
    let amp2 = series(&[(4, 1.0)]);
    let diff = amplitude_diff(&amp1, &amp2, false).unwrap();
    assert_eq!(diff.points().unwrap(), vec![(hours(0), 2.0), (hours(4), 2.0)]);

    let narrow = AmplitudePhaseAnalyzer::new(TimeDelta::hours(3));
    let diff = narrow.amplitude_diff(&amp1, &amp2, false).unwrap();
    assert!(diff.values().unwrap().iter().all(|v| v.is_nan()));
}

#[test]
fn test_match_nearest_picks_closest() {
    let observed = series(&[(10, 1.0)]);
    let model = series(&[(8, 5.0), (11, 2.0), (13, 9.0)]);
    let pairs = match_nearest(&observed, &model, TimeDelta::hours(2)).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].time2, hours(11));
    assert!((pairs[0].amplitude_diff() + 1.0).abs() < 1e-12);
    assert!((pairs[0].phase_diff_minutes() - 60.0).abs() < 1e-12);
}

#[test]
fn test_non_monotonic_input_is_an_error() {
    let bad = TimeSeries::irregular(
        vec![hours(2), hours(1)],
        vec![hydro_tidal::Column::new("x", vec![1.0, 2.0])],
    );
    assert!(bad.is_err());
}
