//! Integration tests for per-location post-processing and study differences.

use approx::assert_relative_eq;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hydro_tidal::batch::{DEFAULT_MAX_FILL_GAP, fill_in, merge};
use hydro_tidal::{
    Column, Interpolation, Interval, PostProcessor, ProcessError, TimeSeries, diff_batch,
    process_batch,
};
use std::f64::consts::PI;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

/// `amplitude * cos(2π (t − lag) / 12h)` every 15 minutes for four days.
fn tide(amplitude: f64, lag_minutes: f64) -> TimeSeries {
    let values = (0..384)
        .map(|i| {
            let minutes = i as f64 * 15.0;
            amplitude * (2.0 * PI * (minutes - lag_minutes) / 720.0).cos()
        })
        .collect();
    TimeSeries::single_regular("RSAC054", t0(), Interval::minutes(15), values)
}

#[test]
fn test_fill_in_only_short_runs() {
    let nan = f64::NAN;
    let values = vec![1.0, nan, 3.0, nan, nan, nan, nan, 8.0, nan];
    let series = TimeSeries::single_regular("x", t0(), Interval::hours(1), values);

    let filled = fill_in(&series, 3, Interpolation::Linear).unwrap();
    let v = filled.values().unwrap();
    assert_relative_eq!(v[1], 2.0, epsilon = 1e-12);
    assert_relative_eq!(v[3], 4.0, epsilon = 1e-12);
    assert_relative_eq!(v[4], 5.0, epsilon = 1e-12);
    assert_relative_eq!(v[5], 6.0, epsilon = 1e-12);
    assert!(v[6].is_nan(), "fourth sample of a long run stays missing");
    assert!(v[8].is_nan(), "trailing run is not extrapolated");
    assert_eq!(filled.interval(), Some(Interval::hours(1)));

    assert!(matches!(
        fill_in(&series, 0, Interpolation::Linear),
        Err(ProcessError::InvalidFillGap(0))
    ));
}

#[test]
fn test_merge_prefers_earlier_records() {
    let nan = f64::NAN;
    let first = TimeSeries::single_regular("obs", t0(), Interval::hours(1), vec![1.0, nan, 3.0]);
    let second = TimeSeries::single_regular(
        "obs-backup",
        t0() + TimeDelta::hours(1),
        Interval::hours(1),
        vec![20.0, 30.0, 40.0],
    );

    let merged = merge(&[first.clone(), second]).unwrap();
    assert_eq!(merged.interval(), Some(Interval::hours(1)));
    assert_eq!(merged.time_at(0), Some(t0()));
    assert_eq!(merged.values().unwrap(), &[1.0, 20.0, 3.0, 40.0]);
    assert_eq!(merged.column_names(), vec!["obs"]);

    // Off-grid record falls back to the union of timestamps
    let offset = TimeSeries::single_regular(
        "obs",
        t0() + TimeDelta::minutes(30),
        Interval::hours(1),
        vec![5.0],
    );
    let merged = merge(&[first, offset]).unwrap();
    assert!(!merged.is_regular());
    assert_eq!(merged.len(), 4);
    assert_eq!(merged.time_at(1), Some(t0() + TimeDelta::minutes(30)));
    let v = merged.values().unwrap();
    assert_eq!((v[0], v[1], v[3]), (1.0, 5.0, 3.0));
    assert!(v[2].is_nan());
}

#[test]
fn test_processor_fills_scales_and_extracts() {
    let mut values = tide(1.0, 0.0).values().unwrap().to_vec();
    values[200] = f64::NAN;
    let raw = TimeSeries::single_regular("RSAC054", t0(), Interval::minutes(15), values);

    let processor = PostProcessor::new()
        .with_fill_in(DEFAULT_MAX_FILL_GAP, Interpolation::Linear)
        .with_scale(2.0);
    let result = processor.process(&raw).unwrap();

    assert!(!result.series.values().unwrap()[200].is_nan());
    assert_relative_eq!(result.series.values().unwrap()[0], 2.0, epsilon = 1e-12);

    // 289-tap kernel at 15 minutes, 144 either side
    assert_eq!(result.godin.len(), 384);
    for v in &result.godin.values().unwrap()[144..240] {
        assert!(v.abs() < 1e-3, "residual tide {v}");
    }

    assert_eq!(result.highs.len(), 7);
    assert_eq!(result.lows.len(), 6);
    assert_eq!(result.amplitude.len(), 6);
    for v in result.amplitude.values().unwrap() {
        assert!((v - 4.0).abs() < 0.08, "amplitude {v}");
    }
}

#[test]
fn test_diff_against_reference_study() {
    let processor = PostProcessor::new();
    let observed = processor.process(&tide(1.0, 0.0)).unwrap();
    let modelled = processor.process(&tide(0.8, 30.0)).unwrap();

    let diff = modelled.diff(&observed).unwrap();
    assert_eq!(diff.phase_diff.len(), 13);
    for v in diff.phase_diff.values().unwrap() {
        assert!((v - 30.0).abs() < 1e-9, "phase difference {v}");
    }
    assert_eq!(diff.amplitude_diff_percent.len(), 12);
    for v in diff.amplitude_diff_percent.values().unwrap() {
        assert!((v + 20.0).abs() < 1e-6, "percent amplitude difference {v}");
    }
    for v in diff.amplitude_diff.values().unwrap() {
        assert!((v + 0.4).abs() < 0.01, "amplitude difference {v}");
    }
}

#[test]
fn test_batches_pair_studies_by_location() {
    let two_columns = TimeSeries::regular(
        t0(),
        Interval::minutes(15),
        vec![Column::new("a", vec![0.0; 384]), Column::new("b", vec![0.0; 384])],
    )
    .unwrap();
    let model = vec![
        ("RSAC054".to_string(), tide(0.8, 30.0)),
        ("RSAN018".to_string(), tide(0.9, 15.0)),
        ("bad".to_string(), two_columns),
    ];
    let observed = vec![("RSAC054".to_string(), tide(1.0, 0.0))];

    let processor = PostProcessor::new();
    let model = process_batch(&model, &processor);
    let observed = process_batch(&observed, &processor);
    assert_eq!(model.successes.len(), 2);
    assert_eq!(model.failures[0].key, "bad");

    let diffs = diff_batch(&model.successes, &observed.successes);
    assert_eq!(diffs.successes.len(), 1);
    assert_eq!(diffs.failures.len(), 1);
    assert_eq!(diffs.failures[0].key, "RSAN018");
    assert!(diffs.failures[0].error.contains("No reference result"));
    assert_eq!(diffs.get("RSAC054").unwrap().phase_diff.len(), 13);
}
