//! Integration tests for period aggregation and comparison metrics.

use approx::assert_relative_eq;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hydro_tidal::analysis::{per_aver, per_max, per_min};
use hydro_tidal::{ComparisonMetrics, Interval, TimeSeries};

fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
}

/// Hourly ramp 0, 1, ..., 99 starting 01JAN2000 0100.
fn ramp() -> TimeSeries {
    let values = (0..100).map(f64::from).collect();
    TimeSeries::single_regular("ramp", ts(1, 1), Interval::hours(1), values)
}

#[test]
fn test_daily_periods_close_on_the_right() {
    let series = ramp();
    let mean = per_aver(&series, Interval::days(1)).unwrap();
    let max = per_max(&series, Interval::days(1)).unwrap();
    let min = per_min(&series, Interval::days(1)).unwrap();

    // 02JAN2000 0000 summarises (01JAN 0000, 02JAN 0000]
    assert_eq!(mean.time_at(0), Some(ts(2, 0)));
    assert_relative_eq!(mean.values().unwrap()[0], 11.5);
    assert_relative_eq!(max.values().unwrap()[0], 23.0);
    assert_relative_eq!(min.values().unwrap()[0], 0.0);

    // 03JAN2000 0000 covers 24..=47
    assert_relative_eq!(mean.values().unwrap()[1], 35.5);
    // Last sample at 05JAN 0400 falls in the 06JAN bin
    assert_eq!(mean.len(), 5);
    assert_eq!(mean.column_names(), vec!["ramp"]);
}

#[test]
fn test_missing_values_skipped_in_periods() {
    let values: Vec<f64> = (0..48).map(|i| if i % 2 == 0 { f64::NAN } else { 1.0 }).collect();
    let series = TimeSeries::single_regular("x", ts(1, 1), Interval::hours(1), values);
    let mean = per_aver(&series, Interval::days(1)).unwrap();
    for v in mean.values().unwrap() {
        assert_relative_eq!(*v, 1.0);
    }
}

#[test]
fn test_identical_series_give_perfect_metrics() {
    let series = ramp();
    let m = ComparisonMetrics::from_series(&series, &series).unwrap();
    assert_eq!(m.n_points, 100);
    assert_relative_eq!(m.rmse, 0.0);
    assert_relative_eq!(m.mean_error, 0.0);
    assert_relative_eq!(m.percent_bias, 0.0);
    assert_relative_eq!(m.nash_sutcliffe, 1.0);
    assert_relative_eq!(m.correlation, 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.slope, 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.intercept, 0.0, epsilon = 1e-9);
    assert!(m.is_highly_correlated());
    assert!(m.is_skillful());
}

#[test]
fn test_metrics_align_on_shared_timestamps() {
    let observed = ramp();
    // Model offset by +1 but sampled every other hour
    let model = TimeSeries::from_points(
        "model",
        (0..50).map(|i| (ts(1, 1) + TimeDelta::hours(2 * i), (2 * i) as f64 + 1.0)),
    )
    .unwrap();

    let m = ComparisonMetrics::from_series(&model, &observed).unwrap();
    assert_eq!(m.n_points, 50);
    assert_relative_eq!(m.mean_error, 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.rmse, 1.0, epsilon = 1e-12);
    assert!(m.percent_bias > 0.0);
    assert_relative_eq!(m.slope, 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.intercept, 1.0, epsilon = 1e-9);
}

#[test]
fn test_rsr_uses_sample_standard_deviation() {
    let model = [1.0, 2.0, 3.0, 4.0];
    let observed = [2.0, 2.0, 4.0, 4.0];
    let m = ComparisonMetrics::compute(&model, &observed);
    // errors -1, 0, -1, 0 → rmse = sqrt(0.5); observed std (ddof=1) = sqrt(4/3)
    assert_relative_eq!(m.rsr, (0.5f64).sqrt() / (4.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    assert_relative_eq!(m.nmse, 0.5 / 3.0, epsilon = 1e-12);
}
