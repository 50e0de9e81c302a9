//! Tidal high and low extraction.
//!
//! # Rolling centred extremum
//!
//! With `p = round(window / Δt)` samples per window, every full window
//! (no missing samples) ending at row `r` nominates its centre row
//! `c = r − (p − 1)/2`, which is `r − (p/2 − 1)` for even `p`. Row `c` is
//! a high if it holds the window's maximum and no other row of the window
//! ties it; lows are the same on `−x`. Plateaus and off-centre peaks are
//! therefore never reported.
//!
//! A two-sample window has no interior row and is widened to three.
//!
//! The window maxima come from a monotonic deque, O(1) amortised per
//! sample. Equal values are kept in the deque so ties are visible.

use std::collections::VecDeque;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, trace};

use super::condition::ConditionedSeries;
use crate::series::{SeriesError, TimeSeries};

/// Default extremum search window.
pub const DEFAULT_WINDOW: TimeDelta = TimeDelta::hours(7);

/// High or low water.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtremumKind {
    /// Local maximum
    High,
    /// Local minimum
    Low,
}

impl ExtremumKind {
    /// Column name used for this kind of extremum.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::High => "max",
            Self::Low => "min",
        }
    }
}

/// A located tidal extremum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtremumPoint {
    /// Time of the extremum
    pub time: NaiveDateTime,
    /// Value at the extremum
    pub value: f64,
    /// High or low
    pub kind: ExtremumKind,
}

/// Time at which the gradient of a series changes sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZeroCrossing {
    /// Interpolated, rounded crossing time
    pub time: NaiveDateTime,
    /// `High` where the gradient turns negative, `Low` where it turns positive
    pub kind: ExtremumKind,
}

/// Rolling-window extremum extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtremaExtractor {
    /// Width of the rolling window
    pub window: TimeDelta,
}

impl Default for ExtremaExtractor {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl ExtremaExtractor {
    /// Extractor with the given window.
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    /// Set the window.
    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = window;
        self
    }

    /// Samples per window for a series sampled every `dt`.
    pub fn periods(&self, dt: TimeDelta) -> usize {
        let dt_ms = dt.num_milliseconds();
        if dt_ms <= 0 {
            return 0;
        }
        (self.window.num_milliseconds() as f64 / dt_ms as f64).round().max(0.0) as usize
    }

    /// Tidal highs of a regular single-column series, column `"max"`.
    ///
    /// # Errors
    /// - `NotRegular` if the series has no fixed interval
    /// - `ColumnCount` if it has more than one column
    pub fn highs(&self, series: &TimeSeries) -> Result<TimeSeries, SeriesError> {
        let rows = self.extremum_rows(series, ExtremumKind::High)?;
        to_series(series, &rows, ExtremumKind::High)
    }

    /// Tidal lows of a regular single-column series, column `"min"`.
    ///
    /// # Errors
    /// As for [`highs`](Self::highs).
    pub fn lows(&self, series: &TimeSeries) -> Result<TimeSeries, SeriesError> {
        let rows = self.extremum_rows(series, ExtremumKind::Low)?;
        to_series(series, &rows, ExtremumKind::Low)
    }

    /// Highs and lows of a conditioned series, dropping any that fall on
    /// grid points inside gaps of the raw record.
    pub fn extract(
        &self,
        conditioned: &ConditionedSeries,
    ) -> Result<(TimeSeries, TimeSeries), SeriesError> {
        let series = &conditioned.series;
        let keep = |rows: Vec<usize>| -> Vec<usize> {
            rows.into_iter().filter(|&r| !conditioned.is_gap(r)).collect()
        };
        let highs = keep(self.extremum_rows(series, ExtremumKind::High)?);
        let lows = keep(self.extremum_rows(series, ExtremumKind::Low)?);
        debug!(highs = highs.len(), lows = lows.len(), "extracted tidal extrema");
        Ok((
            to_series(series, &highs, ExtremumKind::High)?,
            to_series(series, &lows, ExtremumKind::Low)?,
        ))
    }

    /// Highs and lows merged in time order.
    pub fn extrema(&self, series: &TimeSeries) -> Result<Vec<ExtremumPoint>, SeriesError> {
        let values = series.values()?;
        let mut points: Vec<ExtremumPoint> = [ExtremumKind::High, ExtremumKind::Low]
            .into_iter()
            .map(|kind| -> Result<Vec<ExtremumPoint>, SeriesError> {
                let rows = self.extremum_rows(series, kind)?;
                Ok(rows
                    .into_iter()
                    .filter_map(|r| {
                        series.time_at(r).map(|time| ExtremumPoint {
                            time,
                            value: values[r],
                            kind,
                        })
                    })
                    .collect())
            })
            .collect::<Result<Vec<_>, SeriesError>>()?
            .concat();
        points.sort_by_key(|p| p.time);
        Ok(points)
    }

    fn extremum_rows(
        &self,
        series: &TimeSeries,
        kind: ExtremumKind,
    ) -> Result<Vec<usize>, SeriesError> {
        let values = series.values()?;
        if series.is_empty() {
            return Ok(Vec::new());
        }
        let dt = series.fixed_interval().ok_or(SeriesError::NotRegular)?;
        let periods = self.periods(dt);
        if periods < 2 {
            trace!(periods, "window shorter than two samples");
            return Ok(Vec::new());
        }
        Ok(match kind {
            ExtremumKind::High => unique_centered_maxima(values, periods),
            ExtremumKind::Low => {
                let negated: Vec<f64> = values.iter().map(|v| -v).collect();
                unique_centered_maxima(&negated, periods)
            }
        })
    }
}

/// Rows that are the unique maximum of the full window they centre.
fn unique_centered_maxima(values: &[f64], periods: usize) -> Vec<usize> {
    let periods = periods.max(3);
    let shift = (periods - 1) / 2;
    let mut deque: VecDeque<(usize, f64)> = VecDeque::new();
    let mut last_missing: Option<usize> = None;
    let mut rows = Vec::new();

    for (r, &x) in values.iter().enumerate() {
        if x.is_nan() {
            deque.clear();
            last_missing = Some(r);
            continue;
        }
        while deque.back().is_some_and(|&(_, v)| v < x) {
            deque.pop_back();
        }
        deque.push_back((r, x));

        if r + 1 < periods {
            continue;
        }
        let window_start = r + 1 - periods;
        while deque.front().is_some_and(|&(i, _)| i < window_start) {
            deque.pop_front();
        }
        if last_missing.is_some_and(|m| m >= window_start) {
            continue;
        }

        let center = r - shift;
        if let Some(&(i, v)) = deque.front() {
            let tied = deque.get(1).is_some_and(|&(_, next)| next >= v);
            if i == center && !tied {
                rows.push(center);
            }
        }
    }
    rows
}

fn to_series(
    series: &TimeSeries,
    rows: &[usize],
    kind: ExtremumKind,
) -> Result<TimeSeries, SeriesError> {
    let values = series.values()?;
    TimeSeries::from_points(
        kind.column_name(),
        rows.iter()
            .filter_map(|&r| series.time_at(r).map(|t| (t, values[r]))),
    )
}

/// Times where the series gradient changes sign, rounded to `round_to`.
///
/// The gradient is the central difference of successive samples (one-sided
/// at the ends); each sign change is located by linear interpolation
/// between the two bracketing samples. Changes into an exactly zero
/// gradient are skipped.
pub fn zero_crossings(
    series: &TimeSeries,
    round_to: TimeDelta,
) -> Result<Vec<ZeroCrossing>, SeriesError> {
    let values = series.values()?;
    let times = series.timestamps();
    let n = values.len();
    if n < 2 {
        return Ok(Vec::new());
    }

    let gradient: Vec<f64> = (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect();

    let step_ms = round_to.num_milliseconds();
    let mut crossings = Vec::new();
    for i in 0..n - 1 {
        let (g0, g1) = (gradient[i], gradient[i + 1]);
        let same_sign = g0 != 0.0 && g0.signum() == g1.signum();
        if !g0.is_finite() || !g1.is_finite() || g1 == 0.0 || same_sign {
            continue;
        }
        let dx = (times[i + 1] - times[i]).num_milliseconds() as f64;
        let offset = -g0 * dx / (g1 - g0);
        let at = times[i] + TimeDelta::milliseconds(offset.round() as i64);
        let kind = if g1 < 0.0 {
            ExtremumKind::High
        } else {
            ExtremumKind::Low
        };
        crossings.push(ZeroCrossing {
            time: round_time(at, step_ms),
            kind,
        });
    }
    Ok(crossings)
}

/// Round to the nearest multiple of `step_ms` since the Unix epoch, ties to even.
fn round_time(t: NaiveDateTime, step_ms: i64) -> NaiveDateTime {
    if step_ms <= 0 {
        return t;
    }
    let ms = t.and_utc().timestamp_millis();
    let quotient = ms.div_euclid(step_ms);
    let remainder = ms.rem_euclid(step_ms);
    let rounded = match (2 * remainder).cmp(&step_ms) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient.rem_euclid(2),
    };
    t + TimeDelta::milliseconds(rounded * step_ms - ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Interval;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_single_peak_found_at_center() {
        let values = [0.0, 1.0, 2.0, 5.0, 2.0, 1.0, 0.0];
        // periods 4: shift 1, window [r-3, r] nominates r-1
        assert_eq!(unique_centered_maxima(&values, 4), vec![3]);
    }

    #[test]
    fn test_odd_window_nominates_true_center() {
        // periods 5: window [r-4, r] nominates r-2
        let values = [0.0, 1.0, 2.0, 5.0, 2.0, 1.0, 0.0];
        assert_eq!(unique_centered_maxima(&values, 5), vec![3]);
        assert_eq!(unique_centered_maxima(&values, 3), vec![3]);
    }

    #[test]
    fn test_two_sample_window_ignores_rising_slope() {
        let ramp: Vec<f64> = (0..10).map(f64::from).collect();
        assert!(unique_centered_maxima(&ramp, 2).is_empty());
        assert!(unique_centered_maxima(&ramp, 3).is_empty());

        let values = [0.0, 1.0, 2.0, 5.0, 2.0, 1.0, 0.0];
        assert_eq!(unique_centered_maxima(&values, 2), vec![3]);
    }

    #[test]
    fn test_plateau_is_suppressed() {
        let values = [0.0, 1.0, 5.0, 5.0, 1.0, 0.0, -1.0];
        assert!(unique_centered_maxima(&values, 4).is_empty());
    }

    #[test]
    fn test_window_with_missing_sample_is_skipped() {
        let values = [0.0, 1.0, f64::NAN, 5.0, 2.0, 1.0, 0.0];
        // Every window containing row 3 at its centre also holds row 2
        assert!(unique_centered_maxima(&values, 4).is_empty());
    }

    #[test]
    fn test_short_window_yields_nothing() {
        let ts = TimeSeries::single_regular("x", t0(), Interval::hours(1), vec![0.0, 3.0, 0.0]);
        let extractor = ExtremaExtractor::new(TimeDelta::minutes(30));
        assert!(extractor.highs(&ts).unwrap().is_empty());
    }

    #[test]
    fn test_series_shorter_than_window_is_empty() {
        let ts = TimeSeries::single_regular("x", t0(), Interval::hours(1), vec![0.0, 3.0, 0.0]);
        let highs = ExtremaExtractor::default().highs(&ts).unwrap();
        assert!(highs.is_empty());
        assert_eq!(highs.column_names(), ["max"]);
    }

    #[test]
    fn test_irregular_input_rejected() {
        let points = [(t0(), 1.0), (t0() + TimeDelta::hours(1), 2.0)];
        let ts = TimeSeries::from_points("x", points).unwrap();
        assert!(matches!(
            ExtremaExtractor::default().highs(&ts),
            Err(SeriesError::NotRegular)
        ));
    }

    #[test]
    fn test_lows_mirror_highs() {
        let values: Vec<f64> = [0.0, -1.0, -2.0, -5.0, -2.0, -1.0, 0.0].to_vec();
        let ts = TimeSeries::single_regular("x", t0(), Interval::hours(1), values);
        let lows = ExtremaExtractor::new(TimeDelta::hours(4)).lows(&ts).unwrap();
        assert_eq!(lows.points().unwrap(), vec![(t0() + TimeDelta::hours(3), -5.0)]);
        assert_eq!(lows.column_names(), ["min"]);
    }

    #[test]
    fn test_zero_crossings_of_parabola() {
        // Vertex at 3.5 samples of 1 minute
        let values: Vec<f64> = (0..8).map(|i| -((i as f64 - 3.5).powi(2))).collect();
        let ts = TimeSeries::single_regular("x", t0(), Interval::minutes(1), values);
        let zc = zero_crossings(&ts, TimeDelta::seconds(1)).unwrap();
        assert_eq!(zc.len(), 1);
        assert_eq!(zc[0].kind, ExtremumKind::High);
        assert_eq!(zc[0].time, t0() + TimeDelta::seconds(210));
    }

    #[test]
    fn test_round_time_ties_to_even() {
        let t = t0() + TimeDelta::seconds(90);
        assert_eq!(round_time(t, 60_000), t0() + TimeDelta::minutes(2));
        let t = t0() + TimeDelta::seconds(150);
        assert_eq!(round_time(t, 60_000), t0() + TimeDelta::minutes(2));
        let t = t0() + TimeDelta::seconds(29);
        assert_eq!(round_time(t, 60_000), t0());
    }
}
