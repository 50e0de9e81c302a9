//! Tidal amplitude and phase from extrema series.
//!
//! Amplitudes pair each low with the high before it and are stamped at
//! the low. Comparisons between two records match events within a
//! tolerance (±4h by default); an event with no match gives `NaN`, never
//! an error.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::trace;

use crate::series::{SeriesError, TimeSeries};

/// Default half-width of the matching window.
pub const DEFAULT_TOLERANCE: TimeDelta = TimeDelta::hours(4);

/// A pair of extrema from two records matched in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchedExtremum {
    /// Time in the first record
    pub time1: NaiveDateTime,
    /// Value in the first record
    pub value1: f64,
    /// Time in the second record
    pub time2: NaiveDateTime,
    /// Value in the second record
    pub value2: f64,
}

impl MatchedExtremum {
    /// `value1 − value2`.
    pub fn amplitude_diff(&self) -> f64 {
        self.value1 - self.value2
    }

    /// `time2 − time1` in minutes.
    pub fn phase_diff_minutes(&self) -> f64 {
        (self.time2 - self.time1).num_milliseconds() as f64 / 60_000.0
    }
}

/// Amplitude and phase comparisons between extrema series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmplitudePhaseAnalyzer {
    /// Events further apart than this never match
    pub tolerance: TimeDelta,
}

impl Default for AmplitudePhaseAnalyzer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl AmplitudePhaseAnalyzer {
    /// Analyzer with the given matching tolerance.
    pub fn new(tolerance: TimeDelta) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    /// Tidal range at each low: the most recent high at or before it minus
    /// the low, column `"amplitude"`. Lows with no earlier high are dropped.
    pub fn amplitude(
        &self,
        highs: &TimeSeries,
        lows: &TimeSeries,
    ) -> Result<TimeSeries, SeriesError> {
        let highs = highs.valid_points()?;
        let lows = lows.valid_points()?;
        let points = lows.into_iter().filter_map(|(t, low)| {
            let k = highs.partition_point(|(th, _)| *th <= t);
            (k > 0).then(|| (t, highs[k - 1].1 - low))
        });
        TimeSeries::from_points("amplitude", points)
    }

    /// Difference of two amplitude series at the union of their times.
    ///
    /// At each time `t` the first value of each series inside
    /// `[t − tolerance, t + tolerance]` is taken and `amp1 − amp2` (or
    /// `100·(amp1 − amp2)/amp2` with `percent`) reported; `NaN` if either
    /// series has nothing in the window or the percentage is undefined.
    pub fn amplitude_diff(
        &self,
        amp1: &TimeSeries,
        amp2: &TimeSeries,
        percent: bool,
    ) -> Result<TimeSeries, SeriesError> {
        let a1 = amp1.valid_points()?;
        let a2 = amp2.valid_points()?;
        let union = union_times(&a1, &a2);

        let points = union.into_iter().map(|t| {
            let (lo, hi) = (t - self.tolerance, t + self.tolerance);
            let diff = match (first_within(&a1, lo, hi), first_within(&a2, lo, hi)) {
                (Some(v1), Some(v2)) if percent => {
                    let pct = 100.0 * (v1.1 - v2.1) / v2.1;
                    if pct.is_finite() { pct } else { f64::NAN }
                }
                (Some(v1), Some(v2)) => v1.1 - v2.1,
                _ => f64::NAN,
            };
            (t, diff)
        });
        TimeSeries::from_points("amplitude_diff", points)
    }

    /// Phase difference in minutes of record 2 relative to record 1.
    ///
    /// For each high `t` of `highs1`, the first high of `highs2` within the
    /// tolerance gives `t2 − t`; lows likewise. The two are merged on the
    /// union of times, preferring the high-based value.
    ///
    /// Offsets are measured from `t` itself, not from the first record-1
    /// event in `[t − tolerance, t + tolerance]`; the two readings differ
    /// only when record-1 events of one kind lie within the tolerance of
    /// each other.
    pub fn phase_diff(
        &self,
        highs2: &TimeSeries,
        lows2: &TimeSeries,
        highs1: &TimeSeries,
        lows1: &TimeSeries,
    ) -> Result<TimeSeries, SeriesError> {
        let high = self.time_offsets(&highs2.valid_points()?, &highs1.valid_points()?);
        let low = self.time_offsets(&lows2.valid_points()?, &lows1.valid_points()?);
        let union = union_times(&high, &low);

        let lookup = |series: &[(NaiveDateTime, f64)], t: NaiveDateTime| {
            series
                .binary_search_by_key(&t, |(ts, _)| *ts)
                .ok()
                .map(|i| series[i].1)
                .filter(|v| !v.is_nan())
        };
        let points = union.into_iter().map(|t| {
            let v = lookup(&high, t).or_else(|| lookup(&low, t)).unwrap_or(f64::NAN);
            (t, v)
        });
        TimeSeries::from_points("phase_diff", points)
    }

    /// Pair every valid point of `series1` with the nearest point of
    /// `series2` no more than the tolerance away. Equidistant candidates
    /// resolve to the earlier one.
    pub fn match_nearest(
        &self,
        series1: &TimeSeries,
        series2: &TimeSeries,
    ) -> Result<Vec<MatchedExtremum>, SeriesError> {
        let p1 = series1.valid_points()?;
        let p2 = series2.valid_points()?;
        let matches: Vec<MatchedExtremum> = p1
            .into_iter()
            .filter_map(|(t1, v1)| {
                let k = p2.partition_point(|(t, _)| *t < t1);
                let before = k.checked_sub(1).map(|i| p2[i]);
                let after = p2.get(k).copied();
                let nearest = match (before, after) {
                    (Some(b), Some(a)) if (a.0 - t1) < (t1 - b.0) => Some(a),
                    (Some(b), _) => Some(b),
                    (None, a) => a,
                };
                nearest
                    .filter(|(t2, _)| (*t2 - t1).abs() <= self.tolerance)
                    .map(|(t2, v2)| MatchedExtremum {
                        time1: t1,
                        value1: v1,
                        time2: t2,
                        value2: v2,
                    })
            })
            .collect();
        trace!(matched = matches.len(), "nearest-neighbour matching");
        Ok(matches)
    }

    fn time_offsets(
        &self,
        reference: &[(NaiveDateTime, f64)],
        events: &[(NaiveDateTime, f64)],
    ) -> Vec<(NaiveDateTime, f64)> {
        events
            .iter()
            .map(|(t, _)| {
                let offset = first_within(reference, *t - self.tolerance, *t + self.tolerance)
                    .map(|(t2, _)| (t2 - *t).num_milliseconds() as f64 / 60_000.0)
                    .unwrap_or(f64::NAN);
                (*t, offset)
            })
            .collect()
    }
}

/// Tidal range at each low; see [`AmplitudePhaseAnalyzer::amplitude`].
pub fn amplitude(highs: &TimeSeries, lows: &TimeSeries) -> Result<TimeSeries, SeriesError> {
    AmplitudePhaseAnalyzer::default().amplitude(highs, lows)
}

/// Amplitude differences within ±4h; see [`AmplitudePhaseAnalyzer::amplitude_diff`].
pub fn amplitude_diff(
    amp1: &TimeSeries,
    amp2: &TimeSeries,
    percent: bool,
) -> Result<TimeSeries, SeriesError> {
    AmplitudePhaseAnalyzer::default().amplitude_diff(amp1, amp2, percent)
}

/// Phase differences within ±4h, measured from each record-1 event time;
/// see [`AmplitudePhaseAnalyzer::phase_diff`].
pub fn phase_diff(
    highs2: &TimeSeries,
    lows2: &TimeSeries,
    highs1: &TimeSeries,
    lows1: &TimeSeries,
) -> Result<TimeSeries, SeriesError> {
    AmplitudePhaseAnalyzer::default().phase_diff(highs2, lows2, highs1, lows1)
}

/// Nearest-neighbour pairing within `tolerance`.
pub fn match_nearest(
    series1: &TimeSeries,
    series2: &TimeSeries,
    tolerance: TimeDelta,
) -> Result<Vec<MatchedExtremum>, SeriesError> {
    AmplitudePhaseAnalyzer::new(tolerance).match_nearest(series1, series2)
}

/// First point with `lo <= t <= hi`.
fn first_within(
    points: &[(NaiveDateTime, f64)],
    lo: NaiveDateTime,
    hi: NaiveDateTime,
) -> Option<(NaiveDateTime, f64)> {
    let k = points.partition_point(|(t, _)| *t < lo);
    points.get(k).copied().filter(|(t, _)| *t <= hi)
}

fn union_times(a: &[(NaiveDateTime, f64)], b: &[(NaiveDateTime, f64)]) -> Vec<NaiveDateTime> {
    let mut times: Vec<NaiveDateTime> = a.iter().chain(b).map(|(t, _)| *t).collect();
    times.sort_unstable();
    times.dedup();
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn h(hours: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
            + TimeDelta::hours(hours)
    }

    fn series(points: &[(i64, f64)]) -> TimeSeries {
        TimeSeries::from_points("x", points.iter().map(|(t, v)| (h(*t), *v))).unwrap()
    }

    #[test]
    fn test_amplitude_stamped_at_low() {
        let highs = series(&[(0, 2.0), (12, 3.0)]);
        let lows = series(&[(6, -1.0), (18, -2.0)]);
        let amp = amplitude(&highs, &lows).unwrap();
        assert_eq!(amp.points().unwrap(), vec![(h(6), 3.0), (h(18), 5.0)]);
    }

    #[test]
    fn test_amplitude_drops_leading_low() {
        let highs = series(&[(6, 2.0)]);
        let lows = series(&[(0, -1.0), (12, -1.0)]);
        let amp = amplitude(&highs, &lows).unwrap();
        assert_eq!(amp.points().unwrap(), vec![(h(12), 3.0)]);
    }

    #[test]
    fn test_amplitude_diff_percent() {
        let a1 = series(&[(6, 3.0)]);
        let a2 = series(&[(7, 2.0)]);
        let diff = amplitude_diff(&a1, &a2, true).unwrap();
        assert_eq!(diff.len(), 2);
        for v in diff.values().unwrap() {
            assert!((v - 50.0).abs() < 1e-12);
        }

        let zero = series(&[(7, 0.0)]);
        let diff = amplitude_diff(&a1, &zero, true).unwrap();
        assert!(diff.values().unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_phase_diff_prefers_highs() {
        let highs1 = series(&[(0, 1.0)]);
        let lows1 = series(&[(0, -1.0), (8, -1.0)]);
        let highs2 = series(&[(1, 1.0)]);
        let lows2 = series(&[(2, -1.0), (9, -1.0)]);
        let pd = phase_diff(&highs2, &lows2, &highs1, &lows1).unwrap();
        // At 0h the high gives +60 and wins over the low's +120
        assert_eq!(pd.points().unwrap(), vec![(h(0), 60.0), (h(8), 60.0)]);
    }

    #[test]
    fn test_match_nearest_within_tolerance() {
        let s1 = series(&[(0, 1.0), (10, 2.0)]);
        let s2 = series(&[(1, 1.5), (20, 2.5)]);
        let m = match_nearest(&s1, &s2, TimeDelta::hours(2)).unwrap();
        assert_eq!(m.len(), 1);
        assert!((m[0].amplitude_diff() + 0.5).abs() < 1e-12);
        assert!((m[0].phase_diff_minutes() - 60.0).abs() < 1e-12);
    }
}
