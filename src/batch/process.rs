//! Per-location post-processing: gap fill-in, record merging, and the
//! Godin/tidal products of one record and their differences between studies.

use chrono::NaiveDateTime;
use tracing::debug;

use super::ProcessError;
use crate::analysis::{AmplitudePhaseAnalyzer, TidalHLConfig, tidal_highs_lows};
use crate::filter::{GodinFilter, Interpolation};
use crate::series::{Column, SeriesError, TimeIndex, TimeSeries};

/// Default longest run of missing samples filled by [`fill_in`].
pub const DEFAULT_MAX_FILL_GAP: usize = 3;

/// Interpolate across missing runs, filling at most `max_gap` samples of
/// each run.
///
/// Only samples between two valid values are touched; longer runs keep
/// their tail missing, and leading or trailing runs stay missing.
///
/// # Errors
/// `InvalidFillGap` if `max_gap` is zero.
pub fn fill_in(
    series: &TimeSeries,
    max_gap: usize,
    method: Interpolation,
) -> Result<TimeSeries, ProcessError> {
    if max_gap == 0 {
        return Err(ProcessError::InvalidFillGap(max_gap));
    }
    let times = series.timestamps();
    let Some(&origin) = times.first() else {
        return Ok(series.clone());
    };
    let xs: Vec<f64> = times
        .iter()
        .map(|t| (*t - origin).num_milliseconds() as f64)
        .collect();

    let mut filled = 0;
    let columns = series
        .columns()
        .iter()
        .map(|c| {
            let (values, n) = fill_column(&xs, &c.values, max_gap, method);
            filled += n;
            Column::new(c.name.clone(), values)
        })
        .collect();
    debug!(filled, max_gap, "filled short gaps");
    Ok(series.with_columns(columns)?)
}

fn fill_column(
    xs: &[f64],
    values: &[f64],
    max_gap: usize,
    method: Interpolation,
) -> (Vec<f64>, usize) {
    let knots: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    let targets: Vec<usize> = knots
        .windows(2)
        .flat_map(|w| (w[0] + 1..w[1]).take(max_gap))
        .collect();
    let mut out = values.to_vec();
    if targets.is_empty() {
        return (out, 0);
    }

    let kx: Vec<f64> = knots.iter().map(|&i| xs[i]).collect();
    let ky: Vec<f64> = knots.iter().map(|&i| values[i]).collect();
    let at: Vec<f64> = targets.iter().map(|&i| xs[i]).collect();
    let n = targets.len();
    for (i, v) in targets.into_iter().zip(method.evaluate(&kx, &ky, &at)) {
        out[i] = v;
    }
    (out, n)
}

/// Combine several records of the same quantity, earlier records taking
/// precedence wherever they have a value.
///
/// Column names come from the first record. The result is regular when
/// every record shares one interval and all timestamps fall on a common
/// grid; otherwise it is indexed by the union of timestamps.
///
/// # Errors
/// - `NoRecords` if `records` is empty
/// - `ColumnCount` if the records differ in column count
pub fn merge(records: &[TimeSeries]) -> Result<TimeSeries, ProcessError> {
    let (first, rest) = records.split_first().ok_or(ProcessError::NoRecords)?;
    let width = first.n_columns();
    if let Some(other) = rest.iter().find(|r| r.n_columns() != width) {
        return Err(SeriesError::ColumnCount {
            expected: width,
            found: other.n_columns(),
        }
        .into());
    }

    let index = merged_index(records);
    let times = index.timestamps();
    let columns = first
        .columns()
        .iter()
        .enumerate()
        .map(|(j, column)| {
            let values = times.iter().map(|&t| first_value(records, j, t)).collect();
            Column::new(column.name.clone(), values)
        })
        .collect();
    debug!(records = records.len(), rows = times.len(), "merged records");
    Ok(TimeSeries::from_index(index, columns)?)
}

fn first_value(records: &[TimeSeries], column: usize, t: NaiveDateTime) -> f64 {
    records
        .iter()
        .find_map(|r| {
            let row = r.index().position(t)?;
            Some(r.columns()[column].values[row]).filter(|v| !v.is_nan())
        })
        .unwrap_or(f64::NAN)
}

fn merged_index(records: &[TimeSeries]) -> TimeIndex {
    let mut times: Vec<NaiveDateTime> = records.iter().flat_map(|r| r.timestamps()).collect();
    times.sort_unstable();
    times.dedup();

    let interval = records.first().and_then(|r| r.interval());
    if let (Some(interval), Some(&start), Some(&end)) = (interval, times.first(), times.last()) {
        let shared = records.iter().all(|r| r.interval() == Some(interval));
        let on_grid = times
            .iter()
            .all(|&t| interval.advance(start, interval.steps_between(start, t)) == Some(t));
        let len = usize::try_from(interval.steps_between(start, end)).map(|n| n + 1);
        if let (true, true, Ok(len)) = (shared, on_grid, len) {
            return TimeIndex::Regular {
                start,
                interval,
                len,
            };
        }
    }
    TimeIndex::Irregular(times)
}

/// Processing steps applied to one location's record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PostProcessor {
    /// Longest filled run and the interpolation used, if filling
    pub fill: Option<(usize, Interpolation)>,
    /// Factor applied to every value, if scaling
    pub scale: Option<f64>,
    /// Tidal high/low extraction settings
    pub tidal_hl: TidalHLConfig,
}

impl PostProcessor {
    /// Processor with no fill-in or scaling and default extraction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill runs of at most `max_gap` missing samples before processing.
    pub fn with_fill_in(mut self, max_gap: usize, method: Interpolation) -> Self {
        self.fill = Some((max_gap, method));
        self
    }

    /// Multiply the record by `scale` before processing.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the tidal high/low extraction settings.
    pub fn with_tidal_hl(mut self, config: TidalHLConfig) -> Self {
        self.tidal_hl = config;
        self
    }

    /// Fill, scale, then compute the Godin-filtered record, the tidal highs
    /// and lows, and the tidal amplitude.
    ///
    /// # Errors
    /// - `InvalidFillGap` for a zero fill-in gap
    /// - `Filter` if the record is not a regular single-column series
    pub fn process(&self, series: &TimeSeries) -> Result<LocationResult, ProcessError> {
        let mut series = match self.fill {
            Some((max_gap, method)) => fill_in(series, max_gap, method)?,
            None => series.clone(),
        };
        if let Some(scale) = self.scale {
            series = series.map_values(|v| v * scale);
        }

        let godin = GodinFilter.apply(&series)?;
        let hl = tidal_highs_lows(&series, &self.tidal_hl)?;
        let amplitude = hl.amplitude()?;
        Ok(LocationResult {
            series,
            godin,
            highs: hl.highs,
            lows: hl.lows,
            amplitude,
        })
    }
}

/// Products of one processed record.
#[derive(Clone, Debug)]
pub struct LocationResult {
    /// Record after fill-in and scaling
    pub series: TimeSeries,
    /// Godin tidally filtered record
    pub godin: TimeSeries,
    /// Tidal highs, column `"max"`
    pub highs: TimeSeries,
    /// Tidal lows, column `"min"`
    pub lows: TimeSeries,
    /// Tidal range stamped at each low
    pub amplitude: TimeSeries,
}

impl LocationResult {
    /// Amplitude and phase of this record relative to `reference`.
    pub fn diff(&self, reference: &LocationResult) -> Result<LocationDiff, SeriesError> {
        let analyzer = AmplitudePhaseAnalyzer::default();
        let (amp, amp_ref) = (&self.amplitude, &reference.amplitude);
        Ok(LocationDiff {
            amplitude_diff: analyzer.amplitude_diff(amp, amp_ref, false)?,
            amplitude_diff_percent: analyzer.amplitude_diff(amp, amp_ref, true)?,
            phase_diff: analyzer.phase_diff(
                &self.highs,
                &self.lows,
                &reference.highs,
                &reference.lows,
            )?,
        })
    }
}

/// Differences of one record against a reference record.
#[derive(Clone, Debug)]
pub struct LocationDiff {
    /// `amp − amp_ref`
    pub amplitude_diff: TimeSeries,
    /// `100·(amp − amp_ref)/amp_ref`
    pub amplitude_diff_percent: TimeSeries,
    /// Minutes this record lags the reference
    pub phase_diff: TimeSeries,
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
    fn test_fill_column_limits_each_run() {
        let xs: Vec<f64> = (0..8).map(f64::from).collect();
        let values = [0.0, f64::NAN, f64::NAN, f64::NAN, 4.0, f64::NAN, 6.0, f64::NAN];
        let (out, n) = fill_column(&xs, &values, 2, Interpolation::Linear);
        assert_eq!(n, 3);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[2], 2.0);
        assert!(out[3].is_nan());
        assert_eq!(out[5], 5.0);
        assert!(out[7].is_nan());
    }

    #[test]
    fn test_merge_of_one_record_is_identity() {
        let s = TimeSeries::single_regular("x", t0(), Interval::hours(1), vec![1.0, f64::NAN]);
        let merged = merge(std::slice::from_ref(&s)).unwrap();
        assert_eq!(merged.interval(), Some(Interval::hours(1)));
        assert_eq!(merged.len(), 2);
        assert!(merged.values().unwrap()[1].is_nan());
    }

    #[test]
    fn test_merge_nothing_is_an_error() {
        assert!(matches!(merge(&[]), Err(ProcessError::NoRecords)));
    }
}
