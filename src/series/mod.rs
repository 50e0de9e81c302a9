//! Time-indexed series with named value columns.
//!
//! A series is either *regular* (start time plus a fixed or calendar
//! interval) or *irregular* (explicit, strictly increasing timestamps).
//! Missing values are `NaN`; a missing value is never the same as zero.
//!
//! # Example
//!
//! ```ignore
//! use hydro_tidal::series::{Interval, TimeSeries};
//!
//! let stage = TimeSeries::single_regular("RSAC054", start, Interval::minutes(15), values);
//! assert!(stage.is_regular());
//! let highs = TimeSeries::from_points("max", peaks)?;
//! ```

mod interval;
mod window;

pub use interval::Interval;
pub use window::{TimeWindow, parse_timestamp};

use std::ops::Range;

use chrono::{NaiveDateTime, TimeDelta};
use thiserror::Error;

/// Error type for series construction and time parsing.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// Timestamps are not strictly increasing
    #[error("Non-monotonic timestamp at row {row}")]
    NonMonotonic { row: usize },

    /// A column does not match the index length
    #[error("Column '{name}' has {actual} values but the index has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Wrong number of value columns for the operation
    #[error("Expected {expected} column(s), found {found}")]
    ColumnCount { expected: usize, found: usize },

    /// Operation needs a regular, fixed-interval series
    #[error("Operation requires a regular series with a fixed interval")]
    NotRegular,

    /// Timestamp text could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Interval string uses an unknown unit
    #[error("Unsupported interval unit: {0}")]
    UnsupportedIntervalUnit(String),

    /// Window end precedes its start
    #[error("Window end {end} is before start {start}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Window text is not `<start> - <end>`
    #[error("Malformed time window: {0}")]
    MalformedWindow(String),
}

/// Row index of a series.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeIndex {
    /// `len` rows starting at `start`, spaced by `interval`
    Regular {
        start: NaiveDateTime,
        interval: Interval,
        len: usize,
    },
    /// Explicit, strictly increasing timestamps
    Irregular(Vec<NaiveDateTime>),
}

impl TimeIndex {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Regular { len, .. } => *len,
            Self::Irregular(times) => times.len(),
        }
    }

    /// Check if the index has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of row `i`.
    pub fn get(&self, i: usize) -> Option<NaiveDateTime> {
        if i >= self.len() {
            return None;
        }
        match self {
            Self::Regular {
                start, interval, ..
            } => interval.advance(*start, i as i64),
            Self::Irregular(times) => Some(times[i]),
        }
    }

    /// All timestamps.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        match self {
            Self::Regular {
                start,
                interval,
                len,
            } => (0..*len)
                .map_while(|i| interval.advance(*start, i as i64))
                .collect(),
            Self::Irregular(times) => times.clone(),
        }
    }

    /// Interval of a regular index.
    pub fn interval(&self) -> Option<Interval> {
        match self {
            Self::Regular { interval, .. } => Some(*interval),
            Self::Irregular(_) => None,
        }
    }

    /// Row whose timestamp equals `t`.
    pub fn position(&self, t: NaiveDateTime) -> Option<usize> {
        match self {
            Self::Regular {
                start,
                interval,
                len,
            } => {
                let i = interval.steps_between(*start, t);
                let i = usize::try_from(i).ok().filter(|i| i < len)?;
                (interval.advance(*start, i as i64) == Some(t)).then_some(i)
            }
            Self::Irregular(times) => times.binary_search(&t).ok(),
        }
    }

    /// Rows with `lo <= t <= hi`.
    pub fn rows_between(&self, lo: NaiveDateTime, hi: NaiveDateTime) -> Range<usize> {
        if hi < lo {
            return 0..0;
        }
        match self {
            Self::Regular {
                start,
                interval,
                len,
            } => {
                let first = match interval.steps_between(*start, lo) {
                    s if s < 0 => 0,
                    s => {
                        let s = s as usize;
                        if interval.advance(*start, s as i64) == Some(lo) {
                            s
                        } else {
                            s + 1
                        }
                    }
                };
                let last = interval.steps_between(*start, hi);
                if last < 0 {
                    return 0..0;
                }
                let end = (last as usize + 1).min(*len);
                first.min(end)..end
            }
            Self::Irregular(times) => {
                let first = times.partition_point(|t| *t < lo);
                let end = times.partition_point(|t| *t <= hi);
                first..end.max(first)
            }
        }
    }
}

/// A named column of values.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Column name (location id, `"<id>-<location>"`, `"max"`, ...)
    pub name: String,
    /// Values, `NaN` where missing
    pub values: Vec<f64>,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Time series with one or more named value columns.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    index: TimeIndex,
    columns: Vec<Column>,
}

impl TimeSeries {
    /// Create a regular series.
    ///
    /// # Errors
    /// `LengthMismatch` if the columns differ in length.
    pub fn regular(
        start: NaiveDateTime,
        interval: Interval,
        columns: Vec<Column>,
    ) -> Result<Self, SeriesError> {
        let len = columns.first().map_or(0, |c| c.values.len());
        let index = TimeIndex::Regular {
            start,
            interval,
            len,
        };
        Self::with_index(index, columns)
    }

    /// Create an irregular series.
    ///
    /// # Errors
    /// - `NonMonotonic` if timestamps are not strictly increasing
    /// - `LengthMismatch` if a column does not match the timestamps
    pub fn irregular(
        times: Vec<NaiveDateTime>,
        columns: Vec<Column>,
    ) -> Result<Self, SeriesError> {
        if let Some(row) = (1..times.len()).find(|&i| times[i] <= times[i - 1]) {
            return Err(SeriesError::NonMonotonic { row });
        }
        Self::with_index(TimeIndex::Irregular(times), columns)
    }

    /// Create a series over an existing index.
    ///
    /// # Errors
    /// `LengthMismatch` if a column does not match the index.
    pub fn from_index(index: TimeIndex, columns: Vec<Column>) -> Result<Self, SeriesError> {
        Self::with_index(index, columns)
    }

    /// Same index, new columns.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self, SeriesError> {
        Self::with_index(self.index.clone(), columns)
    }

    fn with_index(index: TimeIndex, columns: Vec<Column>) -> Result<Self, SeriesError> {
        let expected = index.len();
        if let Some(bad) = columns.iter().find(|c| c.values.len() != expected) {
            return Err(SeriesError::LengthMismatch {
                name: bad.name.clone(),
                expected,
                actual: bad.values.len(),
            });
        }
        Ok(Self { index, columns })
    }

    /// Single-column regular series.
    pub fn single_regular(
        name: impl Into<String>,
        start: NaiveDateTime,
        interval: Interval,
        values: Vec<f64>,
    ) -> Self {
        let len = values.len();
        Self {
            index: TimeIndex::Regular {
                start,
                interval,
                len,
            },
            columns: vec![Column::new(name, values)],
        }
    }

    /// Single-column irregular series from `(time, value)` points.
    ///
    /// # Errors
    /// `NonMonotonic` if the points are not in strictly increasing time order.
    pub fn from_points(
        name: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDateTime, f64)>,
    ) -> Result<Self, SeriesError> {
        let (times, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        Self::irregular(times, vec![Column::new(name, values)])
    }

    /// Empty single-column irregular series.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            index: TimeIndex::Irregular(Vec::new()),
            columns: vec![Column::new(name, Vec::new())],
        }
    }

    /// Row index.
    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of value columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// All columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if the index is regular.
    pub fn is_regular(&self) -> bool {
        matches!(self.index, TimeIndex::Regular { .. })
    }

    /// Sampling interval of a regular series.
    pub fn interval(&self) -> Option<Interval> {
        self.index.interval()
    }

    /// Fixed sampling interval, `None` for irregular or calendar series.
    pub fn fixed_interval(&self) -> Option<TimeDelta> {
        self.interval().and_then(|iv| iv.as_fixed())
    }

    /// All timestamps.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.index.timestamps()
    }

    /// Timestamp of row `i`.
    pub fn time_at(&self, i: usize) -> Option<NaiveDateTime> {
        self.index.get(i)
    }

    /// The only column of a single-column series.
    ///
    /// # Errors
    /// `ColumnCount` if the series has more (or fewer) than one column.
    pub fn single_column(&self) -> Result<&Column, SeriesError> {
        match self.columns.as_slice() {
            [only] => Ok(only),
            other => Err(SeriesError::ColumnCount {
                expected: 1,
                found: other.len(),
            }),
        }
    }

    /// Values of a single-column series.
    pub fn values(&self) -> Result<&[f64], SeriesError> {
        self.single_column().map(|c| c.values.as_slice())
    }

    /// `(time, value)` rows of a single-column series, missing values included.
    pub fn points(&self) -> Result<Vec<(NaiveDateTime, f64)>, SeriesError> {
        let values = self.values()?;
        Ok(self.timestamps().into_iter().zip(values.iter().copied()).collect())
    }

    /// `(time, value)` rows of a single-column series with missing values skipped.
    pub fn valid_points(&self) -> Result<Vec<(NaiveDateTime, f64)>, SeriesError> {
        Ok(self
            .points()?
            .into_iter()
            .filter(|(_, v)| !v.is_nan())
            .collect())
    }

    /// Value of the first column at exactly `t`.
    pub fn value_at(&self, t: NaiveDateTime) -> Option<f64> {
        let row = self.index.position(t)?;
        self.columns.first().map(|c| c.values[row])
    }

    /// Apply `f` to every value, keeping the index.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values.iter().map(|&v| f(v)).collect()))
                .collect(),
        }
    }

    /// Rename the only column.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        if let [only] = self.columns.as_mut_slice() {
            only.name = name.into();
        }
        self
    }

    /// Rows with `lo <= t <= hi`, as an irregular series.
    pub fn between(&self, lo: NaiveDateTime, hi: NaiveDateTime) -> Self {
        let rows = self.index.rows_between(lo, hi);
        let times = rows.clone().filter_map(|i| self.index.get(i)).collect();
        Self {
            index: TimeIndex::Irregular(times),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[rows.clone()].to_vec()))
                .collect(),
        }
    }

    /// Drop rows where every column is missing; the result is irregular.
    pub fn dropna(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.columns.iter().any(|c| !c.values[i].is_nan()))
            .collect();
        let times = keep.iter().filter_map(|&i| self.index.get(i)).collect();
        Self {
            index: TimeIndex::Irregular(times),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), keep.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    /// Time of the first row with any non-missing value.
    pub fn first_valid_time(&self) -> Option<NaiveDateTime> {
        (0..self.len())
            .find(|&i| self.columns.iter().any(|c| !c.values[i].is_nan()))
            .and_then(|i| self.index.get(i))
    }

    /// Time of the last row with any non-missing value.
    pub fn last_valid_time(&self) -> Option<NaiveDateTime> {
        (0..self.len())
            .rev()
            .find(|&i| self.columns.iter().any(|c| !c.values[i].is_nan()))
            .and_then(|i| self.index.get(i))
    }
}
