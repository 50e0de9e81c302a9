//! Time-windowed reads of model output tables.
//!
//! Rows are selected by time window, columns by object id and (for 3-D
//! tables) location within the object. The result is a regular series
//! whose first timestamp is the calendar time of the first selected row.
//!
//! # Example
//!
//! ```ignore
//! use hydro_tidal::io::{Selector, TimeIndexedTableReader};
//! use hydro_tidal::series::TimeWindow;
//!
//! let reader = TimeIndexedTableReader::new(&store);
//! let window = TimeWindow::parse("02JAN1930 - 03JAN1930")?;
//! let stage = reader.read(
//!     "/hydro/data/channel stage",
//!     Some(&window),
//!     &Selector::labeled([(0, "441")]),
//!     Some(&Selector::labeled([(0, "upstream")])),
//! )?;
//! assert_eq!(stage.column_names(), ["441-upstream"]);
//! ```

use std::ops::Range;

use tracing::debug;

use super::TableError;
use super::store::TableSource;
use super::table::{CalendarMetadata, Table};
use crate::series::{Column, TimeSeries, TimeWindow};

/// Selection of indices along an id or location dimension, each with the
/// label used to name output columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selector {
    /// Every index, labelled by its position
    #[default]
    All,
    /// Explicit `(index, label)` pairs, in output order
    Items(Vec<(usize, String)>),
}

impl Selector {
    /// Select indices, labelled by position.
    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::Items(indices.into_iter().map(|i| (i, i.to_string())).collect())
    }

    /// Select indices with explicit labels.
    pub fn labeled<L: Into<String>>(items: impl IntoIterator<Item = (usize, L)>) -> Self {
        Self::Items(items.into_iter().map(|(i, l)| (i, l.into())).collect())
    }

    /// Resolve against a dimension of length `len`.
    fn resolve(&self, dim: usize, len: usize) -> Result<Vec<(usize, String)>, TableError> {
        match self {
            Self::All => Ok((0..len).map(|i| (i, i.to_string())).collect()),
            Self::Items(items) => {
                if let Some((index, _)) = items.iter().find(|(i, _)| *i >= len) {
                    return Err(TableError::IndexOutOfBounds {
                        index: *index,
                        dim,
                        len,
                    });
                }
                Ok(items.clone())
            }
        }
    }

    fn first_label(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Items(items) => items.first().map(|(_, l)| l.as_str()),
        }
    }
}

/// Row range `[start, end)` of a table covered by `window`.
///
/// The window is clamped to the table's coverage
/// `[start_time, start_time + interval * length]`; each end maps to the
/// row at or before it.
///
/// # Errors
/// `InvalidWindow` if the window ends before it starts.
pub fn table_slice(
    window: &TimeWindow,
    calendar: &CalendarMetadata,
) -> Result<Range<usize>, TableError> {
    if window.end < window.start {
        return Err(TableError::InvalidWindow {
            start: window.start,
            end: window.end,
        });
    }
    let table_start = calendar.start_time;
    let table_end = calendar.end_time().unwrap_or(window.end);

    let start = window.start.max(table_start);
    let end = window.end.min(table_end);
    let interval = calendar.interval;

    let end_index = interval.steps_between(table_start, end);
    if end_index <= 0 {
        return Ok(0..0);
    }
    let end_index = (end_index as usize).min(calendar.length);
    let start_index = (interval.steps_between(table_start, start).max(0) as usize).min(end_index);
    Ok(start_index..end_index)
}

/// Read a time-indexed table into a regular series.
///
/// Column names are `"<id>"`, or `"<id>-<location>"` for every id and
/// location pair when a location selector is given.
///
/// # Errors
/// - `ShapeMismatch` if a location selector is given for a table without a
///   location dimension, or omitted for a table with one
/// - `IndexOutOfBounds` if a selector refers past a dimension
/// - calendar errors from [`CalendarMetadata::from_table`]
pub fn read_time_indexed_table(
    table: &Table,
    window: Option<&TimeWindow>,
    ids: &Selector,
    location: Option<&Selector>,
) -> Result<TimeSeries, TableError> {
    let calendar = CalendarMetadata::from_table(table)?;
    let rows = match window {
        Some(w) => table_slice(w, &calendar)?,
        None => 0..table.n_rows(),
    };

    let targets: Vec<(String, usize, usize)> = match (table.shape(), location) {
        ([_], None) => vec![(ids.first_label().unwrap_or("0").to_string(), 0, 0)],
        ([_, n], None) => ids
            .resolve(1, *n)?
            .into_iter()
            .map(|(i, label)| (label, i, 0))
            .collect(),
        ([_, n, m], Some(loc)) => {
            let ids = ids.resolve(1, *n)?;
            let locs = loc.resolve(2, *m)?;
            ids.iter()
                .flat_map(|(i, id)| {
                    locs.iter()
                        .map(move |(k, l)| (format!("{id}-{l}"), *i, *k))
                })
                .collect()
        }
        (shape, Some(_)) => {
            return Err(TableError::ShapeMismatch(format!(
                "{}: location selector given for a table of shape {shape:?}",
                table.path()
            )));
        }
        (shape, None) => {
            return Err(TableError::ShapeMismatch(format!(
                "{}: table of shape {shape:?} needs a location selector",
                table.path()
            )));
        }
    };

    let columns: Vec<Column> = targets
        .into_iter()
        .map(|(name, id, loc)| {
            let values = rows
                .clone()
                .map(|row| table.value(row, id, loc).unwrap_or(f64::NAN))
                .collect();
            Column::new(name, values)
        })
        .collect();

    let start = calendar
        .time_at(rows.start)
        .ok_or(TableError::IndexOutOfBounds {
            index: rows.start,
            dim: 0,
            len: calendar.length,
        })?;
    debug!(
        table = table.path(),
        start = rows.start,
        end = rows.end,
        columns = columns.len(),
        "read time-indexed table"
    );
    Ok(TimeSeries::regular(start, calendar.interval, columns)?)
}

/// Reads time-indexed tables from a borrowed store.
pub struct TimeIndexedTableReader<'a, S: TableSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: TableSource + ?Sized> TimeIndexedTableReader<'a, S> {
    /// Create a reader over `source`.
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Load the table at `path` and read it.
    ///
    /// See [`read_time_indexed_table`].
    pub fn read(
        &self,
        path: &str,
        window: Option<&TimeWindow>,
        ids: &Selector,
        location: Option<&Selector>,
    ) -> Result<TimeSeries, TableError> {
        let table = self.source.load(path)?;
        read_time_indexed_table(&table, window, ids, location)
    }

    /// Calendar of the table at `path`.
    pub fn calendar(&self, path: &str) -> Result<CalendarMetadata, TableError> {
        CalendarMetadata::from_table(&self.source.load(path)?)
    }
}
