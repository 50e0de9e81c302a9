//! Table stores and query cursors.
//!
//! Stores are read and written whole-table at a time: [`TableSource::load`]
//! returns an owned copy and [`TableSink::store`] replaces a table
//! wholesale. Nothing mutates a loaded table in place.

use std::collections::BTreeMap;

use glob_match::glob_match;
use tracing::{debug, trace};

use super::TableError;
use super::reader::{Selector, read_time_indexed_table};
use super::table::{CalendarMetadata, Table};
use crate::series::{TimeSeries, TimeWindow};

/// Read access to tables addressed by `/group/.../name` paths.
pub trait TableSource {
    /// Load the table at `path`.
    fn load(&self, path: &str) -> Result<Table, TableError>;

    /// Paths of every table in the store.
    fn table_paths(&self) -> Result<Vec<String>, TableError>;
}

/// Write access to a table store.
pub trait TableSink {
    /// Store `table` under its path, replacing any existing table.
    fn store(&mut self, table: Table) -> Result<(), TableError>;
}

/// Table store held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the store holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableSource for MemoryStore {
    fn load(&self, path: &str) -> Result<Table, TableError> {
        self.tables
            .get(path)
            .cloned()
            .ok_or_else(|| TableError::TableNotFound(path.to_string()))
    }

    fn table_paths(&self) -> Result<Vec<String>, TableError> {
        Ok(self.tables.keys().cloned().collect())
    }
}

impl TableSink for MemoryStore {
    fn store(&mut self, table: Table) -> Result<(), TableError> {
        trace!(path = table.path(), "store table");
        self.tables.insert(table.path().to_string(), table);
        Ok(())
    }
}

/// One table read by a [`TableQuery`].
#[derive(Clone, Debug)]
pub struct SeriesBatch {
    /// Table path
    pub path: String,
    /// Calendar of the source table
    pub calendar: CalendarMetadata,
    /// Every id (and location) of the table over the query window
    pub series: TimeSeries,
}

/// Cursor over the tables of a store whose paths match a glob pattern.
///
/// Holds a borrow of the store until exhausted, closed or dropped.
pub struct TableQuery<'a, S: TableSource + ?Sized> {
    source: Option<&'a S>,
    paths: std::vec::IntoIter<String>,
    window: Option<TimeWindow>,
}

/// Open a query over tables whose path matches `pattern`.
///
/// `*` matches within one path segment and `**` across segments, so
/// `"/hydro/data/*"` selects every hydro output table.
pub fn open_query<'a, S: TableSource + ?Sized>(
    source: &'a S,
    pattern: &str,
    window: Option<TimeWindow>,
) -> Result<TableQuery<'a, S>, TableError> {
    let paths: Vec<String> = source
        .table_paths()?
        .into_iter()
        .filter(|p| glob_match(pattern, p))
        .collect();
    debug!(pattern, matches = paths.len(), "open table query");
    Ok(TableQuery {
        source: Some(source),
        paths: paths.into_iter(),
        window,
    })
}

impl<S: TableSource + ?Sized> TableQuery<'_, S> {
    /// Paths not yet read.
    pub fn remaining(&self) -> usize {
        if self.source.is_some() {
            self.paths.len()
        } else {
            0
        }
    }

    /// Release the store; later calls to `next` yield nothing.
    pub fn close(&mut self) {
        self.source = None;
    }

    fn read(&self, source: &S, path: String) -> Result<SeriesBatch, TableError> {
        let table = source.load(&path)?;
        let calendar = CalendarMetadata::from_table(&table)?;
        let location = (table.shape().len() == 3).then_some(Selector::All);
        let series = read_time_indexed_table(
            &table,
            self.window.as_ref(),
            &Selector::All,
            location.as_ref(),
        )?;
        Ok(SeriesBatch {
            path,
            calendar,
            series,
        })
    }
}

impl<S: TableSource + ?Sized> Iterator for TableQuery<'_, S> {
    type Item = Result<SeriesBatch, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source?;
        let path = self.paths.next()?;
        Some(self.read(source, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Interval;
    use chrono::NaiveDate;

    fn table(path: &str) -> Table {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Table::new(path, vec![4, 2], vec![1.0; 8])
            .unwrap()
            .with_calendar(start, Interval::minutes(15))
    }

    #[test]
    fn test_store_replaces_whole_table() {
        let mut store = MemoryStore::new();
        store.store(table("/hydro/data/channel stage")).unwrap();
        let replacement = Table::new("/hydro/data/channel stage", vec![1], vec![7.0]).unwrap();
        store.store(replacement).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("/hydro/data/channel stage").unwrap().data(), &[7.0]);
        assert!(matches!(
            store.load("/missing"),
            Err(TableError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_query_close_stops_iteration() {
        let mut store = MemoryStore::new();
        store.store(table("/hydro/data/a")).unwrap();
        store.store(table("/hydro/data/b")).unwrap();
        let mut query = open_query(&store, "/hydro/data/*", None).unwrap();
        assert_eq!(query.remaining(), 2);
        assert!(query.next().is_some());
        query.close();
        assert_eq!(query.remaining(), 0);
        assert!(query.next().is_none());
    }
}
