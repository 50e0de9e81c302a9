//! Model output tables: stores, time-windowed reads and exclusive access.
//!
//! This module provides:
//! - **Tables**: dense time-major arrays with calendar attributes
//! - **Stores**: [`TableSource`] / [`TableSink`] with an in-memory store and
//!   a NetCDF-4/HDF5 reader (requires `netcdf` feature)
//! - **Reader**: time-window slicing and column selection into regular series
//! - **Queries**: glob-matched cursors over many tables
//! - **Locking**: lock-file based exclusive access to shared files
//!
//! # Table Layout
//!
//! ```text
//! /hydro/data/channel stage    shape (T, N, 2)   interval="15min"
//!                                                 start_time="1990-01-01 00:00"
//! /hydro/data/reservoir flow   shape (T, N)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hydro_tidal::io::{MemoryStore, Selector, TimeIndexedTableReader, open_query};
//!
//! let reader = TimeIndexedTableReader::new(&store);
//! let flow = reader.read("/hydro/data/reservoir flow", None, &Selector::All, None)?;
//!
//! for batch in open_query(&store, "/hydro/data/*", Some(window))? {
//!     let batch = batch?;
//!     println!("{}: {} columns", batch.path, batch.series.n_columns());
//! }
//! ```

mod lock;
#[cfg(feature = "netcdf")]
mod netcdf_store;
mod reader;
mod store;
mod table;

pub use lock::{ExclusiveAccess, LockError, LockFile, LockGuard};
#[cfg(feature = "netcdf")]
pub use netcdf_store::NetCdfStore;
pub use reader::{Selector, TimeIndexedTableReader, read_time_indexed_table, table_slice};
pub use store::{MemoryStore, SeriesBatch, TableQuery, TableSink, TableSource, open_query};
pub use table::{
    AttributeValue, CalendarMetadata, INTERVAL_ATTR, MODEL_ATTR, MODEL_VERSION_ATTR,
    START_TIME_ATTR, Table, decode_bytes,
};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::series::SeriesError;

/// Error type for table access.
#[derive(Debug, Error)]
pub enum TableError {
    /// No table at the path
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Window end precedes its start
    #[error("Window end {end} is before start {start}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Interval attribute uses an unknown unit
    #[error("Unsupported interval unit: {0}")]
    UnsupportedIntervalUnit(String),

    /// Required attribute absent
    #[error("Table {table} has no '{name}' attribute")]
    MissingAttribute { table: String, name: String },

    /// Timestamp attribute or window text could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Table rank or size does not fit the request
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Selector refers past the end of a dimension
    #[error("Index {index} out of bounds for dimension {dim} of length {len}")]
    IndexOutOfBounds { index: usize, dim: usize, len: usize },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Series construction failed
    #[error("Series error: {0}")]
    Series(SeriesError),

    /// NetCDF library error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),
}

impl From<SeriesError> for TableError {
    fn from(e: SeriesError) -> Self {
        match e {
            SeriesError::InvalidWindow { start, end } => Self::InvalidWindow { start, end },
            SeriesError::UnsupportedIntervalUnit(unit) => Self::UnsupportedIntervalUnit(unit),
            SeriesError::InvalidTimestamp(text) => Self::InvalidTimestamp(text),
            other => Self::Series(other),
        }
    }
}
