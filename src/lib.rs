//! # hydro-tidal
//!
//! Extraction and tidal analysis of time-indexed hydrodynamic model output.
//!
//! This crate provides the building blocks for post-processing model runs:
//! - Regular and irregular time series with calendar intervals
//! - Time-windowed reads of calendar-tagged tables (in memory or NetCDF-4/HDF5)
//! - Cosine-Lanczos and Godin tidal filters
//! - Tidal high/low extraction, amplitude and phase differences
//! - Period aggregation and model-vs-observed metrics
//! - Batch processing over many locations

pub mod analysis;
pub mod batch;
pub mod filter;
pub mod io;
pub mod series;

// Re-export main types for convenience
pub use series::{Column, Interval, SeriesError, TimeIndex, TimeSeries, TimeWindow};

// Filters
pub use filter::{CosineLanczos, FilterError, GodinFilter, Interpolation};

// Analysis types
pub use analysis::{
    AmplitudePhaseAnalyzer, ComparisonMetrics, ConditionedSeries, ExtremaExtractor,
    ExtremumKind, ExtremumPoint, MatchedExtremum, SignalConditioner, TidalHLConfig,
    TidalHighsLows, amplitude, amplitude_diff, phase_diff, tidal_highs_lows,
};

// I/O types
pub use io::{
    CalendarMetadata, ExclusiveAccess, LockError, LockFile, MemoryStore, Selector, Table,
    TableError, TableSink, TableSource, TimeIndexedTableReader, open_query,
    read_time_indexed_table,
};
#[cfg(feature = "netcdf")]
pub use io::NetCdfStore;

// Batch driver
pub use batch::{
    BatchReport, LocationDiff, LocationResult, PostProcessor, ProcessError, diff_batch,
    process_batch, run_batch, tidal_hl_batch,
};
