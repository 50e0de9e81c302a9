//! Multi-location batch driver and per-location post-processing.
//!
//! Every item is processed independently; a failing item is logged and
//! recorded in the report and the remaining items still run. With the
//! `parallel` feature items are spread over rayon's thread pool and the
//! report keeps input order.
//!
//! [`PostProcessor`] turns one record into its Godin-filtered record,
//! tidal highs, lows and amplitude ([`LocationResult`]); [`diff_batch`]
//! compares those products between two studies location by location.
//!
//! # Example
//!
//! ```ignore
//! use hydro_tidal::batch::tidal_hl_batch;
//!
//! let stations = vec![("RSAC054".to_string(), rsac054), ("RSAN018".to_string(), rsan018)];
//! let report = tidal_hl_batch(&stations, &TidalHLConfig::default());
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.key, failure.error);
//! }
//!
//! let processor = PostProcessor::new()
//!     .with_fill_in(DEFAULT_MAX_FILL_GAP, Interpolation::Linear)
//!     .with_scale(0.3048);
//! let model = process_batch(&model_stations, &processor);
//! let observed = process_batch(&observed_stations, &processor);
//! let diffs = diff_batch(&model.successes, &observed.successes);
//! ```

mod process;

pub use process::{
    DEFAULT_MAX_FILL_GAP, LocationDiff, LocationResult, PostProcessor, fill_in, merge,
};

use std::fmt::Display;

use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::{TidalHLConfig, TidalHighsLows, tidal_highs_lows};
use crate::filter::FilterError;
use crate::series::{SeriesError, TimeSeries};

/// Error type for post-processing.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Fill-in limit must be at least one sample
    #[error("Fill-in gap must be at least one sample, got {0}")]
    InvalidFillGap(usize),

    /// Nothing to merge
    #[error("No records to merge")]
    NoRecords,

    /// Location has no counterpart in the reference study
    #[error("No reference result for '{0}'")]
    MissingReference(String),

    /// Series construction or shape failure
    #[error("Series error: {0}")]
    Series(#[from] SeriesError),

    /// Filtering or extraction failure
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
}

/// A batch item that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchFailure {
    /// Item key
    pub key: String,
    /// Rendered error
    pub error: String,
}

/// Outcome of a batch run, in input order.
#[derive(Clone, Debug)]
pub struct BatchReport<T> {
    /// Keys and results of the items that succeeded
    pub successes: Vec<(String, T)>,
    /// Items that failed
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    /// Number of items processed.
    pub fn n_items(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// True when no item failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Result for `key`, if that item succeeded.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.successes.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Apply `f` to every keyed item, collecting successes and failures.
pub fn run_batch<I, T, E, F>(items: Vec<(String, I)>, f: F) -> BatchReport<T>
where
    I: Send,
    T: Send,
    E: Display + Send,
    F: Fn(&str, I) -> Result<T, E> + Sync,
{
    #[cfg(feature = "parallel")]
    let outcomes: Vec<(String, Result<T, E>)> = {
        use rayon::prelude::*;
        items
            .into_par_iter()
            .map(|(key, item)| {
                let result = f(&key, item);
                (key, result)
            })
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<(String, Result<T, E>)> = items
        .into_iter()
        .map(|(key, item)| {
            let result = f(&key, item);
            (key, result)
        })
        .collect();

    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for (key, result) in outcomes {
        match result {
            Ok(value) => successes.push((key, value)),
            Err(e) => {
                warn!(key = %key, error = %e, "batch item failed");
                failures.push(BatchFailure {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }
    debug!(
        succeeded = successes.len(),
        failed = failures.len(),
        "batch finished"
    );
    BatchReport {
        successes,
        failures,
    }
}

/// Tidal highs and lows for many named records.
pub fn tidal_hl_batch(
    series: &[(String, TimeSeries)],
    config: &TidalHLConfig,
) -> BatchReport<TidalHighsLows> {
    let items: Vec<(String, &TimeSeries)> = series.iter().map(|(k, s)| (k.clone(), s)).collect();
    run_batch(items, |_, s| tidal_highs_lows(s, config))
}

/// Post-process many named records.
pub fn process_batch(
    series: &[(String, TimeSeries)],
    processor: &PostProcessor,
) -> BatchReport<LocationResult> {
    let items: Vec<(String, &TimeSeries)> = series.iter().map(|(k, s)| (k.clone(), s)).collect();
    run_batch(items, |_, s| processor.process(s))
}

/// Differences of each result against the reference result with the same key.
///
/// Keys missing from `references` fail with `MissingReference`.
pub fn diff_batch(
    results: &[(String, LocationResult)],
    references: &[(String, LocationResult)],
) -> BatchReport<LocationDiff> {
    let items: Vec<(String, &LocationResult)> =
        results.iter().map(|(k, r)| (k.clone(), r)).collect();
    run_batch(items, |key, result| -> Result<LocationDiff, ProcessError> {
        let reference = references
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
            .ok_or_else(|| ProcessError::MissingReference(key.to_string()))?;
        Ok(result.diff(reference)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_do_not_stop_batch() {
        let items = vec![
            ("a".to_string(), 1),
            ("b".to_string(), -1),
            ("c".to_string(), 3),
        ];
        let report = run_batch(items, |_, x: i32| {
            if x < 0 { Err(format!("negative input {x}")) } else { Ok(x * 2) }
        });

        assert_eq!(report.n_items(), 3);
        assert!(!report.is_complete());
        assert_eq!(report.successes, vec![("a".to_string(), 2), ("c".to_string(), 6)]);
        assert_eq!(report.failures[0].key, "b");
        assert_eq!(report.failures[0].error, "negative input -1");
        assert_eq!(report.get("c"), Some(&6));
        assert_eq!(report.get("b"), None);
    }

    #[test]
    fn test_empty_batch() {
        let report = run_batch(Vec::<(String, i32)>::new(), |_, x: i32| Ok::<_, String>(x));
        assert_eq!(report.n_items(), 0);
        assert!(report.is_complete());
    }
}
