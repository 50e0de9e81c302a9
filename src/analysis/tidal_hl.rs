//! End-to-end tidal high/low extraction.
//!
//! # Example
//!
//! ```ignore
//! use hydro_tidal::analysis::{TidalHLConfig, tidal_highs_lows};
//!
//! let config = TidalHLConfig::default().with_window(TimeDelta::hours(6));
//! let hl = tidal_highs_lows(&stage, &config)?;
//! let range = hl.amplitude()?;
//! ```

use chrono::TimeDelta;
use tracing::debug;

use super::amplitude::amplitude;
use super::condition::{DEFAULT_CUTOFF, DEFAULT_RESAMPLE, SignalConditioner};
use super::extrema::{DEFAULT_WINDOW, ExtremaExtractor};
use crate::filter::{FilterError, Interpolation};
use crate::series::{SeriesError, TimeSeries};

/// Settings for [`tidal_highs_lows`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TidalHLConfig {
    /// Low-pass cutoff period
    pub cutoff: TimeDelta,
    /// Grid spacing after resampling
    pub resample_period: TimeDelta,
    /// Interpolation onto the grid
    pub interpolation: Interpolation,
    /// Extremum search window
    pub window: TimeDelta,
}

impl Default for TidalHLConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            resample_period: DEFAULT_RESAMPLE,
            interpolation: Interpolation::Pchip,
            window: DEFAULT_WINDOW,
        }
    }
}

impl TidalHLConfig {
    /// Set the cutoff period.
    pub fn with_cutoff(mut self, cutoff: TimeDelta) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Set the grid spacing.
    pub fn with_resample_period(mut self, period: TimeDelta) -> Self {
        self.resample_period = period;
        self
    }

    /// Set the interpolation method.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the extremum search window.
    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = window;
        self
    }

    /// The conditioner these settings describe.
    pub fn conditioner(&self) -> SignalConditioner {
        SignalConditioner::new()
            .with_cutoff(self.cutoff)
            .with_resample_period(self.resample_period)
            .with_interpolation(self.interpolation)
    }

    /// The extractor these settings describe.
    pub fn extractor(&self) -> ExtremaExtractor {
        ExtremaExtractor::new(self.window)
    }
}

/// Tidal highs and lows of one record.
#[derive(Clone, Debug)]
pub struct TidalHighsLows {
    /// Highs, column `"max"`
    pub highs: TimeSeries,
    /// Lows, column `"min"`
    pub lows: TimeSeries,
}

impl TidalHighsLows {
    /// Tidal range stamped at each low.
    pub fn amplitude(&self) -> Result<TimeSeries, SeriesError> {
        amplitude(&self.highs, &self.lows)
    }
}

/// Condition a raw single-column record and extract its tidal highs and lows.
///
/// Extrema falling inside gaps of the raw record are never reported.
pub fn tidal_highs_lows(
    series: &TimeSeries,
    config: &TidalHLConfig,
) -> Result<TidalHighsLows, FilterError> {
    let conditioned = config.conditioner().condition(series)?;
    let (highs, lows) = config.extractor().extract(&conditioned)?;
    debug!(
        raw = series.len(),
        highs = highs.len(),
        lows = lows.len(),
        "tidal highs and lows"
    );
    Ok(TidalHighsLows { highs, lows })
}
