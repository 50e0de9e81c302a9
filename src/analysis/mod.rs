//! Tidal highs, lows, amplitude and phase, plus comparison tools.
//!
//! This module provides tools for:
//! - Conditioning noisy, gapped stage records onto a regular grid
//! - Extracting tidal highs and lows with a rolling window
//! - Tidal range and amplitude/phase differences between two records
//! - Period aggregation and model-vs-observed metrics
//!
//! # Pipeline
//!
//! ```text
//! raw ──▶ gap mask ──▶ interpolate ──▶ cosine-Lanczos ──▶ rolling max/min
//!                                                                     │
//!                                       amplitude (high − low at low) ◀┘
//! ```
//!
//! A rolling window of `p` samples labelled at its right edge `r` reports
//! the sample `r − (p/2 − 1)` when that sample is the unique extremum of
//! the window.
//!
//! # Example - Tidal Highs and Lows
//!
//! ```ignore
//! use hydro_tidal::analysis::{TidalHLConfig, tidal_highs_lows, amplitude_diff};
//!
//! let model = tidal_highs_lows(&model_stage, &TidalHLConfig::default())?;
//! let obs = tidal_highs_lows(&obs_stage, &TidalHLConfig::default())?;
//!
//! let diff = amplitude_diff(&model.amplitude()?, &obs.amplitude()?, true)?;
//! ```
//!
//! # Example - Validation
//!
//! ```ignore
//! use hydro_tidal::analysis::ComparisonMetrics;
//!
//! let metrics = ComparisonMetrics::from_series(&model_stage, &obs_stage)?;
//! println!("RMSE: {:.3} ft", metrics.rmse);
//! println!("NSE: {:.2}", metrics.nash_sutcliffe);
//! ```

mod amplitude;
mod condition;
mod extrema;
mod metrics;
mod period;
mod tidal_hl;

pub use amplitude::{
    AmplitudePhaseAnalyzer, DEFAULT_TOLERANCE, MatchedExtremum, amplitude, amplitude_diff,
    match_nearest, phase_diff,
};
pub use condition::{
    ConditionedSeries, DEFAULT_CUTOFF, DEFAULT_RESAMPLE, SignalConditioner, condition,
};
pub use extrema::{
    DEFAULT_WINDOW, ExtremaExtractor, ExtremumKind, ExtremumPoint, ZeroCrossing, zero_crossings,
};
pub use metrics::ComparisonMetrics;
pub use period::{per_aver, per_max, per_min};
pub use tidal_hl::{TidalHLConfig, TidalHighsLows, tidal_highs_lows};
