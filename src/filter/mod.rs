//! Digital filters and interpolation for tidal signals.
//!
//! - [`CosineLanczos`]: zero-phase low-pass used to strip high-frequency
//!   noise before extrema are located
//! - [`GodinFilter`]: 24h/24.75h/24h cascaded boxcar removing the tide
//! - [`Interpolation`]: linear, PCHIP or nearest resampling
//!
//! # Example
//!
//! ```ignore
//! use hydro_tidal::filter::{CosineLanczos, GodinFilter};
//!
//! let smooth = CosineLanczos::new(TimeDelta::hours(2)).apply(&stage)?;
//! let subtidal = GodinFilter.apply(&stage)?;
//! ```

mod godin;
mod interpolate;
mod lanczos;

pub use godin::{GodinFilter, convolve_same, generate_kernel};
pub use interpolate::Interpolation;
pub use lanczos::{CosineLanczos, lanczos_coefficients};

use thiserror::Error;

use crate::series::SeriesError;

/// Error type for filtering.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Filter accepts a different number of columns
    #[error("Filter expects {expected} column(s), found {found}")]
    ColumnCount { expected: usize, found: usize },

    /// Cutoff, interval or width out of range
    #[error("Invalid filter parameter: {0}")]
    InvalidParameter(String),

    /// Input has no fixed sampling interval
    #[error("Filter requires a regular series with a fixed interval")]
    NotRegular,

    /// Series construction failed
    #[error("Series error: {0}")]
    Series(#[from] SeriesError),
}
