//! Godin tidal filter.
//!
//! Three cascaded moving averages of 24h, 24.75h and 24h remove diurnal
//! and semi-diurnal tidal energy, leaving a daily-mean-like subtidal
//! signal. The 24.75h boxcar is rounded to an odd number of samples so the
//! combined kernel has a well-defined centre.

use chrono::TimeDelta;
use tracing::debug;

use super::FilterError;
use super::lanczos::convolve_full;
use crate::series::{Column, TimeSeries};

const DAY_MINUTES: f64 = 24.0 * 60.0;
const TIDAL_DAY_MINUTES: f64 = 24.75 * 60.0;

/// Godin filter impulse response for samples spaced `interval` apart.
///
/// # Errors
/// `InvalidParameter` if `interval` is not positive or is longer than a day.
pub fn generate_kernel(interval: TimeDelta) -> Result<Vec<f64>, FilterError> {
    let minutes = interval.num_milliseconds() as f64 / 60_000.0;
    if minutes <= 0.0 || minutes > DAY_MINUTES {
        return Err(FilterError::InvalidParameter(format!(
            "Godin filter needs a sample interval between zero and one day, got {interval}"
        )));
    }

    let n24 = (DAY_MINUTES / minutes).round_ties_even() as usize;
    let mut n25 = (TIDAL_DAY_MINUTES / minutes).round_ties_even() as usize;
    if n25 % 2 == 0 {
        n25 += 1;
    }

    let box24 = vec![1.0 / n24 as f64; n24];
    let box25 = vec![1.0 / n25 as f64; n25];
    Ok(convolve_full(&box25, &convolve_full(&box24, &box24)))
}

/// Centred convolution returning one output per input sample.
///
/// Samples beyond either end are taken as zero, so outputs within half a
/// kernel of the boundaries are attenuated; missing inputs propagate.
pub fn convolve_same(values: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = values.len();
    let m = kernel.len();
    if n == 0 || m == 0 {
        return vec![f64::NAN; n];
    }
    let offset = (m - 1) / 2;
    (0..n)
        .map(|i| {
            // out[i] = full[i + offset] = Σ_j kernel[j] · values[i + offset − j]
            let center = i + offset;
            let j_lo = center.saturating_sub(n - 1);
            let j_hi = center.min(m - 1);
            (j_lo..=j_hi).map(|j| kernel[j] * values[center - j]).sum()
        })
        .collect()
}

/// Godin filter.
#[derive(Clone, Copy, Debug, Default)]
pub struct GodinFilter;

impl GodinFilter {
    /// Filter a single-column regular series.
    ///
    /// # Errors
    /// - `ColumnCount` if the series has more than one column
    /// - `NotRegular` if the series has no fixed interval
    pub fn apply(&self, series: &TimeSeries) -> Result<TimeSeries, FilterError> {
        if series.n_columns() != 1 {
            return Err(FilterError::ColumnCount {
                expected: 1,
                found: series.n_columns(),
            });
        }
        let interval = series.fixed_interval().ok_or(FilterError::NotRegular)?;
        let kernel = generate_kernel(interval)?;
        debug!(taps = kernel.len(), n = series.len(), "Godin filter");

        let column = &series.columns()[0];
        let filtered = convolve_same(&column.values, &kernel);
        match (series.time_at(0), series.interval()) {
            (Some(start), Some(iv)) => Ok(TimeSeries::regular(
                start,
                iv,
                vec![Column::new(column.name.clone(), filtered)],
            )?),
            _ => Ok(series.clone()),
        }
    }
}
