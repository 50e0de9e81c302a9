//! Cosine-Lanczos low-pass filter.
//!
//! # Mathematical Background
//!
//! With `cf = 2·Δt / T_cutoff` (cutoff as a fraction of Nyquist) and `m`
//! taps either side, the coefficients are
//!
//! ```text
//! w_k = cf · sinc(k·cf) · sinc(k/m),   k = -m..=m,   sinc(x) = sin(πx)/(πx)
//! ```
//!
//! normalised to unit sum. The kernel is applied forward and then backward,
//! which cancels the phase shift and squares the amplitude response. For a
//! symmetric kernel this is a single convolution with `w ⊛ w`, whose
//! support is `2m` samples either side.

use chrono::TimeDelta;
use tracing::debug;

use super::FilterError;
use crate::series::{Column, TimeSeries};

/// Zero-phase cosine-Lanczos low-pass filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CosineLanczos {
    /// Cutoff period; signals faster than this are removed
    pub cutoff: TimeDelta,
    /// Taps either side of centre; derived from the cutoff when `None`
    pub half_width: Option<usize>,
}

impl CosineLanczos {
    /// Filter with the default half width.
    pub fn new(cutoff: TimeDelta) -> Self {
        Self {
            cutoff,
            half_width: None,
        }
    }

    /// Override the number of taps either side of centre.
    pub fn with_half_width(mut self, m: usize) -> Self {
        self.half_width = Some(m);
        self
    }

    /// Cutoff as a fraction of the Nyquist frequency for sample spacing `dt`.
    pub fn cutoff_fraction(&self, dt: TimeDelta) -> Result<f64, FilterError> {
        let dt_s = dt.num_milliseconds() as f64 / 1000.0;
        let cutoff_s = self.cutoff.num_milliseconds() as f64 / 1000.0;
        if dt_s <= 0.0 || cutoff_s <= 0.0 {
            return Err(FilterError::InvalidParameter(format!(
                "cutoff period {} and sample interval {} must be positive",
                self.cutoff, dt
            )));
        }
        Ok(2.0 * dt_s / cutoff_s)
    }

    /// Taps either side of centre for sample spacing `dt`.
    pub fn resolve_half_width(&self, dt: TimeDelta) -> Result<usize, FilterError> {
        match self.half_width {
            Some(m) => Ok(m),
            None => Ok((1.25 * 2.0 / self.cutoff_fraction(dt)?) as usize),
        }
    }

    /// Filter coefficients (length `2m + 1`, unit sum) for sample spacing `dt`.
    pub fn coefficients(&self, dt: TimeDelta) -> Result<Vec<f64>, FilterError> {
        let cf = self.cutoff_fraction(dt)?;
        let m = self.resolve_half_width(dt)?;
        Ok(lanczos_coefficients(cf, m))
    }

    /// Filter raw samples taken every `dt`.
    ///
    /// Missing samples are treated as zero inside the convolution and the
    /// result is masked `2m` samples either side of them; the first and
    /// last `2m` outputs are missing.
    pub fn apply_values(&self, values: &[f64], dt: TimeDelta) -> Result<Vec<f64>, FilterError> {
        let weights = self.coefficients(dt)?;
        let m = weights.len() / 2;
        debug!(taps = weights.len(), n = values.len(), "cosine-Lanczos filter");
        Ok(filtfilt_symmetric(values, &weights, m))
    }

    /// Filter every column of a regular, fixed-interval series.
    pub fn apply(&self, series: &TimeSeries) -> Result<TimeSeries, FilterError> {
        let dt = series.fixed_interval().ok_or(FilterError::NotRegular)?;
        let start = series.time_at(0);
        let columns = series
            .columns()
            .iter()
            .map(|c| Ok(Column::new(c.name.clone(), self.apply_values(&c.values, dt)?)))
            .collect::<Result<Vec<_>, FilterError>>()?;
        match (start, series.interval()) {
            (Some(start), Some(interval)) => Ok(TimeSeries::regular(start, interval, columns)?),
            _ => Ok(series.clone()),
        }
    }
}

/// Normalised cosine-Lanczos coefficients for cutoff fraction `cf` and
/// half width `m`.
pub fn lanczos_coefficients(cf: f64, m: usize) -> Vec<f64> {
    use std::f64::consts::PI;

    let side: Vec<f64> = (1..=m)
        .map(|k| {
            let k = k as f64;
            let cosine = cf * (PI * k * cf).sin() / (PI * k * cf);
            let sigma = (PI * k / m as f64).sin() / (PI * k / m as f64);
            cosine * sigma
        })
        .collect();

    let mut w: Vec<f64> = side.iter().rev().copied().collect();
    w.push(cf);
    w.extend_from_slice(&side);

    let total: f64 = w.iter().sum();
    w.iter().map(|v| v / total).collect()
}

/// Forward-backward application of a symmetric FIR kernel of half width `m`.
fn filtfilt_symmetric(values: &[f64], weights: &[f64], m: usize) -> Vec<f64> {
    let n = values.len();
    let reach = 2 * m;
    let mut out = vec![f64::NAN; n];
    if n <= 2 * reach {
        // No sample has full support on both sides
        return if reach == 0 { values.to_vec() } else { out };
    }

    let kernel = convolve_full(weights, weights);
    let clean: Vec<f64> = values.iter().map(|v| if v.is_nan() { 0.0 } else { *v }).collect();

    for i in reach..n - reach {
        out[i] = kernel
            .iter()
            .zip(&clean[i - reach..=i + reach])
            .map(|(k, x)| k * x)
            .sum();
    }

    // Missing input poisons every output whose support reaches it
    for (i, _) in values.iter().enumerate().filter(|(_, v)| v.is_nan()) {
        let lo = i.saturating_sub(reach);
        let hi = (i + reach).min(n - 1);
        out[lo..=hi].iter_mut().for_each(|o| *o = f64::NAN);
    }
    out
}

/// Full linear convolution (`len(a) + len(b) - 1` outputs).
pub(crate) fn convolve_full(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}
