//! Comparison metrics for model-vs-observed validation.
//!
//! The first series is the model, the second the observation. Only pairs
//! where both values are present take part. Normalised metrics divide by
//! the observed mean.

use crate::series::{SeriesError, TimeSeries};

/// Statistical comparison metrics between two series.
#[derive(Clone, Copy, Debug)]
pub struct ComparisonMetrics {
    /// Mean squared error: mean((model - obs)²)
    pub mse: f64,
    /// Root mean square error
    pub rmse: f64,
    /// MSE / mean(obs)
    pub nmse: f64,
    /// RMSE / mean(obs)
    pub nrmse: f64,
    /// Mean error: mean(model - obs)
    pub mean_error: f64,
    /// Mean error / mean(obs)
    pub nmean_error: f64,
    /// Nash–Sutcliffe efficiency: 1 - Σ(model - obs)² / Σ(obs - mean(obs))²
    pub nash_sutcliffe: f64,
    /// Percent bias: 100 · (Σmodel - Σobs) / Σobs
    pub percent_bias: f64,
    /// RMSE / sample standard deviation of obs
    pub rsr: f64,
    /// Pearson correlation coefficient [-1, 1]
    pub correlation: f64,
    /// Least-squares slope of model against obs
    pub slope: f64,
    /// Least-squares intercept of model against obs
    pub intercept: f64,
    /// Number of pairs used
    pub n_points: usize,
}

impl ComparisonMetrics {
    /// Compute metrics over pairwise-valid samples of equal-length slices.
    ///
    /// With no valid pairs every metric is `NaN`.
    pub fn compute(model: &[f64], observation: &[f64]) -> Self {
        let (m, o): (Vec<f64>, Vec<f64>) = model
            .iter()
            .zip(observation)
            .filter(|(a, b)| !a.is_nan() && !b.is_nan())
            .map(|(a, b)| (*a, *b))
            .unzip();
        let n = m.len();
        if n == 0 {
            return Self::undefined();
        }
        let nf = n as f64;

        let model_mean = m.iter().sum::<f64>() / nf;
        let obs_sum = o.iter().sum::<f64>();
        let obs_mean = obs_sum / nf;

        let errors: Vec<f64> = m.iter().zip(&o).map(|(a, b)| a - b).collect();
        let mean_error = errors.iter().sum::<f64>() / nf;
        let sse: f64 = errors.iter().map(|e| e * e).sum();
        let mse = sse / nf;
        let rmse = mse.sqrt();

        let obs_ss: f64 = o.iter().map(|b| (b - obs_mean).powi(2)).sum();
        let model_ss: f64 = m.iter().map(|a| (a - model_mean).powi(2)).sum();
        let cross: f64 = m
            .iter()
            .zip(&o)
            .map(|(a, b)| (a - model_mean) * (b - obs_mean))
            .sum();

        let nash_sutcliffe = if obs_ss > 0.0 {
            1.0 - sse / obs_ss
        } else if sse == 0.0 {
            1.0
        } else {
            f64::NEG_INFINITY
        };

        let obs_std = if n > 1 { (obs_ss / (nf - 1.0)).sqrt() } else { f64::NAN };

        let correlation = if model_ss > 0.0 && obs_ss > 0.0 {
            cross / (model_ss.sqrt() * obs_ss.sqrt())
        } else {
            f64::NAN
        };
        let slope = if obs_ss > 0.0 { cross / obs_ss } else { f64::NAN };
        let intercept = model_mean - slope * obs_mean;

        Self {
            mse,
            rmse,
            nmse: mse / obs_mean,
            nrmse: rmse / obs_mean,
            mean_error,
            nmean_error: mean_error / obs_mean,
            nash_sutcliffe,
            percent_bias: 100.0 * (m.iter().sum::<f64>() - obs_sum) / obs_sum,
            rsr: rmse / obs_std,
            correlation,
            slope,
            intercept,
            n_points: n,
        }
    }

    /// Compute metrics over the timestamps the two single-column series share.
    pub fn from_series(model: &TimeSeries, observation: &TimeSeries) -> Result<Self, SeriesError> {
        let obs = observation.points()?;
        let model_points = model.points()?;
        let (m, o): (Vec<f64>, Vec<f64>) = model_points
            .iter()
            .filter_map(|(t, v)| {
                obs.binary_search_by_key(t, |(ot, _)| *ot)
                    .ok()
                    .map(|i| (*v, obs[i].1))
            })
            .unzip();
        Ok(Self::compute(&m, &o))
    }

    fn undefined() -> Self {
        Self {
            mse: f64::NAN,
            rmse: f64::NAN,
            nmse: f64::NAN,
            nrmse: f64::NAN,
            mean_error: f64::NAN,
            nmean_error: f64::NAN,
            nash_sutcliffe: f64::NAN,
            percent_bias: f64::NAN,
            rsr: f64::NAN,
            correlation: f64::NAN,
            slope: f64::NAN,
            intercept: f64::NAN,
            n_points: 0,
        }
    }

    /// Check if correlation is significant (> 0.95).
    pub fn is_highly_correlated(&self) -> bool {
        self.correlation > 0.95
    }

    /// Check if the Nash–Sutcliffe efficiency indicates a good fit (> 0.9).
    pub fn is_skillful(&self) -> bool {
        self.nash_sutcliffe > 0.9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        let model = [2.0, 3.0, 4.0, 5.0];
        let obs = [1.0, 2.0, 3.0, 4.0];
        let m = ComparisonMetrics::compute(&model, &obs);
        assert_eq!(m.n_points, 4);
        assert_relative_eq!(m.mse, 1.0);
        assert_relative_eq!(m.mean_error, 1.0);
        assert_relative_eq!(m.nmean_error, 0.4);
        // Σobs = 10, Σmodel = 14
        assert_relative_eq!(m.percent_bias, 40.0);
        // Σ(obs - 2.5)² = 5
        assert_relative_eq!(m.nash_sutcliffe, 1.0 - 4.0 / 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.slope, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.correlation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_pairs_skipped() {
        let model = [1.0, f64::NAN, 3.0];
        let obs = [1.0, 2.0, f64::NAN];
        let m = ComparisonMetrics::compute(&model, &obs);
        assert_eq!(m.n_points, 1);
        assert_relative_eq!(m.mse, 0.0);
    }

    #[test]
    fn test_no_pairs_is_undefined() {
        let m = ComparisonMetrics::compute(&[], &[]);
        assert_eq!(m.n_points, 0);
        assert!(m.rmse.is_nan());
    }
}
