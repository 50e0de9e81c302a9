//! One-dimensional interpolation of scattered samples.
//!
//! Knots are `(x, y)` pairs with strictly increasing `x`. Evaluation
//! outside `[x_first, x_last]` returns `NaN`; nothing is extrapolated.

/// Interpolation method used when resampling onto a regular grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Piecewise linear
    Linear,
    /// Piecewise cubic Hermite, monotone (Fritsch–Carlson derivatives)
    #[default]
    Pchip,
    /// Value of the nearest knot
    Nearest,
}

impl Interpolation {
    /// Evaluate the interpolant through `(xs, ys)` at every point of `at`.
    ///
    /// `xs` must be strictly increasing and the same length as `ys`.
    pub fn evaluate(&self, xs: &[f64], ys: &[f64], at: &[f64]) -> Vec<f64> {
        debug_assert_eq!(xs.len(), ys.len());
        if xs.is_empty() {
            return vec![f64::NAN; at.len()];
        }
        match self {
            Self::Linear => at.iter().map(|&x| linear(xs, ys, x)).collect(),
            Self::Nearest => at.iter().map(|&x| nearest(xs, ys, x)).collect(),
            Self::Pchip => {
                let d = pchip_derivatives(xs, ys);
                at.iter().map(|&x| hermite(xs, ys, &d, x)).collect()
            }
        }
    }
}

/// Index `k` with `xs[k] <= x <= xs[k + 1]`, or `None` outside the knots.
fn bracket(xs: &[f64], x: f64) -> Option<usize> {
    let n = xs.len();
    if x.is_nan() || x < xs[0] || x > xs[n - 1] {
        return None;
    }
    if n == 1 {
        return Some(0);
    }
    let k = xs.partition_point(|&v| v <= x);
    Some(k.saturating_sub(1).min(n - 2))
}

fn linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let Some(k) = bracket(xs, x) else {
        return f64::NAN;
    };
    if xs.len() == 1 {
        return ys[0];
    }
    let t = (x - xs[k]) / (xs[k + 1] - xs[k]);
    ys[k] + t * (ys[k + 1] - ys[k])
}

fn nearest(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let Some(k) = bracket(xs, x) else {
        return f64::NAN;
    };
    if xs.len() == 1 {
        return ys[0];
    }
    // Ties go to the left knot
    if x - xs[k] <= xs[k + 1] - x {
        ys[k]
    } else {
        ys[k + 1]
    }
}

/// Knot derivatives for a shape-preserving cubic Hermite interpolant.
///
/// Interior slopes use the weighted harmonic mean of neighbouring secants
/// (zero at local extrema); end slopes use the one-sided three-point
/// formula, limited so the interpolant stays monotone.
fn pchip_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (ys[k + 1] - ys[k]) / h[k]).collect();
    if n == 2 {
        return vec![delta[0]; 2];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (d0, d1) = (delta[k - 1], delta[k]);
        if d0 * d1 > 0.0 {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            d[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
        }
    }
    d[0] = edge_derivative(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = edge_derivative(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

fn edge_derivative(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn hermite(xs: &[f64], ys: &[f64], d: &[f64], x: f64) -> f64 {
    let Some(k) = bracket(xs, x) else {
        return f64::NAN;
    };
    if xs.len() == 1 {
        return ys[0];
    }
    let h = xs[k + 1] - xs[k];
    let t = (x - xs[k]) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * ys[k] + h10 * h * d[k] + h01 * ys[k + 1] + h11 * h * d[k + 1]
}
