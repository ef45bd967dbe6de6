// src/fitting.rs - Nonlinear least squares for the exponential decay model a*exp(b*x)

use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

use crate::errors::{DotAnalyzerError, Result};

const MAX_ITERATIONS: usize = 200;
const STEP_TOLERANCE: f64 = 1e-12;
const MAX_STEP_HALVINGS: usize = 16;

/// Fitted parameters of y = a * exp(b * x). A negative b is a decay; its
/// magnitude is the orientational correlation signal reported to callers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExponentialFit {
    pub a: f64,
    pub b: f64,
    pub r_squared: f64,
}

impl ExponentialFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * (self.b * x).exp()
    }
}

/// Fit a*exp(b*x) to the samples: log-linear least squares on the positive
/// values seeds a damped Gauss-Newton refinement. Every failure mode maps to
/// `FitUnavailable` so callers can keep the raw samples.
pub fn fit_exponential(xs: &[f64], ys: &[f64]) -> Result<ExponentialFit> {
    if xs.len() != ys.len() {
        return Err(DotAnalyzerError::FitUnavailable(format!(
            "sample length mismatch: {} abscissae, {} ordinates",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(DotAnalyzerError::FitUnavailable(format!(
            "{} samples, at least 2 required",
            xs.len()
        )));
    }

    let (mut a, mut b) = log_linear_seed(xs, ys)?;
    let mut sse = sum_squared_error(xs, ys, a, b);

    for _ in 0..MAX_ITERATIONS {
        // Normal equations J^T J * delta = J^T r for the current parameters
        let mut s_aa = 0.0;
        let mut s_ab = 0.0;
        let mut s_bb = 0.0;
        let mut g_a = 0.0;
        let mut g_b = 0.0;
        for (&x, &y) in xs.iter().zip(ys) {
            let e = (b * x).exp();
            let da = e;
            let db = a * x * e;
            let residual = y - a * e;
            s_aa += da * da;
            s_ab += da * db;
            s_bb += db * db;
            g_a += da * residual;
            g_b += db * residual;
        }
        let normal = Matrix2::new(s_aa, s_ab, s_ab, s_bb);
        let gradient = Vector2::new(g_a, g_b);
        let delta = normal
            .lu()
            .solve(&gradient)
            .ok_or_else(|| DotAnalyzerError::FitUnavailable("singular normal equations".into()))?;

        // Halve the step until the residual stops growing
        let mut scale = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_STEP_HALVINGS {
            let a_try = a + scale * delta[0];
            let b_try = b + scale * delta[1];
            let sse_try = sum_squared_error(xs, ys, a_try, b_try);
            if sse_try.is_finite() && sse_try <= sse {
                a = a_try;
                b = b_try;
                sse = sse_try;
                accepted = true;
                break;
            }
            scale *= 0.5;
        }
        if !accepted {
            break;
        }
        let step = (scale * delta[0]).abs().max((scale * delta[1]).abs());
        if step < STEP_TOLERANCE * (1.0 + a.abs().max(b.abs())) {
            break;
        }
    }

    if !a.is_finite() || !b.is_finite() || !sse.is_finite() {
        return Err(DotAnalyzerError::FitUnavailable(
            "parameters did not converge to finite values".into(),
        ));
    }

    Ok(ExponentialFit {
        a,
        b,
        r_squared: r_squared(ys, sse),
    })
}

/// Linear least squares on (x, ln y) over the positive samples
fn log_linear_seed(xs: &[f64], ys: &[f64]) -> Result<(f64, f64)> {
    let positive: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(_, &y)| y > 0.0)
        .map(|(&x, &y)| (x, y.ln()))
        .collect();
    if positive.len() < 2 {
        return Err(DotAnalyzerError::FitUnavailable(format!(
            "{} positive samples, at least 2 required for the log-linear seed",
            positive.len()
        )));
    }

    let n = positive.len() as f64;
    let sum_x: f64 = positive.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = positive.iter().map(|(_, y)| y).sum();
    let sum_xx: f64 = positive.iter().map(|(x, _)| x * x).sum();
    let sum_xy: f64 = positive.iter().map(|(x, y)| x * y).sum();
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON * n * n {
        return Err(DotAnalyzerError::FitUnavailable(
            "degenerate abscissa in the log-linear seed".into(),
        ));
    }
    let b = (n * sum_xy - sum_x * sum_y) / denominator;
    let ln_a = (sum_y - b * sum_x) / n;
    Ok((ln_a.exp(), b))
}

fn sum_squared_error(xs: &[f64], ys: &[f64], a: f64, b: f64) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let residual = y - a * (b * x).exp();
            residual * residual
        })
        .sum()
}

fn r_squared(ys: &[f64], sse: f64) -> f64 {
    let n = ys.len() as f64;
    let mean = ys.iter().sum::<f64>() / n;
    let total: f64 = ys.iter().map(|&y| (y - mean) * (y - mean)).sum();
    if total > 0.0 {
        1.0 - sse / total
    } else if sse <= f64::EPSILON {
        1.0
    } else {
        0.0
    }
}
