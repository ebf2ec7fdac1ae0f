//! Numeric helpers for the forecasting model: penalized weighted least
//! squares and a few robust statistics.

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub coefficients: Vec<f64>,
    /// Trace of the hat matrix. Equals the column count without penalties
    /// and shrinks toward zero as they grow.
    pub effective_dof: f64,
}

/// Solves `min Σ wᵢ (yᵢ − xᵢ·β)² + Σ λⱼ βⱼ²` through the normal equations
/// and a Cholesky factorization.
pub fn weighted_ridge(
    rows: &[Vec<f64>],
    targets: &[f64],
    weights: &[f64],
    penalties: &[f64],
) -> Result<RidgeFit> {
    let p = penalties.len();
    if rows.len() != targets.len() || rows.len() != weights.len() {
        return Err(ForecastError::ModelFit(format!(
            "design has {} rows but {} targets and {} weights",
            rows.len(),
            targets.len(),
            weights.len()
        )));
    }
    if p == 0 {
        return Ok(RidgeFit {
            coefficients: Vec::new(),
            effective_dof: 0.0,
        });
    }

    let mut gram = vec![vec![0.0; p]; p];
    let mut rhs = vec![0.0; p];
    for ((x, &y), &w) in rows.iter().zip(targets).zip(weights) {
        if x.len() != p {
            return Err(ForecastError::ModelFit(format!(
                "design row has {} columns, expected {}",
                x.len(),
                p
            )));
        }
        for i in 0..p {
            let wx = w * x[i];
            rhs[i] += wx * y;
            for j in 0..=i {
                gram[i][j] += wx * x[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            gram[j][i] = gram[i][j];
        }
    }
    let unpenalized = gram.clone();
    for i in 0..p {
        gram[i][i] += penalties[i];
    }

    let trace: f64 = (0..p).map(|i| gram[i][i]).sum();
    let mut jitter = 0.0;
    for _ in 0..4 {
        let mut attempt = gram.clone();
        for (i, row) in attempt.iter_mut().enumerate() {
            row[i] += jitter;
        }
        if let Some(factor) = cholesky(&attempt) {
            let effective_dof = (0..p)
                .map(|j| {
                    let column: Vec<f64> = unpenalized.iter().map(|row| row[j]).collect();
                    cholesky_solve(&factor, &column)[j]
                })
                .sum();
            return Ok(RidgeFit {
                coefficients: cholesky_solve(&factor, &rhs),
                effective_dof,
            });
        }
        jitter = if jitter == 0.0 {
            1e-10 * trace.max(1.0)
        } else {
            jitter * 100.0
        };
    }

    Err(ForecastError::ModelFit(
        "normal equations are not positive definite".to_string(),
    ))
}

/// Lower-triangular factor `L` with `A = L Lᵀ`, or `None` if `A` is not
/// positive definite.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = a[i][i] - sum;
                if !(d > 0.0) || !d.is_finite() {
                    return None;
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = l.len();
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| l[i][k] * z[k]).sum();
        z[i] = (b[i] - sum) / l[i][i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (z[i] - sum) / l[i][i];
    }
    x
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.2e-9).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -normal_quantile(1.0 - p)
    }
}
