//! Ordinary least squares solver.
//!
//! Regression imputation solves one small linear problem per call:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! where each row `x_i` is `[1, feature_1, ..., feature_k]`.
//!
//! SVD handles tall design matrices (more rows than columns). A design whose
//! numerical rank is below its column count (collinear features, a feature
//! that is constant like the intercept) has no unique coefficients, and the
//! solver reports it instead of returning a minimum-norm fit.

use nalgebra::{DMatrix, DVector};

/// Singular values below `RANK_RTOL * max(n, p) * σ_max` count as zero.
const RANK_RTOL: f64 = 1e-10;

/// Solve a full-column-rank least squares problem using SVD.
///
/// Returns `None` when `x` is rank deficient or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return None;
    }

    let eps = sigma_max * RANK_RTOL * x.nrows().max(x.ncols()) as f64;
    if svd.rank(eps) < x.ncols() {
        return None;
    }

    let beta = svd.solve(y, eps).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Coefficient of determination for fitted values `y_hat` against `y`.
///
/// Returns 1.0 for a constant target that is reproduced exactly.
pub fn r_squared(y: &DVector<f64>, y_hat: &DVector<f64>) -> f64 {
    let n = y.len() as f64;
    if n == 0.0 {
        return f64::NAN;
    }
    let mean = y.sum() / n;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y.iter().zip(y_hat.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
