//! Weighted least squares.
//!
//! The bulk/shear decomposition solves small problems of the form
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2,   w_i = 1 / σ_i^2
//! ```
//!
//! Rows are scaled by `sqrt(w_i)` and the resulting ordinary least squares
//! problem is solved with SVD (nalgebra's QR solve only handles square systems).
//! Parameter covariance comes from `(XᵀWX)⁻¹`.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Loosen the singular-value cutoff step by step before giving up.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Weighted solve plus the unscaled covariance `(XᵀWX)⁻¹`.
#[derive(Debug, Clone)]
pub struct WeightedFit {
    pub beta: DVector<f64>,
    /// Weighted sum of squared residuals (χ²).
    pub chi2: f64,
    pub covariance: DMatrix<f64>,
}

pub fn weighted_least_squares(x: &DMatrix<f64>, y: &DVector<f64>, w: &[f64]) -> Option<WeightedFit> {
    let n = x.nrows();
    if y.len() != n || w.len() != n || w.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return None;
    }

    let mut xw = x.clone();
    let mut yw = y.clone();
    for i in 0..n {
        let sw = w[i].sqrt();
        xw.row_mut(i).scale_mut(sw);
        yw[i] *= sw;
    }

    let beta = solve_least_squares(&xw, &yw)?;
    let resid = &yw - &xw * &beta;
    let chi2 = resid.norm_squared();

    let normal = xw.transpose() * &xw;
    let covariance = normal.try_inverse()?;

    Some(WeightedFit {
        beta,
        chi2,
        covariance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn weights_pull_the_fit_toward_precise_points() {
        // Constant model; the heavily weighted point dominates the mean.
        let x = DMatrix::from_element(2, 1, 1.0);
        let y = DVector::from_row_slice(&[0.0, 10.0]);
        let fit = weighted_least_squares(&x, &y, &[1.0, 99.0]).unwrap();
        assert!((fit.beta[0] - 9.9).abs() < 1e-10);
        assert!((fit.covariance[(0, 0)] - 0.01).abs() < 1e-12);
    }
}
