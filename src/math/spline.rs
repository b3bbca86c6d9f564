//! Cubic spline interpolation for tabulated property curves.
//!
//! Material tables and dilution-factor curves are sparse (4–10 knots), so the
//! boundary condition matters a lot near the ends. The default is
//! **not-a-knot** (third derivative continuous across the second and
//! penultimate knots). A natural spline (zero curvature at the ends) is
//! available as well.
//!
//! The knot second derivatives are solved as a dense `n × n` system with LU.
//! `n` never exceeds a few dozen here.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// End condition used to close the spline system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplineBoundary {
    #[default]
    NotAKnot,
    Natural,
}

impl SplineBoundary {
    pub fn min_points(self) -> usize {
        match self {
            Self::NotAKnot => 4,
            Self::Natural => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Build a spline through `(xs[i], ys[i])`.
    ///
    /// `xs` must be strictly increasing and every value finite.
    pub fn new(what: &str, xs: &[f64], ys: &[f64], boundary: SplineBoundary) -> ModelResult<Self> {
        if xs.len() != ys.len() {
            return Err(ModelError::malformed(
                what,
                None,
                format!("{} abscissae but {} values", xs.len(), ys.len()),
            ));
        }
        let n = xs.len();
        if n < boundary.min_points() {
            return Err(ModelError::InsufficientData {
                what: what.to_string(),
                needed: boundary.min_points(),
                got: n,
            });
        }
        if let Some(i) = xs.iter().chain(ys.iter()).position(|v| !v.is_finite()) {
            return Err(ModelError::malformed(what, None, format!("non-finite value at position {i}")));
        }
        if let Some(i) = (1..n).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(ModelError::malformed(
                what,
                None,
                format!("abscissae must be strictly increasing (x[{i}]={} <= x[{}]={})", xs[i], i - 1, xs[i - 1]),
            ));
        }

        let m = if n == 2 {
            vec![0.0; 2]
        } else {
            solve_second_derivatives(what, xs, ys, boundary)?
        };

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn contains(&self, x: f64) -> bool {
        let (lo, hi) = self.domain();
        x >= lo && x <= hi
    }

    pub fn knots(&self) -> &[f64] {
        &self.xs
    }

    /// Evaluate at `x`. Outside the knot range the boundary cubic is extended.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        // Index of the first knot strictly greater than x, clamped to a valid interval.
        let hi = self.xs.partition_point(|&k| k <= x).clamp(1, n - 1);
        let lo = hi - 1;

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.m[lo] + (b * b * b - b) * self.m[hi]) * h * h / 6.0
    }

    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}

fn solve_second_derivatives(
    what: &str,
    xs: &[f64],
    ys: &[f64],
    boundary: SplineBoundary,
) -> ModelResult<Vec<f64>> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }

    match boundary {
        SplineBoundary::Natural => {
            a[(0, 0)] = 1.0;
            a[(n - 1, n - 1)] = 1.0;
        }
        SplineBoundary::NotAKnot => {
            // Piecewise third derivative (m[i+1]-m[i])/h[i] equal across knot 1 and knot n-2.
            a[(0, 0)] = h[1];
            a[(0, 1)] = -(h[0] + h[1]);
            a[(0, 2)] = h[0];
            a[(n - 1, n - 3)] = h[n - 2];
            a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
            a[(n - 1, n - 1)] = h[n - 3];
        }
    }

    let solution = a.lu().solve(&rhs).ok_or_else(|| {
        ModelError::invalid(what, "spline system is singular (check the knot spacing)")
    })?;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::invalid(what, "spline system produced non-finite curvature"));
    }
    Ok(solution.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_knots() {
        let xs = [12.0, 20.0, 50.0, 100.0, 122.0, 200.0, 300.0];
        let ys = [0.13e-8, -0.27e-8, -45e-8, -33e-8, -5e-8, 1.4e-6, 2.6e-6];
        for boundary in [SplineBoundary::NotAKnot, SplineBoundary::Natural] {
            let s = CubicSpline::new("alpha", &xs, &ys, boundary).unwrap();
            for (x, y) in xs.iter().zip(ys.iter()) {
                assert!((s.evaluate(*x) - y).abs() <= 1e-9 * y.abs().max(1e-12));
            }
        }
    }

    #[test]
    fn not_a_knot_reproduces_a_cubic_exactly() {
        // A single cubic satisfies the not-a-knot conditions, so the spline must equal it.
        let f = |x: f64| 0.5 * x * x * x - 2.0 * x * x + x - 3.0;
        let xs = [0.0, 1.0, 2.5, 3.0, 4.5, 6.0];
        let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
        let s = CubicSpline::new("cubic", &xs, &ys, SplineBoundary::NotAKnot).unwrap();
        for x in [0.3, 1.7, 2.9, 5.2, 6.5, -0.5] {
            assert!((s.evaluate(x) - f(x)).abs() < 1e-9, "x={x}");
        }
    }

    #[test]
    fn natural_spline_is_linear_for_linear_data() {
        let xs = [1.0, 2.0, 4.0];
        let ys = [3.0, 5.0, 9.0];
        let s = CubicSpline::new("line", &xs, &ys, SplineBoundary::Natural).unwrap();
        assert!((s.evaluate(3.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_short_or_unsorted_tables() {
        let err = CubicSpline::new("kappa", &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], SplineBoundary::NotAKnot)
            .unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { needed: 4, got: 3, .. }));

        let err = CubicSpline::new("kappa", &[1.0, 3.0, 2.0, 4.0], &[1.0; 4], SplineBoundary::NotAKnot)
            .unwrap_err();
        assert!(matches!(err, ModelError::MalformedInput { .. }));
    }
}
