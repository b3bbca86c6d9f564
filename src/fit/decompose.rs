//! Bulk/shear decomposition of measured coating loss.
//!
//! Given, per mode `i`:
//! - frequency `f_i`, measured loss `φ_i` and its standard deviation `σ_i`
//! - bulk and shear dilution factors `D_bu,i`, `D_sh,i`
//!
//! we fit
//!
//! ```text
//! φ_i = D_sh,i φ_shear + D_bu,i φ_bulk (f_i / f_ref)^n
//! ```
//!
//! For a fixed exponent `n` this is a 2-parameter weighted linear problem
//! (weights `1/σ²`). The exponent is fixed (`constant`: 0, `linear`: 1) or
//! chosen by grid search: every candidate is solved independently (in
//! parallel) and the lowest χ² wins, ties broken by grid index.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::BulkScaling;
use crate::error::{ModelError, ModelResult};
use crate::fit::bootstrap::{BootstrapSummary, bootstrap};
use crate::io::MeasuredPoint;
use crate::math::{lin_space, weighted_least_squares};

/// Fitted parameters: `[φ_shear, φ_bulk]`.
pub const PARAMETERS: usize = 2;
pub const MIN_ROWS: usize = 3;

/// Row-aligned measurements and dilution factors.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionInput {
    pub frequencies: Vec<f64>,
    pub loss: Vec<f64>,
    pub sigma: Vec<f64>,
    pub bulk_dilution: Vec<f64>,
    pub shear_dilution: Vec<f64>,
}

impl DecompositionInput {
    /// `dilution` rows are `(D_bulk, D_shear)`, aligned with `points`.
    pub fn new(points: &[MeasuredPoint], dilution: &[(f64, f64)]) -> ModelResult<Self> {
        if points.len() != dilution.len() {
            return Err(ModelError::malformed(
                "dilution file",
                None,
                format!("{} dilution rows for {} loss rows", dilution.len(), points.len()),
            ));
        }
        if points.len() < MIN_ROWS {
            return Err(ModelError::InsufficientData {
                what: "bulk/shear decomposition".to_string(),
                needed: MIN_ROWS,
                got: points.len(),
            });
        }
        for (i, p) in points.iter().enumerate() {
            if !(p.sigma.is_finite() && p.sigma > 0.0) {
                return Err(ModelError::malformed(
                    "loss file",
                    None,
                    format!("row {}: standard deviation must be > 0, got {}", i + 1, p.sigma),
                ));
            }
            if !(p.x.is_finite() && p.x > 0.0 && p.value.is_finite()) {
                return Err(ModelError::malformed(
                    "loss file",
                    None,
                    format!("row {}: frequency must be > 0 and loss finite", i + 1),
                ));
            }
        }
        if dilution.iter().any(|(b, s)| !(b.is_finite() && s.is_finite())) {
            return Err(ModelError::malformed("dilution file", None, "non-finite dilution factor"));
        }

        Ok(Self {
            frequencies: points.iter().map(|p| p.x).collect(),
            loss: points.iter().map(|p| p.value).collect(),
            sigma: points.iter().map(|p| p.sigma).collect(),
            bulk_dilution: dilution.iter().map(|d| d.0).collect(),
            shear_dilution: dilution.iter().map(|d| d.1).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loss.is_empty()
    }

    fn weights(&self) -> Vec<f64> {
        self.sigma.iter().map(|s| 1.0 / (s * s)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionOptions {
    pub scaling: BulkScaling,
    /// `f_ref` (Hz) in the bulk scaling term.
    pub reference_frequency: f64,
    /// Exponent search interval for [`BulkScaling::Fit`].
    pub exponent_range: (f64, f64),
    pub exponent_steps: usize,
    /// Bootstrap replicates (0 disables).
    pub replicates: usize,
    pub seed: u64,
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            scaling: BulkScaling::Constant,
            reference_frequency: 1000.0,
            exponent_range: (0.0, 2.0),
            exponent_steps: 41,
            replicates: 0,
            seed: 42,
        }
    }
}

impl DecompositionOptions {
    /// Candidate exponents for the configured scaling.
    pub fn exponents(&self) -> ModelResult<Vec<f64>> {
        match self.scaling {
            BulkScaling::Constant => Ok(vec![0.0]),
            BulkScaling::Linear => Ok(vec![1.0]),
            BulkScaling::Fit => {
                let (lo, hi) = self.exponent_range;
                if self.exponent_steps < 2 {
                    return Err(ModelError::invalid("exponent steps", "must be >= 2"));
                }
                lin_space(lo, hi, self.exponent_steps)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub scaling: BulkScaling,
    pub reference_frequency: f64,
    pub exponent: f64,
    pub phi_shear: f64,
    pub phi_bulk: f64,
    /// Standard errors from the covariance scaled by reduced χ².
    pub shear_error: f64,
    pub bulk_error: f64,
    pub chi2: f64,
    pub reduced_chi2: f64,
    pub dof: usize,
    pub candidates: usize,
    /// Model prediction at each input row.
    pub fitted: Vec<f64>,
    pub bootstrap: Option<BootstrapSummary>,
}

impl Decomposition {
    /// Bulk loss at `frequency`, `φ_bulk (f/f_ref)^n`.
    pub fn bulk_at(&self, frequency: f64) -> f64 {
        self.phi_bulk * (frequency / self.reference_frequency).powf(self.exponent)
    }
}

/// Best fit for one loss vector over a set of candidate exponents.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub idx: usize,
    pub exponent: f64,
    pub beta: [f64; PARAMETERS],
    pub chi2: f64,
    pub covariance: DMatrix<f64>,
}

fn design(input: &DecompositionInput, reference_frequency: f64, exponent: f64) -> DMatrix<f64> {
    let n = input.len();
    let mut x = DMatrix::<f64>::zeros(n, PARAMETERS);
    for i in 0..n {
        x[(i, 0)] = input.shear_dilution[i];
        x[(i, 1)] = input.bulk_dilution[i] * (input.frequencies[i] / reference_frequency).powf(exponent);
    }
    x
}

fn evaluate_candidate(
    input: &DecompositionInput,
    loss: &DVector<f64>,
    weights: &[f64],
    reference_frequency: f64,
    idx: usize,
    exponent: f64,
) -> Option<Candidate> {
    let x = design(input, reference_frequency, exponent);
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let fit = weighted_least_squares(&x, loss, weights)?;
    if !fit.chi2.is_finite() {
        return None;
    }
    Some(Candidate {
        idx,
        exponent,
        beta: [fit.beta[0], fit.beta[1]],
        chi2: fit.chi2,
        covariance: fit.covariance,
    })
}

/// Solve every candidate exponent and keep the lowest χ².
pub(crate) fn best_candidate(
    input: &DecompositionInput,
    loss: &[f64],
    reference_frequency: f64,
    exponents: &[f64],
) -> ModelResult<Candidate> {
    let y = DVector::from_column_slice(loss);
    let weights = input.weights();

    let candidates: Vec<Candidate> = exponents
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &n)| evaluate_candidate(input, &y, &weights, reference_frequency, idx, n))
        .collect();

    if candidates.is_empty() {
        return Err(ModelError::FitFailed {
            what: "no candidate exponent gave a solvable bulk/shear system".to_string(),
        });
    }

    // Deterministic selection: minimum χ², ties broken by grid index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.chi2 < best.chi2 || (c.chi2 == best.chi2 && c.idx < best.idx) {
            best = c;
        }
    }
    Ok(best.clone())
}

pub fn decompose(input: &DecompositionInput, options: &DecompositionOptions) -> ModelResult<Decomposition> {
    if !(options.reference_frequency.is_finite() && options.reference_frequency > 0.0) {
        return Err(ModelError::invalid(
            "reference frequency",
            format!("must be > 0, got {}", options.reference_frequency),
        ));
    }
    let exponents = options.exponents()?;
    debug!(rows = input.len(), candidates = exponents.len(), "bulk/shear decomposition");

    let best = best_candidate(input, &input.loss, options.reference_frequency, &exponents)?;

    let dof = input.len() - PARAMETERS;
    let reduced_chi2 = best.chi2 / dof as f64;
    let error = |k: usize| (best.covariance[(k, k)] * reduced_chi2).max(0.0).sqrt();

    let x = design(input, options.reference_frequency, best.exponent);
    let fitted = (x * DVector::from_column_slice(&best.beta)).iter().copied().collect();

    let bootstrap = if options.replicates > 0 {
        Some(bootstrap(input, options, &exponents)?)
    } else {
        None
    };

    info!(
        exponent = best.exponent,
        phi_shear = best.beta[0],
        phi_bulk = best.beta[1],
        chi2 = best.chi2,
        "decomposition finished"
    );

    Ok(Decomposition {
        scaling: options.scaling,
        reference_frequency: options.reference_frequency,
        exponent: best.exponent,
        phi_shear: best.beta[0],
        phi_bulk: best.beta[1],
        shear_error: error(0),
        bulk_error: error(1),
        chi2: best.chi2,
        reduced_chi2,
        dof,
        candidates: exponents.len(),
        fitted,
        bootstrap,
    })
}
