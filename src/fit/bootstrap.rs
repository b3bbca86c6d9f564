//! Parametric bootstrap for the bulk/shear decomposition.
//!
//! Each replicate draws `φ_i ~ N(φ_i, σ_i)` and refits over the same exponent
//! candidates. Replicate `r` is seeded with `seed + r`, so results do not depend
//! on how rayon schedules the work.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult};
use crate::fit::decompose::{DecompositionInput, DecompositionOptions, best_candidate};

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSummary {
    pub requested: usize,
    /// Replicates whose refit succeeded.
    pub used: usize,
    pub shear_std: f64,
    pub bulk_std: f64,
    pub exponent_std: f64,
}

fn resample(input: &DecompositionInput, seed: u64) -> Option<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    input
        .loss
        .iter()
        .zip(&input.sigma)
        .map(|(&mean, &sd)| Normal::new(mean, sd).ok().map(|d| d.sample(&mut rng)))
        .collect()
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

pub fn bootstrap(
    input: &DecompositionInput,
    options: &DecompositionOptions,
    exponents: &[f64],
) -> ModelResult<BootstrapSummary> {
    let requested = options.replicates;
    let fits: Vec<[f64; 3]> = (0..requested)
        .into_par_iter()
        .filter_map(|r| {
            let loss = resample(input, options.seed.wrapping_add(r as u64))?;
            let c = best_candidate(input, &loss, options.reference_frequency, exponents).ok()?;
            Some([c.beta[0], c.beta[1], c.exponent])
        })
        .collect();

    if fits.len() < 2 {
        return Err(ModelError::FitFailed {
            what: format!("bootstrap produced {} usable replicates of {requested}", fits.len()),
        });
    }
    if fits.len() < requested {
        warn!(used = fits.len(), requested, "some bootstrap replicates failed to refit");
    }
    debug!(replicates = fits.len(), "bootstrap finished");

    let column = |k: usize| fits.iter().map(|f| f[k]).collect::<Vec<_>>();
    Ok(BootstrapSummary {
        requested,
        used: fits.len(),
        shear_std: std_dev(&column(0)),
        bulk_std: std_dev(&column(1)),
        exponent_std: std_dev(&column(2)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::decompose::decompose;
    use crate::io::MeasuredPoint;

    fn input() -> DecompositionInput {
        let rows = [
            (390.0, 0.12, 0.88),
            (1100.0, 0.35, 0.60),
            (2200.0, 0.22, 0.75),
            (3600.0, 0.41, 0.55),
            (5400.0, 0.18, 0.80),
        ];
        let points: Vec<MeasuredPoint> = rows
            .iter()
            .map(|&(f, b, s)| MeasuredPoint {
                x: f,
                value: s * 2e-5 + b * 7e-5,
                sigma: 2e-6,
            })
            .collect();
        let dilution: Vec<(f64, f64)> = rows.iter().map(|&(_, b, s)| (b, s)).collect();
        DecompositionInput::new(&points, &dilution).unwrap()
    }

    fn options(seed: u64) -> DecompositionOptions {
        DecompositionOptions {
            replicates: 64,
            seed,
            ..DecompositionOptions::default()
        }
    }

    #[test]
    fn bootstrap_is_deterministic_per_seed() {
        let input = input();
        let a = bootstrap(&input, &options(7), &[0.0]).unwrap();
        let b = bootstrap(&input, &options(7), &[0.0]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.used, 64);

        let c = bootstrap(&input, &options(8), &[0.0]).unwrap();
        assert_ne!(a.shear_std, c.shear_std);
    }

    #[test]
    fn bootstrap_spread_is_comparable_to_standard_errors() {
        let input = input();
        let fit = decompose(&input, &options(1)).unwrap();
        let boot = fit.bootstrap.as_ref().unwrap();
        assert!(boot.shear_std > 0.0 && boot.bulk_std > 0.0);
        // Fixed exponent: no spread.
        assert_eq!(boot.exponent_std, 0.0);
        // Noise-free data have zero residual scatter; the bootstrap still sees σ.
        assert!(boot.bulk_std > 1e-7 && boot.bulk_std < 1e-4);
    }
}
