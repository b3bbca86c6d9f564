//! Coating loss from measured total loss and bare-substrate loss.
//!
//! ```text
//! φ_coat = φ_tot / D + (1 − 1/D) φ_sub
//! σ_coat = sqrt(σ_tot² / D + |1 − 1/D| σ_sub²)
//! ```
//!
//! `D` is the coating dilution factor of the mode. Substrate values are taken
//! at the total-loss temperature: exact match if present, otherwise linear
//! interpolation between neighbours, clamped to the end values outside the
//! substrate data.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::LossUnit;
use crate::error::{ModelError, ModelResult};
use crate::io::MeasuredPoint;

/// Substrate loss and σ at `x`, plus whether the lookup was clamped.
///
/// `substrate` must be sorted by `x`.
pub fn substrate_at(substrate: &[MeasuredPoint], x: f64) -> (f64, f64, bool) {
    let first = substrate[0];
    let last = substrate[substrate.len() - 1];
    if x <= first.x {
        return (first.value, first.sigma, x < first.x);
    }
    if x >= last.x {
        return (last.value, last.sigma, x > last.x);
    }

    let hi = substrate.partition_point(|p| p.x < x);
    let b = substrate[hi];
    if b.x == x {
        return (b.value, b.sigma, false);
    }
    let a = substrate[hi - 1];
    let w = (x - a.x) / (b.x - a.x);
    (
        a.value + w * (b.value - a.value),
        a.sigma + w * (b.sigma - a.sigma),
        false,
    )
}

/// Extract coating loss at every total-loss temperature.
pub fn extract_coating_loss(
    total: &[MeasuredPoint],
    substrate: &[MeasuredPoint],
    dilution: f64,
) -> ModelResult<Vec<MeasuredPoint>> {
    if !(dilution.is_finite() && dilution != 0.0) {
        return Err(ModelError::invalid(
            "dilution factor",
            format!("must be finite and non-zero, got {dilution}"),
        ));
    }
    if substrate.is_empty() {
        return Err(ModelError::InsufficientData {
            what: "substrate loss".to_string(),
            needed: 1,
            got: 0,
        });
    }

    let mut sorted = substrate.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

    let inv = 1.0 / dilution;
    let mut clamped = 0usize;
    let out = total
        .iter()
        .map(|p| {
            let (phi_sub, sigma_sub, was_clamped) = substrate_at(&sorted, p.x);
            clamped += usize::from(was_clamped);
            MeasuredPoint {
                x: p.x,
                value: inv * p.value + (1.0 - inv) * phi_sub,
                sigma: (inv * p.sigma * p.sigma + (1.0 - inv).abs() * sigma_sub * sigma_sub).sqrt(),
            }
        })
        .collect();

    if clamped > 0 {
        let (lo, hi) = (sorted[0].x, sorted[sorted.len() - 1].x);
        warn!(clamped, "{clamped} temperature(s) outside substrate data [{lo}, {hi}] used the end values");
    }
    Ok(out)
}

/// φ ± σ → Q ± σ_Q with `Q = 1/φ` and `σ_Q = 1/(φ−σ) − 1/(φ+σ)`.
pub fn to_quality(point: MeasuredPoint) -> MeasuredPoint {
    MeasuredPoint {
        x: point.x,
        value: 1.0 / point.value,
        sigma: 1.0 / (point.value - point.sigma) - 1.0 / (point.value + point.sigma),
    }
}

pub fn in_unit(points: &[MeasuredPoint], unit: LossUnit) -> Vec<MeasuredPoint> {
    match unit {
        LossUnit::Phi => points.to_vec(),
        LossUnit::Q => points.iter().copied().map(to_quality).collect(),
    }
}

/// `Coating <input name>` for φ, `Coating Mode <mode> Averaged Q.txt` for Q,
/// next to the input file.
pub fn default_output_path(input: &Path, unit: LossUnit, mode: Option<&str>) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let name = match unit {
        LossUnit::Phi => {
            let file = input.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
            format!("Coating {file}")
        }
        LossUnit::Q => match mode {
            Some(mode) => format!("Coating Mode {mode} Averaged Q.txt"),
            None => "Coating Averaged Q.txt".to_string(),
        },
    };
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, value: f64, sigma: f64) -> MeasuredPoint {
        MeasuredPoint { x, value, sigma }
    }

    #[test]
    fn matching_temperatures_use_formula_directly() {
        let total = [pt(12.0, 1e-4, 1e-6)];
        let sub = [pt(10.0, 5e-6, 1e-7), pt(12.0, 4e-6, 2e-7), pt(20.0, 8e-6, 1e-7)];
        let out = extract_coating_loss(&total, &sub, 0.1).unwrap();
        // 10·1e-4 + (1 − 10)·4e-6
        assert!((out[0].value - (1e-3 - 36e-6)).abs() < 1e-15);
        let sigma = (10.0 * 1e-12 + 9.0 * 4e-14_f64).sqrt();
        assert!((out[0].sigma - sigma).abs() < 1e-18);
    }

    #[test]
    fn recovers_known_coating_loss() {
        // Build a total loss from a known coating loss: φ_tot = D φ_c + (1 − D) φ_s.
        let d = 0.03;
        let sub = [pt(10.0, 2e-6, 0.0), pt(100.0, 6e-6, 0.0), pt(300.0, 1e-5, 0.0)];
        let coat = 4e-4;
        let total: Vec<_> = [10.0, 55.0, 200.0]
            .iter()
            .map(|&t| {
                let (s, _, _) = substrate_at(&sub, t);
                pt(t, d * coat + (1.0 - d) * s, 0.0)
            })
            .collect();
        let out = extract_coating_loss(&total, &sub, d).unwrap();
        for p in out {
            assert!((p.value - coat).abs() < 1e-15);
        }
    }

    #[test]
    fn interpolates_and_clamps_substrate() {
        let sub = [pt(10.0, 1.0, 0.1), pt(20.0, 3.0, 0.3)];
        let (v, s, clamped) = substrate_at(&sub, 15.0);
        assert!((v - 2.0).abs() < 1e-12 && (s - 0.2).abs() < 1e-12 && !clamped);
        assert_eq!(substrate_at(&sub, 5.0), (1.0, 0.1, true));
        assert_eq!(substrate_at(&sub, 25.0), (3.0, 0.3, true));
        assert_eq!(substrate_at(&sub, 20.0), (3.0, 0.3, false));
    }

    #[test]
    fn zero_dilution_is_rejected() {
        let err = extract_coating_loss(&[pt(1.0, 1.0, 0.0)], &[pt(1.0, 1.0, 0.0)], 0.0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn quality_factor_conversion() {
        let q = to_quality(pt(300.0, 1e-4, 1e-5));
        assert!((q.value - 1e4).abs() < 1e-8);
        let expected = 1.0 / 9e-5 - 1.0 / 1.1e-4;
        assert!((q.sigma - expected).abs() < 1e-8);
    }

    #[test]
    fn default_names_follow_unit() {
        let input = Path::new("data/Mode 3 Averaged Phi.txt");
        assert_eq!(
            default_output_path(input, LossUnit::Phi, None),
            PathBuf::from("data/Coating Mode 3 Averaged Phi.txt")
        );
        assert_eq!(
            default_output_path(input, LossUnit::Q, Some("3")),
            PathBuf::from("data/Coating Mode 3 Averaged Q.txt")
        );
    }
}
