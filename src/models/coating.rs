//! Effective-medium thermoelastic loss of a multilayer coating.
//!
//! The two stack materials are averaged by thickness fraction, then the
//! coating is treated as a single film on the substrate:
//!
//! ```text
//! x      = sqrt(i ω τ)
//! g      = −sinh x / (x (cosh x + R sinh x)) = −1 / (x (coth x + R))
//! φ_coat = 2 c_c T / ⟨E/(1−σ)⟩ · (⟨Eα/(1−σ)⟩ / c_c − E_s α_s / ((1−σ_s) c_s))² · Im g
//! ```
//!
//! `τ` is a calibration knob rather than a derived constant: the thermal
//! diffusion time `L_c² c_c / κ_c` divided by `tau_divisor`, or a fixed value.

use num_complex::Complex64;

use super::{LayerState, check_point, finite};
use crate::domain::CoatingModelConfig;
use crate::error::ModelResult;
use crate::materials::CoatingStack;
use crate::math::coth;

/// Thickness-weighted averages of the stack's elastic quantities at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveMedium {
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub alpha: f64,
    /// ⟨E/(1−σ)⟩
    pub plane_modulus: f64,
    /// ⟨Eα/(1−σ)⟩
    pub plane_stress: f64,
}

impl EffectiveMedium {
    fn of(layer: &LayerState) -> Self {
        let e = layer.constants.youngs_modulus;
        let s = layer.constants.poisson_ratio;
        Self {
            youngs_modulus: e,
            poisson_ratio: s,
            alpha: layer.alpha,
            plane_modulus: e / (1.0 - s),
            plane_stress: e * layer.alpha / (1.0 - s),
        }
    }

    /// Average over the stack. Without a second material the first is used alone.
    pub fn average(first: &LayerState, second: Option<&LayerState>, stack: &CoatingStack) -> Self {
        let a = Self::of(first);
        let Some(second) = second else {
            return a;
        };
        let b = Self::of(second);
        let (w1, w2) = stack.weights();
        let mix = |x: f64, y: f64| w1 * x + w2 * y;
        Self {
            youngs_modulus: mix(a.youngs_modulus, b.youngs_modulus),
            poisson_ratio: mix(a.poisson_ratio, b.poisson_ratio),
            alpha: mix(a.alpha, b.alpha),
            plane_modulus: mix(a.plane_modulus, b.plane_modulus),
            plane_stress: mix(a.plane_stress, b.plane_stress),
        }
    }
}

/// Relaxation time τ (s) of the coating at its current thermal state.
pub fn relaxation_time(coat: &LayerState, config: &CoatingModelConfig) -> f64 {
    match config.tau {
        Some(tau) => tau,
        None => {
            let l = coat.constants.thickness;
            l * l * coat.specific_heat / coat.conductivity / config.tau_divisor
        }
    }
}

fn response(omega_tau: f64, ratio: f64) -> Complex64 {
    let x = (Complex64::new(0.0, omega_tau)).sqrt();
    -1.0 / (x * (coth(x) + ratio))
}

pub fn coating_loss(
    sub: &LayerState,
    coat: &LayerState,
    medium: &EffectiveMedium,
    config: &CoatingModelConfig,
    temperature: f64,
    frequency: f64,
) -> ModelResult<f64> {
    check_point(temperature, frequency)?;
    sub.check("substrate", temperature, frequency)?;
    coat.check("coating", temperature, frequency)?;

    let omega = 2.0 * std::f64::consts::PI * frequency;
    let tau = relaxation_time(coat, config);
    let ratio = ((coat.specific_heat * coat.conductivity) / (sub.specific_heat * sub.conductivity)).sqrt();
    let g = response(omega * tau, ratio);

    let prefactor = 2.0 * coat.specific_heat * temperature / medium.plane_modulus;
    let sub_stress = sub.constants.youngs_modulus * sub.alpha / ((1.0 - sub.constants.poisson_ratio) * sub.specific_heat);
    let mismatch = medium.plane_stress / coat.specific_heat - sub_stress;

    finite(prefactor * mismatch * mismatch * g.im, "coating loss", temperature, frequency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::defaults;
    use crate::models::fixtures::states;

    fn stack() -> CoatingStack {
        CoatingStack::layered(defaults::LAYER_THICKNESS, defaults::ALGAAS_LAYERS, defaults::GAAS_LAYERS)
    }

    #[test]
    fn single_material_medium_is_the_material() {
        let (_, coat, _) = states(300.0);
        let m = EffectiveMedium::average(&coat, None, &stack());
        assert_eq!(m.youngs_modulus, 8.36e10);
        assert!((m.plane_modulus - 8.36e10 / 0.6).abs() < 1.0);
    }

    #[test]
    fn medium_interpolates_between_materials() {
        let (_, c1, c2) = states(300.0);
        let m = EffectiveMedium::average(&c1, Some(&c2), &stack());
        let (w1, w2) = stack().weights();
        assert!((m.alpha - (w1 * c1.alpha + w2 * c2.alpha)).abs() < 1e-18);
        assert!(m.youngs_modulus > 8.36e10 && m.youngs_modulus < 8.53e10);
    }

    #[test]
    fn tau_override_and_divisor() {
        let (_, coat, _) = states(300.0);
        let cfg = CoatingModelConfig::default();
        let expected = 6.28e-6f64.powi(2) * coat.specific_heat / coat.conductivity / 400_000.0;
        assert!((relaxation_time(&coat, &cfg) - expected).abs() <= 1e-12 * expected);

        let fixed = CoatingModelConfig {
            tau: Some(1e-15),
            ..cfg
        };
        assert_eq!(relaxation_time(&coat, &fixed), 1e-15);
    }

    #[test]
    fn low_frequency_response_follows_square_root_law() {
        // Im g → R·sqrt(ωτ/2) as ωτ → 0.
        let r = 0.3;
        for wt in [1e-10, 1e-8] {
            let g = response(wt, r);
            let asymptote = r * (wt / 2.0).sqrt();
            assert!((g.im - asymptote).abs() < 1e-3 * asymptote, "ωτ={wt}");
        }
    }

    #[test]
    fn coating_loss_is_positive_and_finite() {
        let cfg = CoatingModelConfig::default();
        for t in [12.0, 122.0, 300.0] {
            let (sub, c1, c2) = states(t);
            let m = EffectiveMedium::average(&c1, Some(&c2), &stack());
            for f in [1.0, 390.0, 1e6, 1e12] {
                let v = coating_loss(&sub, &c1, &m, &cfg, t, f).unwrap();
                assert!(v.is_finite() && v >= 0.0, "T={t} f={f}: {v}");
            }
        }
    }
}
