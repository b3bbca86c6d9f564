//! Interface thermoelastic damping of a coated plate.
//!
//! A coating and substrate with different expansion coefficients exchange heat
//! across their interface when the plate flexes. The loss splits into a
//! parallel (in-plane) and a perpendicular contribution:
//!
//! ```text
//! γ_x  = (1+i)·sqrt(π f c_x / κ_x)            q = γ_s L_s,  u = γ_c L_c
//! R    = sqrt(κ_c c_c / (κ_s c_s))
//! Δβ∥  = 2(α_c/c_c − α_s/c_s)
//! Δβ⊥  = α_c(1+σ_c)/(c_c(1−σ_c)) − α_s(1+σ_s)/(c_s(1−σ_s))
//! Θ_f  = Δβ / (cosh u + R sinh u coth q)
//! Θ_s  = −R Δβ / (coth u sinh q + R cosh q)
//! A    = (2σ_c−2) α_c Θ_f∥ sinh(u)/γ_c + (4−2σ_c) α_s L_c Θ_s∥ cosh q − 2 α_s Θ_s∥ sinh(q)/γ_s
//! B    = α_c Θ_f⊥ sinh(u)/γ_c + 2σ_c α_s/(1−σ_c) L_c Θ_s⊥ cosh q − (1+σ_s)/(1−σ_s) α_s Θ_s⊥ sinh(q)/γ_s
//! a    = 2L_c(1−σ_c)/E_c + 2L_s(1−σ_s)/E_s
//! b    = (1−2σ_c)(1+σ_c)L_c/(E_c(1−σ_c)) + (1−2σ_s)(1+σ_s)L_s/(E_s(1−σ_s))
//! φ∥   = 2T|Im A|/a,  φ⊥ = 2T|Im B|/b
//! ```
//!
//! Each `Θ·sinh`/`Θ·cosh` product is evaluated through `coth` only
//! (`D = coth u + R coth q`):
//!
//! ```text
//! Θ_f sinh(u)/γ_c = Δβ / (γ_c D)
//! Θ_s cosh(q)     = −R Δβ / (coth u / coth q + R)
//! Θ_s sinh(q)/γ_s = −R Δβ / (γ_s D)
//! ```

use num_complex::Complex64;

use super::{LayerState, check_point, finite};
use crate::error::ModelResult;
use crate::math::{coth, diffusive};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceLoss {
    pub parallel: f64,
    pub perpendicular: f64,
}

impl InterfaceLoss {
    pub fn total(&self) -> f64 {
        self.parallel + self.perpendicular
    }
}

/// The three Θ products for one Δβ.
#[derive(Debug, Clone, Copy)]
struct ThetaTerms {
    film_sinh: Complex64,
    sub_cosh: Complex64,
    sub_sinh: Complex64,
}

struct Wavenumbers {
    coating: Complex64,
    substrate: Complex64,
    coth_film: Complex64,
    coth_sub: Complex64,
    ratio: f64,
}

impl Wavenumbers {
    fn new(sub: &LayerState, coat: &LayerState, frequency: f64) -> Self {
        let pi_f = std::f64::consts::PI * frequency;
        let coating = diffusive(pi_f * coat.specific_heat / coat.conductivity);
        let substrate = diffusive(pi_f * sub.specific_heat / sub.conductivity);
        Self {
            coating,
            substrate,
            coth_film: coth(coating * coat.constants.thickness),
            coth_sub: coth(substrate * sub.constants.thickness),
            ratio: ((coat.conductivity * coat.specific_heat) / (sub.conductivity * sub.specific_heat)).sqrt(),
        }
    }

    fn theta(&self, delta_beta: f64) -> ThetaTerms {
        let r = self.ratio;
        let d = self.coth_film + r * self.coth_sub;
        ThetaTerms {
            film_sinh: delta_beta / (self.coating * d),
            sub_cosh: -r * delta_beta / (self.coth_film / self.coth_sub + r),
            sub_sinh: -r * delta_beta / (self.substrate * d),
        }
    }
}

fn mismatch(sub: &LayerState, coat: &LayerState) -> (f64, f64) {
    let (sc, ss) = (coat.constants.poisson_ratio, sub.constants.poisson_ratio);
    let parallel = 2.0 * (coat.alpha / coat.specific_heat - sub.alpha / sub.specific_heat);
    let perpendicular = coat.alpha * (1.0 + sc) / (coat.specific_heat * (1.0 - sc))
        - sub.alpha * (1.0 + ss) / (sub.specific_heat * (1.0 - ss));
    (parallel, perpendicular)
}

fn compliances(sub: &LayerState, coat: &LayerState) -> (f64, f64) {
    let (ec, sc, lc) = (coat.constants.youngs_modulus, coat.constants.poisson_ratio, coat.constants.thickness);
    let (es, ss, ls) = (sub.constants.youngs_modulus, sub.constants.poisson_ratio, sub.constants.thickness);
    let a = 2.0 * lc * (1.0 - sc) / ec + 2.0 * ls * (1.0 - ss) / es;
    let b = (1.0 - 2.0 * sc) * (1.0 + sc) * lc / (ec * (1.0 - sc))
        + (1.0 - 2.0 * ss) * (1.0 + ss) * ls / (es * (1.0 - ss));
    (a, b)
}

fn amplitudes(sub: &LayerState, coat: &LayerState, frequency: f64) -> (Complex64, Complex64) {
    let (sc, ss) = (coat.constants.poisson_ratio, sub.constants.poisson_ratio);
    let (ac, as_) = (coat.alpha, sub.alpha);
    let lc = coat.constants.thickness;

    let waves = Wavenumbers::new(sub, coat, frequency);
    let (dbp, dbn) = mismatch(sub, coat);
    let par = waves.theta(dbp);
    let perp = waves.theta(dbn);

    let a = (2.0 * sc - 2.0) * ac * par.film_sinh + (4.0 - 2.0 * sc) * as_ * lc * par.sub_cosh
        - 2.0 * as_ * par.sub_sinh;
    let b = ac * perp.film_sinh + 2.0 * sc * as_ / (1.0 - sc) * lc * perp.sub_cosh
        - (1.0 + ss) / (1.0 - ss) * as_ * perp.sub_sinh;
    (a, b)
}

/// Interface loss at one `(temperature, frequency)` point.
pub fn interface_loss(
    sub: &LayerState,
    coat: &LayerState,
    temperature: f64,
    frequency: f64,
) -> ModelResult<InterfaceLoss> {
    check_point(temperature, frequency)?;
    sub.check("substrate", temperature, frequency)?;
    coat.check("coating", temperature, frequency)?;

    let (big_a, big_b) = amplitudes(sub, coat, frequency);
    let (a, b) = compliances(sub, coat);

    let parallel = finite(2.0 * temperature * big_a.im.abs() / a, "parallel interface loss", temperature, frequency)?;
    let perpendicular = finite(
        2.0 * temperature * big_b.im.abs() / b,
        "perpendicular interface loss",
        temperature,
        frequency,
    )?;
    Ok(InterfaceLoss {
        parallel,
        perpendicular,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::states;
    use proptest::prelude::*;

    /// Textbook hyperbolic form, valid while cosh/sinh stay representable.
    fn amplitudes_direct(sub: &LayerState, coat: &LayerState, frequency: f64) -> (Complex64, Complex64) {
        let (sc, ss) = (coat.constants.poisson_ratio, sub.constants.poisson_ratio);
        let (ac, as_, lc, ls) = (coat.alpha, sub.alpha, coat.constants.thickness, sub.constants.thickness);
        let pi_f = std::f64::consts::PI * frequency;
        let gc = diffusive(pi_f * coat.specific_heat / coat.conductivity);
        let gs = diffusive(pi_f * sub.specific_heat / sub.conductivity);
        let (u, q) = (gc * lc, gs * ls);
        let r = ((coat.conductivity * coat.specific_heat) / (sub.conductivity * sub.specific_heat)).sqrt();
        let cothq = q.cosh() / q.sinh();
        let cothu = u.cosh() / u.sinh();
        let (dbp, dbn) = mismatch(sub, coat);
        let theta = |db: f64| {
            let tf = db / (u.cosh() + r * u.sinh() * cothq);
            let ts = -r * db / (cothu * q.sinh() + r * q.cosh());
            (tf, ts)
        };
        let (tfp, tsp) = theta(dbp);
        let (tfn, tsn) = theta(dbn);
        let a = (2.0 * sc - 2.0) * tfp * ac * u.sinh() / gc + (4.0 - 2.0 * sc) * as_ * tsp * q.cosh() * lc
            - 2.0 * as_ * tsp * q.sinh() / gs;
        let b = ac * tfn * u.sinh() / gc + 2.0 * sc * as_ / (1.0 - sc) * tsn * q.cosh() * lc
            - (1.0 + ss) / (1.0 - ss) * as_ * tsn * q.sinh() / gs;
        (a, b)
    }

    #[test]
    fn coth_form_matches_direct_form() {
        for &(t, f) in &[(300.0, 1.0), (300.0, 1e3), (122.0, 390.0), (50.0, 1e4), (12.0, 10.0)] {
            let (sub, coat, _) = states(t);
            let (a, b) = amplitudes(&sub, &coat, f);
            let (a0, b0) = amplitudes_direct(&sub, &coat, f);
            assert!((a - a0).norm() <= 1e-9 * a0.norm(), "A at T={t} f={f}: {a} vs {a0}");
            assert!((b - b0).norm() <= 1e-9 * b0.norm(), "B at T={t} f={f}: {b} vs {b0}");
        }
    }

    #[test]
    fn room_temperature_kilohertz_reference() {
        // Literature materials at 300 K, 1 kHz (all tables have a knot at 300 K).
        let (sub, coat, _) = states(300.0);
        let loss = interface_loss(&sub, &coat, 300.0, 1e3).unwrap();
        assert!((loss.parallel - 1.2739808967579424e-6).abs() < 1e-6 * 1.274e-6);
        assert!((loss.perpendicular - 7.338055898839905e-6).abs() < 1e-6 * 7.338e-6);
        assert!(loss.total() > 1e-8 && loss.total() < 1e-3);
    }

    #[test]
    fn identical_materials_have_no_interface_loss() {
        let (sub, _, _) = states(150.0);
        let mut coat = sub;
        coat.constants.thickness = 5e-6;
        let loss = interface_loss(&sub, &coat, 150.0, 2e3).unwrap();
        assert_eq!(loss.total(), 0.0);
    }

    #[test]
    fn expansion_sign_flip_leaves_loss_unchanged() {
        let (sub, coat, _) = states(200.0);
        let (mut sub_neg, mut coat_neg) = (sub, coat);
        sub_neg.alpha = -sub.alpha;
        coat_neg.alpha = -coat.alpha;
        let a = interface_loss(&sub, &coat, 200.0, 500.0).unwrap();
        let b = interface_loss(&sub_neg, &coat_neg, 200.0, 500.0).unwrap();
        assert!((a.total() - b.total()).abs() <= 1e-12 * a.total());
    }

    #[test]
    fn extreme_frequencies_stay_finite() {
        let (sub, coat, _) = states(12.0);
        for f in [1e-3, 1e10, 1e14] {
            let loss = interface_loss(&sub, &coat, 12.0, f).unwrap();
            assert!(loss.total().is_finite() && loss.total() >= 0.0, "f={f}");
        }
    }

    #[test]
    fn non_positive_specific_heat_is_singular() {
        let (sub, mut coat, _) = states(100.0);
        coat.specific_heat = 0.0;
        let err = interface_loss(&sub, &coat, 100.0, 1e3).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ModelError::SingularModel { temperature, frequency, .. }
                if temperature == 100.0 && frequency == 1e3
        ));
    }

    mod proptests {
        use super::*;

        proptest! {
            #[test]
            fn interface_loss_is_non_negative(t in 12.0f64..300.0, log_f in -3.0f64..10.0) {
                let f = 10f64.powf(log_f);
                let (sub, coat, _) = states(t);
                let loss = interface_loss(&sub, &coat, t, f).unwrap();
                prop_assert!(loss.parallel >= 0.0);
                prop_assert!(loss.perpendicular >= 0.0);
                prop_assert!(loss.total().is_finite());
            }
        }
    }
}
