//! Substrate bulk thermoelastic loss (single Debye peak).
//!
//! ```text
//! ω_peak = (κ_s / c_s)(π / L_s)²
//! φ_sub  = D (3α_s)² K_s T ω ω_peak / (c_s (ω² + ω_peak²)),   ω = 2πf
//! ```
//!
//! `D` is the dilution factor of the mode: the fraction of elastic energy
//! stored in the substrate.

use super::{LayerState, check_point, finite};
use crate::error::{ModelError, ModelResult};

/// Angular frequency of the substrate relaxation peak (rad/s).
pub fn debye_peak(sub: &LayerState) -> f64 {
    let k = std::f64::consts::PI / sub.constants.thickness;
    sub.conductivity / sub.specific_heat * k * k
}

pub fn substrate_loss(sub: &LayerState, dilution: f64, temperature: f64, frequency: f64) -> ModelResult<f64> {
    check_point(temperature, frequency)?;
    sub.check("substrate", temperature, frequency)?;
    if !(dilution.is_finite() && dilution >= 0.0) {
        return Err(ModelError::invalid("dilution factor", format!("must be finite and >= 0, got {dilution}")));
    }

    let omega = 2.0 * std::f64::consts::PI * frequency;
    let peak = debye_peak(sub);
    let strength = (3.0 * sub.alpha).powi(2) * sub.constants.bulk_modulus * temperature / sub.specific_heat;
    let loss = dilution * strength * omega * peak / (omega * omega + peak * peak);
    finite(loss, "substrate loss", temperature, frequency)
}
