//! Closed-form mechanical loss models.
//!
//! - `interface`: thermoelastic damping from the coating/substrate expansion mismatch
//! - `substrate`: bulk thermoelastic (Debye) peak of the substrate
//! - `coating`: effective-medium thermoelastic loss of a two-material stack
//!
//! Every model works on a [`LayerState`]: one material's interpolated thermal
//! properties at a single temperature, plus its elastic constants.

use crate::error::{ModelError, ModelResult};
use crate::materials::{MaterialConstants, MaterialCurves};

pub mod coating;
pub mod interface;
pub mod substrate;

pub use coating::{EffectiveMedium, coating_loss, relaxation_time};
pub use interface::{InterfaceLoss, interface_loss};
pub use substrate::{debye_peak, substrate_loss};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerState {
    /// Linear expansion α (1/K).
    pub alpha: f64,
    /// Specific heat c_v (J/(kg·K)).
    pub specific_heat: f64,
    /// Conductivity κ (W/(m·K)).
    pub conductivity: f64,
    pub constants: MaterialConstants,
}

impl LayerState {
    pub fn at(curves: &MaterialCurves, temperature: f64) -> Self {
        let s = curves.at(temperature);
        Self {
            alpha: s.alpha,
            specific_heat: s.specific_heat,
            conductivity: s.conductivity,
            constants: curves.constants,
        }
    }

    /// Thermal properties must be usable as divisors and under square roots.
    pub fn check(&self, material: &str, temperature: f64, frequency: f64) -> ModelResult<()> {
        let singular = |what: String| ModelError::SingularModel {
            what,
            temperature,
            frequency,
        };
        if !(self.specific_heat.is_finite() && self.specific_heat > 0.0) {
            return Err(singular(format!("{material} specific heat = {:e}", self.specific_heat)));
        }
        if !(self.conductivity.is_finite() && self.conductivity > 0.0) {
            return Err(singular(format!("{material} conductivity = {:e}", self.conductivity)));
        }
        if !self.alpha.is_finite() {
            return Err(singular(format!("{material} expansion is not finite")));
        }
        Ok(())
    }
}

pub(crate) fn check_point(temperature: f64, frequency: f64) -> ModelResult<()> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(ModelError::invalid("temperature", format!("must be > 0 K, got {temperature}")));
    }
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(ModelError::invalid("frequency", format!("must be > 0 Hz, got {frequency}")));
    }
    Ok(())
}

/// Fail with `SingularModel` instead of propagating NaN/inf.
pub(crate) fn finite(value: f64, what: &str, temperature: f64, frequency: f64) -> ModelResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::SingularModel {
            what: format!("{what} evaluated to {value}"),
            temperature,
            frequency,
        })
    }
}
