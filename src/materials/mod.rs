//! Material descriptions: temperature-dependent property tables plus elastic constants.
//!
//! A [`MaterialSet`] is immutable once built and is passed explicitly into the
//! loss evaluator. Interpolants are built per run with [`MaterialCurves`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModelError, ModelResult};
use crate::math::{CubicSpline, SplineBoundary};

pub mod defaults;

pub use defaults::literature_set;

/// One tabulated quantity of one material versus temperature (K).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPropertyTable {
    pub name: String,
    pub temperatures: Vec<f64>,
    pub values: Vec<f64>,
}

impl MaterialPropertyTable {
    pub const MIN_POINTS: usize = 4;

    pub fn new(name: impl Into<String>, temperatures: Vec<f64>, values: Vec<f64>) -> ModelResult<Self> {
        let table = Self {
            name: name.into(),
            temperatures,
            values,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.temperatures.len() != self.values.len() {
            return Err(ModelError::malformed(
                &self.name,
                None,
                format!(
                    "{} temperatures but {} values",
                    self.temperatures.len(),
                    self.values.len()
                ),
            ));
        }
        if self.temperatures.len() < Self::MIN_POINTS {
            return Err(ModelError::InsufficientData {
                what: self.name.clone(),
                needed: Self::MIN_POINTS,
                got: self.temperatures.len(),
            });
        }
        if self.temperatures.iter().chain(&self.values).any(|v| !v.is_finite()) {
            return Err(ModelError::malformed(&self.name, None, "non-finite entry"));
        }
        if self.temperatures.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::malformed(
                &self.name,
                None,
                "temperatures must be strictly increasing",
            ));
        }
        Ok(())
    }

    /// Multiply every value by `factor` (unit conversion).
    pub fn scaled(mut self, factor: f64) -> Self {
        for v in &mut self.values {
            *v *= factor;
        }
        self
    }

    pub fn range(&self) -> (f64, f64) {
        (self.temperatures[0], self.temperatures[self.temperatures.len() - 1])
    }

    pub fn spline(&self) -> ModelResult<CubicSpline> {
        self.validate()?;
        CubicSpline::new(&self.name, &self.temperatures, &self.values, SplineBoundary::NotAKnot)
    }
}

/// A property table resampled onto a caller-chosen temperature grid.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedProfile {
    pub name: String,
    pub temperatures: Vec<f64>,
    pub values: Vec<f64>,
}

impl InterpolatedProfile {
    pub fn build(table: &MaterialPropertyTable, grid: &[f64]) -> ModelResult<Self> {
        let spline = table.spline()?;
        warn_if_extrapolating(&table.name, table.range(), grid);
        Ok(Self {
            name: table.name.clone(),
            temperatures: grid.to_vec(),
            values: spline.evaluate_many(grid),
        })
    }
}

fn warn_if_extrapolating(name: &str, (lo, hi): (f64, f64), grid: &[f64]) {
    let below = grid.iter().filter(|&&t| t < lo).count();
    let above = grid.iter().filter(|&&t| t > hi).count();
    if below + above > 0 {
        warn!(
            table = name,
            below, above, "extrapolating {name} outside its tabulated range [{lo}, {hi}] K"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialConstants {
    /// Young's modulus (Pa).
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    /// Bulk modulus (Pa).
    pub bulk_modulus: f64,
    /// Density (kg/m³).
    pub density: f64,
    /// Thickness (m).
    pub thickness: f64,
}

impl MaterialConstants {
    pub fn validate(&self, material: &str) -> ModelResult<()> {
        let positive = [
            ("youngs_modulus", self.youngs_modulus),
            ("bulk_modulus", self.bulk_modulus),
            ("density", self.density),
            ("thickness", self.thickness),
        ];
        for (what, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(ModelError::invalid(format!("{material}.{what}"), format!("must be > 0, got {v}")));
            }
        }
        // σ = 1/2 zeroes the perpendicular compliance and σ = 1 is a pole of the model.
        if !(self.poisson_ratio.is_finite() && self.poisson_ratio > -1.0 && self.poisson_ratio < 0.5) {
            return Err(ModelError::invalid(
                format!("{material}.poisson_ratio"),
                format!("must lie in (-1, 0.5), got {}", self.poisson_ratio),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub constants: MaterialConstants,
    /// Linear thermal expansion α (1/K).
    pub expansion: MaterialPropertyTable,
    /// Specific heat c_v (J/(kg·K)).
    pub specific_heat: MaterialPropertyTable,
    /// Thermal conductivity κ (W/(m·K)).
    pub conductivity: MaterialPropertyTable,
}

impl Material {
    pub fn validate(&self) -> ModelResult<()> {
        self.constants.validate(&self.name)?;
        self.expansion.validate()?;
        self.specific_heat.validate()?;
        self.conductivity.validate()?;
        Ok(())
    }

    /// Temperature interval covered by all three tables.
    pub fn temperature_range(&self) -> (f64, f64) {
        let tables = [&self.expansion, &self.specific_heat, &self.conductivity];
        let lo = tables.iter().map(|t| t.range().0).fold(f64::NEG_INFINITY, f64::max);
        let hi = tables.iter().map(|t| t.range().1).fold(f64::INFINITY, f64::min);
        (lo, hi)
    }
}

/// Total thickness of each material in an alternating two-material stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoatingStack {
    pub first_thickness: f64,
    pub second_thickness: f64,
}

impl CoatingStack {
    pub fn layered(layer_thickness: f64, first_layers: u32, second_layers: u32) -> Self {
        Self {
            first_thickness: layer_thickness * first_layers as f64,
            second_thickness: layer_thickness * second_layers as f64,
        }
    }

    /// Thickness fractions `(w₁, w₂)`.
    pub fn weights(&self) -> (f64, f64) {
        let total = self.first_thickness + self.second_thickness;
        (self.first_thickness / total, self.second_thickness / total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSet {
    pub substrate: Material,
    /// Coating material in contact with the substrate.
    pub coating: Material,
    /// Second stack material, used for effective-medium coating loss.
    pub coating2: Option<Material>,
    pub stack: CoatingStack,
}

impl MaterialSet {
    pub fn validate(&self) -> ModelResult<()> {
        self.substrate.validate()?;
        self.coating.validate()?;
        if let Some(c2) = &self.coating2 {
            c2.validate()?;
        }
        let (w1, w2) = self.stack.weights();
        if !(w1.is_finite() && w2.is_finite() && w1 >= 0.0 && w2 >= 0.0) {
            return Err(ModelError::invalid("stack", "layer thicknesses must be >= 0 with a positive total"));
        }
        Ok(())
    }

    /// Intersection of the tabulated ranges of every material in the set.
    pub fn temperature_range(&self) -> (f64, f64) {
        let mut range = self.substrate.temperature_range();
        for m in std::iter::once(&self.coating).chain(self.coating2.as_ref()) {
            let (lo, hi) = m.temperature_range();
            range = (range.0.max(lo), range.1.min(hi));
        }
        range
    }

    pub fn tables(&self) -> Vec<&MaterialPropertyTable> {
        let mut out = Vec::new();
        for m in [Some(&self.substrate), Some(&self.coating), self.coating2.as_ref()].into_iter().flatten() {
            out.push(&m.expansion);
            out.push(&m.specific_heat);
            out.push(&m.conductivity);
        }
        out
    }
}

/// Interpolated thermal properties of one material at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalState {
    pub alpha: f64,
    pub specific_heat: f64,
    pub conductivity: f64,
}

/// Splines for one material, built once per run.
#[derive(Debug, Clone)]
pub struct MaterialCurves {
    pub name: String,
    pub constants: MaterialConstants,
    expansion: CubicSpline,
    specific_heat: CubicSpline,
    conductivity: CubicSpline,
    range: (f64, f64),
}

impl MaterialCurves {
    pub fn build(material: &Material) -> ModelResult<Self> {
        Ok(Self {
            name: material.name.clone(),
            constants: material.constants,
            expansion: material.expansion.spline()?,
            specific_heat: material.specific_heat.spline()?,
            conductivity: material.conductivity.spline()?,
            range: material.temperature_range(),
        })
    }

    pub fn at(&self, temperature: f64) -> ThermalState {
        ThermalState {
            alpha: self.expansion.evaluate(temperature),
            specific_heat: self.specific_heat.evaluate(temperature),
            conductivity: self.conductivity.evaluate(temperature),
        }
    }

    /// Log a warning when `temperatures` leave the tabulated range.
    pub fn check_range(&self, temperatures: &[f64]) {
        warn_if_extrapolating(&self.name, self.range, temperatures);
    }
}

/// Interpolants for a whole [`MaterialSet`].
#[derive(Debug, Clone)]
pub struct SetCurves {
    pub substrate: MaterialCurves,
    pub coating: MaterialCurves,
    pub coating2: Option<MaterialCurves>,
    pub stack: CoatingStack,
}

impl SetCurves {
    pub fn build(set: &MaterialSet) -> ModelResult<Self> {
        set.validate()?;
        Ok(Self {
            substrate: MaterialCurves::build(&set.substrate)?,
            coating: MaterialCurves::build(&set.coating)?,
            coating2: set.coating2.as_ref().map(MaterialCurves::build).transpose()?,
            stack: set.stack,
        })
    }

    pub fn check_range(&self, temperatures: &[f64]) {
        self.substrate.check_range(temperatures);
        self.coating.check_range(temperatures);
        if let Some(c2) = &self.coating2 {
            c2.check_range(temperatures);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rejects_short_input() {
        let err = MaterialPropertyTable::new("si.alpha", vec![1.0, 2.0, 3.0], vec![0.0; 3]).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                what: "si.alpha".into(),
                needed: 4,
                got: 3
            }
        );
    }

    #[test]
    fn table_rejects_unsorted_temperatures() {
        let err = MaterialPropertyTable::new("x", vec![1.0, 2.0, 2.0, 3.0], vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, ModelError::MalformedInput { .. }));
    }

    #[test]
    fn interpolated_profile_hits_knots() {
        let set = literature_set();
        let table = &set.substrate.conductivity;
        let profile = InterpolatedProfile::build(table, &table.temperatures).unwrap();
        for (got, want) in profile.values.iter().zip(&table.values) {
            assert!((got - want).abs() <= 1e-9 * want.abs());
        }
    }

    #[test]
    fn set_range_is_intersection() {
        let set = literature_set();
        assert_eq!(set.temperature_range(), (12.0, 300.0));
    }

    #[test]
    fn stack_weights_sum_to_one() {
        let (w1, w2) = CoatingStack::layered(266e-9, 11, 12).weights();
        assert!((w1 + w2 - 1.0).abs() < 1e-15);
        assert!((w1 - 11.0 / 23.0).abs() < 1e-15);
    }
}
