//! Dilution-factor curve of one mode family.
//!
//! The curve maps mode frequency to the fraction of elastic energy stored in
//! the substrate. It is the only source of substrate dilution in frequency
//! sweeps, so it also defines where substrate loss may be evaluated: every
//! query is an exact spline evaluation, and queries outside
//! `[first mode, last mode]` are rejected.

use std::path::Path;

use crate::error::{ModelError, ModelResult};
use crate::io::ingest::read_columns;
use crate::math::{CubicSpline, SplineBoundary};

#[derive(Debug, Clone)]
pub struct ModeDilutionCurve {
    frequencies: Vec<f64>,
    factors: Vec<f64>,
    spline: CubicSpline,
}

impl ModeDilutionCurve {
    pub const MIN_POINTS: usize = 4;

    pub fn new(frequencies: Vec<f64>, factors: Vec<f64>) -> ModelResult<Self> {
        if frequencies.len() < Self::MIN_POINTS {
            return Err(ModelError::InsufficientData {
                what: "dilution curve".to_string(),
                needed: Self::MIN_POINTS,
                got: frequencies.len(),
            });
        }
        let spline = CubicSpline::new("dilution curve", &frequencies, &factors, SplineBoundary::NotAKnot)?;
        Ok(Self {
            frequencies,
            factors,
            spline,
        })
    }

    /// Load a two-column `frequency dilution` file.
    pub fn from_file(path: &Path) -> ModelResult<Self> {
        let rows = read_columns(path, 2)?;
        let frequencies = rows.iter().map(|r| r[0]).collect();
        let factors = rows.iter().map(|r| r[1]).collect();
        Self::new(frequencies, factors).map_err(|err| match err {
            ModelError::MalformedInput { line, message, .. } => {
                ModelError::malformed(path.display().to_string(), line, message)
            }
            other => other,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        self.spline.domain()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Dilution factor at `frequency`, interpolated exactly at that frequency.
    pub fn factor_at(&self, frequency: f64) -> ModelResult<f64> {
        if !self.spline.contains(frequency) {
            let (min, max) = self.domain();
            return Err(ModelError::DomainExtrapolation {
                what: "dilution curve".to_string(),
                value: frequency,
                min,
                max,
            });
        }
        Ok(self.spline.evaluate(frequency))
    }

    pub fn factors_on(&self, grid: &[f64]) -> ModelResult<Vec<f64>> {
        grid.iter().map(|&f| self.factor_at(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> ModeDilutionCurve {
        ModeDilutionCurve::new(
            vec![390.0, 1100.0, 2200.0, 3600.0, 5400.0],
            vec![0.0021, 0.0034, 0.0040, 0.0047, 0.0051],
        )
        .unwrap()
    }

    #[test]
    fn endpoints_return_exact_knot_values() {
        let c = curve();
        assert_eq!(c.factor_at(390.0).unwrap(), 0.0021);
        assert_eq!(c.factor_at(5400.0).unwrap(), 0.0051);
        assert_eq!(c.factor_at(2200.0).unwrap(), 0.0040);
    }

    #[test]
    fn outside_domain_is_rejected() {
        let c = curve();
        for f in [389.999, 5400.001, 1e6] {
            match c.factor_at(f).unwrap_err() {
                ModelError::DomainExtrapolation { min, max, .. } => {
                    assert_eq!((min, max), (390.0, 5400.0));
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn interior_values_are_interpolated_not_snapped() {
        let c = curve();
        let v = c.factor_at(1500.0).unwrap();
        assert!(v > 0.0034 && v < 0.0040);
        assert_ne!(v, c.factor_at(1501.0).unwrap());
    }

    #[test]
    fn needs_four_modes() {
        let err = ModeDilutionCurve::new(vec![1.0, 2.0, 3.0], vec![0.1, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { needed: 4, got: 3, .. }));
    }
}
