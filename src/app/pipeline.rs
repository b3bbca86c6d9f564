//! Shared workflows used by the CLI commands and the viewer.
//!
//! Keeping these in one place avoids duplicating the core steps:
//! config/materials -> dilution source -> sweep, and file ingest -> analysis.
//! The front-ends then focus on presentation (printing, plots, widgets).

use std::path::Path;

use tracing::{debug, info};

use crate::analysis::extract_coating_loss;
use crate::data::ModeDilutionCurve;
use crate::domain::{DilutionSource, ModelConfig, REFERENCE_FREQUENCY, SweepSpec};
use crate::error::{AppError, ModelResult};
use crate::fit::{Decomposition, DecompositionInput, DecompositionOptions, decompose};
use crate::io::config::FileConfig;
use crate::io::{MeasuredPoint, read_pairs, read_three_column};
use crate::materials::{MaterialSet, SetCurves, literature_set};
use crate::sweep::{Dilution, PointLoss, SweepOutput, evaluate_point, run_sweep};

/// All computed outputs of a single `ted model` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dilution_curve: Option<ModeDilutionCurve>,
    pub sweep: SweepOutput,
}

/// Literature materials with the config file's overrides applied.
pub fn resolve_materials(file: &FileConfig) -> ModelResult<MaterialSet> {
    file.materials.apply(literature_set())
}

pub fn load_dilution(source: &DilutionSource) -> ModelResult<Option<ModeDilutionCurve>> {
    match source {
        DilutionSource::Curve(path) => {
            let curve = ModeDilutionCurve::from_file(path)?;
            let (lo, hi) = curve.domain();
            debug!(path = %path.display(), lo, hi, "loaded dilution curve");
            Ok(Some(curve))
        }
        DilutionSource::Factor(_) | DilutionSource::None => Ok(None),
    }
}

/// Run the sweep with an already-loaded dilution curve.
pub fn run_model_with(
    config: &ModelConfig,
    materials: &MaterialSet,
    curve: Option<&ModeDilutionCurve>,
) -> ModelResult<SweepOutput> {
    let dilution = match (curve, &config.dilution) {
        (Some(curve), _) => Dilution::Curve(curve),
        (None, DilutionSource::Factor(d)) => Dilution::Factor(*d),
        (None, _) => Dilution::None,
    };
    run_sweep(materials, config, dilution)
}

/// Execute the full model pipeline and return the computed outputs.
pub fn run_model(config: &ModelConfig, materials: &MaterialSet) -> Result<RunOutput, AppError> {
    let dilution_curve = load_dilution(&config.dilution)?;
    let sweep = run_model_with(config, materials, dilution_curve.as_ref())?;
    Ok(RunOutput { dilution_curve, sweep })
}

/// One evaluated point used by `ted validate` to show that a config runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotCheck {
    pub temperature: f64,
    pub frequency: f64,
    pub dilution: Option<f64>,
    pub loss: PointLoss,
}

/// Evaluate the configured model at a single representative point.
///
/// The point is the fixed temperature or frequency of the sweep; the free
/// axis takes the first dilution-curve mode (or 390 Hz) and the top of the
/// temperature range.
pub fn spot_check(
    config: &ModelConfig,
    materials: &MaterialSet,
    curve: Option<&ModeDilutionCurve>,
) -> ModelResult<SpotCheck> {
    let (_, t_max) = config.grid.temperature_range.unwrap_or_else(|| materials.temperature_range());
    let default_frequency = curve.map(|c| c.domain().0).unwrap_or(REFERENCE_FREQUENCY);
    let (temperature, frequency) = match config.sweep {
        SweepSpec::FixedTemperature { temperature } => (temperature, default_frequency),
        SweepSpec::FixedFrequency { frequency } => (t_max, frequency),
        SweepSpec::Sweep2D => (t_max, default_frequency),
    };

    let dilution = match (curve, &config.dilution) {
        _ if !config.losses.substrate => None,
        (Some(curve), _) => Some(curve.factor_at(frequency)?),
        (None, DilutionSource::Factor(d)) => Some(*d),
        (None, _) => None,
    };
    let curves = SetCurves::build(materials)?;
    let loss = evaluate_point(
        &curves,
        temperature,
        frequency,
        dilution,
        &config.losses,
        &config.coating_model,
    )?;
    Ok(SpotCheck {
        temperature,
        frequency,
        dilution,
        loss,
    })
}

/// Coating loss (φ) from total and substrate loss files.
pub fn run_coat_loss(total: &Path, substrate: &Path, dilution: f64) -> ModelResult<Vec<MeasuredPoint>> {
    let total_points = read_three_column(total)?;
    let substrate_points = read_three_column(substrate)?;
    info!(
        total = total_points.len(),
        substrate = substrate_points.len(),
        dilution,
        "extracting coating loss"
    );
    extract_coating_loss(&total_points, &substrate_points, dilution)
}

#[derive(Debug, Clone)]
pub struct DecomposeRun {
    pub input: DecompositionInput,
    pub fit: Decomposition,
}

impl DecomposeRun {
    /// `f φ_fit 0` rows.
    pub fn fitted_rows(&self) -> Vec<[f64; 3]> {
        self.input
            .frequencies
            .iter()
            .zip(&self.fit.fitted)
            .map(|(&f, &v)| [f, v, 0.0])
            .collect()
    }
}

/// Bulk/shear decomposition of a loss file against a row-aligned dilution file.
pub fn run_decompose(loss: &Path, dilution: &Path, options: &DecompositionOptions) -> ModelResult<DecomposeRun> {
    let points = read_three_column(loss)?;
    let factors = read_pairs(dilution)?;
    let input = DecompositionInput::new(&points, &factors)?;
    let fit = decompose(&input, options)?;
    Ok(DecomposeRun { input, fit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GridConfig, LossResult, LossToggles, SweepSpec};

    #[test]
    fn interface_only_run_needs_no_dilution() {
        let config = ModelConfig {
            sweep: SweepSpec::FixedTemperature { temperature: 300.0 },
            grid: GridConfig {
                resolution: 16,
                ..Default::default()
            },
            losses: LossToggles::default(),
            dilution: DilutionSource::None,
            coating_model: Default::default(),
        };
        let run = run_model(&config, &literature_set()).unwrap();
        assert!(run.dilution_curve.is_none());
        let LossResult::Curve(curve) = &run.sweep.result else {
            panic!("expected a curve");
        };
        assert_eq!(curve.x.len(), 16);
    }

    #[test]
    fn direct_factor_is_used_without_a_curve() {
        let config = ModelConfig {
            sweep: SweepSpec::FixedFrequency { frequency: 390.0 },
            grid: GridConfig {
                resolution: 8,
                ..Default::default()
            },
            losses: LossToggles {
                substrate: true,
                ..Default::default()
            },
            dilution: DilutionSource::Factor(0.5),
            coating_model: Default::default(),
        };
        let run = run_model(&config, &literature_set()).unwrap();
        assert_eq!(run.sweep.dilution_factor, Some(0.5));
    }

    #[test]
    fn spot_check_uses_first_mode_at_fixed_temperature() {
        let curve = ModeDilutionCurve::new(vec![1000.0, 2000.0, 3000.0, 4000.0], vec![0.2, 0.3, 0.35, 0.4]).unwrap();
        let config = ModelConfig {
            sweep: SweepSpec::FixedTemperature { temperature: 250.0 },
            grid: GridConfig::default(),
            losses: LossToggles {
                substrate: true,
                ..Default::default()
            },
            dilution: DilutionSource::None,
            coating_model: Default::default(),
        };
        let check = spot_check(&config, &literature_set(), Some(&curve)).unwrap();
        assert_eq!((check.temperature, check.frequency), (250.0, 1000.0));
        assert_eq!(check.dilution, Some(0.2));
        assert!(check.loss.interface > 0.0);
        assert!(check.loss.substrate.is_some_and(|s| s > 0.0));
        assert!(check.loss.coating.is_none());
    }

    #[test]
    fn spot_check_fixed_frequency_takes_top_of_range() {
        let config = ModelConfig {
            sweep: SweepSpec::FixedFrequency { frequency: 390.0 },
            grid: GridConfig::default(),
            losses: LossToggles::default(),
            dilution: DilutionSource::None,
            coating_model: Default::default(),
        };
        let check = spot_check(&config, &literature_set(), None).unwrap();
        assert_eq!((check.temperature, check.frequency), (300.0, 390.0));
        assert_eq!(check.loss.total(), check.loss.interface);
    }

    #[test]
    fn missing_curve_file_is_an_input_error() {
        let err = run_model(
            &ModelConfig {
                sweep: SweepSpec::FixedFrequency { frequency: 390.0 },
                grid: GridConfig::default(),
                losses: LossToggles {
                    substrate: true,
                    ..Default::default()
                },
                dilution: DilutionSource::Curve("/nonexistent/ted/modes.txt".into()),
                coating_model: Default::default(),
            },
            &literature_set(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
