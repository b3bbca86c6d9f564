//! Sweep orchestration.
//!
//! All three sweep modes go through one routine, [`evaluate_grid`], which
//! evaluates every `(T, f)` pair of a temperature list × frequency list. The
//! modes differ only in how they build the two lists:
//!
//! | mode | temperatures | frequencies |
//! |---|---|---|
//! | fixed temperature | `[T]` | dilution domain (linear) or broad range (log) |
//! | fixed frequency | material range (linear) | `[f]` |
//! | 2D | material range (linear) | dilution domain or 2D range (log) |
//!
//! Material properties are interpolated once per temperature; effective-medium
//! averages likewise. The first failing point aborts the sweep and the error
//! carries its coordinate.

use tracing::{debug, info};

use crate::data::ModeDilutionCurve;
use crate::domain::{
    Axis, CoatingModelConfig, ExtendedSeries, LossComponent, LossCurve, LossResult, LossSeries, LossSurface,
    LossToggles, ModelConfig, SurfaceSeries, SweepSpec,
};
use crate::error::{ModelError, ModelResult};
use crate::materials::{MaterialSet, SetCurves};
use crate::math::{lin_space, log_space};
use crate::models::{EffectiveMedium, LayerState, coating_loss, interface_loss, substrate_loss};

/// Resolved source of the substrate dilution factor.
#[derive(Debug, Clone, Copy)]
pub enum Dilution<'a> {
    None,
    Curve(&'a ModeDilutionCurve),
    Factor(f64),
}

/// Loss components at one `(T, f)` point. Disabled components are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLoss {
    pub interface: f64,
    pub substrate: Option<f64>,
    pub coating: Option<f64>,
}

impl PointLoss {
    pub fn total(&self) -> f64 {
        self.interface + self.substrate.unwrap_or(0.0) + self.coating.unwrap_or(0.0)
    }
}

/// Grid values indexed `[temperature][frequency]`, one matrix per enabled component.
#[derive(Debug, Clone, PartialEq)]
pub struct GridValues {
    pub interface: Vec<Vec<f64>>,
    pub substrate: Option<Vec<Vec<f64>>>,
    pub coating: Option<Vec<Vec<f64>>>,
    pub total: Vec<Vec<f64>>,
}

impl GridValues {
    fn components(self) -> Vec<(LossComponent, Vec<Vec<f64>>)> {
        let mut out = vec![(LossComponent::Interface, self.interface)];
        if let Some(s) = self.substrate {
            out.push((LossComponent::Substrate, s));
        }
        if let Some(c) = self.coating {
            out.push((LossComponent::Coating, c));
        }
        out.push((LossComponent::Total, self.total));
        out
    }
}

/// Material states shared by every frequency at one temperature.
struct TemperatureSlice {
    substrate: LayerState,
    coating: LayerState,
    medium: EffectiveMedium,
}

impl TemperatureSlice {
    fn new(curves: &SetCurves, temperature: f64) -> Self {
        let substrate = LayerState::at(&curves.substrate, temperature);
        let coating = LayerState::at(&curves.coating, temperature);
        let second = curves.coating2.as_ref().map(|c| LayerState::at(c, temperature));
        let medium = EffectiveMedium::average(&coating, second.as_ref(), &curves.stack);
        Self {
            substrate,
            coating,
            medium,
        }
    }

    fn evaluate(
        &self,
        temperature: f64,
        frequency: f64,
        dilution: Option<f64>,
        toggles: &LossToggles,
        coating_model: &CoatingModelConfig,
    ) -> ModelResult<PointLoss> {
        let interface = interface_loss(&self.substrate, &self.coating, temperature, frequency)?.total();
        let substrate = match (toggles.substrate, dilution) {
            (true, Some(d)) => Some(substrate_loss(&self.substrate, d, temperature, frequency)?),
            (true, None) => return Err(missing_dilution()),
            (false, _) => None,
        };
        let coating = if toggles.coating {
            Some(coating_loss(
                &self.substrate,
                &self.coating,
                &self.medium,
                coating_model,
                temperature,
                frequency,
            )?)
        } else {
            None
        };
        Ok(PointLoss {
            interface,
            substrate,
            coating,
        })
    }
}

fn missing_dilution() -> ModelError {
    ModelError::invalid(
        "dilution",
        "substrate loss needs a dilution curve (--dilution-curve) or a dilution factor (--dilution-factor)",
    )
}

/// Evaluate one point (builds the material state for `temperature` on the fly).
pub fn evaluate_point(
    curves: &SetCurves,
    temperature: f64,
    frequency: f64,
    dilution: Option<f64>,
    toggles: &LossToggles,
    coating_model: &CoatingModelConfig,
) -> ModelResult<PointLoss> {
    TemperatureSlice::new(curves, temperature)
        .evaluate(temperature, frequency, dilution, toggles, coating_model)
        .map_err(|e| e.at_point(temperature, frequency))
}

/// Evaluate every `(T, f)` pair of `temperatures × frequencies`.
///
/// `dilution` must have one entry per frequency when substrate loss is enabled.
pub fn evaluate_grid(
    curves: &SetCurves,
    temperatures: &[f64],
    frequencies: &[f64],
    dilution: Option<&[f64]>,
    toggles: &LossToggles,
    coating_model: &CoatingModelConfig,
) -> ModelResult<GridValues> {
    if let Some(d) = dilution {
        if d.len() != frequencies.len() {
            return Err(ModelError::invalid(
                "dilution",
                format!("{} factors for {} frequencies", d.len(), frequencies.len()),
            ));
        }
    }
    curves.check_range(temperatures);

    let rows = temperatures.len();
    let mut interface = Vec::with_capacity(rows);
    let mut substrate = toggles.substrate.then(|| Vec::with_capacity(rows));
    let mut coating = toggles.coating.then(|| Vec::with_capacity(rows));
    let mut total = Vec::with_capacity(rows);

    for &t in temperatures {
        let slice = TemperatureSlice::new(curves, t);
        let n = frequencies.len();
        let (mut i_row, mut s_row, mut c_row, mut t_row) =
            (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));

        for (j, &f) in frequencies.iter().enumerate() {
            let d = dilution.map(|d| d[j]);
            let p = slice
                .evaluate(t, f, d, toggles, coating_model)
                .map_err(|e| e.at_point(t, f))?;
            i_row.push(p.interface);
            if let Some(v) = p.substrate {
                s_row.push(v);
            }
            if let Some(v) = p.coating {
                c_row.push(v);
            }
            t_row.push(p.total());
        }

        interface.push(i_row);
        if let Some(s) = substrate.as_mut() {
            s.push(s_row);
        }
        if let Some(c) = coating.as_mut() {
            c.push(c_row);
        }
        total.push(t_row);
    }

    Ok(GridValues {
        interface,
        substrate,
        coating,
        total,
    })
}

/// Result of one sweep plus the dilution factor applied (fixed-frequency runs).
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub result: LossResult,
    pub dilution_factor: Option<f64>,
}

/// Run the sweep selected by `config.sweep`.
pub fn run_sweep(materials: &MaterialSet, config: &ModelConfig, dilution: Dilution<'_>) -> ModelResult<SweepOutput> {
    let curves = SetCurves::build(materials)?;
    if config.losses.substrate && matches!(dilution, Dilution::None) {
        return Err(missing_dilution());
    }

    info!(sweep = %config.sweep.label(), substrate = config.losses.substrate, coating = config.losses.coating, "starting sweep");
    let out = match config.sweep {
        SweepSpec::FixedTemperature { temperature } => fixed_temperature(&curves, config, dilution, temperature)?,
        SweepSpec::FixedFrequency { frequency } => fixed_frequency(&curves, materials, config, dilution, frequency)?,
        SweepSpec::Sweep2D => surface(&curves, materials, config, dilution)?,
    };
    info!("sweep finished");
    Ok(out)
}

fn temperature_grid(materials: &MaterialSet, config: &ModelConfig, steps: usize) -> ModelResult<Vec<f64>> {
    let (lo, hi) = config.grid.temperature_range.unwrap_or_else(|| materials.temperature_range());
    lin_space(lo, hi, steps)
}

fn curve_factors(curve: &ModeDilutionCurve, frequencies: &[f64], enabled: bool) -> ModelResult<Option<Vec<f64>>> {
    if enabled { curve.factors_on(frequencies).map(Some) } else { Ok(None) }
}

fn fixed_temperature(
    curves: &SetCurves,
    config: &ModelConfig,
    dilution: Dilution<'_>,
    temperature: f64,
) -> ModelResult<SweepOutput> {
    let toggles = &config.losses;
    let steps = config.grid.resolution;
    let (broad_lo, broad_hi) = config.grid.frequency_range;

    let (frequencies, factors, cut_to_domain) = match dilution {
        Dilution::Curve(curve) if toggles.substrate || toggles.coating => {
            let (lo, hi) = curve.domain();
            let grid = lin_space(lo, hi, steps)?;
            let factors = curve_factors(curve, &grid, toggles.substrate)?;
            (grid, factors, true)
        }
        Dilution::Factor(d) => {
            let grid = log_space(broad_lo, broad_hi, steps)?;
            let factors = toggles.substrate.then(|| vec![d; grid.len()]);
            (grid, factors, false)
        }
        _ => (log_space(broad_lo, broad_hi, steps)?, None, false),
    };
    debug!(points = frequencies.len(), cut_to_domain, "fixed-temperature frequency grid");

    let values = evaluate_grid(
        curves,
        &[temperature],
        &frequencies,
        factors.as_deref(),
        toggles,
        &config.coating_model,
    )?;

    let extended_interface = if cut_to_domain && toggles.extended_interface {
        let broad = log_space(broad_lo, broad_hi, steps)?;
        let interface_only = LossToggles::default();
        let ext = evaluate_grid(curves, &[temperature], &broad, None, &interface_only, &config.coating_model)?;
        Some(ExtendedSeries {
            x: broad,
            values: first_row(ext.interface),
        })
    } else {
        None
    };

    let series = values
        .components()
        .into_iter()
        .map(|(component, rows)| LossSeries {
            component,
            values: first_row(rows),
        })
        .collect();

    Ok(SweepOutput {
        result: LossResult::Curve(LossCurve {
            axis: Axis::Frequency,
            fixed: temperature,
            x: frequencies,
            series,
            extended_interface,
        }),
        dilution_factor: None,
    })
}

fn fixed_frequency(
    curves: &SetCurves,
    materials: &MaterialSet,
    config: &ModelConfig,
    dilution: Dilution<'_>,
    frequency: f64,
) -> ModelResult<SweepOutput> {
    let toggles = &config.losses;
    let temperatures = temperature_grid(materials, config, config.grid.resolution)?;

    let factor = if toggles.substrate {
        match dilution {
            Dilution::Curve(curve) => Some(curve.factor_at(frequency)?),
            Dilution::Factor(d) => Some(d),
            Dilution::None => return Err(missing_dilution()),
        }
    } else {
        None
    };
    if let Some(d) = factor {
        info!(frequency, dilution = d, "dilution factor for fixed-frequency sweep");
    }

    let factors = factor.map(|d| [d]);
    let values = evaluate_grid(
        curves,
        &temperatures,
        &[frequency],
        factors.as_ref().map(|d| d.as_slice()),
        toggles,
        &config.coating_model,
    )?;

    let series = values
        .components()
        .into_iter()
        .map(|(component, rows)| LossSeries {
            component,
            values: rows.into_iter().map(|r| r[0]).collect(),
        })
        .collect();

    Ok(SweepOutput {
        result: LossResult::Curve(LossCurve {
            axis: Axis::Temperature,
            fixed: frequency,
            x: temperatures,
            series,
            extended_interface: None,
        }),
        dilution_factor: factor,
    })
}

fn surface(
    curves: &SetCurves,
    materials: &MaterialSet,
    config: &ModelConfig,
    dilution: Dilution<'_>,
) -> ModelResult<SweepOutput> {
    let toggles = &config.losses;
    let steps = config.grid.resolution_2d;
    let temperatures = temperature_grid(materials, config, steps)?;

    let (frequencies, factors) = match dilution {
        Dilution::Curve(curve) if toggles.substrate => {
            let (lo, hi) = curve.domain();
            let grid = log_space(lo, hi, steps)?;
            let factors = curve_factors(curve, &grid, true)?;
            (grid, factors)
        }
        Dilution::Factor(d) if toggles.substrate => {
            let (lo, hi) = config.grid.frequency_range_2d;
            let grid = log_space(lo, hi, steps)?;
            let factors = Some(vec![d; grid.len()]);
            (grid, factors)
        }
        _ => {
            let (lo, hi) = config.grid.frequency_range_2d;
            (log_space(lo, hi, steps)?, None)
        }
    };
    debug!(temperatures = temperatures.len(), frequencies = frequencies.len(), "2D grid");

    let values = evaluate_grid(
        curves,
        &temperatures,
        &frequencies,
        factors.as_deref(),
        toggles,
        &config.coating_model,
    )?;

    let series = values
        .components()
        .into_iter()
        .map(|(component, values)| SurfaceSeries { component, values })
        .collect();

    Ok(SweepOutput {
        result: LossResult::Surface(LossSurface {
            frequency: frequencies,
            temperature: temperatures,
            series,
        }),
        dilution_factor: None,
    })
}

fn first_row(rows: Vec<Vec<f64>>) -> Vec<f64> {
    rows.into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DilutionSource, GridConfig};
    use crate::materials::literature_set;

    fn config(sweep: SweepSpec, losses: LossToggles) -> ModelConfig {
        ModelConfig {
            sweep,
            grid: GridConfig {
                resolution: 50,
                resolution_2d: 8,
                ..GridConfig::default()
            },
            losses,
            dilution: DilutionSource::None,
            coating_model: CoatingModelConfig::default(),
        }
    }

    fn modes() -> ModeDilutionCurve {
        ModeDilutionCurve::new(
            vec![390.0, 1100.0, 2200.0, 3600.0, 5400.0],
            vec![0.0021, 0.0034, 0.0040, 0.0047, 0.0051],
        )
        .unwrap()
    }

    fn curve(out: &SweepOutput) -> &LossCurve {
        match &out.result {
            LossResult::Curve(c) => c,
            LossResult::Surface(_) => panic!("expected a curve"),
        }
    }

    #[test]
    fn interface_only_fixed_temperature_uses_broad_log_grid() {
        let cfg = config(SweepSpec::FixedTemperature { temperature: 300.0 }, LossToggles::default());
        let out = run_sweep(&literature_set(), &cfg, Dilution::None).unwrap();
        let c = curve(&out);
        assert_eq!(c.axis, Axis::Frequency);
        assert_eq!(c.x.len(), 50);
        assert_eq!(c.x[0], 1e-3);
        assert_eq!(c.x[49], 1e10);
        let components: Vec<_> = c.series.iter().map(|s| s.component).collect();
        assert_eq!(components, vec![LossComponent::Interface, LossComponent::Total]);
        assert!(c.series[0].values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn substrate_sweep_is_cut_to_dilution_domain() {
        let losses = LossToggles {
            substrate: true,
            coating: true,
            extended_interface: true,
        };
        let cfg = config(SweepSpec::FixedTemperature { temperature: 122.0 }, losses);
        let modes = modes();
        let out = run_sweep(&literature_set(), &cfg, Dilution::Curve(&modes)).unwrap();
        let c = curve(&out);
        assert_eq!(c.x[0], 390.0);
        assert_eq!(c.x[49], 5400.0);

        let get = |k| &c.series(k).unwrap().values;
        for i in 0..c.x.len() {
            let sum = get(LossComponent::Interface)[i] + get(LossComponent::Substrate)[i] + get(LossComponent::Coating)[i];
            assert!((get(LossComponent::Total)[i] - sum).abs() <= 1e-15 * sum.abs());
        }

        let ext = c.extended_interface.as_ref().unwrap();
        assert_eq!(ext.x.len(), 50);
        assert_eq!(ext.x[0], 1e-3);
    }

    #[test]
    fn fixed_frequency_interpolates_dilution_exactly() {
        let losses = LossToggles {
            substrate: true,
            ..LossToggles::default()
        };
        let modes = modes();
        let cfg = config(SweepSpec::FixedFrequency { frequency: 1500.0 }, losses);
        let out = run_sweep(&literature_set(), &cfg, Dilution::Curve(&modes)).unwrap();
        assert_eq!(out.dilution_factor, Some(modes.factor_at(1500.0).unwrap()));

        let c = curve(&out);
        assert_eq!(c.axis, Axis::Temperature);
        assert_eq!((c.x[0], c.x[49]), (12.0, 300.0));

        // Same values as evaluating the point directly with that factor.
        let curves = SetCurves::build(&literature_set()).unwrap();
        let p = evaluate_point(&curves, c.x[10], 1500.0, out.dilution_factor, &losses, &cfg.coating_model).unwrap();
        assert_eq!(c.series(LossComponent::Substrate).unwrap().values[10], p.substrate.unwrap());
    }

    #[test]
    fn fixed_frequency_outside_dilution_domain_fails() {
        let losses = LossToggles {
            substrate: true,
            ..LossToggles::default()
        };
        let modes = modes();
        let cfg = config(SweepSpec::FixedFrequency { frequency: 100.0 }, losses);
        let err = run_sweep(&literature_set(), &cfg, Dilution::Curve(&modes)).unwrap_err();
        assert!(matches!(err, ModelError::DomainExtrapolation { value, .. } if value == 100.0));
    }

    #[test]
    fn substrate_without_dilution_is_rejected() {
        let losses = LossToggles {
            substrate: true,
            ..LossToggles::default()
        };
        let cfg = config(SweepSpec::Sweep2D, losses);
        let err = run_sweep(&literature_set(), &cfg, Dilution::None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn surface_has_temperature_major_shape() {
        let losses = LossToggles {
            substrate: true,
            ..LossToggles::default()
        };
        let modes = modes();
        let cfg = config(SweepSpec::Sweep2D, losses);
        let out = run_sweep(&literature_set(), &cfg, Dilution::Curve(&modes)).unwrap();
        let LossResult::Surface(s) = &out.result else {
            panic!("expected a surface");
        };
        assert_eq!(s.temperature.len(), 8);
        assert_eq!(s.frequency.len(), 8);
        assert_eq!((s.frequency[0], s.frequency[7]), (390.0, 5400.0));
        let total = s.series(LossComponent::Total).unwrap();
        assert_eq!(total.values.len(), 8);
        assert!(total.values.iter().all(|row| row.len() == 8));
    }

    #[test]
    fn singular_state_reports_grid_coordinate() {
        let mut set = literature_set();
        // Specific heat crossing zero inside the sweep range.
        set.coating.specific_heat.values = vec![-50.0, -10.0, 5.0, 20.0, 40.0, 100.0, 150.0, 300.0, 500.0];
        let cfg = config(SweepSpec::FixedFrequency { frequency: 390.0 }, LossToggles::default());
        let err = run_sweep(&set, &cfg, Dilution::None).unwrap_err();
        match err {
            ModelError::SingularModel { temperature, frequency, .. } => {
                assert_eq!(temperature, 12.0);
                assert_eq!(frequency, 390.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
