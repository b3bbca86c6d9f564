//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the sweep evaluator and the analysis commands
//! - exported to three-column text or JSON
//! - reloaded later for plotting or the interactive viewer

use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Default 1D resolution (points per sweep axis).
pub const DEFAULT_RESOLUTION: usize = 100_000;
/// Default 2D resolution (points per axis; cost is quadratic).
pub const DEFAULT_RESOLUTION_2D: usize = 1_000;
pub const DEFAULT_FREQUENCY_RANGE: (f64, f64) = (1e-3, 1e10);
pub const DEFAULT_FREQUENCY_RANGE_2D: (f64, f64) = (1e1, 1e6);
pub const DEFAULT_TAU_DIVISOR: f64 = 400_000.0;

/// Measured loss at 390 Hz used as regression markers on fixed-temperature plots.
pub const REFERENCE_FREQUENCY: f64 = 390.0;
pub const REFERENCE_POINTS: [(f64, f64); 3] = [(12.0, 6.78e-8), (122.0, 8.78e-8), (300.0, 2.44e-5)];

/// Sweep mode as selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SweepMode {
    /// Temperature fixed, frequency varies.
    FixedTemperature,
    /// Frequency fixed, temperature varies.
    FixedFrequency,
    /// Both vary (loss surface).
    #[value(name = "2d")]
    #[serde(rename = "2d")]
    Sweep2d,
}

/// Which independent variable(s) vary, with the fixed value where one is held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SweepSpec {
    FixedTemperature { temperature: f64 },
    FixedFrequency { frequency: f64 },
    #[serde(rename = "2d")]
    Sweep2D,
}

impl SweepSpec {
    pub fn label(&self) -> String {
        match self {
            Self::FixedTemperature { temperature } => format!("fixed temperature {temperature} K"),
            Self::FixedFrequency { frequency } => format!("fixed frequency {frequency} Hz"),
            Self::Sweep2D => "temperature × frequency surface".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossComponent {
    Interface,
    Substrate,
    Coating,
    Total,
}

impl LossComponent {
    pub const ALL: [LossComponent; 4] = [Self::Interface, Self::Substrate, Self::Coating, Self::Total];

    pub fn name(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Substrate => "substrate",
            Self::Coating => "coating",
            Self::Total => "total",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Interface => "Interface",
            Self::Substrate => "Substrate",
            Self::Coating => "Coating",
            Self::Total => "Total",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Frequency,
    Temperature,
}

impl Axis {
    pub fn label(self) -> &'static str {
        match self {
            Self::Frequency => "frequency (Hz)",
            Self::Temperature => "temperature (K)",
        }
    }

    /// Frequency axes span decades and are plotted in log scale.
    pub fn is_log(self) -> bool {
        matches!(self, Self::Frequency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSeries {
    pub component: LossComponent,
    pub values: Vec<f64>,
}

/// Interface loss on the broad frequency grid, outside the dilution-curve domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedSeries {
    pub x: Vec<f64>,
    pub values: Vec<f64>,
}

/// 1D result: every series aligned on `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossCurve {
    pub axis: Axis,
    /// Value of the variable held fixed (K or Hz).
    pub fixed: f64,
    pub x: Vec<f64>,
    pub series: Vec<LossSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_interface: Option<ExtendedSeries>,
}

impl LossCurve {
    pub fn series(&self, component: LossComponent) -> Option<&LossSeries> {
        self.series.iter().find(|s| s.component == component)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSeries {
    pub component: LossComponent,
    /// Row-major, `values[temperature_index][frequency_index]`.
    pub values: Vec<Vec<f64>>,
}

/// 2D result over the Cartesian product of both grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSurface {
    pub frequency: Vec<f64>,
    pub temperature: Vec<f64>,
    pub series: Vec<SurfaceSeries>,
}

impl LossSurface {
    pub fn series(&self, component: LossComponent) -> Option<&SurfaceSeries> {
        self.series.iter().find(|s| s.component == component)
    }

    /// Row of the surface at `temperature[index]`, as a frequency curve.
    pub fn at_temperature(&self, index: usize) -> Option<LossCurve> {
        let fixed = *self.temperature.get(index)?;
        let series = self
            .series
            .iter()
            .map(|s| {
                Some(LossSeries {
                    component: s.component,
                    values: s.values.get(index)?.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(LossCurve {
            axis: Axis::Frequency,
            fixed,
            x: self.frequency.clone(),
            series,
            extended_interface: None,
        })
    }

    /// Column of the surface at `frequency[index]`, as a temperature curve.
    pub fn at_frequency(&self, index: usize) -> Option<LossCurve> {
        let fixed = *self.frequency.get(index)?;
        let series = self
            .series
            .iter()
            .map(|s| {
                Some(LossSeries {
                    component: s.component,
                    values: s.values.iter().map(|row| row.get(index).copied()).collect::<Option<Vec<_>>>()?,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(LossCurve {
            axis: Axis::Temperature,
            fixed,
            x: self.temperature.clone(),
            series,
            extended_interface: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LossResult {
    Curve(LossCurve),
    Surface(LossSurface),
}

impl LossResult {
    pub fn components(&self) -> Vec<LossComponent> {
        match self {
            Self::Curve(c) => c.series.iter().map(|s| s.component).collect(),
            Self::Surface(s) => s.series.iter().map(|s| s.component).collect(),
        }
    }

    /// Check that every series matches its grid.
    ///
    /// Curve series (and the full-range interface) have one value per `x`;
    /// surface series are `temperature.len()` rows of `frequency.len()` values.
    pub fn validate(&self, input: &str) -> ModelResult<()> {
        let mismatch = |what: String| Err(ModelError::malformed(input, None, what));
        match self {
            Self::Curve(c) => {
                for s in &c.series {
                    if s.values.len() != c.x.len() {
                        return mismatch(format!(
                            "{} series has {} values for {} grid points",
                            s.component.name(),
                            s.values.len(),
                            c.x.len()
                        ));
                    }
                }
                if let Some(ext) = &c.extended_interface {
                    if ext.values.len() != ext.x.len() {
                        return mismatch(format!(
                            "full-range interface has {} values for {} grid points",
                            ext.values.len(),
                            ext.x.len()
                        ));
                    }
                }
            }
            Self::Surface(surface) => {
                for s in &surface.series {
                    if s.values.len() != surface.temperature.len() {
                        return mismatch(format!(
                            "{} surface has {} rows for {} temperatures",
                            s.component.name(),
                            s.values.len(),
                            surface.temperature.len()
                        ));
                    }
                    if let Some((row, values)) =
                        s.values.iter().enumerate().find(|(_, r)| r.len() != surface.frequency.len())
                    {
                        return mismatch(format!(
                            "{} surface row {} has {} values for {} frequencies",
                            s.component.name(),
                            row + 1,
                            values.len(),
                            surface.frequency.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A saved loss result (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossFile {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub sweep: SweepSpec,
    /// Dilution factor applied in fixed-frequency runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dilution_factor: Option<f64>,
    pub result: LossResult,
}

/// Where the substrate dilution factor comes from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DilutionSource {
    #[default]
    None,
    /// Two-column `frequency dilution` file for one mode family.
    Curve(PathBuf),
    /// A single dilution factor for the mode of interest.
    Factor(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoatingModelConfig {
    /// τ = (L_c² c_c / κ_c) / tau_divisor.
    pub tau_divisor: f64,
    /// Fixed τ (s); overrides the divisor when set.
    pub tau: Option<f64>,
}

impl Default for CoatingModelConfig {
    fn default() -> Self {
        Self {
            tau_divisor: DEFAULT_TAU_DIVISOR,
            tau: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub resolution: usize,
    pub resolution_2d: usize,
    /// Broad frequency range (Hz) for interface-only fixed-temperature sweeps.
    pub frequency_range: (f64, f64),
    /// Frequency range (Hz) of 2D sweeps without a dilution curve.
    pub frequency_range_2d: (f64, f64),
    /// Temperature range (K); defaults to the range shared by all material tables.
    pub temperature_range: Option<(f64, f64)>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            resolution_2d: DEFAULT_RESOLUTION_2D,
            frequency_range: DEFAULT_FREQUENCY_RANGE,
            frequency_range_2d: DEFAULT_FREQUENCY_RANGE_2D,
            temperature_range: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LossToggles {
    pub substrate: bool,
    pub coating: bool,
    /// Also report interface loss on the broad grid when the sweep is cut to the dilution domain.
    pub extended_interface: bool,
}

/// Physics configuration of one evaluator run.
///
/// Built once (TOML file + CLI flags) and never mutated during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub sweep: SweepSpec,
    pub grid: GridConfig,
    pub losses: LossToggles,
    pub dilution: DilutionSource,
    pub coating_model: CoatingModelConfig,
}

/// Presentation/export options for a `ted model` run.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    /// Stem for three-column exports (`<stem>_<component>.txt`).
    pub export: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub svg: Option<PathBuf>,
    /// Measured `x φ σ` points drawn over the model.
    pub overlay: Option<PathBuf>,
    pub debug: bool,
}

/// How loss values are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LossUnit {
    /// Loss angle φ.
    Phi,
    /// Quality factor Q = 1/φ.
    Q,
}

impl LossUnit {
    pub fn label(self) -> &'static str {
        match self {
            Self::Phi => "φ",
            Self::Q => "Q",
        }
    }
}

/// Frequency dependence of the bulk loss term in the bulk/shear decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BulkScaling {
    /// φ_bulk independent of frequency.
    Constant,
    /// φ_bulk ∝ f.
    Linear,
    /// φ_bulk ∝ f^n with n found by grid search.
    Fit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Ms,
    S,
    Min,
    H,
}

impl TimeUnit {
    pub fn millis(self) -> f64 {
        match self {
            Self::Ms => 1.0,
            Self::S => 1_000.0,
            Self::Min => 60_000.0,
            Self::H => 3_600_000.0,
        }
    }

    /// File-name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Ms => "milliseconds",
            Self::S => "seconds",
            Self::Min => "minutes",
            Self::H => "hours",
        }
    }
}

/// Temperature-controller channels and their CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    SampleFloor,
    Stage,
    PulseTube,
    SampleHeat,
    ChHeat,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Self::SampleFloor,
        Self::Stage,
        Self::PulseTube,
        Self::SampleHeat,
        Self::ChHeat,
    ];

    pub fn column(self) -> usize {
        match self {
            Self::SampleFloor => 1,
            Self::Stage => 2,
            Self::PulseTube => 4,
            Self::SampleHeat => 7,
            Self::ChHeat => 12,
        }
    }

    pub fn file_tag(self) -> &'static str {
        match self {
            Self::SampleFloor => "SampleFloor",
            Self::Stage => "Stage",
            Self::PulseTube => "PulseTube",
            Self::SampleHeat => "SampleHeat",
            Self::ChHeat => "CH Heat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_result_json_tags() {
        let result = LossResult::Curve(LossCurve {
            axis: Axis::Frequency,
            fixed: 300.0,
            x: vec![1.0, 2.0],
            series: vec![LossSeries {
                component: LossComponent::Interface,
                values: vec![1e-9, 2e-9],
            }],
            extended_interface: None,
        });
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"kind\":\"curve\""));
        assert!(json.contains("\"component\":\"interface\""));
        let back: LossResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn surface_slices_follow_row_major_layout() {
        let surface = LossSurface {
            frequency: vec![10.0, 100.0, 1000.0],
            temperature: vec![50.0, 150.0],
            series: vec![SurfaceSeries {
                component: LossComponent::Total,
                values: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            }],
        };
        let row = surface.at_temperature(1).unwrap();
        assert_eq!(row.axis, Axis::Frequency);
        assert_eq!(row.fixed, 150.0);
        assert_eq!(row.series[0].values, vec![4.0, 5.0, 6.0]);

        let col = surface.at_frequency(2).unwrap();
        assert_eq!(col.axis, Axis::Temperature);
        assert_eq!(col.x, vec![50.0, 150.0]);
        assert_eq!(col.series[0].values, vec![3.0, 6.0]);

        assert!(surface.at_temperature(2).is_none());
    }

    const RAGGED_SURFACE: &str = r#"{"kind":"surface","frequency":[10,100],"temperature":[12,300],
        "series":[{"component":"total","values":[[1e-6,2e-6],[3e-6]]}]}"#;

    #[test]
    fn ragged_surface_is_rejected_and_slices_do_not_panic() {
        let result: LossResult = serde_json::from_str(RAGGED_SURFACE).unwrap();
        let err = result.validate("loss.json").unwrap_err();
        assert!(matches!(err, ModelError::MalformedInput { .. }));
        assert!(err.to_string().contains("row 2"));

        let LossResult::Surface(surface) = &result else {
            panic!("expected a surface");
        };
        assert!(surface.at_frequency(1).is_none());
        assert!(surface.at_frequency(0).is_some());
        assert!(surface.at_temperature(1).is_some());
    }

    #[test]
    fn curve_series_must_match_the_grid() {
        let mut curve = LossCurve {
            axis: Axis::Temperature,
            fixed: 390.0,
            x: vec![12.0, 300.0],
            series: vec![LossSeries {
                component: LossComponent::Interface,
                values: vec![1e-8, 1e-6],
            }],
            extended_interface: None,
        };
        assert!(LossResult::Curve(curve.clone()).validate("loss.json").is_ok());

        curve.extended_interface = Some(ExtendedSeries {
            x: vec![1.0, 10.0, 100.0],
            values: vec![1e-9],
        });
        assert!(LossResult::Curve(curve.clone()).validate("loss.json").is_err());

        curve.extended_interface = None;
        curve.series[0].values.pop();
        assert!(LossResult::Curve(curve).validate("loss.json").is_err());
    }

    #[test]
    fn sweep_spec_serializes_with_mode_tag() {
        let json = serde_json::to_string(&SweepSpec::FixedFrequency { frequency: 390.0 }).unwrap();
        assert_eq!(json, r#"{"mode":"fixed-frequency","frequency":390.0}"#);
    }
}
