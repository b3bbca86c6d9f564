//! TOML run configuration.
//!
//! Every field is optional: anything left out keeps its default, and command
//! line flags override file values. Material sections override individual
//! constants or whole tables of the literature set.
//!
//! ```toml
//! [sweep]
//! mode = "fixed-temperature"
//! temperature = 300.0
//! resolution = 20000
//!
//! [losses]
//! substrate = true
//! dilution_curve = "modes.txt"   # relative to this file
//!
//! [coating_model]
//! tau_divisor = 400000.0
//!
//! [materials.substrate]
//! thickness = 0.001
//!
//! [materials.coating.conductivity]
//! temperatures = [12.0, 50.0, 122.0, 300.0]
//! values = [300.0, 70.0, 20.0, 10.0]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::SweepMode;
use crate::error::{AppError, ModelResult};
use crate::materials::{CoatingStack, Material, MaterialPropertyTable, MaterialSet};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub sweep: SweepSection,
    #[serde(default)]
    pub losses: LossSection,
    #[serde(default)]
    pub coating_model: CoatingSection,
    #[serde(default)]
    pub materials: MaterialsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSection {
    pub mode: Option<SweepMode>,
    pub temperature: Option<f64>,
    pub frequency: Option<f64>,
    pub resolution: Option<usize>,
    pub resolution_2d: Option<usize>,
    pub frequency_range: Option<[f64; 2]>,
    pub frequency_range_2d: Option<[f64; 2]>,
    pub temperature_range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossSection {
    pub substrate: Option<bool>,
    pub coating: Option<bool>,
    pub extended_interface: Option<bool>,
    pub dilution_curve: Option<PathBuf>,
    pub dilution_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoatingSection {
    pub tau_divisor: Option<f64>,
    pub tau: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialsSection {
    pub substrate: Option<MaterialOverride>,
    pub coating: Option<MaterialOverride>,
    pub coating2: Option<MaterialOverride>,
    pub stack: Option<StackSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialOverride {
    /// `false` drops the material (only meaningful for `coating2`).
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub name: Option<String>,
    pub youngs_modulus: Option<f64>,
    pub poisson_ratio: Option<f64>,
    pub bulk_modulus: Option<f64>,
    pub density: Option<f64>,
    pub thickness: Option<f64>,
    pub expansion: Option<TableSpec>,
    pub specific_heat: Option<TableSpec>,
    pub conductivity: Option<TableSpec>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub temperatures: Vec<f64>,
    pub values: Vec<f64>,
    /// Unit conversion applied to `values` (e.g. 1000 for J/(g·K) → J/(kg·K)).
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StackSection {
    Layers {
        layer_thickness: f64,
        first_layers: u32,
        second_layers: u32,
    },
    Totals {
        first_thickness: f64,
        second_thickness: f64,
    },
}

impl StackSection {
    fn stack(&self) -> CoatingStack {
        match *self {
            Self::Layers {
                layer_thickness,
                first_layers,
                second_layers,
            } => CoatingStack::layered(layer_thickness, first_layers, second_layers),
            Self::Totals {
                first_thickness,
                second_thickness,
            } => CoatingStack {
                first_thickness,
                second_thickness,
            },
        }
    }
}

impl TableSpec {
    fn table(&self, name: String) -> ModelResult<MaterialPropertyTable> {
        Ok(MaterialPropertyTable::new(name, self.temperatures.clone(), self.values.clone())?.scaled(self.scale))
    }
}

impl MaterialOverride {
    pub fn apply(&self, mut base: Material) -> ModelResult<Material> {
        if let Some(name) = &self.name {
            base.name = name.clone();
        }
        let c = &mut base.constants;
        let fields = [
            (&mut c.youngs_modulus, self.youngs_modulus),
            (&mut c.poisson_ratio, self.poisson_ratio),
            (&mut c.bulk_modulus, self.bulk_modulus),
            (&mut c.density, self.density),
            (&mut c.thickness, self.thickness),
        ];
        for (slot, value) in fields {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(spec) = &self.expansion {
            base.expansion = spec.table(format!("{}.expansion", base.name))?;
        }
        if let Some(spec) = &self.specific_heat {
            base.specific_heat = spec.table(format!("{}.specific_heat", base.name))?;
        }
        if let Some(spec) = &self.conductivity {
            base.conductivity = spec.table(format!("{}.conductivity", base.name))?;
        }
        base.validate()?;
        Ok(base)
    }
}

impl MaterialsSection {
    /// Apply overrides on top of `base`.
    pub fn apply(&self, base: MaterialSet) -> ModelResult<MaterialSet> {
        let mut set = base;
        if let Some(o) = &self.substrate {
            set.substrate = o.apply(set.substrate)?;
        }
        if let Some(o) = &self.coating {
            set.coating = o.apply(set.coating)?;
        }
        if let Some(o) = &self.coating2 {
            set.coating2 = match (o.enabled, set.coating2.take()) {
                (false, _) => None,
                (true, Some(existing)) => Some(o.apply(existing)?),
                // A fresh second material starts from the first coating.
                (true, None) => Some(o.apply(set.coating.clone())?),
            };
        }
        if let Some(stack) = &self.stack {
            set.stack = stack.stack();
        }
        set.validate()?;
        Ok(set)
    }
}

/// Parse a config from TOML text. Relative paths resolve against `base_dir`.
pub fn parse_config(text: &str, base_dir: Option<&Path>) -> Result<FileConfig, AppError> {
    let mut config: FileConfig =
        toml::from_str(text).map_err(|e| AppError::new(2, format!("Invalid config: {e}")))?;
    if let (Some(dir), Some(curve)) = (base_dir, config.losses.dilution_curve.as_mut()) {
        if curve.is_relative() {
            *curve = dir.join(&*curve);
        }
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<FileConfig, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
    parse_config(&text, path.parent())
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::literature_set;

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg = parse_config("", None).unwrap();
        assert!(cfg.sweep.mode.is_none());
        assert!(cfg.losses.dilution_curve.is_none());
    }

    #[test]
    fn parses_sections_and_resolves_paths() {
        let text = r#"
            [sweep]
            mode = "fixed-frequency"
            frequency = 390.0
            temperature_range = [20.0, 250.0]

            [losses]
            substrate = true
            dilution_curve = "modes.txt"

            [coating_model]
            tau = 1e-15
        "#;
        let cfg = parse_config(text, Some(Path::new("/data/run"))).unwrap();
        assert_eq!(cfg.sweep.mode, Some(SweepMode::FixedFrequency));
        assert_eq!(cfg.sweep.temperature_range, Some([20.0, 250.0]));
        assert_eq!(cfg.losses.dilution_curve, Some(PathBuf::from("/data/run/modes.txt")));
        assert_eq!(cfg.coating_model.tau, Some(1e-15));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("[sweep]\nresolutoin = 5\n", None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn material_overrides_apply_on_top_of_defaults() {
        let text = r#"
            [materials.substrate]
            thickness = 0.001

            [materials.coating.specific_heat]
            temperatures = [10.0, 100.0, 200.0, 300.0]
            values = [0.02, 0.2, 0.4, 0.6]
            scale = 1000.0

            [materials.coating2]
            enabled = false

            [materials.stack]
            first_thickness = 3e-6
            second_thickness = 3e-6
        "#;
        let cfg = parse_config(text, None).unwrap();
        let set = cfg.materials.apply(literature_set()).unwrap();
        assert_eq!(set.substrate.constants.thickness, 0.001);
        assert_eq!(set.substrate.constants.youngs_modulus, 169e9);
        assert_eq!(set.coating.specific_heat.temperatures, vec![10.0, 100.0, 200.0, 300.0]);
        assert!((set.coating.specific_heat.values[3] - 600.0).abs() < 1e-9);
        assert!(set.coating2.is_none());
        assert_eq!(set.stack.weights(), (0.5, 0.5));
    }

    #[test]
    fn short_override_table_is_rejected() {
        let text = r#"
            [materials.substrate.expansion]
            temperatures = [10.0, 20.0]
            values = [1e-9, 2e-9]
        "#;
        let cfg = parse_config(text, None).unwrap();
        assert!(cfg.materials.apply(literature_set()).is_err());
    }
}
