//! Debug bundle writer for inspecting material inputs and resolved grids.
//!
//! The bundle is a markdown file with the tabulated properties, the elastic
//! constants and every interpolated profile sampled on a coarse temperature
//! grid, so interpolation artefacts (overshoot, sign changes) are easy to spot.

use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::data::ModeDilutionCurve;
use crate::domain::ModelConfig;
use crate::error::{AppError, ModelResult};
use crate::materials::{InterpolatedProfile, MaterialSet};
use crate::math::lin_space;

/// Temperatures at which interpolated profiles are listed.
pub const PROFILE_POINTS: usize = 25;

pub fn render_debug_bundle(
    config: &ModelConfig,
    materials: &MaterialSet,
    dilution: Option<&ModeDilutionCurve>,
) -> ModelResult<String> {
    let mut out = String::new();
    let (t_lo, t_hi) = config.grid.temperature_range.unwrap_or_else(|| materials.temperature_range());

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# ted debug bundle");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- sweep: {}", config.sweep.label());
    let _ = writeln!(out, "- temperature_range: {t_lo}..{t_hi} K");
    let _ = writeln!(
        out,
        "- resolution: {} (1D), {} (2D)",
        config.grid.resolution, config.grid.resolution_2d
    );
    let _ = writeln!(
        out,
        "- frequency_range: {:e}..{:e} Hz (1D), {:e}..{:e} Hz (2D)",
        config.grid.frequency_range.0,
        config.grid.frequency_range.1,
        config.grid.frequency_range_2d.0,
        config.grid.frequency_range_2d.1
    );
    let _ = writeln!(
        out,
        "- losses: substrate={} coating={} extended_interface={}",
        config.losses.substrate, config.losses.coating, config.losses.extended_interface
    );
    let (w1, w2) = materials.stack.weights();
    let _ = writeln!(out, "- stack weights: {w1:.4} / {w2:.4}");

    let _ = writeln!(out, "\n## Elastic constants");
    let _ = writeln!(out, "| material | E (Pa) | σ | K (Pa) | ρ (kg/m³) | thickness (m) |");
    let _ = writeln!(out, "| - | - | - | - | - | - |");
    for m in std::iter::once(&materials.substrate)
        .chain(std::iter::once(&materials.coating))
        .chain(materials.coating2.as_ref())
    {
        let c = &m.constants;
        let _ = writeln!(
            out,
            "| {} | {:e} | {} | {:e} | {} | {:e} |",
            m.name, c.youngs_modulus, c.poisson_ratio, c.bulk_modulus, c.density, c.thickness
        );
    }

    let _ = writeln!(out, "\n## Tabulated properties");
    for table in materials.tables() {
        let _ = writeln!(out, "\n### {}", table.name);
        let _ = writeln!(out, "| T (K) | value |");
        let _ = writeln!(out, "| - | - |");
        for (t, v) in table.temperatures.iter().zip(&table.values) {
            let _ = writeln!(out, "| {t} | {v:e} |");
        }
    }

    let grid = lin_space(t_lo, t_hi, PROFILE_POINTS)?;
    let _ = writeln!(out, "\n## Interpolated profiles");
    for table in materials.tables() {
        let profile = InterpolatedProfile::build(table, &grid)?;
        let _ = writeln!(out, "\n### {}", profile.name);
        let _ = writeln!(out, "| T (K) | value |");
        let _ = writeln!(out, "| - | - |");
        for (t, v) in profile.temperatures.iter().zip(&profile.values) {
            let flag = if table.values.iter().all(|x| *x > 0.0) && *v <= 0.0 { " ⚠" } else { "" };
            let _ = writeln!(out, "| {t:.2} | {v:e}{flag} |");
        }
    }

    if let Some(curve) = dilution {
        let _ = writeln!(out, "\n## Dilution curve");
        let _ = writeln!(out, "| f (Hz) | D |");
        let _ = writeln!(out, "| - | - |");
        for (f, d) in curve.frequencies().iter().zip(curve.factors()) {
            let _ = writeln!(out, "| {f} | {d} |");
        }
    }

    Ok(out)
}

/// Write `ted_debug_<timestamp>.md` under `dir`.
pub fn write_debug_bundle(
    dir: &Path,
    config: &ModelConfig,
    materials: &MaterialSet,
    dilution: Option<&ModeDilutionCurve>,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("ted_debug_{ts}.md"));

    let body = render_debug_bundle(config, materials, dilution)?;
    let mut file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    file.write_all(body.as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write debug bundle: {e}")))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DilutionSource, SweepSpec};
    use crate::materials::literature_set;

    #[test]
    fn bundle_lists_every_table_and_profile() {
        let config = ModelConfig {
            sweep: SweepSpec::FixedFrequency { frequency: 390.0 },
            grid: Default::default(),
            losses: Default::default(),
            dilution: DilutionSource::None,
            coating_model: Default::default(),
        };
        let set = literature_set();
        let txt = render_debug_bundle(&config, &set, None).unwrap();
        assert!(txt.starts_with("# ted debug bundle\n"));
        assert!(txt.contains("- temperature_range: 12..300 K"));
        for table in set.tables() {
            assert_eq!(txt.matches(&format!("### {}\n", table.name)).count(), 2);
        }
        assert!(!txt.contains("## Dilution curve"));
    }
}
