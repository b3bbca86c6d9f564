//! Column-file exports.
//!
//! All outputs follow the three-column text convention shared by the analysis
//! commands (`x value σ`, whitespace separated). Values are written with
//! shortest round-trip `{:e}` formatting so re-reading reproduces them exactly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{LossComponent, LossResult};
use crate::error::AppError;
use crate::io::ingest::MeasuredPoint;

/// Write rows of numbers, one row per line.
pub fn write_rows<R: AsRef<[f64]>>(path: &Path, rows: impl IntoIterator<Item = R>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    let mut count = 0usize;
    for row in rows {
        let line = row
            .as_ref()
            .iter()
            .map(|v| format!("{v:e}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{line}")
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
        count += 1;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;

    info!(path = %path.display(), rows = count, "wrote column file");
    Ok(())
}

pub fn write_measured(path: &Path, points: &[MeasuredPoint]) -> Result<(), AppError> {
    write_rows(path, points.iter().map(|p| [p.x, p.value, p.sigma]))
}

/// `<stem>_<suffix>.txt`
pub fn component_path(stem: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}_{suffix}.txt", stem.display()))
}

/// Export every series of a result, one file per component.
///
/// Curves are written as `x loss 0`; surfaces as `frequency temperature loss`
/// (temperature-major). Returns the files written.
pub fn write_loss_result(stem: &Path, result: &LossResult) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::new();
    match result {
        LossResult::Curve(curve) => {
            for series in &curve.series {
                let path = component_path(stem, series.component.name());
                write_rows(&path, curve.x.iter().zip(&series.values).map(|(&x, &v)| [x, v, 0.0]))?;
                written.push(path);
            }
            if let Some(ext) = &curve.extended_interface {
                let path = component_path(stem, &format!("{}_extended", LossComponent::Interface.name()));
                write_rows(&path, ext.x.iter().zip(&ext.values).map(|(&x, &v)| [x, v, 0.0]))?;
                written.push(path);
            }
        }
        LossResult::Surface(surface) => {
            for series in &surface.series {
                let path = component_path(stem, series.component.name());
                let rows = surface.temperature.iter().zip(&series.values).flat_map(|(&t, row)| {
                    surface.frequency.iter().zip(row).map(move |(&f, &v)| [f, t, v])
                });
                write_rows(&path, rows)?;
                written.push(path);
            }
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_paths_append_suffix() {
        let p = component_path(Path::new("out/run300K"), "total");
        assert_eq!(p, PathBuf::from("out/run300K_total.txt"));
    }
}
