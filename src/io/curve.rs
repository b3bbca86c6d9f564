//! Read/write loss result JSON files.
//!
//! A loss file is the portable form of one evaluator run: the sweep that
//! produced it, the dilution factor used (fixed-frequency runs) and every
//! computed series. `ted view` and `ted plot` read it back.
//!
//! The schema is defined by `domain::LossFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Local;

use crate::domain::{LossFile, LossResult, SweepSpec};
use crate::error::AppError;

pub fn loss_file(sweep: SweepSpec, dilution_factor: Option<f64>, result: &LossResult) -> LossFile {
    LossFile {
        tool: format!("ted {}", env!("CARGO_PKG_VERSION")),
        generated: Local::now(),
        sweep,
        dilution_factor,
        result: result.clone(),
    }
}

pub fn write_loss_json(path: &Path, file: &LossFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create loss JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(out), file)
        .map_err(|e| AppError::new(2, format!("Failed to write loss JSON: {e}")))?;
    Ok(())
}

pub fn read_loss_json(path: &Path) -> Result<LossFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open loss JSON '{}': {e}", path.display())))?;
    let loss: LossFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid loss JSON '{}': {e}", path.display())))?;
    loss.result.validate(&path.display().to_string())?;
    Ok(loss)
}
