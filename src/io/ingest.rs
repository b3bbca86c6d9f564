//! Column-file ingest.
//!
//! Every input of the toolkit is a small text table: one record per line,
//! values separated by whitespace (commas are accepted too). This module turns
//! such files into numeric rows.
//!
//! - Blank lines and lines starting with `#` are skipped.
//! - A record with too few columns, an unparsable number or a non-finite value
//!   (`nan`, `inf`) is a hard error (`MalformedInput`) carrying the file name
//!   and 1-based line number.
//! - No fitting or physics here.

use std::fs;
use std::path::Path;

use crate::error::{ModelError, ModelResult};

/// One `x value σ` record of a measured-loss (or exported loss) file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredPoint {
    pub x: f64,
    pub value: f64,
    pub sigma: f64,
}

/// Parse rows of at least `min_columns` numbers from `text`.
///
/// `input` names the source in error messages.
pub fn parse_columns(input: &str, text: &str, min_columns: usize) -> ModelResult<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = idx + 1;
        let row = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|tok| !tok.is_empty())
            .map(|tok| match tok.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                Ok(_) => Err(ModelError::malformed(input, Some(line_no), format!("non-finite value '{tok}'"))),
                Err(_) => Err(ModelError::malformed(input, Some(line_no), format!("cannot parse '{tok}' as a number"))),
            })
            .collect::<ModelResult<Vec<f64>>>()?;
        if row.len() < min_columns {
            return Err(ModelError::malformed(
                input,
                Some(line_no),
                format!("expected at least {min_columns} columns, found {}", row.len()),
            ));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ModelError::InsufficientData {
            what: input.to_string(),
            needed: 1,
            got: 0,
        });
    }
    Ok(rows)
}

pub fn read_columns(path: &Path, min_columns: usize) -> ModelResult<Vec<Vec<f64>>> {
    let input = path.display().to_string();
    let text = fs::read_to_string(path)
        .map_err(|e| ModelError::malformed(&input, None, format!("cannot read file: {e}")))?;
    parse_columns(&input, &text, min_columns)
}

/// Read an `x value σ` file.
pub fn read_three_column(path: &Path) -> ModelResult<Vec<MeasuredPoint>> {
    Ok(read_columns(path, 3)?
        .into_iter()
        .map(|r| MeasuredPoint {
            x: r[0],
            value: r[1],
            sigma: r[2],
        })
        .collect())
}

/// Read a two-column file as `(a, b)` pairs.
pub fn read_pairs(path: &Path) -> ModelResult<Vec<(f64, f64)>> {
    Ok(read_columns(path, 2)?.into_iter().map(|r| (r[0], r[1])).collect())
}
