//! Temperature-controller log handling.
//!
//! The controller exports a CSV with one header line; column 0 is Unix time in
//! milliseconds and the remaining columns are probe temperatures and heater
//! powers. `extract_channels` splits it into `time value` files per channel;
//! `elapsed` turns absolute timestamps into time since the first sample.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::{Channel, TimeUnit};
use crate::error::{ModelError, ModelResult};

/// Unix ms → elapsed time in `unit`, relative to the first row.
pub fn elapsed(rows: &[(f64, f64)], unit: TimeUnit) -> ModelResult<Vec<(f64, f64)>> {
    let Some(&(start, _)) = rows.first() else {
        return Err(ModelError::InsufficientData {
            what: "time series".to_string(),
            needed: 1,
            got: 0,
        });
    };
    let scale = unit.millis();
    Ok(rows.iter().map(|&(t, v)| ((t - start) / scale, v)).collect())
}

/// Recording start as a UTC timestamp, if the millisecond value is representable.
pub fn recording_start(unix_ms: f64) -> Option<DateTime<Utc>> {
    if !unix_ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(unix_ms.round() as i64)
}

/// `<dir>/<stem><unit>.txt`
pub fn converted_path(input: &Path, unit: TimeUnit) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    input.with_file_name(format!("{stem}{}.txt", unit.suffix()))
}

/// `<dir>/TimeVsTemp<Channel>.txt`
pub fn channel_path(dir: &Path, channel: Channel) -> PathBuf {
    dir.join(format!("TimeVsTemp{}.txt", channel.file_tag()))
}

/// Rows `(unix ms, value)` for every requested channel, in request order.
pub fn extract_channels<R: Read>(
    input: &str,
    reader: R,
    channels: &[Channel],
) -> ModelResult<Vec<(Channel, Vec<(f64, f64)>)>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut out: Vec<(Channel, Vec<(f64, f64)>)> = channels.iter().map(|&c| (c, Vec::new())).collect();

    for (idx, result) in csv.records().enumerate() {
        // Records start after the header; line numbers are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| ModelError::malformed(input, Some(line), format!("CSV parse error: {e}")))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let field = |col: usize| -> ModelResult<f64> {
            let raw = record.get(col).ok_or_else(|| {
                ModelError::malformed(input, Some(line), format!("missing column {col} ({} columns)", record.len()))
            })?;
            raw.parse::<f64>()
                .map_err(|_| ModelError::malformed(input, Some(line), format!("cannot parse '{raw}' in column {col}")))
        };

        let time = field(0)?;
        for (channel, rows) in &mut out {
            rows.push((time, field(channel.column())?));
        }
    }

    if out.first().is_some_and(|(_, rows)| rows.is_empty()) {
        return Err(ModelError::InsufficientData {
            what: input.to_string(),
            needed: 1,
            got: 0,
        });
    }
    Ok(out)
}

pub fn extract_channels_from_file(path: &Path, channels: &[Channel]) -> ModelResult<Vec<(Channel, Vec<(f64, f64)>)>> {
    let input = path.display().to_string();
    let file = File::open(path).map_err(|e| ModelError::malformed(&input, None, format!("cannot open file: {e}")))?;
    extract_channels(&input, file, channels)
}
