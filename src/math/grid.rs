//! Evaluation grids for sweeps.
//!
//! Both generators pin the first and last points to the requested bounds so a
//! grid that starts on a dilution-curve knot really starts on that knot.

use crate::error::{ModelError, ModelResult};

/// `steps` evenly spaced points in `[min, max]` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> ModelResult<Vec<f64>> {
    check_bounds("linear grid", min, max, steps)?;
    if steps == 1 {
        return Ok(vec![min]);
    }
    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    out[steps - 1] = max;
    Ok(out)
}

/// `steps` log-spaced points in `[min, max]` (inclusive). Bounds must be positive.
pub fn log_space(min: f64, max: f64, steps: usize) -> ModelResult<Vec<f64>> {
    check_bounds("log grid", min, max, steps)?;
    if min <= 0.0 {
        return Err(ModelError::invalid(
            "log grid",
            format!("bounds must be > 0 (min={min}, max={max})"),
        ));
    }
    if steps == 1 {
        return Ok(vec![min]);
    }

    let ln_min = min.ln();
    let step = (max.ln() - ln_min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| (ln_min + step * i as f64).exp()).collect();
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

fn check_bounds(what: &str, min: f64, max: f64, steps: usize) -> ModelResult<()> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(ModelError::invalid(what, format!("bounds must be finite (min={min}, max={max})")));
    }
    if steps == 0 {
        return Err(ModelError::invalid(what, "resolution must be >= 1"));
    }
    if steps > 1 && max <= min {
        return Err(ModelError::invalid(what, format!("max must exceed min (min={min}, max={max})")));
    }
    Ok(())
}
