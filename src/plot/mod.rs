//! Plot descriptions shared by the ASCII renderer, the SVG writer and the TUI.
//!
//! A [`Figure`] is a set of labelled series in data space. Log axes are handled
//! by transforming coordinates to `log10` before rendering ([`Figure::projected`]),
//! so every renderer draws on plain linear coordinates and formats ticks back
//! as powers of ten. Points that cannot be shown on a log axis (≤ 0) are dropped.

use std::path::Path;

use crate::domain::{Axis, LossComponent, LossCurve, LossSurface, LossUnit, REFERENCE_FREQUENCY, REFERENCE_POINTS};
use crate::fit::{Decomposition, DecompositionInput};
use crate::io::MeasuredPoint;

pub mod ascii;
pub mod svg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Line,
    Markers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub style: Style,
    pub points: Vec<(f64, f64)>,
    /// Symmetric error bars (same length as `points`).
    pub errors: Option<Vec<f64>>,
}

impl Series {
    pub fn line(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            style: Style::Line,
            points,
            errors: None,
        }
    }

    pub fn measured(label: impl Into<String>, points: &[MeasuredPoint]) -> Self {
        Self {
            label: label.into(),
            style: Style::Markers,
            points: points.iter().map(|p| (p.x, p.value)).collect(),
            errors: Some(points.iter().map(|p| p.sigma).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_log: bool,
    pub y_log: bool,
    pub series: Vec<Series>,
}

/// A series in render space. `bars` are `(x, y, y_low, y_high)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Projected {
    pub label: String,
    pub style: Style,
    pub points: Vec<(f64, f64)>,
    pub bars: Vec<(f64, f64, f64, f64)>,
}

fn axis_value(v: f64, log: bool) -> Option<f64> {
    if !v.is_finite() {
        return None;
    }
    if log {
        (v > 0.0).then(|| v.log10())
    } else {
        Some(v)
    }
}

impl Figure {
    /// Series in render space (log10 where the axis is logarithmic).
    pub fn projected(&self) -> Vec<Projected> {
        self.series
            .iter()
            .map(|s| {
                let mut points = Vec::with_capacity(s.points.len());
                let mut bars = Vec::new();
                for (i, &(x, y)) in s.points.iter().enumerate() {
                    let (Some(px), Some(py)) = (axis_value(x, self.x_log), axis_value(y, self.y_log)) else {
                        continue;
                    };
                    points.push((px, py));
                    if let Some(err) = s.errors.as_ref().and_then(|e| e.get(i)).filter(|e| **e > 0.0) {
                        // A lower bar reaching ≤ 0 on a log axis is clipped to the point itself.
                        let lo = axis_value(y - err, self.y_log).unwrap_or(py);
                        let hi = axis_value(y + err, self.y_log).unwrap_or(py);
                        bars.push((px, py, lo, hi));
                    }
                }
                Projected {
                    label: s.label.clone(),
                    style: s.style,
                    points,
                    bars,
                }
            })
            .collect()
    }

    /// Render-space bounds over all series (including error bars).
    pub fn bounds(projected: &[Projected]) -> Option<((f64, f64), (f64, f64))> {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for s in projected {
            for &(px, py) in &s.points {
                x = (x.0.min(px), x.1.max(px));
                y = (y.0.min(py), y.1.max(py));
            }
            for &(_, _, lo, hi) in &s.bars {
                y = (y.0.min(lo), y.1.max(hi));
            }
        }
        if !(x.0.is_finite() && x.1.is_finite() && y.0.is_finite() && y.1.is_finite()) {
            return None;
        }
        if x.1 <= x.0 {
            x = (x.0 - 0.5, x.1 + 0.5);
        }
        if y.1 <= y.0 {
            y = (y.0 - 0.5, y.1 + 0.5);
        }
        Some((x, y))
    }
}

/// Format a render-space tick back to data space.
pub fn tick_label(v: f64, log: bool) -> String {
    if log {
        format!("1e{:.1}", v)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else if v.abs() >= 1e4 || (v != 0.0 && v.abs() < 1e-2) {
        format!("{v:.1e}")
    } else {
        format!("{v:.1}")
    }
}

/// Series for one evaluator curve, plus measured overlay and reference markers.
pub fn curve_figure(curve: &LossCurve, overlay: Option<&[MeasuredPoint]>) -> Figure {
    let fixed = match curve.axis {
        Axis::Frequency => format!("T = {} K", curve.fixed),
        Axis::Temperature => format!("f = {} Hz", curve.fixed),
    };

    let mut series: Vec<Series> = curve
        .series
        .iter()
        .map(|s| Series::line(s.component.display_name(), curve.x.iter().copied().zip(s.values.iter().copied()).collect()))
        .collect();

    if let Some(ext) = &curve.extended_interface {
        series.push(Series::line(
            format!("{} (full range)", LossComponent::Interface.display_name()),
            ext.x.iter().copied().zip(ext.values.iter().copied()).collect(),
        ));
    }
    if let Some(points) = overlay {
        series.push(Series::measured("Measured", points));
    }
    if let Some(reference) = reference_series(curve) {
        series.push(reference);
    }

    Figure {
        title: format!("Thermoelastic loss, {fixed}"),
        x_label: curve.axis.label().to_string(),
        y_label: "loss angle φ".to_string(),
        x_log: curve.axis.is_log(),
        y_log: true,
        series,
    }
}

/// Measured 390 Hz points that fall on this curve's fixed coordinate.
fn reference_series(curve: &LossCurve) -> Option<Series> {
    let points: Vec<(f64, f64)> = match curve.axis {
        Axis::Frequency => REFERENCE_POINTS
            .iter()
            .filter(|(t, _)| *t == curve.fixed)
            .map(|&(_, phi)| (REFERENCE_FREQUENCY, phi))
            .collect(),
        Axis::Temperature if curve.fixed == REFERENCE_FREQUENCY => REFERENCE_POINTS.to_vec(),
        Axis::Temperature => Vec::new(),
    };
    (!points.is_empty()).then(|| Series {
        label: format!("Reference ({REFERENCE_FREQUENCY} Hz)"),
        style: Style::Markers,
        points,
        errors: None,
    })
}

/// Several measured files on one set of axes.
pub fn measured_figure(title: &str, x_label: &str, unit: LossUnit, datasets: &[(String, Vec<MeasuredPoint>)]) -> Figure {
    Figure {
        title: title.to_string(),
        x_label: x_label.to_string(),
        y_label: match unit {
            LossUnit::Phi => "loss angle φ".to_string(),
            LossUnit::Q => "quality factor Q".to_string(),
        },
        x_log: false,
        y_log: true,
        series: datasets.iter().map(|(label, pts)| Series::measured(label.clone(), pts)).collect(),
    }
}

/// Measured loss per mode with the fitted model at each mode.
pub fn decomposition_figure(temperature: &str, input: &DecompositionInput, fit: &Decomposition) -> Figure {
    let measured: Vec<MeasuredPoint> = (0..input.len())
        .map(|i| MeasuredPoint {
            x: input.frequencies[i],
            value: input.loss[i],
            sigma: input.sigma[i],
        })
        .collect();
    let fitted = input.frequencies.iter().copied().zip(fit.fitted.iter().copied()).collect();
    Figure {
        title: format!("Bulk/shear decomposition at {temperature} K"),
        x_label: Axis::Frequency.label().to_string(),
        y_label: "loss angle φ".to_string(),
        x_log: true,
        y_log: true,
        series: vec![
            Series::measured("Measured", &measured),
            Series {
                label: "Fit".to_string(),
                style: Style::Markers,
                points: fitted,
                errors: None,
            },
        ],
    }
}

/// Legend label from a data file name: `Coated Mode 3 Averaged Phi.txt` → `Coating Mode 3 φ`.
pub fn dataset_label(path: &Path) -> String {
    let name = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    let name = name.replace("Coated", "Coating").replace("Averaged Phi.txt", "φ");
    name.strip_suffix(".txt").unwrap_or(&name).trim().to_string()
}

/// A loss surface as a grid of `log10(loss)` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub title: String,
    /// log10 of frequency (Hz).
    pub x: Vec<f64>,
    /// Temperature (K).
    pub y: Vec<f64>,
    /// `values[y][x]`; `None` where the loss is not positive.
    pub values: Vec<Vec<Option<f64>>>,
}

impl Heatmap {
    pub fn from_surface(surface: &LossSurface, component: LossComponent) -> Option<Self> {
        let series = surface.series(component)?;
        Some(Self {
            title: format!("{} loss (log10 φ)", component.display_name()),
            x: surface.frequency.iter().map(|f| f.log10()).collect(),
            y: surface.temperature.clone(),
            values: series
                .values
                .iter()
                .map(|row| row.iter().map(|&v| axis_value(v, true)).collect())
                .collect(),
        })
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in self.values.iter().flatten().flatten() {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
        (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
    }
}
