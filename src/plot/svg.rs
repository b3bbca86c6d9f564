//! SVG output via Plotters.
//!
//! Figures are drawn in render space (see [`Figure::projected`]) with tick
//! labels formatted back to data values. Heat maps are downsampled to at most
//! [`MAX_CELLS`] per axis to keep file sizes reasonable.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use super::{Figure, Heatmap, Style, tick_label};
use crate::error::AppError;

pub const DEFAULT_SIZE: (u32, u32) = (1024, 720);
pub const MAX_CELLS: usize = 200;

fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let projected = figure.projected();
    let Some(((x0, x1), (y0, y1))) = Figure::bounds(&projected) else {
        return Err("nothing to plot: every value is outside the axis domain".into());
    };
    let pad = 0.05 * (y1 - y0);

    let mut chart = ChartBuilder::on(root)
        .caption(&figure.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, (y0 - pad)..(y1 + pad))?;

    let (x_log, y_log) = (figure.x_log, figure.y_log);
    chart
        .configure_mesh()
        .x_desc(figure.x_label.as_str())
        .y_desc(figure.y_label.as_str())
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&|v| tick_label(*v, x_log))
        .y_label_formatter(&|v| tick_label(*v, y_log))
        .draw()?;

    for (i, s) in projected.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        match s.style {
            Style::Line => {
                chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
                    .label(s.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            Style::Markers => {
                chart.draw_series(
                    s.bars
                        .iter()
                        .map(|&(x, y, lo, hi)| ErrorBar::new_vertical(x, lo, y, hi, color.filled(), 8)),
                )?;
                chart
                    .draw_series(s.points.iter().map(|&p| Circle::new(p, 4, color.filled())))?
                    .label(s.label.as_str())
                    .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Blue (low) → red (high).
fn heat_color(u: f64) -> HSLColor {
    HSLColor((1.0 - u.clamp(0.0, 1.0)) * 240.0 / 360.0, 0.85, 0.5)
}

/// Cell edges halfway between neighbouring centres.
fn edges(centres: &[f64]) -> Vec<f64> {
    let n = centres.len();
    if n == 1 {
        return vec![centres[0] - 0.5, centres[0] + 0.5];
    }
    let mut out = Vec::with_capacity(n + 1);
    out.push(centres[0] - 0.5 * (centres[1] - centres[0]));
    for w in centres.windows(2) {
        out.push(0.5 * (w[0] + w[1]));
    }
    out.push(centres[n - 1] + 0.5 * (centres[n - 1] - centres[n - 2]));
    out
}

fn stride(n: usize) -> usize {
    n.div_ceil(MAX_CELLS).max(1)
}

fn draw_heatmap<DB>(root: &DrawingArea<DB, Shift>, map: &Heatmap) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let Some((lo, hi)) = map.range() else {
        return Err("surface has no positive loss values".into());
    };

    let (sx, sy) = (stride(map.x.len()), stride(map.y.len()));
    let xs: Vec<usize> = (0..map.x.len()).step_by(sx).collect();
    let ys: Vec<usize> = (0..map.y.len()).step_by(sy).collect();
    let x_edges = edges(&xs.iter().map(|&i| map.x[i]).collect::<Vec<_>>());
    let y_edges = edges(&ys.iter().map(|&j| map.y[j]).collect::<Vec<_>>());

    let mut chart = ChartBuilder::on(root)
        .caption(&map.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_edges[0]..x_edges[x_edges.len() - 1], y_edges[0]..y_edges[y_edges.len() - 1])?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("frequency (Hz)")
        .y_desc("temperature (K)")
        .x_label_formatter(&|v| tick_label(*v, true))
        .draw()?;

    let span = if hi > lo { hi - lo } else { 1.0 };
    let mut cells = Vec::with_capacity(xs.len() * ys.len());
    for (cj, &j) in ys.iter().enumerate() {
        for (ci, &i) in xs.iter().enumerate() {
            if let Some(v) = map.values[j][i] {
                cells.push(Rectangle::new(
                    [(x_edges[ci], y_edges[cj]), (x_edges[ci + 1], y_edges[cj + 1])],
                    heat_color((v - lo) / span).filled(),
                ));
            }
        }
    }
    chart.draw_series(cells)?;

    root.present()?;
    Ok(())
}

fn svg_error(path: &Path, e: Box<dyn Error>) -> AppError {
    AppError::new(4, format!("Failed to render SVG '{}': {e}", path.display()))
}

pub fn write_figure_svg(path: &Path, figure: &Figure, size: (u32, u32)) -> Result<(), AppError> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_figure(&root, figure).map_err(|e| svg_error(path, e))?;
    info!(path = %path.display(), "wrote SVG plot");
    Ok(())
}

pub fn write_heatmap_svg(path: &Path, map: &Heatmap, size: (u32, u32)) -> Result<(), AppError> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_heatmap(&root, map).map_err(|e| svg_error(path, e))?;
    info!(path = %path.display(), "wrote SVG heat map");
    Ok(())
}

/// Render a figure to an in-memory SVG document.
pub fn figure_svg_string(figure: &Figure, size: (u32, u32)) -> Result<String, AppError> {
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
        draw_figure(&root, figure).map_err(|e| AppError::new(4, format!("Failed to render SVG: {e}")))?;
    }
    Ok(buf)
}
