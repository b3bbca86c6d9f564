//! Plotters-powered loss chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! Coordinates are in render space (log10 on logarithmic axes), as produced by
//! [`crate::plot::Figure::projected`].

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::plot::tick_label;

/// High-contrast series colours for terminal rendering, in series order.
pub const SERIES_COLORS: [(u8, u8, u8); 6] = [
    (0, 255, 255),
    (255, 255, 0),
    (255, 0, 255),
    (0, 255, 0),
    (255, 128, 0),
    (255, 255, 255),
];

pub fn series_color(i: usize) -> (u8, u8, u8) {
    SERIES_COLORS[i % SERIES_COLORS.len()]
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct LossChart<'a> {
    /// Line series (model components).
    pub lines: &'a [Vec<(f64, f64)>],
    /// Point series (measured/reference markers), coloured after the lines.
    pub markers: &'a [Vec<(f64, f64)>],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub x_log: bool,
    pub y_log: bool,
}

impl<'a> Widget for LossChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| tick_label(*v, self.x_log))
                .y_label_formatter(&|v| tick_label(*v, self.y_log))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(WHITE)
                .bold_line_style(WHITE)
                .draw()?;

            for (i, line) in self.lines.iter().enumerate() {
                let (r, g, b) = series_color(i);
                chart.draw_series(LineSeries::new(line.iter().copied(), RGBColor(r, g, b)))?;
            }

            // `Pixel` rather than `Circle`: the ratatui backend maps circle radii
            // to canvas units, which draws oversized markers.
            for (i, points) in self.markers.iter().enumerate() {
                let (r, g, b) = series_color(self.lines.len() + i);
                chart.draw_series(points.iter().map(|&p| Pixel::new(p, RGBColor(r, g, b))))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
