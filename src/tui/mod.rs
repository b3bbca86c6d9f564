//! Ratatui-based viewer for saved loss results (`ted view`).
//!
//! Curves are shown directly. Surfaces are shown one slice at a time (a row at
//! fixed temperature or a column at fixed frequency) or as a heat map.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::domain::{LossComponent, LossCurve, LossFile, LossResult};
use crate::error::AppError;
use crate::plot::{self, Figure, Heatmap, tick_label};

mod plotters_chart;

use plotters_chart::{LossChart, series_color};

/// Start the viewer on a loaded loss file.
pub fn run(path: &Path, file: LossFile) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(path, file);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Which variable a surface slice holds fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slice {
    Temperature,
    Frequency,
}

/// What is on screen, independent of the terminal.
#[derive(Debug, Clone, PartialEq)]
struct ViewState {
    hidden: Vec<LossComponent>,
    extended: bool,
    slice: Slice,
    index: usize,
    heatmap: bool,
}

impl ViewState {
    fn new(file: &LossFile) -> Self {
        let index = match &file.result {
            LossResult::Surface(s) => s.temperature.len() / 2,
            LossResult::Curve(_) => 0,
        };
        Self {
            hidden: Vec::new(),
            extended: true,
            slice: Slice::Temperature,
            index,
            heatmap: false,
        }
    }

    fn toggle(&mut self, component: LossComponent) {
        if let Some(pos) = self.hidden.iter().position(|c| *c == component) {
            self.hidden.remove(pos);
        } else {
            self.hidden.push(component);
        }
    }

    fn visible(&self, component: LossComponent) -> bool {
        !self.hidden.contains(&component)
    }

    fn slice_len(&self, file: &LossFile) -> usize {
        match (&file.result, self.slice) {
            (LossResult::Surface(s), Slice::Temperature) => s.temperature.len(),
            (LossResult::Surface(s), Slice::Frequency) => s.frequency.len(),
            (LossResult::Curve(_), _) => 1,
        }
    }

    fn step(&mut self, file: &LossFile, delta: isize) {
        let len = self.slice_len(file);
        if len == 0 {
            return;
        }
        let next = (self.index as isize + delta).clamp(0, len as isize - 1);
        self.index = next as usize;
    }

    fn swap_slice(&mut self, file: &LossFile) {
        self.slice = match self.slice {
            Slice::Temperature => Slice::Frequency,
            Slice::Frequency => Slice::Temperature,
        };
        self.index = self.slice_len(file) / 2;
    }

    /// The curve currently on screen, with hidden components removed.
    fn curve(&self, file: &LossFile) -> Option<LossCurve> {
        let mut curve = match &file.result {
            LossResult::Curve(c) => c.clone(),
            LossResult::Surface(s) => match self.slice {
                Slice::Temperature => s.at_temperature(self.index)?,
                Slice::Frequency => s.at_frequency(self.index)?,
            },
        };
        curve.series.retain(|s| self.visible(s.component));
        if !self.extended || !self.visible(LossComponent::Interface) {
            curve.extended_interface = None;
        }
        Some(curve)
    }

    fn figure(&self, file: &LossFile) -> Option<Figure> {
        self.curve(file).map(|c| plot::curve_figure(&c, None))
    }

    /// Heat map of the first visible component, preferring the total.
    fn heatmap(&self, file: &LossFile) -> Option<Heatmap> {
        let LossResult::Surface(surface) = &file.result else {
            return None;
        };
        let component = std::iter::once(LossComponent::Total)
            .chain(LossComponent::ALL)
            .find(|c| self.visible(*c) && surface.series(*c).is_some())?;
        Heatmap::from_surface(surface, component)
    }
}

struct App {
    path: PathBuf,
    file: LossFile,
    view: ViewState,
    status: String,
}

impl App {
    fn new(path: &Path, file: LossFile) -> Self {
        let view = ViewState::new(&file);
        Self {
            path: path.to_path_buf(),
            file,
            view,
            status: "Loaded.".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the viewer should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let is_surface = matches!(self.file.result, LossResult::Surface(_));
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char(c @ '1'..='4') => {
                let component = LossComponent::ALL[c as usize - '1' as usize];
                self.view.toggle(component);
                let state = if self.view.visible(component) { "shown" } else { "hidden" };
                self.status = format!("{}: {state}", component.display_name());
            }
            KeyCode::Char('e') => {
                self.view.extended = !self.view.extended;
                self.status = format!("full-range interface: {}", if self.view.extended { "on" } else { "off" });
            }
            KeyCode::Char('s') if is_surface => {
                self.view.swap_slice(&self.file);
                self.status = format!("slicing at fixed {}", self.slice_name());
            }
            KeyCode::Char('h') if is_surface => {
                self.view.heatmap = !self.view.heatmap;
            }
            KeyCode::Left if is_surface => self.view.step(&self.file, -1),
            KeyCode::Right if is_surface => self.view.step(&self.file, 1),
            KeyCode::PageDown if is_surface => {
                let jump = (self.view.slice_len(&self.file) / 10).max(1) as isize;
                self.view.step(&self.file, -jump);
            }
            KeyCode::PageUp if is_surface => {
                let jump = (self.view.slice_len(&self.file) / 10).max(1) as isize;
                self.view.step(&self.file, jump);
            }
            KeyCode::Char('x') => self.export_svg(),
            _ => {}
        }
        false
    }

    fn slice_name(&self) -> &'static str {
        match self.view.slice {
            Slice::Temperature => "temperature",
            Slice::Frequency => "frequency",
        }
    }

    fn export_svg(&mut self) {
        let stem = self.path.file_stem().and_then(|s| s.to_str()).unwrap_or("loss");
        let out = self.path.with_file_name(format!("{stem}_view.svg"));
        let written = if self.view.heatmap {
            self.view
                .heatmap(&self.file)
                .map(|m| plot::svg::write_heatmap_svg(&out, &m, plot::svg::DEFAULT_SIZE))
        } else {
            self.view
                .figure(&self.file)
                .map(|f| plot::svg::write_figure_svg(&out, &f, plot::svg::DEFAULT_SIZE))
        };
        self.status = match written {
            Some(Ok(())) => format!("Wrote {}", out.display()),
            Some(Err(err)) => format!("SVG export failed: {err}"),
            None => "Nothing to export.".to_string(),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        if self.view.heatmap {
            self.draw_heatmap(frame, chunks[1]);
        } else {
            self.draw_chart(frame, chunks[1]);
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("ted", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " {} | {} | generated {}",
                self.path.display(),
                self.file.sweep.label(),
                self.file.generated.format("%Y-%m-%d %H:%M:%S"),
            )),
        ]));

        let mut detail = match &self.file.result {
            LossResult::Curve(c) => format!("{} points", c.x.len()),
            LossResult::Surface(s) => {
                let at = match self.view.slice {
                    Slice::Temperature => s.temperature.get(self.view.index).map(|t| format!("T = {t:.2} K")),
                    Slice::Frequency => s.frequency.get(self.view.index).map(|f| format!("f = {f:.4e} Hz")),
                };
                format!(
                    "{} T × {} f | slice {}/{} at {}",
                    s.temperature.len(),
                    s.frequency.len(),
                    self.view.index + 1,
                    self.view.slice_len(&self.file),
                    at.unwrap_or_else(|| "-".to_string()),
                )
            }
        };
        if let Some(d) = self.file.dilution_factor {
            detail.push_str(&format!(" | dilution factor {d:.6}"));
        }
        lines.push(Line::from(Span::styled(detail, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let figure = self.view.figure(&self.file);
        let title = figure.as_ref().map(|f| f.title.clone()).unwrap_or_else(|| "Loss".to_string());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(figure) = figure else {
            frame.render_widget(
                Paragraph::new("No curve at this slice.").style(Style::default().fg(Color::Yellow)),
                inner,
            );
            return;
        };
        let projected = figure.projected();
        let Some(((x0, x1), (y0, y1))) = Figure::bounds(&projected) else {
            frame.render_widget(
                Paragraph::new("No positive loss values to plot.").style(Style::default().fg(Color::Yellow)),
                inner,
            );
            return;
        };
        let pad = ((y1 - y0).abs() * 0.05).max(1e-12);
        let x_bounds = [x0, x1];
        let y_bounds = [y0 - pad, y1 + pad];

        let lines: Vec<Vec<(f64, f64)>> = projected
            .iter()
            .filter(|s| s.style == plot::Style::Line)
            .map(|s| s.points.clone())
            .collect();
        let markers: Vec<Vec<(f64, f64)>> = projected
            .iter()
            .filter(|s| s.style == plot::Style::Markers)
            .map(|s| s.points.clone())
            .collect();

        let legend_height = 1;
        let (chart_area, legend_area) = {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(legend_height)])
                .split(inner);
            (parts[0], parts[1])
        };

        let (chart_rect, insets) = chart_layout(chart_area);
        let widget = LossChart {
            lines: &lines,
            markers: &markers,
            x_bounds,
            y_bounds,
            x_label: &figure.x_label,
            y_label: &figure.y_label,
            x_log: figure.x_log,
            y_log: figure.y_log,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, chart_area, chart_rect, insets, &figure, x_bounds, y_bounds);
        }

        // Legend in the same colour order as the chart: lines, then markers.
        let ordered = projected
            .iter()
            .filter(|s| s.style == plot::Style::Line)
            .chain(projected.iter().filter(|s| s.style == plot::Style::Markers));
        let mut spans = Vec::new();
        for (i, s) in ordered.enumerate() {
            let (r, g, b) = series_color(i);
            let glyph = if s.style == plot::Style::Line { "── " } else { "•  " };
            spans.push(Span::styled(glyph, Style::default().fg(Color::Rgb(r, g, b))));
            spans.push(Span::raw(format!("{}   ", s.label)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), legend_area);
    }

    fn draw_heatmap(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Loss surface").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(map) = self.view.heatmap(&self.file) else {
            frame.render_widget(
                Paragraph::new("No visible component.").style(Style::default().fg(Color::Yellow)),
                inner,
            );
            return;
        };
        // Header and scale lines take two rows.
        let txt = plot::ascii::render_heatmap(
            &map,
            inner.width as usize,
            (inner.height as usize).saturating_sub(2),
        );
        frame.render_widget(Paragraph::new(txt), inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if matches!(self.file.result, LossResult::Surface(_)) {
            "1-4 toggle series  e full range  ←/→ PgUp/PgDn slice  s swap slice  h heat map  x svg  q quit"
        } else {
            "1-4 toggle series  e full range  x svg  q quit"
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    figure: &Figure,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = tick_label(x_val, figure.x_log);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = tick_label(y_val, figure.y_log);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(figure.x_label.as_str())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(figure.y_label.as_str())
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.min(20),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Axis, ExtendedSeries, LossSeries, LossSurface, SurfaceSeries, SweepSpec};
    use chrono::Local;

    fn file(result: LossResult, sweep: SweepSpec) -> LossFile {
        LossFile {
            tool: "ted".to_string(),
            generated: Local::now(),
            sweep,
            dilution_factor: None,
            result,
        }
    }

    fn curve_file() -> LossFile {
        file(
            LossResult::Curve(LossCurve {
                axis: Axis::Frequency,
                fixed: 200.0,
                x: vec![100.0, 1000.0],
                series: vec![
                    LossSeries {
                        component: LossComponent::Interface,
                        values: vec![1e-7, 2e-7],
                    },
                    LossSeries {
                        component: LossComponent::Substrate,
                        values: vec![1e-8, 3e-8],
                    },
                    LossSeries {
                        component: LossComponent::Total,
                        values: vec![1.1e-7, 2.3e-7],
                    },
                ],
                extended_interface: Some(ExtendedSeries {
                    x: vec![1.0, 1e6],
                    values: vec![1e-9, 1e-5],
                }),
            }),
            SweepSpec::FixedTemperature { temperature: 200.0 },
        )
    }

    fn surface_file() -> LossFile {
        file(
            LossResult::Surface(LossSurface {
                frequency: vec![10.0, 100.0, 1000.0],
                temperature: vec![20.0, 40.0, 60.0, 80.0],
                series: vec![SurfaceSeries {
                    component: LossComponent::Interface,
                    values: vec![vec![1e-8; 3]; 4],
                }],
            }),
            SweepSpec::Sweep2D,
        )
    }

    #[test]
    fn hidden_components_are_removed_from_the_figure() {
        let f = curve_file();
        let mut view = ViewState::new(&f);
        assert_eq!(view.figure(&f).unwrap().series.len(), 4);

        view.toggle(LossComponent::Substrate);
        let labels: Vec<String> = view.figure(&f).unwrap().series.into_iter().map(|s| s.label).collect();
        assert!(!labels.iter().any(|l| l == "Substrate"));

        // Hiding the interface also hides its full-range companion.
        view.toggle(LossComponent::Interface);
        assert_eq!(view.figure(&f).unwrap().series.len(), 1);

        view.toggle(LossComponent::Substrate);
        assert_eq!(view.figure(&f).unwrap().series.len(), 2);
    }

    #[test]
    fn surface_slices_step_and_clamp() {
        let f = surface_file();
        let mut view = ViewState::new(&f);
        assert_eq!(view.index, 2);
        view.step(&f, 10);
        assert_eq!(view.index, 3);
        assert_eq!(view.curve(&f).unwrap().fixed, 80.0);

        view.swap_slice(&f);
        assert_eq!(view.slice, Slice::Frequency);
        assert_eq!(view.index, 1);
        view.step(&f, -5);
        let curve = view.curve(&f).unwrap();
        assert_eq!(curve.axis, Axis::Temperature);
        assert_eq!(curve.fixed, 10.0);
    }

    #[test]
    fn heatmap_falls_back_to_first_visible_component() {
        let f = surface_file();
        let mut view = ViewState::new(&f);
        assert!(view.heatmap(&f).unwrap().title.starts_with("Interface"));
        view.toggle(LossComponent::Interface);
        assert!(view.heatmap(&f).is_none());
        assert!(ViewState::new(&curve_file()).heatmap(&curve_file()).is_none());
    }

    #[test]
    fn keys_toggle_and_quit() {
        let mut app = App::new(Path::new("loss.json"), curve_file());
        assert!(!app.handle_key(KeyCode::Char('2')));
        assert!(!app.view.visible(LossComponent::Substrate));
        assert_eq!(app.status, "Substrate: hidden");
        // Slice keys are ignored for curves.
        assert!(!app.handle_key(KeyCode::Right));
        assert_eq!(app.view.index, 0);
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
