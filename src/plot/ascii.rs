//! Character-grid previews of loss figures and surfaces.
//!
//! Figures are drawn on their projected (log10 where requested) coordinates
//! on a fixed-size grid, so the same input always renders the same text.
//!
//! Plot elements:
//! - line series: `-`, `=`, `~`, `:` (in series order)
//! - measured points: `o`, `x`, `#`, `@` with `|` error bars
//! - heat maps: density ramp ` .:-=+*#%@` from low to high loss

use super::{Figure, Heatmap, Style, tick_label};

const LINE_CHARS: [char; 4] = ['-', '=', '~', ':'];
const MARKER_CHARS: [char; 4] = ['o', 'x', '#', '@'];
const RAMP: [char; 10] = [' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Render a figure on a `width × height` character grid, with a range header and a legend.
pub fn render_figure(figure: &Figure, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let projected = figure.projected();
    let ((x_min, x_max), (y_min, y_max)) = Figure::bounds(&projected).unwrap_or(((0.0, 1.0), (0.0, 1.0)));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let mut legend = Vec::with_capacity(projected.len());
    let (mut lines, mut markers) = (0usize, 0usize);

    // Lines first so markers and bars overlay them.
    for s in projected.iter().filter(|s| s.style == Style::Line) {
        let ch = LINE_CHARS[lines % LINE_CHARS.len()];
        lines += 1;
        draw_curve(&mut grid, &s.points, (x_min, x_max), (y_min, y_max), ch);
        legend.push(format!("  {ch} {}", s.label));
    }
    for s in projected.iter().filter(|s| s.style == Style::Markers) {
        let ch = MARKER_CHARS[markers % MARKER_CHARS.len()];
        markers += 1;
        for &(x, _, lo, hi) in &s.bars {
            let col = map_x(x, x_min, x_max, width);
            let (top, bottom) = (map_y(hi, y_min, y_max, height), map_y(lo, y_min, y_max, height));
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                if row[col] == ' ' {
                    row[col] = '|';
                }
            }
        }
        for &(x, y) in &s.points {
            grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = ch;
        }
        legend.push(format!("  {ch} {}", s.label));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{}, {}] | {}=[{}, {}]\n",
        figure.x_label,
        tick_label(x_min, figure.x_log),
        tick_label(x_max, figure.x_log),
        figure.y_label,
        tick_label(y_min, figure.y_log),
        tick_label(y_max, figure.y_log),
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for line in legend {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Render a heat map: columns are frequency (log), rows temperature (highest on top).
pub fn render_heatmap(map: &Heatmap, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let (nx, ny) = (map.x.len(), map.y.len());
    if nx == 0 || ny == 0 {
        return format!("{}: empty surface\n", map.title);
    }
    let (lo, hi) = map.range().unwrap_or((0.0, 1.0));

    let pick = |k: usize, cells: usize, n: usize| -> usize {
        if cells < 2 { 0 } else { ((k as f64 / (cells as f64 - 1.0)) * (n as f64 - 1.0)).round() as usize }
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{}: f=[{}, {}] Hz | T=[{:.1}, {:.1}] K | log10 φ=[{:.2}, {:.2}]\n",
        map.title,
        tick_label(map.x[0], true),
        tick_label(map.x[nx - 1], true),
        map.y[0],
        map.y[ny - 1],
        lo,
        hi,
    ));
    for r in 0..height {
        let j = pick(height - 1 - r, height, ny);
        let row: String = (0..width)
            .map(|c| match map.values[j][pick(c, width, nx)] {
                Some(v) => RAMP[shade(v, lo, hi)],
                None => '?',
            })
            .collect();
        out.push_str(&row);
        out.push('\n');
    }
    out.push_str(&format!("  scale: '{}' low → high\n", RAMP.iter().collect::<String>()));
    out
}

fn shade(v: f64, lo: f64, hi: f64) -> usize {
    if hi <= lo {
        return RAMP.len() / 2;
    }
    let u = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    (u * (RAMP.len() as f64 - 1.0)).round() as usize
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x: (f64, f64), y: (f64, f64), ch: char) {
    if curve.is_empty() {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(px, py) in curve {
        let col = map_x(px, x.0, x.1, width);
        let row = map_y(py, y.0, y.1, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, ch),
            None => {
                if grid[row][col] == ' ' {
                    grid[row][col] = ch;
                }
            }
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Series;

    #[test]
    fn plot_golden_snapshot_small() {
        let figure = Figure {
            title: "t".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            x_log: false,
            y_log: false,
            series: vec![
                Series::line("model", vec![(1.0, 100.0), (10.0, 100.0)]),
                Series {
                    label: "data".to_string(),
                    style: Style::Markers,
                    points: vec![(1.0, 100.0), (10.0, 110.0)],
                    errors: None,
                },
            ],
        };

        let txt = render_figure(&figure, 10, 5);
        let expected = concat!(
            "Plot: x=[1.0, 10.0] | y=[99.5, 110.5]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
            "  - model\n",
            "  o data\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn error_bars_extend_around_markers() {
        let figure = Figure {
            title: "t".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            x_log: false,
            y_log: false,
            series: vec![Series {
                label: "m".to_string(),
                style: Style::Markers,
                points: vec![(0.0, 5.0), (1.0, 5.0)],
                errors: Some(vec![5.0, 0.0]),
            }],
        };
        let txt = render_figure(&figure, 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).take(5).collect();
        assert_eq!(rows[0], "|         ");
        assert_eq!(rows[2], "o        o");
        assert_eq!(rows[4], "|         ");
    }

    #[test]
    fn heatmap_shades_low_to_high() {
        let map = Heatmap {
            title: "Total loss".to_string(),
            x: vec![1.0, 2.0],
            y: vec![10.0, 20.0],
            values: vec![vec![Some(-8.0), Some(-6.0)], vec![Some(-7.0), None]],
        };
        let txt = render_heatmap(&map, 10, 5);
        let rows: Vec<&str> = txt.lines().collect();
        assert_eq!(rows[0], "Total loss: f=[1e1, 1e2] Hz | T=[10.0, 20.0] K | log10 φ=[-8.00, -6.00]");
        // Top row is the highest temperature: -7 then missing.
        assert_eq!(rows[1], "+++++?????");
        assert_eq!(rows[5], "     @@@@@");
    }
}
