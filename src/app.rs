//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - merges the optional TOML config with command-line flags
//! - dispatches to one handler per subcommand
//! - prints reports/plots and writes the requested files

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::{
    channel_path, converted_path, default_output_path, elapsed, extract_channels_from_file, in_unit, recording_start,
};
use crate::cli::{
    Cli, CoatLossArgs, Command, ConvertTimeArgs, DecomposeArgs, ExtractTempsArgs, ModelArgs, PlotArgs, SweepArgs,
    ViewArgs,
};
use crate::domain::{
    Channel, CoatingModelConfig, DilutionSource, GridConfig, LossComponent, LossResult, LossToggles, LossUnit,
    ModelConfig, OutputOptions, SweepMode, SweepSpec,
};
use crate::error::{AppError, ModelError};
use crate::fit::DecompositionOptions;
use crate::io::config::{FileConfig, load_config};
use crate::io::{
    loss_file, read_loss_json, read_pairs, read_three_column, write_loss_json, write_loss_result, write_measured,
    write_rows,
};
use crate::plot::svg::{DEFAULT_SIZE, write_figure_svg, write_heatmap_svg};
use crate::plot::{Heatmap, ascii, curve_figure, dataset_label, decomposition_figure, measured_figure};
use crate::report::{
    format_decomposition, format_measured_table, format_model_summary, format_resolved_config, format_spot_check,
};

pub mod pipeline;

/// Environment variable naming a default config file.
pub const CONFIG_ENV: &str = "TED_CONFIG";

/// Fixed temperature (K) when neither flag nor config sets one.
pub const DEFAULT_TEMPERATURE: f64 = 300.0;

/// Fixed frequency (Hz) when neither flag nor config sets one.
pub const DEFAULT_FREQUENCY: f64 = crate::domain::REFERENCE_FREQUENCY;

/// Entry point for the `ted` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match cli.command {
        Command::Model(args) => handle_model(&args, config_path.as_deref()),
        Command::Validate(args) => handle_validate(args.file.as_deref().or(config_path.as_deref())),
        Command::View(args) => handle_view(&args, config_path.as_deref()),
        Command::CoatLoss(args) => handle_coat_loss(&args),
        Command::Decompose(args) => handle_decompose(&args),
        Command::Plot(args) => handle_plot(&args),
        Command::ConvertTime(args) => handle_convert_time(&args),
        Command::ExtractTemps(args) => handle_extract_temps(&args),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig, AppError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(path)
        }
        None => Ok(FileConfig::default()),
    }
}

fn invalid(what: &str, message: impl Into<String>) -> AppError {
    ModelError::invalid(what, message).into()
}

fn positive(what: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(what, format!("must be finite and > 0 (got {value})")))
    }
}

fn range(what: &str, cli: Option<&[f64]>, file: Option<[f64; 2]>) -> Result<Option<(f64, f64)>, AppError> {
    let pair = match (cli, file) {
        (Some(&[lo, hi]), _) => (lo, hi),
        (Some(other), _) => return Err(invalid(what, format!("expected MIN MAX, got {} values", other.len()))),
        (None, Some([lo, hi])) => (lo, hi),
        (None, None) => return Ok(None),
    };
    if !(pair.0.is_finite() && pair.1.is_finite() && pair.0 < pair.1) {
        return Err(invalid(what, format!("expected finite MIN < MAX, got [{}, {}]", pair.0, pair.1)));
    }
    Ok(Some(pair))
}

/// Merge CLI flags over the config file over built-in defaults.
pub fn model_config_from_args(args: &SweepArgs, file: &FileConfig) -> Result<ModelConfig, AppError> {
    let s = &file.sweep;
    let sweep = match args.mode.or(s.mode).unwrap_or(SweepMode::FixedTemperature) {
        SweepMode::FixedTemperature => SweepSpec::FixedTemperature {
            temperature: positive(
                "temperature",
                args.temperature.or(s.temperature).unwrap_or(DEFAULT_TEMPERATURE),
            )?,
        },
        SweepMode::FixedFrequency => SweepSpec::FixedFrequency {
            frequency: positive("frequency", args.frequency.or(s.frequency).unwrap_or(DEFAULT_FREQUENCY))?,
        },
        SweepMode::Sweep2d => SweepSpec::Sweep2D,
    };

    let defaults = GridConfig::default();
    let grid = GridConfig {
        resolution: args.resolution.or(s.resolution).unwrap_or(defaults.resolution),
        resolution_2d: args.resolution_2d.or(s.resolution_2d).unwrap_or(defaults.resolution_2d),
        frequency_range: range("frequency_range", args.frequency_range.as_deref(), s.frequency_range)?
            .unwrap_or(defaults.frequency_range),
        frequency_range_2d: range("frequency_range_2d", args.frequency_range_2d.as_deref(), s.frequency_range_2d)?
            .unwrap_or(defaults.frequency_range_2d),
        temperature_range: range("temperature_range", args.temperature_range.as_deref(), s.temperature_range)?,
    };
    if grid.resolution < 2 || grid.resolution_2d < 2 {
        return Err(invalid("resolution", "need at least 2 points per axis"));
    }

    let l = &file.losses;
    let losses = LossToggles {
        substrate: args.substrate || l.substrate.unwrap_or(false),
        coating: args.coating || l.coating.unwrap_or(false),
        extended_interface: args.extended_interface || l.extended_interface.unwrap_or(false),
    };

    let dilution = if let Some(path) = &args.dilution_curve {
        DilutionSource::Curve(path.clone())
    } else if let Some(d) = args.dilution_factor {
        DilutionSource::Factor(positive("dilution_factor", d)?)
    } else if let Some(path) = &l.dilution_curve {
        if l.dilution_factor.is_some() {
            warn!("config sets both dilution_curve and dilution_factor; using the curve");
        }
        DilutionSource::Curve(path.clone())
    } else if let Some(d) = l.dilution_factor {
        DilutionSource::Factor(positive("dilution_factor", d)?)
    } else {
        DilutionSource::None
    };
    if losses.substrate && dilution == DilutionSource::None {
        return Err(invalid(
            "dilution",
            "substrate loss needs --dilution-curve or --dilution-factor",
        ));
    }

    let c = &file.coating_model;
    // A divisor on the command line beats a fixed τ from the file.
    let tau = if args.tau_divisor.is_some() { args.tau } else { args.tau.or(c.tau) };
    let coating_model = CoatingModelConfig {
        tau_divisor: positive(
            "tau_divisor",
            args.tau_divisor.or(c.tau_divisor).unwrap_or(CoatingModelConfig::default().tau_divisor),
        )?,
        tau: tau.map(|t| positive("tau", t)).transpose()?,
    };

    Ok(ModelConfig {
        sweep,
        grid,
        losses,
        dilution,
        coating_model,
    })
}

pub fn output_options_from_args(args: &ModelArgs) -> OutputOptions {
    OutputOptions {
        plot: !args.plot.no_plot,
        plot_width: args.plot.width,
        plot_height: args.plot.height,
        export: args.export.clone(),
        export_json: args.export_json.clone(),
        svg: args.svg.clone(),
        overlay: args.overlay.clone(),
        debug: args.debug,
    }
}

/// Heat map of the total (or the only) series of a surface.
fn surface_heatmap(result: &LossResult) -> Option<Heatmap> {
    let LossResult::Surface(surface) = result else {
        return None;
    };
    Heatmap::from_surface(surface, LossComponent::Total)
        .or_else(|| Heatmap::from_surface(surface, LossComponent::Interface))
}

fn handle_model(args: &ModelArgs, config_path: Option<&Path>) -> Result<(), AppError> {
    let file = load_file_config(config_path)?;
    let config = model_config_from_args(&args.sweep, &file)?;
    let materials = pipeline::resolve_materials(&file)?;
    let options = output_options_from_args(args);

    let curve = pipeline::load_dilution(&config.dilution)?;
    if options.debug {
        let path = crate::debug::write_debug_bundle(Path::new("debug"), &config, &materials, curve.as_ref())?;
        println!("Wrote debug bundle: {}", path.display());
    }
    let output = pipeline::run_model_with(&config, &materials, curve.as_ref())?;

    println!("{}", format_model_summary(&config, &materials, &output));

    let overlay = options.overlay.as_deref().map(read_three_column).transpose()?;
    if options.plot {
        match &output.result {
            LossResult::Curve(curve) => {
                let figure = curve_figure(curve, overlay.as_deref());
                println!("{}", ascii::render_figure(&figure, options.plot_width, options.plot_height));
            }
            LossResult::Surface(_) => {
                if let Some(map) = surface_heatmap(&output.result) {
                    println!("{}", ascii::render_heatmap(&map, options.plot_width, options.plot_height));
                }
            }
        }
    }

    if let Some(stem) = &options.export {
        for path in write_loss_result(stem, &output.result)? {
            println!("Wrote {}", path.display());
        }
    }
    if let Some(path) = &options.export_json {
        write_loss_json(path, &loss_file(config.sweep, output.dilution_factor, &output.result))?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &options.svg {
        match &output.result {
            LossResult::Curve(curve) => write_figure_svg(path, &curve_figure(curve, overlay.as_deref()), DEFAULT_SIZE)?,
            LossResult::Surface(_) => {
                let map = surface_heatmap(&output.result)
                    .ok_or_else(|| AppError::new(4, "Surface has no series to draw"))?;
                write_heatmap_svg(path, &map, DEFAULT_SIZE)?;
            }
        }
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_validate(path: Option<&Path>) -> Result<(), AppError> {
    let Some(path) = path else {
        return Err(AppError::new(
            2,
            format!("No config given (pass a file, --config, or set {CONFIG_ENV})"),
        ));
    };
    let file = load_config(path)?;
    let materials = pipeline::resolve_materials(&file)?;
    let config = model_config_from_args(&SweepArgs::default(), &file)?;
    let curve = pipeline::load_dilution(&config.dilution)?;
    if let Some(curve) = &curve {
        let (lo, hi) = curve.domain();
        println!("Dilution curve domain: [{lo}, {hi}] Hz ({} modes)", curve.frequencies().len());
        for (f, d) in curve.frequencies().iter().zip(curve.factors()) {
            println!("  {f:>12.3} Hz  {d:.6}");
        }
    }

    println!("{}", format_resolved_config(&config, &materials));

    let check = pipeline::spot_check(&config, &materials, curve.as_ref())?;
    println!("{}", format_spot_check(&check));
    println!("Config OK: {}", path.display());
    Ok(())
}

fn handle_view(args: &ViewArgs, config_path: Option<&Path>) -> Result<(), AppError> {
    if let Some(path) = &args.file {
        let file = read_loss_json(path)?;
        return crate::tui::run(path, file);
    }

    let file = load_file_config(config_path)?;
    let config = model_config_from_args(&args.sweep, &file)?;
    let materials = pipeline::resolve_materials(&file)?;
    let run = pipeline::run_model(&config, &materials)?;
    let loss = loss_file(config.sweep, run.sweep.dilution_factor, &run.sweep.result);
    crate::tui::run(Path::new("ted_model.json"), loss)
}

fn handle_coat_loss(args: &CoatLossArgs) -> Result<(), AppError> {
    let phi = pipeline::run_coat_loss(&args.total, &args.substrate, args.dilution)?;
    let points = in_unit(&phi, args.unit);

    let out = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.total, args.unit, args.mode_label.as_deref()));
    write_measured(&out, &points)?;

    let title = format!("Coating loss (D = {})", args.dilution);
    println!("{}", format_measured_table(&title, args.unit, &points));

    let figure = measured_figure(&title, "temperature (K)", args.unit, &[(dataset_label(&out), points)]);
    if !args.plot.no_plot {
        println!("{}", ascii::render_figure(&figure, args.plot.width, args.plot.height));
    }
    if let Some(svg) = &args.svg {
        write_figure_svg(svg, &figure, DEFAULT_SIZE)?;
        println!("Wrote {}", svg.display());
    }
    println!("Wrote {}", out.display());
    Ok(())
}

fn handle_decompose(args: &DecomposeArgs) -> Result<(), AppError> {
    let options = DecompositionOptions {
        scaling: args.scaling,
        reference_frequency: positive("reference_frequency", args.reference_frequency)?,
        exponent_range: (args.exponent_min, args.exponent_max),
        exponent_steps: args.exponent_steps,
        replicates: args.bootstrap,
        seed: args.seed,
    };
    let run = pipeline::run_decompose(&args.loss, &args.dilution, &options)?;
    println!("{}", format_decomposition(&args.temperature, &run.input, &run.fit));

    let figure = decomposition_figure(&args.temperature, &run.input, &run.fit);
    if !args.plot.no_plot {
        println!("{}", ascii::render_figure(&figure, args.plot.width, args.plot.height));
    }
    if let Some(svg) = &args.svg {
        write_figure_svg(svg, &figure, DEFAULT_SIZE)?;
        println!("Wrote {}", svg.display());
    }

    let out = args.output.clone().unwrap_or_else(|| {
        let stem = args.loss.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        args.loss.with_file_name(format!("{stem} fit {}K.txt", args.temperature))
    });
    write_rows(&out, run.fitted_rows())?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn plot_loss_json(args: &PlotArgs, path: &Path) -> Result<(), AppError> {
    let loss = read_loss_json(path)?;
    if args.unit == LossUnit::Q {
        warn!("loss results are plotted as φ");
    }
    match &loss.result {
        LossResult::Curve(curve) => {
            let mut figure = curve_figure(curve, None);
            if let Some(title) = &args.title {
                figure.title = title.clone();
            }
            if !args.plot.no_plot {
                println!("{}", ascii::render_figure(&figure, args.plot.width, args.plot.height));
            }
            if let Some(svg) = &args.svg {
                write_figure_svg(svg, &figure, DEFAULT_SIZE)?;
                println!("Wrote {}", svg.display());
            }
        }
        LossResult::Surface(_) => {
            let map =
                surface_heatmap(&loss.result).ok_or_else(|| AppError::new(4, "Surface has no series to draw"))?;
            if !args.plot.no_plot {
                println!("{}", ascii::render_heatmap(&map, args.plot.width, args.plot.height));
            }
            if let Some(svg) = &args.svg {
                write_heatmap_svg(svg, &map, DEFAULT_SIZE)?;
                println!("Wrote {}", svg.display());
            }
        }
    }
    Ok(())
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    if let [path] = args.files.as_slice() {
        if is_json(path) {
            return plot_loss_json(args, path);
        }
    }
    if args.files.iter().any(|p| is_json(p)) {
        return Err(AppError::new(2, "A JSON loss result must be plotted on its own"));
    }

    let mut datasets = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let points = read_three_column(path)?;
        datasets.push((dataset_label(path), in_unit(&points, args.unit)));
    }
    let title = args.title.clone().unwrap_or_else(|| match args.unit {
        LossUnit::Phi => "Loss angle vs temperature".to_string(),
        LossUnit::Q => "Q vs temperature".to_string(),
    });
    let figure = measured_figure(&title, &args.x_label, args.unit, &datasets);

    if !args.plot.no_plot {
        println!("{}", ascii::render_figure(&figure, args.plot.width, args.plot.height));
    }
    if let Some(svg) = &args.svg {
        write_figure_svg(svg, &figure, DEFAULT_SIZE)?;
        println!("Wrote {}", svg.display());
    }
    Ok(())
}

fn handle_convert_time(args: &ConvertTimeArgs) -> Result<(), AppError> {
    let rows = read_pairs(&args.input)?;
    let converted = elapsed(&rows, args.unit)?;
    if let Some(start) = rows.first().and_then(|&(t, _)| recording_start(t)) {
        println!("Recording started {}", start.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    let out = args.output.clone().unwrap_or_else(|| converted_path(&args.input, args.unit));
    write_rows(&out, converted.iter().map(|&(t, v)| [t, v]))?;
    println!("Wrote {} rows to {}", converted.len(), out.display());
    Ok(())
}

fn handle_extract_temps(args: &ExtractTempsArgs) -> Result<(), AppError> {
    let channels = if args.channels.is_empty() {
        Channel::ALL.to_vec()
    } else {
        args.channels.clone()
    };
    let dir = match &args.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
            dir.clone()
        }
        None => args.input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    for (channel, rows) in extract_channels_from_file(&args.input, &channels)? {
        let path = channel_path(&dir, channel);
        write_rows(&path, rows.iter().map(|&(t, v)| [t, v]))?;
        println!("{}: {} rows -> {}", channel.file_tag(), rows.len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::parse_config;

    fn sweep_args() -> SweepArgs {
        SweepArgs::default()
    }

    #[test]
    fn defaults_without_config() {
        let config = model_config_from_args(&sweep_args(), &FileConfig::default()).unwrap();
        assert_eq!(config.sweep, SweepSpec::FixedTemperature { temperature: 300.0 });
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.losses, LossToggles::default());
        assert_eq!(config.dilution, DilutionSource::None);
    }

    #[test]
    fn flags_override_file_values() {
        let file = parse_config(
            r#"
            [sweep]
            mode = "fixed-frequency"
            frequency = 1000.0
            resolution = 500
            temperature_range = [20.0, 200.0]

            [losses]
            substrate = true
            dilution_factor = 0.3

            [coating_model]
            tau = 1e-9
            "#,
            None,
        )
        .unwrap();

        let args = SweepArgs {
            frequency: Some(390.0),
            temperature_range: Some(vec![50.0, 100.0]),
            tau_divisor: Some(1e5),
            ..sweep_args()
        };
        let config = model_config_from_args(&args, &file).unwrap();
        assert_eq!(config.sweep, SweepSpec::FixedFrequency { frequency: 390.0 });
        assert_eq!(config.grid.resolution, 500);
        assert_eq!(config.grid.temperature_range, Some((50.0, 100.0)));
        assert!(config.losses.substrate);
        assert_eq!(config.dilution, DilutionSource::Factor(0.3));
        assert_eq!(config.coating_model.tau_divisor, 1e5);
        assert_eq!(config.coating_model.tau, None);
    }

    #[test]
    fn substrate_without_dilution_is_rejected() {
        let args = SweepArgs {
            substrate: true,
            ..sweep_args()
        };
        let err = model_config_from_args(&args, &FileConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bad_ranges_and_values_are_rejected() {
        let reversed = SweepArgs {
            frequency_range: Some(vec![1e3, 1.0]),
            ..sweep_args()
        };
        assert!(model_config_from_args(&reversed, &FileConfig::default()).is_err());

        let negative = SweepArgs {
            temperature: Some(-4.0),
            ..sweep_args()
        };
        assert!(model_config_from_args(&negative, &FileConfig::default()).is_err());

        let tiny = SweepArgs {
            resolution: Some(1),
            ..sweep_args()
        };
        assert!(model_config_from_args(&tiny, &FileConfig::default()).is_err());
    }
}
