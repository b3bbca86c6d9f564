//! Command-line parsing for the thermoelastic loss toolkit.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! physics and fitting code. Flags here only override values; defaults for the
//! physics live in [`crate::domain`] and the optional TOML config.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{BulkScaling, Channel, LossUnit, SweepMode, TimeUnit};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ted", version, about = "Thermoelastic loss modelling for coated disk resonators")]
pub struct Cli {
    /// More log output on stderr (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML run configuration (defaults to `$TED_CONFIG` when set).
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate interface, substrate and coating thermoelastic loss.
    Model(ModelArgs),
    /// Load and validate a config, then print the resolved run without evaluating.
    Validate(ValidateArgs),
    /// Browse a saved JSON result (or a fresh model run) in a terminal UI.
    View(ViewArgs),
    /// Extract coating loss from total and substrate loss measurements.
    CoatLoss(CoatLossArgs),
    /// Split coating loss into bulk and shear contributions.
    Decompose(DecomposeArgs),
    /// Plot three-column data files or a saved JSON result.
    Plot(PlotArgs),
    /// Convert Unix-millisecond timestamps to elapsed time.
    ConvertTime(ConvertTimeArgs),
    /// Split a temperature-controller CSV export into per-channel files.
    ExtractTemps(ExtractTempsArgs),
}

/// Physics and grid options shared by `model` and `view`.
#[derive(Debug, Args, Clone, Default)]
pub struct SweepArgs {
    /// Sweep mode.
    #[arg(short, long, value_enum)]
    pub mode: Option<SweepMode>,

    /// Fixed temperature (K) for `fixed-temperature`.
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Fixed frequency (Hz) for `fixed-frequency`.
    #[arg(short, long)]
    pub frequency: Option<f64>,

    /// Points per sweep axis (1D modes).
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Points per axis for the 2D surface.
    #[arg(long = "resolution-2d")]
    pub resolution_2d: Option<usize>,

    /// Broad frequency range (Hz) for interface-only sweeps.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub frequency_range: Option<Vec<f64>>,

    /// Frequency range (Hz) of 2D sweeps without a dilution curve.
    #[arg(long = "frequency-range-2d", num_args = 2, value_names = ["MIN", "MAX"])]
    pub frequency_range_2d: Option<Vec<f64>>,

    /// Temperature range (K); defaults to the range shared by the material tables.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub temperature_range: Option<Vec<f64>>,

    /// Include substrate (Debye peak) loss.
    #[arg(long)]
    pub substrate: bool,

    /// Include effective-medium coating loss.
    #[arg(long)]
    pub coating: bool,

    /// Also evaluate interface loss on the broad grid when the sweep is cut to the dilution curve.
    #[arg(long)]
    pub extended_interface: bool,

    /// Two-column `frequency dilution` file for the mode family of interest.
    #[arg(long, value_name = "FILE", conflicts_with = "dilution_factor")]
    pub dilution_curve: Option<PathBuf>,

    /// Single dilution factor for the mode of interest.
    #[arg(long, value_name = "D")]
    pub dilution_factor: Option<f64>,

    /// Coating relaxation time divisor: τ = L²c/κ / divisor.
    #[arg(long)]
    pub tau_divisor: Option<f64>,

    /// Fixed coating relaxation time (s); overrides the divisor.
    #[arg(long, conflicts_with = "tau_divisor")]
    pub tau: Option<f64>,
}

/// Terminal plot size, shared by every command that plots.
#[derive(Debug, Args, Clone)]
pub struct PlotSizeArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,

    #[command(flatten)]
    pub plot: PlotSizeArgs,

    /// Export every series as three-column text: `<STEM>_<component>.txt`.
    #[arg(long, value_name = "STEM")]
    pub export: Option<PathBuf>,

    /// Export the result as JSON (readable by `ted view` and `ted plot`).
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Write an SVG plot (line plot, or heat map of the total for 2D sweeps).
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Measured `x φ σ` points drawn over the model.
    #[arg(long, value_name = "FILE")]
    pub overlay: Option<PathBuf>,

    /// Write a material/grid debug bundle under `debug/`.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Config to validate (falls back to `--config` / `$TED_CONFIG`).
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// JSON result from `ted model --export-json`. Without it, the model is run first.
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub sweep: SweepArgs,
}

#[derive(Debug, Args)]
pub struct CoatLossArgs {
    /// Total loss of the coated sample (`T φ σ`).
    pub total: PathBuf,

    /// Loss of the uncoated substrate (`T φ σ`).
    pub substrate: PathBuf,

    /// Coating dilution factor of the mode.
    #[arg(short, long, value_name = "D", allow_negative_numbers = true)]
    pub dilution: f64,

    /// Output unit.
    #[arg(short, long, value_enum, default_value_t = LossUnit::Phi)]
    pub unit: LossUnit,

    /// Mode label used in the default Q output name.
    #[arg(long)]
    pub mode_label: Option<String>,

    /// Output file (default derived from the input name and unit).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write an SVG plot of the extracted loss.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    #[command(flatten)]
    pub plot: PlotSizeArgs,
}

#[derive(Debug, Args)]
pub struct DecomposeArgs {
    /// Coating loss per mode (`f φ σ`).
    pub loss: PathBuf,

    /// Row-aligned dilution factors (`D_bulk D_shear`).
    pub dilution: PathBuf,

    /// Temperature label for the report and output names.
    #[arg(short, long, default_value = "300")]
    pub temperature: String,

    /// Frequency dependence of the bulk term.
    #[arg(long, value_enum, default_value_t = BulkScaling::Constant)]
    pub scaling: BulkScaling,

    /// Reference frequency f_ref (Hz) of the bulk term.
    #[arg(long, default_value_t = 1000.0)]
    pub reference_frequency: f64,

    /// Exponent grid lower bound (`--scaling fit`).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub exponent_min: f64,

    /// Exponent grid upper bound (`--scaling fit`).
    #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub exponent_max: f64,

    /// Exponent grid points (`--scaling fit`).
    #[arg(long, default_value_t = 41)]
    pub exponent_steps: usize,

    /// Bootstrap replicates (0 disables).
    #[arg(long, default_value_t = 0)]
    pub bootstrap: usize,

    /// Bootstrap seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write fitted values (`f φ_fit 0`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write an SVG plot of data and fit.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    #[command(flatten)]
    pub plot: PlotSizeArgs,
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Three-column files, or a single JSON loss result.
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Plot loss angle or quality factor.
    #[arg(short, long, value_enum, default_value_t = LossUnit::Phi)]
    pub unit: LossUnit,

    #[arg(long)]
    pub title: Option<String>,

    /// X-axis label for three-column files.
    #[arg(long, default_value = "temperature (K)")]
    pub x_label: String,

    /// Write an SVG plot.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    #[command(flatten)]
    pub plot: PlotSizeArgs,
}

#[derive(Debug, Args)]
pub struct ConvertTimeArgs {
    /// Two-column `unix_ms value` file.
    pub input: PathBuf,

    /// Elapsed-time unit.
    #[arg(short, long, value_enum, default_value_t = TimeUnit::S)]
    pub unit: TimeUnit,

    /// Output file (default `<stem><unit>.txt` next to the input).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExtractTempsArgs {
    /// Temperature-controller CSV export.
    pub input: PathBuf,

    /// Channels to extract (default: all).
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub channels: Vec<Channel>,

    /// Output directory (default: next to the input).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn model_flags_parse() {
        let cli = Cli::try_parse_from([
            "ted",
            "-vv",
            "model",
            "--mode",
            "fixed-frequency",
            "-f",
            "390",
            "--temperature-range",
            "20",
            "250",
            "--substrate",
            "--dilution-factor",
            "0.85",
            "--no-plot",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Model(args) = cli.command else {
            panic!("expected model");
        };
        assert_eq!(args.sweep.mode, Some(SweepMode::FixedFrequency));
        assert_eq!(args.sweep.frequency, Some(390.0));
        assert_eq!(args.sweep.temperature_range, Some(vec![20.0, 250.0]));
        assert!(args.sweep.substrate && !args.sweep.coating);
        assert_eq!(args.sweep.dilution_factor, Some(0.85));
        assert!(args.plot.no_plot);
    }

    #[test]
    fn dilution_sources_conflict() {
        let err = Cli::try_parse_from([
            "ted",
            "model",
            "--dilution-curve",
            "modes.txt",
            "--dilution-factor",
            "0.5",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn channels_are_comma_separated() {
        let cli = Cli::try_parse_from(["ted", "extract-temps", "log.csv", "-c", "stage,ch-heat"]).unwrap();
        let Command::ExtractTemps(args) = cli.command else {
            panic!("expected extract-temps");
        };
        assert_eq!(args.channels, vec![Channel::Stage, Channel::ChHeat]);
    }

    #[test]
    fn two_d_mode_name() {
        let cli = Cli::try_parse_from(["ted", "view", "--mode", "2d"]).unwrap();
        let Command::View(args) = cli.command else {
            panic!("expected view");
        };
        assert!(args.file.is_none());
        assert_eq!(args.sweep.mode, Some(SweepMode::Sweep2d));
    }
}
