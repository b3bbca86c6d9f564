//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the physics and fitting code stays clean and testable
//! - output changes are localized (snapshot-style tests below)

use crate::domain::{DilutionSource, LossResult, LossUnit, ModelConfig, SweepSpec};
use crate::fit::{Decomposition, DecompositionInput};
use crate::io::MeasuredPoint;
use crate::materials::MaterialSet;
use crate::app::pipeline::SpotCheck;
use crate::sweep::SweepOutput;

fn fmt_sci(v: f64) -> String {
    format!("{v:.4e}")
}

fn materials_line(materials: &MaterialSet) -> String {
    let coating = match &materials.coating2 {
        Some(second) => format!("{} / {}", materials.coating.name, second.name),
        None => materials.coating.name.clone(),
    };
    format!(
        "Materials: substrate={} ({:.3} mm) | coating={} ({:.3} µm)",
        materials.substrate.name,
        materials.substrate.constants.thickness * 1e3,
        coating,
        materials.coating.constants.thickness * 1e6,
    )
}

/// The resolved run configuration (`ted validate`, and the head of `ted model`).
pub fn format_resolved_config(config: &ModelConfig, materials: &MaterialSet) -> String {
    let mut out = String::new();
    out.push_str(&materials_line(materials));
    out.push('\n');

    let (t_lo, t_hi) = config.grid.temperature_range.unwrap_or_else(|| materials.temperature_range());
    out.push_str(&format!("Sweep: {}\n", config.sweep.label()));
    match config.sweep {
        SweepSpec::FixedTemperature { .. } => out.push_str(&format!(
            "Grid: {} points | broad f=[{:e}, {:e}] Hz\n",
            config.grid.resolution, config.grid.frequency_range.0, config.grid.frequency_range.1
        )),
        SweepSpec::FixedFrequency { .. } => out.push_str(&format!(
            "Grid: {} points | T=[{t_lo}, {t_hi}] K\n",
            config.grid.resolution
        )),
        SweepSpec::Sweep2D => out.push_str(&format!(
            "Grid: {0} × {0} points | T=[{t_lo}, {t_hi}] K | f=[{1:e}, {2:e}] Hz without dilution curve\n",
            config.grid.resolution_2d, config.grid.frequency_range_2d.0, config.grid.frequency_range_2d.1
        )),
    }

    let on = |b: bool| if b { "on" } else { "off" };
    out.push_str(&format!(
        "Losses: interface=on substrate={} coating={} extended-interface={}\n",
        on(config.losses.substrate),
        on(config.losses.coating),
        on(config.losses.extended_interface),
    ));
    out.push_str(&match &config.dilution {
        DilutionSource::None => "Dilution: none\n".to_string(),
        DilutionSource::Curve(path) => format!("Dilution: curve {}\n", path.display()),
        DilutionSource::Factor(d) => format!("Dilution: factor {d}\n"),
    });
    if config.losses.coating {
        out.push_str(&match config.coating_model.tau {
            Some(tau) => format!("Coating τ: fixed {tau:e} s\n"),
            None => format!("Coating τ: L²c/κ / {}\n", config.coating_model.tau_divisor),
        });
    }
    out
}

/// Run summary: configuration, then min/max of every computed series.
pub fn format_model_summary(config: &ModelConfig, materials: &MaterialSet, output: &SweepOutput) -> String {
    let mut out = String::new();
    out.push_str("=== ted - Thermoelastic Loss ===\n");
    out.push_str(&format_resolved_config(config, materials));
    if let Some(d) = output.dilution_factor {
        out.push_str(&format!("Dilution factor applied: {d:.6}\n"));
    }

    out.push_str("\nSeries:\n");
    match &output.result {
        LossResult::Curve(curve) => {
            let unit = if curve.axis.is_log() { "Hz" } else { "K" };
            for s in &curve.series {
                let Some((i_max, max)) = argmax(&s.values) else {
                    continue;
                };
                let min = s.values.iter().copied().fold(f64::INFINITY, f64::min);
                out.push_str(&format!(
                    "  {:<10} min={} max={} at {:.4} {unit}\n",
                    s.component.display_name(),
                    fmt_sci(min),
                    fmt_sci(max),
                    curve.x[i_max],
                ));
            }
            if let Some(ext) = &curve.extended_interface {
                out.push_str(&format!(
                    "  Interface evaluated on the full range as well ({} points)\n",
                    ext.x.len()
                ));
            }
        }
        LossResult::Surface(surface) => {
            out.push_str(&format!(
                "  grid {} T × {} f\n",
                surface.temperature.len(),
                surface.frequency.len()
            ));
            for s in &surface.series {
                let flat: Vec<f64> = s.values.iter().flatten().copied().collect();
                let Some((k, max)) = argmax(&flat) else {
                    continue;
                };
                let nf = surface.frequency.len();
                let min = flat.iter().copied().fold(f64::INFINITY, f64::min);
                out.push_str(&format!(
                    "  {:<10} min={} max={} at T={:.2} K f={:.4e} Hz\n",
                    s.component.display_name(),
                    fmt_sci(min),
                    fmt_sci(max),
                    surface.temperature[k / nf],
                    surface.frequency[k % nf],
                ));
            }
        }
    }
    out
}

fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}

pub fn format_decomposition(temperature: &str, input: &DecompositionInput, fit: &Decomposition) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Bulk/shear decomposition at {temperature} K ===\n"));
    out.push_str(&format!(
        "Model: φ = D_shear φ_shear + D_bulk φ_bulk (f / {} Hz)^n | scaling={:?}\n",
        fit.reference_frequency, fit.scaling
    ));
    if fit.candidates > 1 {
        out.push_str(&format!("Exponent: n={:.4} (best of {} candidates)\n", fit.exponent, fit.candidates));
    } else {
        out.push_str(&format!("Exponent: n={} (fixed)\n", fit.exponent));
    }
    out.push_str(&format!("φ_shear = {} ± {}\n", fmt_sci(fit.phi_shear), fmt_sci(fit.shear_error)));
    if fit.exponent == 0.0 {
        out.push_str(&format!("φ_bulk  = {} ± {}\n", fmt_sci(fit.phi_bulk), fmt_sci(fit.bulk_error)));
    } else {
        // Also quoted as the coefficient of f^n with f in Hz.
        let per_hz = fit.reference_frequency.powf(fit.exponent);
        out.push_str(&format!(
            "φ_bulk  = {} ± {} at f_ref = {} Hz ({} ± {} per Hz^{})\n",
            fmt_sci(fit.phi_bulk),
            fmt_sci(fit.bulk_error),
            fit.reference_frequency,
            fmt_sci(fit.phi_bulk / per_hz),
            fmt_sci(fit.bulk_error / per_hz),
            fit.exponent
        ));
    }
    out.push_str(&format!(
        "χ²={:.4} dof={} reduced χ²={:.4}\n",
        fit.chi2, fit.dof, fit.reduced_chi2
    ));
    if let Some(b) = &fit.bootstrap {
        out.push_str(&format!(
            "Bootstrap ({}/{} replicates): sd(φ_shear)={} sd(φ_bulk)={} sd(n)={:.4}\n",
            b.used,
            b.requested,
            fmt_sci(b.shear_std),
            fmt_sci(b.bulk_std),
            b.exponent_std
        ));
    }

    out.push_str("\n  freq(Hz)      φ            σ            φ_fit        (φ−fit)/σ\n");
    for i in 0..input.len() {
        let pull = (input.loss[i] - fit.fitted[i]) / input.sigma[i];
        out.push_str(&format!(
            "  {:<12.2}  {}  {}  {}  {:+.3}\n",
            input.frequencies[i],
            fmt_sci(input.loss[i]),
            fmt_sci(input.sigma[i]),
            fmt_sci(fit.fitted[i]),
            pull
        ));
    }
    out
}

/// Single-point evaluation printed by `ted validate`.
pub fn format_spot_check(check: &SpotCheck) -> String {
    let mut out = format!(
        "Spot check at T={} K, f={} Hz:\n  Interface  {}\n",
        check.temperature,
        fmt_sci(check.frequency),
        fmt_sci(check.loss.interface)
    );
    if let Some(v) = check.loss.substrate {
        let d = check.dilution.map(|d| format!(" (D={d:.6})")).unwrap_or_default();
        out.push_str(&format!("  Substrate  {}{d}\n", fmt_sci(v)));
    }
    if let Some(v) = check.loss.coating {
        out.push_str(&format!("  Coating    {}\n", fmt_sci(v)));
    }
    out.push_str(&format!("  Total      {}", fmt_sci(check.loss.total())));
    out
}

/// `x value σ` table for the coating-loss extraction.
pub fn format_measured_table(title: &str, unit: LossUnit, points: &[MeasuredPoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{title}\n"));
    out.push_str(&format!("  {:<10}  {:<12}  σ\n", "T (K)", unit.label()));
    for p in points {
        out.push_str(&format!("  {:<10.3}  {}  {}\n", p.x, fmt_sci(p.value), fmt_sci(p.sigma)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Axis, LossComponent, LossCurve, LossSeries};

    #[test]
    fn argmax_skips_non_finite() {
        assert_eq!(argmax(&[1.0, f64::NAN, 3.0, 2.0]), Some((2, 3.0)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn measured_table_snapshot() {
        let txt = format_measured_table(
            "Coating loss",
            LossUnit::Phi,
            &[MeasuredPoint {
                x: 12.0,
                value: 1.5e-4,
                sigma: 2e-6,
            }],
        );
        let expected = concat!(
            "Coating loss\n",
            "  T (K)       φ             σ\n",
            "  12.000      1.5000e-4  2.0000e-6\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn linear_bulk_is_quoted_at_reference_and_per_hz() {
        use crate::fit::{DecompositionOptions, decompose};
        use crate::domain::BulkScaling;

        let rows = [(1000.0, 0.9, 0.1), (2000.0, 0.7, 0.3), (4000.0, 0.5, 0.5), (8000.0, 0.8, 0.2)];
        let (shear, bulk) = (2e-5, 3e-4);
        let points: Vec<MeasuredPoint> = rows
            .iter()
            .map(|&(f, ds, db)| MeasuredPoint {
                x: f,
                value: ds * shear + db * bulk * f / 1000.0,
                sigma: 1e-6,
            })
            .collect();
        let dilution: Vec<(f64, f64)> = rows.iter().map(|&(_, ds, db)| (db, ds)).collect();
        let input = DecompositionInput::new(&points, &dilution).unwrap();
        let options = DecompositionOptions {
            scaling: BulkScaling::Linear,
            ..Default::default()
        };
        let fit = decompose(&input, &options).unwrap();

        let txt = format_decomposition("300", &input, &fit);
        assert!(txt.contains("at f_ref = 1000 Hz"));
        assert!(txt.contains("per Hz^1"));
        assert!(txt.contains(&fmt_sci(fit.phi_bulk / 1000.0)));
    }

    #[test]
    fn spot_check_lists_enabled_components() {
        use crate::sweep::PointLoss;

        let txt = format_spot_check(&SpotCheck {
            temperature: 300.0,
            frequency: 390.0,
            dilution: Some(0.25),
            loss: PointLoss {
                interface: 2e-6,
                substrate: Some(1e-7),
                coating: None,
            },
        });
        assert!(txt.starts_with("Spot check at T=300 K, f=3.9000e2 Hz:"));
        assert!(txt.contains("  Substrate  1.0000e-7 (D=0.250000)"));
        assert!(!txt.contains("Coating"));
        assert!(txt.ends_with("  Total      2.1000e-6"));
    }

    #[test]
    fn summary_lists_each_component() {
        let output = SweepOutput {
            result: LossResult::Curve(LossCurve {
                axis: Axis::Frequency,
                fixed: 300.0,
                x: vec![1.0, 10.0, 100.0],
                series: vec![
                    LossSeries {
                        component: LossComponent::Interface,
                        values: vec![1e-7, 3e-6, 2e-6],
                    },
                    LossSeries {
                        component: LossComponent::Total,
                        values: vec![1e-7, 3e-6, 2e-6],
                    },
                ],
                extended_interface: None,
            }),
            dilution_factor: None,
        };
        let config = ModelConfig {
            sweep: SweepSpec::FixedTemperature { temperature: 300.0 },
            grid: Default::default(),
            losses: Default::default(),
            dilution: DilutionSource::None,
            coating_model: Default::default(),
        };
        let txt = format_model_summary(&config, &crate::materials::literature_set(), &output);
        assert!(txt.contains("Sweep: fixed temperature 300 K"));
        assert!(txt.contains("  Interface  min=1.0000e-7 max=3.0000e-6 at 10.0000 Hz"));
        assert!(txt.contains("  Total      "));
    }
}
