//! # Signcalc CLI
//!
//! `signcalc [request.json] [--settings <settings.json>]` runs one
//! [`SolveRequest`] and prints the JSON output. With no request file it runs
//! an interactive single-pole sign design.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (e.g. `RUST_LOG=signcalc_core=debug`).
//!
//! [`SolveRequest`]: signcalc_core::SolveRequest

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use signcalc_core::calculations::footing::FootingInput;
use signcalc_core::loads::{Cabinet, Exposure, LoadInput, SiteLoads};
use signcalc_core::optimization::ParetoInput;
use signcalc_core::sections::StaticCatalog;
use signcalc_core::{CalcError, CalibrationStore, DesignSettings, SignCalc, SolverRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Size a sign support from a JSON request, or interactively.
#[derive(Parser, Debug)]
#[command(name = "signcalc", version, about = "Sign support structural calculations")]
struct Args {
    /// JSON request file; omit for the interactive designer.
    request: Option<PathBuf>,

    /// Design settings JSON overriding the defaults.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn build_engine(settings_path: Option<&Path>) -> Result<SignCalc, CalcError> {
    let settings = match settings_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| CalcError::configuration(path.display().to_string(), e.to_string()))?;
            DesignSettings::from_json(&json)?
        }
        None => DesignSettings::default(),
    };
    SignCalc::new(
        CalibrationStore::with_defaults(),
        settings,
        SolverRegistry::with_defaults(),
        Box::new(StaticCatalog::builtin()),
    )
}

fn prompt_f64(prompt: &str, default: f64) -> f64 {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return default;
    }

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return default;
    }

    input.trim().parse().unwrap_or(default)
}

fn prompt_exposure(default: Exposure) -> Exposure {
    print!("Exposure category B/C/D [C]: ");
    if io::stdout().flush().is_err() {
        return default;
    }
    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return default;
    }
    match input.trim().to_ascii_uppercase().as_str() {
        "B" => Exposure::B,
        "C" => Exposure::C,
        "D" => Exposure::D,
        _ => default,
    }
}

fn print_error(e: &CalcError) {
    eprintln!("Error [{}]: {}", e.error_code(), e);
    if let Ok(json) = serde_json::to_string_pretty(e) {
        eprintln!();
        eprintln!("Error JSON:");
        eprintln!("{}", json);
    }
}

fn run_request(engine: &SignCalc, path: &Path) -> Result<(), CalcError> {
    let request = fs::read_to_string(path)
        .map_err(|e| CalcError::invalid_input("request", path.display().to_string(), e.to_string()))?;
    let response = engine.dispatch_json(&request)?;
    info!(request = %path.display(), stats = ?engine.cache_stats(), "cli.request_done");
    println!("{}", response);
    Ok(())
}

fn run_demo(engine: &SignCalc) -> Result<(), CalcError> {
    println!("Signcalc - Sign Support Designer");
    println!("================================");
    println!();

    let wind_speed_mph = prompt_f64("Basic wind speed (mph) [115]: ", 115.0);
    let exposure = prompt_exposure(Exposure::C);
    let width_ft = prompt_f64("Cabinet width (ft) [14]: ", 14.0);
    let cabinet_height_ft = prompt_f64("Cabinet height (ft) [8]: ", 8.0);
    let height_ft = prompt_f64("Overall height (ft) [25]: ", 25.0);
    let soil_psf = prompt_f64("Allowable soil bearing (psf) [3000]: ", 3000.0);
    let diameter_ft = prompt_f64("Footing diameter (ft) [3]: ", 3.0);

    let loads = engine.derive_loads(&LoadInput {
        site: SiteLoads {
            wind_speed_mph,
            exposure,
        },
        cabinets: vec![Cabinet::new(width_ft, cabinet_height_ft)],
        height_ft,
    })?;
    let poles = engine.pareto_optimize_poles(&ParetoInput::new(loads.result.moment_kipin(), height_ft))?;
    let footing = engine.footing_solve(&FootingInput::new(
        diameter_ft,
        loads.result.moment_kipft,
        soil_psf,
        1,
    ))?;

    println!();
    println!("═══════════════════════════════════════");
    println!("  SIGN SUPPORT RESULTS");
    println!("═══════════════════════════════════════");
    println!();
    println!("Loads ({} v{}):", loads.solver, loads.solver_version);
    println!("  qz       = {:.1} psf", loads.result.velocity_pressure_psf);
    println!("  Force    = {:.0} lb", loads.result.wind_force_lb);
    println!("  Moment   = {:.1} kip-ft", loads.result.moment_kipft);
    println!("  Weight   = {:.0} lb", loads.result.estimated_weight_lb);
    println!();
    println!("Pole candidates (Pareto ranked):");
    if poles.result.is_empty() {
        println!("  none - no catalog section works");
    }
    for p in poles.result.iter().take(5) {
        println!(
            "  {:<14} ${:>8.0}  {:>6.1} plf  SF {:.2}{}",
            p.designation,
            p.cost,
            p.weight_plf,
            p.safety_factor,
            if p.is_dominated { "" } else { "  [front]" }
        );
    }
    println!();
    println!("Footing:");
    println!(
        "  {:.1} ft dia x {:.0} in deep, {:.2} yd³ {}",
        footing.result.diameter_ft,
        footing.result.depth_in,
        footing.result.concrete_yd3,
        if footing.result.request_engineering {
            "[REVIEW]"
        } else {
            "[OK]"
        }
    );
    println!();
    println!("Assumptions:");
    for a in loads
        .assumptions
        .iter()
        .chain(&poles.assumptions)
        .chain(&footing.assumptions)
    {
        println!("  - {}", a);
    }
    println!();
    println!("═══════════════════════════════════════");
    println!(
        "  CONFIDENCE: loads {:.2}, poles {:.2}, footing {:.2}",
        loads.confidence, poles.confidence, footing.confidence
    );
    println!("═══════════════════════════════════════");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let result = build_engine(args.settings.as_deref()).and_then(|engine| match args.request.as_deref() {
        Some(path) => run_request(&engine, path),
        None => run_demo(&engine),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["signcalc", "req.json", "--settings", "site.json"]).unwrap();
        assert_eq!(args.request, Some(PathBuf::from("req.json")));
        assert_eq!(args.settings, Some(PathBuf::from("site.json")));

        let args = Args::try_parse_from(["signcalc"]).unwrap();
        assert!(args.request.is_none() && args.settings.is_none());

        assert!(Args::try_parse_from(["signcalc", "--settings"]).is_err());
        assert!(Args::try_parse_from(["signcalc", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let err = build_engine(Some(Path::new("/nonexistent/settings.json"))).err().unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }
}
