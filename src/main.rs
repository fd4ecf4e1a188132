use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::info;
use thiserror::Error;
use topobrief::{
    extract, render_summary, DispatchError, Dispatcher, OptimizationResult, SimulatedSolver,
    SolverConfig, SolverSettings, WireResponse,
};

/// Extract an optimization problem from a brief and run it.
#[derive(Debug, Parser)]
#[command(name = "topobrief", version, about)]
struct Args {
    /// Brief file to read, or `-` for standard input.
    brief: PathBuf,

    /// Solver base URL (overrides TOPOBRIEF_SOLVER_URL).
    #[arg(long)]
    solver_url: Option<String>,

    /// Request timeout in seconds (overrides TOPOBRIEF_SOLVER_TIMEOUT_SECS).
    #[arg(long)]
    timeout: Option<u64>,

    /// Voxels per axis, replacing the brief's value (at most 100).
    #[arg(long)]
    resolution: Option<usize>,

    /// SIMP penalty, replacing the brief's value.
    #[arg(long)]
    penalty: Option<f64>,

    /// Iteration budget, replacing the brief's value.
    #[arg(long)]
    iterations: Option<usize>,

    /// Skip the solver and run the simulated optimization directly.
    #[arg(long)]
    simulate: bool,

    /// Do not emulate solver latency in simulated runs.
    #[arg(long)]
    no_delay: bool,

    /// Seed for the simulated density noise.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the result as JSON instead of a text report.
    #[arg(long)]
    json: bool,

    /// Print the extracted parameters as JSON and stop.
    #[arg(long)]
    extract_only: bool,
}

/// Failures that end the program.
#[derive(Debug, Error)]
enum CliError {
    /// The brief could not be read.
    #[error("could not read brief: {0}")]
    Io(#[from] io::Error),
    /// Output could not be encoded.
    #[error("could not encode output: {0}")]
    Json(#[from] serde_json::Error),
    /// The parameters were rejected before dispatch.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Read the brief from `path`, or from standard input when `path` is `-`.
fn read_brief(path: &Path) -> Result<String, io::Error> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path)
    }
}

/// Simulated fallback configured from `--seed` and `--no-delay`.
fn simulator(args: &Args) -> SimulatedSolver {
    let simulator = match args.seed {
        Some(seed) => SimulatedSolver::with_seed(seed),
        None => SimulatedSolver::new(),
    };
    if args.no_delay {
        simulator.with_latency(Duration::ZERO)
    } else {
        simulator
    }
}

/// Run the pipeline once. `Ok(false)` means the optimisation itself failed.
fn run(args: &Args) -> Result<bool, CliError> {
    // Pull the labelled fields out of the brief. Anything missing or garbled
    // takes its default, so this step never fails on content.
    let text = read_brief(&args.brief)?;
    // Settings given on the command line only replace the solver controls;
    // the part, material and load come from the brief alone.
    let params = extract(&text).with_solver_settings(SolverSettings {
        resolution: args.resolution,
        penalty: args.penalty,
        iterations: args.iterations,
    });

    if args.extract_only {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(true);
    }

    // Either skip the solver outright or send the record once. An unreachable
    // solver is answered by the simulator, and the result says so.
    let result: OptimizationResult = if args.simulate {
        params.validate().map_err(DispatchError::from)?;
        info!("solver skipped on request");
        simulator(args).simulate(&params)
    } else {
        let mut config = SolverConfig::from_env();
        if let Some(url) = &args.solver_url {
            config.base_url.clone_from(url);
        }
        if let Some(secs) = args.timeout {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        Dispatcher::http(config)
            .with_simulator(simulator(args))
            .dispatch(&params)?
    };

    // Report the outcome. Simulated runs are labelled in both formats.
    if args.json {
        println!("{}", serde_json::to_string_pretty(&WireResponse::from(&result))?);
    } else {
        print!("{}", render_summary(&params, &result));
    }
    Ok(result.success)
}

fn main() -> ExitCode {
    // Log output is controlled with RUST_LOG, e.g. RUST_LOG=info.
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
