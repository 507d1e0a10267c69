//! PolySched Command Line Interface
//!
//! Usage:
//!   polysched [OPTIONS] <input-file>
//!   polysched --help
//!
//! Examples:
//!   polysched deps.json                         # Schedule with defaults
//!   polysched --fuse=min deps.json              # One band per strongly connected component
//!   polysched --max-coefficient=4 deps.json     # Bound schedule coefficients
//!   polysched --emit=forest deps.json           # Dump the band forest
//!
//! The input is a JSON object with the fields of `ScheduleConstraints`
//! (`domain`, `validity`, `proximity`, ...) and an optional `options`
//! object holding `ScheduleOptions` fields. Command line flags override it.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use polysched::schedule::{FuseStrategy, Schedule, ScheduleAlgorithm, ScheduleConstraints, ScheduleOptions};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// PolySched - Multi-dimensional Affine Scheduler
#[derive(Parser, Debug)]
#[command(name = "polysched")]
#[command(author = "PolySched Contributors")]
#[command(version)]
#[command(about = "Computes affine schedules from polyhedral dependences", long_about = None)]
struct Cli {
    /// Input file with schedule constraints (JSON)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Bound on the absolute value of schedule coefficients
    #[arg(long)]
    max_coefficient: Option<u32>,

    /// Bound on the constant term of schedule rows
    #[arg(long)]
    max_constant_term: Option<u32>,

    /// Do not split common factors off carrying rows
    #[arg(long)]
    no_split_scaled: bool,

    /// Scheduling algorithm
    #[arg(long)]
    algorithm: Option<AlgorithmArg>,

    /// Fusion strategy
    #[arg(long)]
    fuse: Option<FuseArg>,

    /// Split the graph instead of closing a band early
    #[arg(long)]
    maximize_band_depth: bool,

    /// Require coincident outer rows
    #[arg(long)]
    outer_coincidence: bool,

    /// Order independent components by a separate row
    #[arg(long)]
    separate_components: bool,

    /// What to emit
    #[arg(long, default_value = "schedule")]
    emit: EmitKind,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Permutable bands with carrying as a fallback
    Isl,
    /// Carry as many dependences as possible per row
    Feautrier,
}

impl From<AlgorithmArg> for ScheduleAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Isl => ScheduleAlgorithm::Isl,
            AlgorithmArg::Feautrier => ScheduleAlgorithm::Feautrier,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FuseArg {
    /// Fuse weakly connected statements
    Max,
    /// Schedule strongly connected components apart
    Min,
}

impl From<FuseArg> for FuseStrategy {
    fn from(arg: FuseArg) -> Self {
        match arg {
            FuseArg::Max => FuseStrategy::Max,
            FuseArg::Min => FuseStrategy::Min,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Schedule maps, one per statement
    Schedule,
    /// Padded schedule maps rebuilt from the band forest
    Map,
    /// Band forest
    Forest,
    /// Schedule and band forest as JSON
    Json,
}

/// Input file layout: constraints plus optional options.
#[derive(Debug, Deserialize)]
struct Input {
    #[serde(flatten)]
    constraints: ScheduleConstraints,
    #[serde(default)]
    options: Option<ScheduleOptions>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("PolySched v{}", polysched::VERSION);
    debug!("Input file: {:?}", cli.input);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;
    let input: Input = serde_json::from_str(&source)
        .with_context(|| format!("Failed to parse schedule constraints: {:?}", cli.input))?;

    let options = build_options(&cli, input.options.unwrap_or_default());
    debug!("Schedule options: {:?}", options);

    let schedule = match polysched::compute_schedule(&input.constraints, &options) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!("Scheduling failed: {}", e);
            return Err(e.into());
        }
    };
    info!("Computed {} schedule rows in {} bands", schedule.n_total_row, schedule.n_band);

    let output = render(&schedule, cli.emit)?;
    write_output(&cli.output, &output)
}

fn build_options(cli: &Cli, mut options: ScheduleOptions) -> ScheduleOptions {
    if let Some(bound) = cli.max_coefficient {
        options.max_coefficient = Some(bound);
    }
    if let Some(bound) = cli.max_constant_term {
        options.max_constant_term = Some(bound);
    }
    if cli.no_split_scaled {
        options.split_scaled = false;
    }
    if let Some(algorithm) = cli.algorithm {
        options.algorithm = algorithm.into();
    }
    if let Some(fuse) = cli.fuse {
        options.fuse = fuse.into();
    }
    options.maximize_band_depth |= cli.maximize_band_depth;
    options.outer_coincidence |= cli.outer_coincidence;
    options.separate_components |= cli.separate_components;
    options
}

fn render(schedule: &Schedule, emit: EmitKind) -> Result<String> {
    let text = match emit {
        EmitKind::Schedule => schedule.to_string(),
        EmitKind::Map => schedule.forest_schedule_map().iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        EmitKind::Forest => schedule.band_forest().iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(""),
        EmitKind::Json => {
            let value = serde_json::json!({
                "schedule": schedule,
                "bands": schedule.band_forest(),
            });
            serde_json::to_string_pretty(&value).context("Failed to serialize schedule")?
        }
    };
    Ok(text)
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
