#![warn(missing_docs)]
//! isobench CLI Library
//!
//! The boundary layer around the measurement engine: reads `isobench.toml`
//! and the environment once, applies command-line overrides, sets up
//! logging, and measures an external command.
//!
//! # Example
//!
//! ```text
//! isobench -n 10 --warmup 2 --progress -- sleep 0.01
//! ```

mod command;
mod config;

pub use command::{CommandError, ShellCommand};
pub use config::*;

use clap::Parser;
use isobench_core::{ExecutionTime, MeasureConfig, Summary};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// isobench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "isobench")]
#[command(author, version, about = "isobench - isolated execution-time measurement")]
pub struct Cli {
    /// Number of measured trials
    #[arg(long, short = 'n')]
    pub samples: Option<u64>,

    /// Number of warmup trials (durations discarded)
    #[arg(long)]
    pub warmup: Option<u64>,

    /// Run each trial in a forked child process
    /// Use --isolated=false to run trials in-process
    #[arg(long, action = clap::ArgAction::Set)]
    pub isolated: Option<bool>,

    /// Suspend heap trimming inside each trial's child process
    #[arg(long)]
    pub disable_gc: bool,

    /// Stream each trial's duration to stderr as it completes
    #[arg(long)]
    pub progress: bool,

    /// Configuration file (default: discover isobench.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to measure, with its arguments
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Run the isobench CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the isobench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose);

    let file_config = match &cli.config {
        Some(path) => IsobenchConfig::load(path)?,
        None => IsobenchConfig::discover()?.unwrap_or_default(),
    };
    let env = EnvOverrides::from_env();
    let config = build_measure_config(&cli, &file_config, &env);
    config.validate()?;

    let command = ShellCommand::new(&cli.command)?;

    let mut execution = ExecutionTime::new(config);
    if cli.progress {
        execution = execution.with_progress(std::io::stderr());
    }

    info!(
        program = command.program(),
        samples = execution.config().samples,
        warmup = execution.config().warmup,
        executor = execution.executor_name(),
        "measuring"
    );

    let summary = execution.run_fallible(|| command.run())?;
    println!("{}", format_summary(&summary));

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "isobench=debug"
    } else {
        "isobench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build a MeasureConfig by layering: defaults → isobench.toml → environment → CLI flags.
pub fn build_measure_config(
    cli: &Cli,
    config: &IsobenchConfig,
    env: &EnvOverrides,
) -> MeasureConfig {
    let mut measure = config.runner.to_measure_config();
    env.apply(&mut measure);

    if let Some(samples) = cli.samples {
        measure.samples = samples;
    }
    if let Some(warmup) = cli.warmup {
        measure.warmup = warmup;
    }
    if let Some(isolated) = cli.isolated {
        measure.subprocess = isolated;
    }
    if cli.disable_gc {
        measure.disable_gc = true;
    }

    measure
}

/// One-line rendering of a summary
pub fn format_summary(summary: &Summary) -> String {
    format!(
        "average: {:.6}s  stddev: {:.6}s  ({} samples)",
        summary.average, summary.std_dev, summary.sample_count
    )
}
