//! CLI for the osimsim operating system simulator.
//!
//! Runs a configuration file end to end: parses it, loads and parses the
//! metadata program it references, runs the simulation, and prints the
//! resulting timeline (the engine itself already streams lines to stdout
//! as they're produced, when the configured log target calls for it).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use osimsim::config::Config;
use osimsim::engine::Engine;
use osimsim::metadata;

/// osimsim — single-CPU operating system simulator.
#[derive(Parser)]
#[command(name = "osimsim", version, about)]
struct Cli {
    /// Path to the simulator configuration file.
    config_path: PathBuf,

    /// After the run, print a machine-readable JSON summary of every
    /// process's final state to stdout (in addition to the timeline).
    #[arg(long)]
    summary_json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // A missing config-path argument is handled by clap itself (exit 1,
    // before `run` is ever reached). Every other termination — success or
    // a recoverable config/metadata/engine error — exits 0, matching the
    // reference tool this simulator reproduces: a single `Fatal:` line to
    // stderr is the full extent of the failure signal.
    if let Err(e) = run(&cli) {
        eprintln!("Fatal: {e}");
    }
    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(path = %cli.config_path.display(), "loading configuration");
    let config = Config::load(&cli.config_path)?;
    tracing::info!(policy = %config.scheduling_policy, "configuration loaded");

    let meta_contents = std::fs::read_to_string(&config.meta_path)
        .map_err(|source| format!("failed to read metadata file '{}': {source}", config.meta_path.display()))?;
    let ops = metadata::parse(&meta_contents)?;
    tracing::info!(op_count = ops.len(), "metadata program parsed");

    let report = Engine::new(config, ops)?.run()?;
    tracing::info!(process_count = report.process_summary.len(), "simulation complete");

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&report.process_summary)?);
    }

    Ok(())
}
