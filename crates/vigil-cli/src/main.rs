//! `vigil` -- CLI for the vigil behavioral interviewer.
//!
//! Provides the following subcommands:
//!
//! - `vigil discover` -- Connect to a server and list its capabilities.
//! - `vigil check` -- Interview a server, build a baseline, diff against the
//!   previous one.
//! - `vigil explore` -- Documentation-only interview, nothing persisted.
//! - `vigil diff` -- Compare two baseline files.
//!
//! Exit codes: 0 success, 1 drift detected in CI mode, 4 operational error.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Exit code for operational failures (connection, I/O, bad files).
const EXIT_OPERATIONAL: i32 = 4;
/// Exit code for detected drift when it should fail the run.
const EXIT_DRIFT: i32 = 1;

/// vigil behavioral interviewer CLI.
#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Interview MCP servers, build behavioral baselines, detect drift",
    version,
    disable_help_subcommand = true
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Connect to a server and list its capabilities.
    Discover(commands::discover::DiscoverArgs),

    /// Interview a server and produce (or compare against) a baseline.
    Check(commands::check::CheckArgs),

    /// Interview a server for documentation only; nothing is persisted.
    Explore(commands::explore::ExploreArgs),

    /// Compare two baseline files.
    Diff(commands::diff_cmd::DiffArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Discover(args) => commands::discover::run(args).await,
        Commands::Check(args) => commands::check::run(args).await,
        Commands::Explore(args) => commands::explore::run(args).await,
        Commands::Diff(args) => commands::diff_cmd::run(args).await,
    };

    match outcome {
        Ok(commands::RunResult::Clean) => {}
        Ok(commands::RunResult::Drift) => std::process::exit(EXIT_DRIFT),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_OPERATIONAL);
        }
    }
}
