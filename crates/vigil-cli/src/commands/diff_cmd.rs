//! `vigil diff` -- compare two baseline files.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use vigil_baseline::{diff_baselines, load_baseline, VerifyMode};
use vigil_types::DiffSeverity;

use super::RunResult;

#[derive(Args)]
pub struct DiffArgs {
    /// The older baseline file.
    pub previous: PathBuf,

    /// The newer baseline file.
    pub current: PathBuf,

    /// Load baselines even if their integrity hashes mismatch.
    #[arg(long)]
    pub no_verify: bool,
}

pub async fn run(args: DiffArgs) -> anyhow::Result<RunResult> {
    let mode = if args.no_verify {
        VerifyMode::Skip
    } else {
        VerifyMode::Require
    };
    let previous = load_baseline(&args.previous, mode)
        .with_context(|| format!("failed to load {}", args.previous.display()))?;
    let current = load_baseline(&args.current, mode)
        .with_context(|| format!("failed to load {}", args.current.display()))?;

    let diff = diff_baselines(&previous, &current);
    super::check::print_diff(&diff);

    if diff.severity >= DiffSeverity::Warning {
        return Ok(RunResult::Drift);
    }
    Ok(RunResult::Clean)
}
