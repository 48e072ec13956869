//! `vigil check` -- interview, baseline, and drift detection.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use vigil_baseline::{
    build_baseline, diff_baselines, load_baseline, save_baseline, BaselineInputs, VerifyMode,
};
use vigil_cache::{CacheConfig, ResponseCache};
use vigil_interview::{InterviewConfig, Interviewer};
use vigil_transport::discover;
use vigil_types::DiffSeverity;

use super::{build_llm, ConnectArgs, RunResult};

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Directory holding baseline files.
    #[arg(long, default_value = ".vigil")]
    pub baseline_dir: PathBuf,

    /// Questions generated per tool per persona.
    #[arg(long, default_value_t = 5)]
    pub questions: usize,

    /// Fail the run (exit 1) when drift is warning or worse.
    #[arg(long)]
    pub ci: bool,

    /// Load the previous baseline even if its integrity hash mismatches.
    #[arg(long)]
    pub no_verify: bool,
}

pub async fn run(args: CheckArgs) -> anyhow::Result<RunResult> {
    let client = args.connect.connect()?;
    let discovery = discover(&client).await?;
    info!(tools = discovery.tools.len(), "discovery complete");

    let cache_dir = args.baseline_dir.join("cache");
    let cache = ResponseCache::with_disk(CacheConfig::default(), &cache_dir)
        .context("failed to open response cache")?;

    let interviewer = Interviewer::new(
        client.clone(),
        build_llm()?,
        std::sync::Arc::new(cache),
        InterviewConfig {
            questions_per_tool: args.questions,
            call_timeout_ms: args.connect.timeout * 1_000,
            ..InterviewConfig::default()
        },
    );
    let outcome = interviewer.interview(&discovery.tools).await;
    client.close().await;

    let baseline = build_baseline(BaselineInputs {
        server: discovery.server.clone(),
        server_command: client.describe(),
        descriptors: &discovery.tools,
        profiles: &outcome.profiles,
        latencies: &outcome.latencies,
        warnings: &discovery.warnings,
        cancelled: outcome.cancelled,
    })?;

    std::fs::create_dir_all(&args.baseline_dir)?;
    let path = args
        .baseline_dir
        .join(format!("{}.baseline.json", safe_name(&discovery.server.name)));

    let mut drifted = false;
    if path.exists() {
        let mode = if args.no_verify {
            VerifyMode::Skip
        } else {
            VerifyMode::Require
        };
        let previous = load_baseline(&path, mode).context("failed to load previous baseline")?;
        let diff = diff_baselines(&previous, &baseline);
        print_diff(&diff);
        drifted = diff.severity >= DiffSeverity::Warning;
    } else {
        println!("no previous baseline; this run establishes one");
    }

    save_baseline(&baseline, &path)?;
    println!(
        "baseline written to {} ({} tools, hash {})",
        path.display(),
        baseline.tools.len(),
        baseline.integrity_hash
    );

    if args.ci && drifted {
        return Ok(RunResult::Drift);
    }
    Ok(RunResult::Clean)
}

fn safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "server".into()
    } else {
        cleaned
    }
}

pub(super) fn print_diff(diff: &vigil_types::BehavioralDiff) {
    println!(
        "drift: {:?} ({} breaking, {} warning, {} info)",
        diff.severity, diff.breaking_count, diff.warning_count, diff.info_count
    );
    for name in &diff.tools_removed {
        println!("  removed tool: {name}");
    }
    for name in &diff.tools_added {
        println!("  added tool: {name}");
    }
    for modification in &diff.tools_modified {
        for change in &modification.changes {
            println!(
                "  {} [{:?}]: {}",
                modification.tool, change.severity, change.description
            );
        }
    }
    for assertion in &diff.assertions_removed {
        println!("  assertion removed ({}): {}", assertion.tool, assertion.assertion);
    }
    for assertion in &diff.assertions_added {
        println!("  assertion added ({}): {}", assertion.tool, assertion.assertion);
    }
}
