//! `vigil explore` -- documentation-only interview, nothing persisted.

use clap::Args;

use vigil_cache::{CacheConfig, ResponseCache};
use vigil_interview::{InterviewConfig, Interviewer};
use vigil_transport::discover;

use super::{build_llm, ConnectArgs, RunResult};

#[derive(Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Questions generated per tool per persona.
    #[arg(long, default_value_t = 3)]
    pub questions: usize,
}

pub async fn run(args: ExploreArgs) -> anyhow::Result<RunResult> {
    let client = args.connect.connect()?;
    let discovery = discover(&client).await?;

    let interviewer = Interviewer::new(
        client.clone(),
        build_llm()?,
        std::sync::Arc::new(ResponseCache::new(CacheConfig::default())),
        InterviewConfig {
            questions_per_tool: args.questions,
            call_timeout_ms: args.connect.timeout * 1_000,
            ..InterviewConfig::default()
        },
    );
    let outcome = interviewer.interview(&discovery.tools).await;
    client.close().await;

    for profile in &outcome.profiles {
        println!("## {}", profile.name);
        if !profile.description.is_empty() {
            println!("{}", profile.description);
        }
        println!("interactions: {}", profile.interactions.len());
        for note in &profile.behavioral_notes {
            println!("  + {note}");
        }
        for note in &profile.limitations {
            println!("  - {note}");
        }
        for note in &profile.security_notes {
            println!("  ! {note}");
        }
        if profile.partial {
            println!("  (interview cut short for this tool)");
        }
        println!();
    }
    if outcome.cancelled {
        println!("interview was cancelled before completion");
    }

    Ok(RunResult::Clean)
}
