//! `vigil discover` -- capability discovery summary.

use clap::Args;

use vigil_transport::discover;

use super::{ConnectArgs, RunResult};

#[derive(Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Print the raw discovery result as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: DiscoverArgs) -> anyhow::Result<RunResult> {
    let client = args.connect.connect()?;
    let result = discover(&client).await?;
    client.close().await;

    if args.json {
        let payload = serde_json::json!({
            "server": result.server,
            "tools": result.tools,
            "prompts": result.prompts,
            "resources": result.resources,
            "warnings": result.warnings,
            "transportErrors": result.transport_errors,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(RunResult::Clean);
    }

    println!(
        "{} {} (protocol {})",
        result.server.name, result.server.version, result.server.protocol_version
    );
    println!("capabilities: {}", result.server.capabilities.join(", "));
    println!("tools: {}", result.tools.len());
    for tool in &result.tools {
        println!(
            "  {} -- {}",
            tool.name,
            tool.description.as_deref().unwrap_or("(no description)")
        );
    }
    if !result.prompts.is_empty() {
        println!("prompts: {}", result.prompts.len());
    }
    if !result.resources.is_empty() {
        println!("resources: {}", result.resources.len());
    }
    for warning in &result.warnings {
        println!("warning: {}", warning.message);
    }
    for record in &result.transport_errors {
        println!("transport error [{}]: {}", record.category, record.message);
    }

    Ok(RunResult::Clean)
}
