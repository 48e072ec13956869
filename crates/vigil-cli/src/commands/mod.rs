//! Subcommand implementations and shared plumbing.

pub mod check;
pub mod diff_cmd;
pub mod discover;
pub mod explore;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};

use vigil_llm::{
    AnthropicProvider, FallbackClient, OllamaProvider, OpenAiCompatConfig, OpenAiCompatProvider,
    Provider,
};
use vigil_transport::{HttpTransport, McpClient, StdioTransport};

/// What a finished command means for the exit code.
pub enum RunResult {
    Clean,
    Drift,
}

/// Transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Stdio,
    StreamableHttp,
}

/// Connection flags shared by every server-facing subcommand.
#[derive(Args)]
pub struct ConnectArgs {
    /// Server launch command (stdio transport), e.g. "node server.js".
    #[arg(value_name = "COMMAND", required_unless_present = "url")]
    pub command: Option<String>,

    /// Transport to use.
    #[arg(long, value_enum, default_value = "stdio")]
    pub transport: TransportKind,

    /// Remote endpoint URL (streamable-http transport).
    #[arg(long)]
    pub url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

impl ConnectArgs {
    /// Build a client for the selected transport.
    pub fn connect(&self) -> anyhow::Result<Arc<McpClient>> {
        let timeout_ms = self.timeout * 1_000;
        let client = match self.transport {
            TransportKind::Stdio => {
                let command = self
                    .command
                    .as_deref()
                    .context("stdio transport needs a server command")?;
                let transport = StdioTransport::spawn_command_line(command)
                    .context("failed to launch server")?;
                McpClient::with_timeout(Box::new(transport), timeout_ms)
            }
            TransportKind::StreamableHttp => {
                let url = self
                    .url
                    .as_deref()
                    .context("streamable-http transport needs --url")?;
                McpClient::with_timeout(Box::new(HttpTransport::new(url)), timeout_ms)
            }
        };
        Ok(Arc::new(client))
    }
}

/// The default provider chain: OpenAI, then Anthropic, then a local Ollama.
///
/// Providers without credentials are skipped by the fallback at call time.
pub fn build_llm() -> anyhow::Result<Arc<dyn Provider>> {
    let providers: Vec<Box<dyn Provider>> = vec![
        Box::new(OpenAiCompatProvider::new(OpenAiCompatConfig::openai())),
        Box::new(AnthropicProvider::new()),
        Box::new(OllamaProvider::new()),
    ];
    let Some(chain) = FallbackClient::new(providers) else {
        bail!("no LLM providers available");
    };
    Ok(Arc::new(chain))
}
