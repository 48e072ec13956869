//! SSE (Server-Sent Events) line parser for OpenAI-compatible streaming.
//!
//! Parses the `data:` lines from an SSE stream into [`StreamChunk`] values.
//! The stream sends JSON deltas followed by a `data: [DONE]` sentinel.

use serde::Deserialize;

use crate::error::{ProviderError, Result};
use crate::types::{StreamChunk, Usage};

/// The sentinel value that marks the end of an SSE stream.
const DONE_SENTINEL: &str = "[DONE]";

/// The subset of the `chat.completion.chunk` shape this parser needs.
#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    choices: Vec<StreamDeltaChoice>,
    #[serde(default)]
    usage: Option<StreamDeltaUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamDeltaChoice {
    #[serde(default)]
    delta: StreamDeltaContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDeltaContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDeltaUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Parse a single SSE line into zero or more [`StreamChunk`] values.
///
/// Empty lines, comments, and `event:`/`id:`/`retry:` lines yield nothing.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidResponse`] if a `data:` payload is not
/// parseable as a streaming delta.
pub fn parse_sse_line(line: &str) -> Result<Vec<StreamChunk>> {
    let line = line.trim_end();

    if line.is_empty() || line.starts_with(':') {
        return Ok(vec![]);
    }

    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(vec![]);
    };
    let payload = payload.trim_start();
    if payload.is_empty() {
        return Ok(vec![]);
    }

    if payload == DONE_SENTINEL {
        return Ok(vec![StreamChunk::Done {
            stop_reason: None,
            usage: None,
        }]);
    }

    let delta: StreamDelta = serde_json::from_str(payload)
        .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse SSE delta: {e}")))?;

    let mut chunks = Vec::new();
    if let Some(choice) = delta.choices.first() {
        if let Some(text) = &choice.delta.content {
            if !text.is_empty() {
                chunks.push(StreamChunk::TextDelta { text: text.clone() });
            }
        }
        if choice.finish_reason.is_some() {
            let usage = delta.usage.as_ref().map(|u| Usage {
                input_tokens: u.prompt_tokens.unwrap_or(0),
                output_tokens: u.completion_tokens.unwrap_or(0),
            });
            chunks.push(StreamChunk::Done {
                stop_reason: choice.finish_reason.clone(),
                usage,
            });
        }
    }
    Ok(chunks)
}
