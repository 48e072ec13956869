//! Request and response types for LLM completion calls.
//!
//! Kept provider-neutral: each backend maps these onto its own wire format.

use serde::{Deserialize, Serialize};

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author ("system", "user", "assistant").
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a message with role and content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Whether this is a system message.
    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// Per-call options shared by every provider.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Model identifier; empty means the provider's default.
    pub model: String,
    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 = deterministic).
    pub temperature: Option<f64>,
    /// System prompt prepended to the conversation.
    pub system: Option<String>,
}

impl ChatOptions {
    /// Options with a specific model.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// The model to use, falling back to a provider default.
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.model.is_empty() {
            default
        } else {
            &self.model
        }
    }
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    /// Input plus output tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A finished completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The generated text.
    pub text: String,
    /// Why generation stopped (e.g. "stop", "end_turn", "content_filter").
    pub stop_reason: Option<String>,
    /// Token usage, when the provider reports it.
    pub usage: Option<Usage>,
}

/// A single event on a streaming completion channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A partial text delta.
    TextDelta {
        text: String,
    },
    /// The stream is complete.
    Done {
        stop_reason: Option<String>,
        usage: Option<Usage>,
    },
}

/// The aggregate result of a streaming completion.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    /// All text deltas concatenated.
    pub text: String,
    /// Whether the stream reached its terminal event.
    pub completed: bool,
    /// Usage from the terminal event, when reported.
    pub usage: Option<Usage>,
}
