//! LLM provider abstraction for vigil.
//!
//! A unified chat/complete/stream interface over multiple providers, plus
//! the reliability layers the interviewer depends on:
//!
//! - [`Provider`] trait defines the completion interface
//! - [`OpenAiCompatProvider`] works with any OpenAI-compatible endpoint
//! - [`AnthropicProvider`] and [`OllamaProvider`] speak the native APIs
//! - [`FallbackClient`] walks an ordered provider chain with health tracking
//! - [`refusal`] rejects completions that are refusals rather than answers
//! - [`TokenBudget`] / [`BudgetedClient`] enforce a token spend ceiling
//! - [`parse_json`] parses model output with Markdown fences stripped

pub mod anthropic;
pub mod budget;
pub mod error;
pub mod fallback;
pub mod json;
pub mod ollama;
pub mod openai_compat;
pub mod provider;
pub mod refusal;
pub mod sse;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use budget::{BudgetConfig, BudgetedClient, TokenBudget};
pub use error::{is_retryable, ProviderError, Result};
pub use fallback::{FallbackClient, ProviderHealth};
pub use json::parse_json;
pub use ollama::OllamaProvider;
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use provider::Provider;
pub use sse::parse_sse_line;
pub use types::{ChatMessage, ChatOptions, Completion, StreamChunk, StreamOutcome, Usage};
