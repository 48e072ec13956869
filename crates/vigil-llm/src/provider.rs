//! The core [`Provider`] trait for LLM completions.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{ChatMessage, ChatOptions, Completion, StreamChunk, StreamOutcome};

/// A provider that can execute completion requests.
///
/// Implementations handle the protocol details for a specific LLM API
/// (authentication, request formatting, response parsing, refusal
/// screening). Reliability layers ([`FallbackClient`](crate::FallbackClient),
/// [`BudgetedClient`](crate::BudgetedClient)) also implement this trait so
/// they compose transparently.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider name (e.g. "openai", "anthropic", "ollama").
    fn name(&self) -> &str;

    /// Execute a chat completion over a full message history.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`](crate::error::ProviderError) on network,
    /// authentication, rate-limit, parsing, or refusal failures.
    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion>;

    /// Execute a single-prompt completion.
    ///
    /// The default wraps the prompt as one user message.
    async fn complete(&self, prompt: &str, opts: &ChatOptions) -> Result<Completion> {
        self.chat(&[ChatMessage::user(prompt)], opts).await
    }

    /// Stream a completion, sending chunks to `tx` and returning the
    /// aggregate outcome.
    ///
    /// The default degrades to a non-streaming call delivered as one text
    /// delta followed by the terminal event. Providers with native streaming
    /// override this.
    async fn stream(
        &self,
        prompt: &str,
        opts: &ChatOptions,
        tx: mpsc::Sender<StreamChunk>,
    ) -> Result<StreamOutcome> {
        let completion = self.complete(prompt, opts).await?;
        let _ = tx
            .send(StreamChunk::TextDelta {
                text: completion.text.clone(),
            })
            .await;
        let _ = tx
            .send(StreamChunk::Done {
                stop_reason: completion.stop_reason.clone(),
                usage: completion.usage,
            })
            .await;
        Ok(StreamOutcome {
            text: completion.text,
            completed: true,
            usage: completion.usage,
        })
    }
}
