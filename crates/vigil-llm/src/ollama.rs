//! Ollama provider speaking the local `/api/chat` endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::refusal;
use crate::types::{ChatMessage, ChatOptions, Completion, Usage};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";

/// An LLM provider speaking the Ollama chat API. No authentication.
pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    message: Option<ApiMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    /// Point at the default local daemon.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Override the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion> {
        let model = opts.model_or(DEFAULT_MODEL).to_string();

        let mut wire: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &opts.system {
            wire.push(ChatMessage::system(system.clone()));
        }
        wire.extend_from_slice(messages);

        let mut body = json!({
            "model": model,
            "messages": wire,
            "stream": false,
        });
        if let Some(temperature) = opts.temperature {
            body["options"] = json!({"temperature": temperature});
        }

        debug!(model = %model, messages = wire.len(), "sending ollama chat request");

        let response = self
            .http
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Connection(format!("ollama unreachable: {e}"))
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                404 => ProviderError::ModelNotFound(format!("model '{model}': {text}")),
                500..=599 => ProviderError::ServerError { status, body: text },
                _ => ProviderError::RequestFailed(format!("HTTP {status}: {text}")),
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (input, output) => Some(Usage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };

        let completion = Completion {
            text: parsed.message.map(|m| m.content).unwrap_or_default(),
            stop_reason: parsed.done_reason,
            usage,
        };
        refusal::check_completion(&completion)?;
        Ok(completion)
    }
}
