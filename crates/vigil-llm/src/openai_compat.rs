//! OpenAI-compatible provider implementation.
//!
//! [`OpenAiCompatProvider`] works with any API that follows the OpenAI chat
//! completion format by pointing `base_url` at the endpoint.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::refusal;
use crate::sse::parse_sse_line;
use crate::types::{ChatMessage, ChatOptions, Completion, StreamChunk, StreamOutcome, Usage};

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name reported to callers (e.g. "openai", "groq").
    pub name: String,
    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model used when the caller does not pick one.
    pub default_model: String,
}

impl OpenAiCompatConfig {
    /// The stock OpenAI configuration.
    pub fn openai() -> Self {
        Self {
            name: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            default_model: "gpt-4o-mini".into(),
        }
    }
}

/// An LLM provider speaking the OpenAI chat completion API.
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    http: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl OpenAiCompatProvider {
    /// Create a provider; the API key is resolved from the configured
    /// environment variable at request time.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: None,
        }
    }

    /// Create a provider with an explicit API key, bypassing env lookup.
    pub fn with_api_key(config: OpenAiCompatConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ProviderError::NotConfigured(format!("set {} env var", self.config.api_key_env))
        })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
        stream: bool,
    ) -> serde_json::Value {
        let mut wire: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &opts.system {
            wire.push(ChatMessage::system(system.clone()));
        }
        wire.extend_from_slice(messages);

        let mut body = json!({
            "model": opts.model_or(&self.config.default_model),
            "messages": wire,
        });
        if let Some(max_tokens) = opts.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = opts.temperature {
            body["temperature"] = json!(temperature);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn map_http_error(&self, response: reqwest::Response, model: &str) -> ProviderError {
        let status = response.status().as_u16();
        if status == 429 {
            let retry_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            warn!(provider = %self.config.name, retry_after_ms = retry_ms, "rate limited");
            return ProviderError::RateLimited {
                retry_after_ms: retry_ms,
            };
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            401 | 403 => ProviderError::AuthFailed(body),
            404 => ProviderError::ModelNotFound(format!("model '{model}': {body}")),
            500..=599 => ProviderError::ServerError { status, body },
            _ => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion> {
        let api_key = self.resolve_api_key()?;
        let model = opts.model_or(&self.config.default_model).to_string();

        debug!(
            provider = %self.config.name,
            model = %model,
            messages = messages.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&self.request_body(messages, opts, false))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.map_http_error(response, &model).await);
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".into()))?;

        let completion = Completion {
            text: choice.message.content.unwrap_or_default(),
            stop_reason: choice.finish_reason,
            usage: parsed.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        };
        refusal::check_completion(&completion)?;
        Ok(completion)
    }

    async fn stream(
        &self,
        prompt: &str,
        opts: &ChatOptions,
        tx: mpsc::Sender<StreamChunk>,
    ) -> Result<StreamOutcome> {
        let api_key = self.resolve_api_key()?;
        let model = opts.model_or(&self.config.default_model).to_string();
        let messages = [ChatMessage::user(prompt)];

        let response = self
            .http
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&self.request_body(&messages, opts, true))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.map_http_error(response, &model).await);
        }

        let mut text = String::new();
        let mut completed = false;
        let mut usage = None;
        let mut stop_reason = None;
        let mut buffer = String::new();
        let mut body = response.bytes_stream();

        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|e| ProviderError::Connection(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));
            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                for chunk in parse_sse_line(&line)? {
                    match &chunk {
                        StreamChunk::TextDelta { text: delta } => text.push_str(delta),
                        StreamChunk::Done {
                            stop_reason: reason,
                            usage: reported,
                        } => {
                            completed = true;
                            stop_reason = reason.clone();
                            usage = usage.or(*reported);
                        }
                    }
                    let _ = tx.send(chunk).await;
                }
            }
        }

        refusal::check_completion(&Completion {
            text: text.clone(),
            stop_reason,
            usage,
        })?;
        Ok(StreamOutcome {
            text,
            completed,
            usage,
        })
    }
}
