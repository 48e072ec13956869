//! Anthropic provider speaking the native Messages API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::refusal;
use crate::types::{ChatMessage, ChatOptions, Completion, Usage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Tokens generated when the caller does not set a limit; the Messages API
/// requires an explicit value.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// An LLM provider speaking the Anthropic Messages API.
pub struct AnthropicProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicProvider {
    /// Create a provider; the API key is resolved from `ANTHROPIC_API_KEY`
    /// at request time.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
        }
    }

    /// Create a provider with an explicit API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::new()
        }
    }

    /// Override the base URL (testing, proxies).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV)
            .map_err(|_| ProviderError::NotConfigured(format!("set {API_KEY_ENV} env var")))
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion> {
        let api_key = self.resolve_api_key()?;
        let model = opts.model_or(DEFAULT_MODEL).to_string();

        // The Messages API takes the system prompt out of band; system
        // messages in the history are folded into it.
        let mut system_parts: Vec<&str> = Vec::new();
        if let Some(system) = &opts.system {
            system_parts.push(system);
        }
        let wire: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| {
                if m.is_system() {
                    system_parts.push(&m.content);
                    false
                } else {
                    true
                }
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": opts.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": wire
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content}))
                .collect::<Vec<_>>(),
        });
        if !system_parts.is_empty() {
            body["system"] = json!(system_parts.join("\n\n"));
        }
        if let Some(temperature) = opts.temperature {
            body["temperature"] = json!(temperature);
        }

        debug!(model = %model, messages = wire.len(), "sending messages request");

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            if status == 429 {
                let retry_ms = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs * 1000)
                    .unwrap_or(1000);
                return Err(ProviderError::RateLimited {
                    retry_after_ms: retry_ms,
                });
            }
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => ProviderError::AuthFailed(text),
                404 => ProviderError::ModelNotFound(format!("model '{model}': {text}")),
                500..=599 => ProviderError::ServerError { status, body: text },
                _ => ProviderError::RequestFailed(format!("HTTP {status}: {text}")),
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let completion = Completion {
            text,
            stop_reason: parsed.stop_reason,
            usage: parsed.usage.map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        };
        refusal::check_completion(&completion)?;
        Ok(completion)
    }
}
