//! Provider fallback: walk an ordered chain, tracking per-provider health.
//!
//! [`FallbackClient`] takes a list of providers and calls them in order,
//! skipping any whose health is currently unhealthy. A provider is marked
//! unhealthy after a configurable number of *consecutive* retryable
//! failures; a success resets the counter. Non-retryable errors (other than
//! refusals and missing configuration, which hop to the next provider)
//! propagate immediately.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{is_retryable, ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatMessage, ChatOptions, Completion};

/// Default consecutive-failure threshold before a provider is skipped.
const DEFAULT_UNHEALTHY_AFTER: u32 = 3;

/// Consecutive-failure health state for one provider in the chain.
pub struct ProviderHealth {
    consecutive_failures: AtomicU32,
    unhealthy_after: u32,
}

impl ProviderHealth {
    fn new(unhealthy_after: u32) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            unhealthy_after,
        }
    }

    /// Current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Whether the provider should currently be skipped.
    pub fn is_unhealthy(&self) -> bool {
        self.consecutive_failures() >= self.unhealthy_after
    }

    fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }
}

/// A chain of providers with health-aware fallback.
pub struct FallbackClient {
    providers: Vec<Box<dyn Provider>>,
    health: Vec<ProviderHealth>,
}

impl FallbackClient {
    /// Create a chain from an ordered list of providers.
    ///
    /// The first provider is the primary. Returns `None` if the list is
    /// empty.
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Option<Self> {
        Self::with_threshold(providers, DEFAULT_UNHEALTHY_AFTER)
    }

    /// Create a chain with an explicit unhealthy threshold.
    pub fn with_threshold(
        providers: Vec<Box<dyn Provider>>,
        unhealthy_after: u32,
    ) -> Option<Self> {
        if providers.is_empty() {
            return None;
        }
        let health = providers
            .iter()
            .map(|_| ProviderHealth::new(unhealthy_after))
            .collect();
        Some(Self { providers, health })
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in chain order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Health state of the provider at `index`.
    pub fn health(&self, index: usize) -> Option<&ProviderHealth> {
        self.health.get(index)
    }

    /// Whether a non-retryable error should still hop to the next provider.
    ///
    /// A refusal is terminal for the refusing provider but another model may
    /// comply; a provider without credentials should not block the chain.
    fn hops_to_next(err: &ProviderError) -> bool {
        matches!(
            err,
            ProviderError::Refused { .. }
                | ProviderError::NotConfigured(_)
                | ProviderError::ModelNotFound(_)
        )
    }
}

#[async_trait]
impl Provider for FallbackClient {
    fn name(&self) -> &str {
        // Report the primary provider's name.
        self.providers
            .first()
            .map(|p| p.name())
            .unwrap_or("fallback")
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion> {
        let mut attempts: Vec<String> = Vec::new();

        for (idx, provider) in self.providers.iter().enumerate() {
            let health = &self.health[idx];
            if health.is_unhealthy() {
                debug!(
                    provider = %provider.name(),
                    failures = health.consecutive_failures(),
                    "skipping unhealthy provider"
                );
                attempts.push(format!("{}: skipped (unhealthy)", provider.name()));
                continue;
            }

            match provider.chat(messages, opts).await {
                Ok(completion) => {
                    health.record_success();
                    return Ok(completion);
                }
                Err(err) => {
                    if is_retryable(&err) {
                        health.record_failure();
                    } else if !Self::hops_to_next(&err) {
                        return Err(err);
                    }

                    warn!(
                        provider = %provider.name(),
                        provider_index = idx,
                        total_providers = self.providers.len(),
                        error = %err,
                        "provider failed, trying next in fallback chain"
                    );
                    attempts.push(format!("{}: {err}", provider.name()));
                }
            }
        }

        Err(ProviderError::Exhausted { attempts })
    }
}
