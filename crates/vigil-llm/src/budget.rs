//! Token budget enforcement.
//!
//! [`TokenBudget`] tracks a running total of input+output tokens against a
//! ceiling. [`BudgetedClient`] wraps any [`Provider`]: before each call it
//! estimates the input cost with a conservative heuristic; in strict mode an
//! overshooting call fails, otherwise the message history is truncated
//! (keeping the system message and the newest messages) until it fits.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatMessage, ChatOptions, Completion};

/// Flat per-message overhead in tokens (role framing, separators).
const MESSAGE_OVERHEAD_TOKENS: u64 = 4;

/// Punctuation share above which text is considered token-dense.
const PUNCTUATION_DENSITY_THRESHOLD: f64 = 0.15;

/// Budget limits and behavior.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Total input+output tokens allowed.
    pub max_tokens: u64,
    /// Fail instead of truncating when a call would overshoot.
    pub strict: bool,
    /// Truncation never drops below this many messages.
    pub min_messages: usize,
    /// Fraction of budget at which the warning callback fires.
    pub warn_fraction: f64,
}

impl BudgetConfig {
    /// A budget with the default lenient behavior.
    pub fn new(max_tokens: u64) -> Self {
        Self {
            max_tokens,
            strict: false,
            min_messages: 2,
            warn_fraction: 0.8,
        }
    }

    /// Same budget, but failing instead of truncating.
    pub fn strict(max_tokens: u64) -> Self {
        Self {
            strict: true,
            ..Self::new(max_tokens)
        }
    }
}

type WarnCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Running token spend against a ceiling.
pub struct TokenBudget {
    config: BudgetConfig,
    used: AtomicU64,
    warned: AtomicBool,
    warn_callback: Option<WarnCallback>,
}

impl TokenBudget {
    /// A fresh budget.
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            used: AtomicU64::new(0),
            warned: AtomicBool::new(false),
            warn_callback: None,
        }
    }

    /// Attach a callback fired once when usage crosses the warn fraction.
    /// The callback receives `(used, max)`.
    pub fn on_warning(mut self, callback: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        self.warn_callback = Some(Box::new(callback));
        self
    }

    /// Tokens spent so far.
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    /// Tokens left before the ceiling.
    pub fn remaining(&self) -> u64 {
        self.config.max_tokens.saturating_sub(self.used())
    }

    /// The configured limits.
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Record spend and fire the one-shot warning if the threshold was
    /// crossed.
    pub fn record(&self, tokens: u64) {
        let used = self.used.fetch_add(tokens, Ordering::SeqCst) + tokens;
        let threshold = (self.config.max_tokens as f64 * self.config.warn_fraction) as u64;
        if used >= threshold
            && self
                .warned
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            warn!(used, max = self.config.max_tokens, "token budget warning threshold crossed");
            if let Some(callback) = &self.warn_callback {
                callback(used, self.config.max_tokens);
            }
        }
    }
}

/// Conservative token estimate for a piece of text.
///
/// `ceil(chars / 4)`, inflated by 20% when the text is punctuation-dense
/// (punctuation tokenizes worse than prose).
pub fn estimate_text_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    if chars == 0 {
        return 0;
    }
    let base = chars.div_ceil(4);
    let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count() as u64;
    if punctuation as f64 / chars as f64 > PUNCTUATION_DENSITY_THRESHOLD {
        (base as f64 * 1.2).ceil() as u64
    } else {
        base
    }
}

/// Conservative input estimate for a message history.
pub fn estimate_message_tokens(messages: &[ChatMessage]) -> u64 {
    messages
        .iter()
        .map(|m| estimate_text_tokens(&m.content) + MESSAGE_OVERHEAD_TOKENS)
        .sum()
}

/// A provider wrapper that enforces a [`TokenBudget`].
pub struct BudgetedClient<P> {
    inner: P,
    budget: TokenBudget,
}

impl<P: Provider> BudgetedClient<P> {
    /// Wrap a provider with a budget.
    pub fn new(inner: P, budget: TokenBudget) -> Self {
        Self { inner, budget }
    }

    /// The budget state.
    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// Drop oldest non-system messages until the estimate fits `available`,
    /// preserving the system message and at least `min_messages` in total.
    fn truncate_to_fit(
        messages: &[ChatMessage],
        available: u64,
        min_messages: usize,
    ) -> Vec<ChatMessage> {
        let system = messages.iter().find(|m| m.is_system());
        let system_count = usize::from(system.is_some());
        let mut total = system
            .map(|m| estimate_text_tokens(&m.content) + MESSAGE_OVERHEAD_TOKENS)
            .unwrap_or(0);

        let mut kept_newest_first: Vec<&ChatMessage> = Vec::new();
        for message in messages.iter().rev().filter(|m| !m.is_system()) {
            let cost = estimate_text_tokens(&message.content) + MESSAGE_OVERHEAD_TOKENS;
            let under_floor = kept_newest_first.len() + system_count < min_messages;
            if !under_floor && total + cost > available {
                break;
            }
            kept_newest_first.push(message);
            total += cost;
        }

        let mut result: Vec<ChatMessage> = Vec::with_capacity(kept_newest_first.len() + 1);
        if let Some(system) = system {
            result.push(system.clone());
        }
        result.extend(kept_newest_first.into_iter().rev().cloned());
        result
    }
}

#[async_trait]
impl<P: Provider> Provider for BudgetedClient<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<Completion> {
        let mut estimate = estimate_message_tokens(messages);
        if let Some(system) = &opts.system {
            estimate += estimate_text_tokens(system) + MESSAGE_OVERHEAD_TOKENS;
        }
        let remaining = self.budget.remaining();

        let truncated;
        let wire: &[ChatMessage] = if estimate > remaining {
            if self.budget.config.strict {
                return Err(ProviderError::BudgetExceeded {
                    needed: estimate,
                    remaining,
                });
            }
            truncated =
                Self::truncate_to_fit(messages, remaining, self.budget.config.min_messages);
            debug!(
                original = messages.len(),
                kept = truncated.len(),
                "truncated history to fit token budget"
            );
            estimate = estimate_message_tokens(&truncated);
            &truncated
        } else {
            messages
        };

        let completion = self.inner.chat(wire, opts).await?;

        // Prefer the provider's actual accounting; fall back to estimates.
        let spent = completion
            .usage
            .map(|u| u.total())
            .unwrap_or_else(|| estimate + estimate_text_tokens(&completion.text));
        self.budget.record(spent);

        Ok(completion)
    }
}
