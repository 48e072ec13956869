//! The interview orchestrator: one pass per persona, one profile per tool.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_cache::{tool_key, ResponseCache};
use vigil_llm::Provider;
use vigil_transport::McpClient;
use vigil_types::{
    ActualOutcome, LatencySample, OutcomeAssessment, Question, QuestionCategory, ToolDescriptor,
    ToolInteraction, ToolProfile,
};

use crate::generator::QuestionGenerator;
use crate::persona::Persona;

/// Interview limits and persona lineup.
#[derive(Clone)]
pub struct InterviewConfig {
    /// Personas to run, one pass each.
    pub personas: Vec<Persona>,
    /// Questions generated per tool per persona.
    pub questions_per_tool: usize,
    /// Per-invocation deadline.
    pub call_timeout_ms: u64,
    /// Concurrent persona passes; 0 means one permit per persona. The
    /// effective value is never more than the number of tools.
    pub max_concurrent_personas: usize,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            personas: Persona::default_set(),
            questions_per_tool: 5,
            call_timeout_ms: 30_000,
            max_concurrent_personas: 0,
        }
    }
}

/// Everything an interview produced.
#[derive(Debug)]
pub struct InterviewOutcome {
    /// Merged per-tool profiles, sorted by tool name.
    pub profiles: Vec<ToolProfile>,
    /// Latency samples for performance statistics (cache hits excluded).
    pub latencies: Vec<LatencySample>,
    /// Whether the interview was cut short by cancellation.
    pub cancelled: bool,
}

/// Runs persona-biased interviews against one server.
pub struct Interviewer {
    client: Arc<McpClient>,
    generator: QuestionGenerator,
    cache: Arc<ResponseCache>,
    config: InterviewConfig,
    cancel: CancellationToken,
}

struct PassResult {
    persona_id: String,
    profiles: Vec<ToolProfile>,
    latencies: Vec<LatencySample>,
    cancelled: bool,
}

impl Interviewer {
    /// Wire the orchestrator to its collaborators.
    pub fn new(
        client: Arc<McpClient>,
        llm: Arc<dyn Provider>,
        cache: Arc<ResponseCache>,
        config: InterviewConfig,
    ) -> Self {
        Self {
            client,
            generator: QuestionGenerator::new(llm),
            cache,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// A token that cancels the whole interview when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Interview every tool under every configured persona.
    ///
    /// Never fails outright: per-tool failures are recorded in the profiles,
    /// and cancellation yields partial profiles with `cancelled` set.
    pub async fn interview(&self, tools: &[ToolDescriptor]) -> InterviewOutcome {
        if tools.is_empty() || self.config.personas.is_empty() {
            return InterviewOutcome {
                profiles: Vec::new(),
                latencies: Vec::new(),
                cancelled: self.cancel.is_cancelled(),
            };
        }

        let configured = if self.config.max_concurrent_personas == 0 {
            self.config.personas.len()
        } else {
            self.config.max_concurrent_personas
        };
        let permits = configured.min(tools.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));

        info!(
            tools = tools.len(),
            personas = self.config.personas.len(),
            permits,
            "starting interview"
        );

        let passes = self.config.personas.iter().map(|persona| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                // The semaphore is never closed; treat a closed permit as a
                // cancelled pass.
                match semaphore.acquire().await {
                    Ok(_permit) => self.run_pass(persona, tools).await,
                    Err(_) => PassResult {
                        persona_id: persona.id.clone(),
                        profiles: Vec::new(),
                        latencies: Vec::new(),
                        cancelled: true,
                    },
                }
            }
        });

        let mut results: Vec<PassResult> = futures_util::future::join_all(passes).await;
        // Passes may finish in any order; the merge is made deterministic by
        // sorting on persona id.
        results.sort_by(|a, b| a.persona_id.cmp(&b.persona_id));

        let cancelled =
            self.cancel.is_cancelled() || results.iter().any(|pass| pass.cancelled);
        let mut latencies = Vec::new();
        let mut profiles: Vec<ToolProfile> = Vec::new();
        for pass in results {
            latencies.extend(pass.latencies);
            for profile in pass.profiles {
                match profiles.iter_mut().find(|p| p.name == profile.name) {
                    Some(merged) => merged.merge(profile),
                    None => profiles.push(profile),
                }
            }
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));

        InterviewOutcome {
            profiles,
            latencies,
            cancelled,
        }
    }

    async fn run_pass(&self, persona: &Persona, tools: &[ToolDescriptor]) -> PassResult {
        let mut profiles = Vec::new();
        let mut latencies = Vec::new();
        let mut cancelled = false;

        for tool in tools {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let questions = self
                .generator
                .generate(tool, persona, self.config.questions_per_tool)
                .await;

            let mut profile = ToolProfile::new(
                tool.name.clone(),
                tool.description.clone().unwrap_or_default(),
            );

            for question in questions {
                if self.cancel.is_cancelled() {
                    profile.partial = true;
                    cancelled = true;
                    break;
                }
                let (interaction, latency) = self.run_question(tool, question).await;
                latencies.extend(latency);
                profile.interactions.push(interaction);
            }

            derive_notes(&mut profile);
            debug!(
                persona = %persona.id,
                tool = %tool.name,
                interactions = profile.interactions.len(),
                "pass finished for tool"
            );
            profiles.push(profile);
        }

        PassResult {
            persona_id: persona.id.clone(),
            profiles,
            latencies,
            cancelled,
        }
    }

    /// Resolve one question into an interaction record, consulting the
    /// cache before touching the transport. Only transport calls produce
    /// latency samples.
    async fn run_question(
        &self,
        tool: &ToolDescriptor,
        question: Question,
    ) -> (ToolInteraction, Option<LatencySample>) {
        let started = Instant::now();
        let key = tool_key(&tool.name, &question.args);

        let mut latency = None;
        let (response, error, tool_execution_ms) = match self.cache.get(&key) {
            Some(cached) => {
                debug!(tool = %tool.name, "cache hit for invocation");
                (Some(cached), None, 0u64)
            }
            None => {
                let call_started = Instant::now();
                let outcome = self
                    .client
                    .call_tool(&tool.name, question.args.clone(), self.config.call_timeout_ms)
                    .await;
                let elapsed_ms = call_started.elapsed().as_millis() as u64;

                let (response, error) = match outcome {
                    Ok(result) if result.is_error => {
                        let text = result.text();
                        let message = if text.is_empty() {
                            "tool reported an unspecified error".to_string()
                        } else {
                            text
                        };
                        (None, Some(message))
                    }
                    Ok(result) => {
                        let value = result.response_value();
                        if let Err(err) = self.cache.set(&key, value.clone()) {
                            warn!(tool = %tool.name, error = %err, "response not cached");
                        }
                        (Some(value), None)
                    }
                    Err(err) => (None, Some(err.to_string())),
                };

                latency = Some(LatencySample {
                    tool_name: tool.name.clone(),
                    duration_ms: elapsed_ms as f64,
                    success: error.is_none(),
                    category: question.category,
                    timestamp: Utc::now(),
                });
                (response, error, elapsed_ms)
            }
        };

        let actual = if error.is_some() {
            ActualOutcome::Error
        } else {
            ActualOutcome::Success
        };
        let outcome_assessment = OutcomeAssessment::assess(question.expected_outcome, actual);

        let interaction = ToolInteraction {
            tool_name: tool.name.clone(),
            question,
            response,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
            tool_execution_ms,
            outcome_assessment,
        };
        (interaction, latency)
    }
}

/// Turn raw interaction outcomes into profile notes.
fn derive_notes(profile: &mut ToolProfile) {
    if profile.interactions.is_empty() {
        return;
    }

    let total = profile.interactions.len();
    let failed = profile
        .interactions
        .iter()
        .filter(|i| i.error.is_some())
        .count();

    if failed == total {
        profile.limitations.push(
            "every interview invocation failed; the tool could not be exercised".to_string(),
        );
    }

    let happy: Vec<&ToolInteraction> = profile
        .interactions
        .iter()
        .filter(|i| i.question.category == QuestionCategory::HappyPath)
        .collect();
    if !happy.is_empty() && happy.iter().all(|i| i.error.is_none()) {
        profile
            .behavioral_notes
            .push("responds successfully to well-formed input".to_string());
    }

    for interaction in &profile.interactions {
        let question = &interaction.question;
        match question.category {
            QuestionCategory::Security => {
                if interaction.error.is_none() && !interaction.outcome_assessment.correct {
                    profile.security_notes.push(format!(
                        "risk: accepted a suspicious input ({})",
                        question.description
                    ));
                } else if interaction.error.is_some() {
                    profile
                        .security_notes
                        .push(format!("rejected {}", question.description));
                }
            }
            _ => {
                if !interaction.outcome_assessment.correct {
                    if let Some(error) = &interaction.error {
                        profile
                            .limitations
                            .push(format!("{}: {}", question.description, error));
                    }
                }
            }
        }
    }

    // Duplicate notes add no information.
    dedup_in_place(&mut profile.behavioral_notes);
    dedup_in_place(&mut profile.limitations);
    dedup_in_place(&mut profile.security_notes);
}

fn dedup_in_place(notes: &mut Vec<String>) {
    let mut seen = Vec::new();
    notes.retain(|note| {
        if seen.contains(note) {
            false
        } else {
            seen.push(note.clone());
            true
        }
    });
}
