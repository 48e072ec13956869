//! Orchestrator behavior against scripted transport and LLM collaborators.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use vigil_cache::{CacheConfig, ResponseCache};
use vigil_interview::{InterviewConfig, Interviewer, Persona};
use vigil_llm::{ChatMessage, ChatOptions, Completion, Provider};
use vigil_transport::{McpClient, McpTransport, TransportError};
use vigil_types::{ActualOutcome, ToolDescriptor, TransportErrorRecord};

/// A transport whose tools/call behavior is scripted per test.
struct ScriptedTransport {
    call_count: AtomicU32,
    calls_seen: Mutex<Vec<Value>>,
    behavior: Behavior,
}

enum Behavior {
    Echo,
    IsError(String),
    Fail,
}

impl ScriptedTransport {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            call_count: AtomicU32::new(0),
            calls_seen: Mutex::new(Vec::new()),
            behavior,
        })
    }
}

/// Newtype wrapper so `McpTransport` (foreign trait) can be implemented for
/// a shared handle to `ScriptedTransport` without violating orphan rules.
struct TransportHandle(Arc<ScriptedTransport>);

#[async_trait]
impl McpTransport for TransportHandle {
    async fn request(
        &self,
        method: &str,
        params: Value,
        _timeout_ms: u64,
    ) -> Result<Value, TransportError> {
        assert_eq!(method, "tools/call");
        self.0.call_count.fetch_add(1, Ordering::SeqCst);
        self.0.calls_seen.lock().unwrap().push(params.clone());
        match &self.0.behavior {
            Behavior::Echo => Ok(json!({
                "content": [{"type": "text", "text": "echoed"}],
            })),
            Behavior::IsError(message) => Ok(json!({
                "content": [{"type": "text", "text": message}],
                "isError": true,
            })),
            Behavior::Fail => Err(TransportError::Connection("pipe broke".into())),
        }
    }

    async fn notify(&self, _method: &str, _params: Value) -> Result<(), TransportError> {
        Ok(())
    }

    fn transport_errors(&self) -> Vec<TransportErrorRecord> {
        Vec::new()
    }

    fn describe(&self) -> String {
        "scripted".into()
    }

    async fn close(&self) {}
}

/// An LLM that always emits the same one-question script.
struct OneQuestionLlm {
    expected_outcome: &'static str,
}

#[async_trait]
impl Provider for OneQuestionLlm {
    fn name(&self) -> &str {
        "scripted-llm"
    }
    async fn chat(&self, _m: &[ChatMessage], _o: &ChatOptions) -> vigil_llm::Result<Completion> {
        let script = format!(
            r#"[{{"description": "basic call", "category": "happy_path",
                 "args": {{"text": "hello"}}, "expectedOutcome": "{}"}}]"#,
            self.expected_outcome
        );
        Ok(Completion {
            text: script,
            stop_reason: Some("stop".into()),
            usage: None,
        })
    }
}

fn echo_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "echo".into(),
        description: Some("echoes text".into()),
        input_schema: json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
    }
}

fn interviewer(
    transport: Arc<ScriptedTransport>,
    llm: Arc<dyn Provider>,
    personas: Vec<Persona>,
) -> Interviewer {
    let client = Arc::new(McpClient::new(Box::new(TransportHandle(transport))));
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
    Interviewer::new(
        client,
        llm,
        cache,
        InterviewConfig {
            personas,
            questions_per_tool: 1,
            call_timeout_ms: 2_000,
            max_concurrent_personas: 0,
        },
    )
}

#[tokio::test]
async fn successful_call_is_recorded_and_assessed() {
    let transport = ScriptedTransport::new(Behavior::Echo);
    let subject = interviewer(
        Arc::clone(&transport),
        Arc::new(OneQuestionLlm {
            expected_outcome: "success",
        }),
        vec![Persona::explorer()],
    );

    let outcome = subject.interview(&[echo_tool()]).await;
    assert!(!outcome.cancelled);
    assert_eq!(outcome.profiles.len(), 1);

    let profile = &outcome.profiles[0];
    assert_eq!(profile.name, "echo");
    assert_eq!(profile.interactions.len(), 1);
    let interaction = &profile.interactions[0];
    assert_eq!(interaction.response, Some(json!("echoed")));
    assert!(interaction.error.is_none());
    assert_eq!(interaction.outcome_assessment.actual, ActualOutcome::Success);
    assert!(interaction.outcome_assessment.correct);
    assert_eq!(outcome.latencies.len(), 1);
    assert!(outcome.latencies[0].success);
}

#[tokio::test]
async fn is_error_reply_counts_as_error_outcome() {
    let transport = ScriptedTransport::new(Behavior::IsError("bad input".into()));
    let subject = interviewer(
        Arc::clone(&transport),
        Arc::new(OneQuestionLlm {
            expected_outcome: "error",
        }),
        vec![Persona::explorer()],
    );

    let outcome = subject.interview(&[echo_tool()]).await;
    let interaction = &outcome.profiles[0].interactions[0];
    assert_eq!(interaction.error.as_deref(), Some("bad input"));
    assert_eq!(interaction.outcome_assessment.actual, ActualOutcome::Error);
    assert!(interaction.outcome_assessment.correct);
    assert!(!outcome.latencies[0].success);
}

#[tokio::test]
async fn identical_args_across_personas_hit_the_cache() {
    let transport = ScriptedTransport::new(Behavior::Echo);
    // Two personas asking the identical question: the transport must only
    // be called once; the second pass reuses the cached response.
    let subject = interviewer(
        Arc::clone(&transport),
        Arc::new(OneQuestionLlm {
            expected_outcome: "success",
        }),
        vec![Persona::explorer(), Persona::adversary()],
    );

    let outcome = subject.interview(&[echo_tool()]).await;
    assert_eq!(transport.call_count.load(Ordering::SeqCst), 1);

    let profile = &outcome.profiles[0];
    assert_eq!(profile.interactions.len(), 2);
    assert!(profile.interactions.iter().all(|i| i.error.is_none()));
    // Only the real transport call produces a latency sample.
    assert_eq!(outcome.latencies.len(), 1);
}

#[tokio::test]
async fn transport_failure_isolates_to_the_profile() {
    let transport = ScriptedTransport::new(Behavior::Fail);
    let subject = interviewer(
        Arc::clone(&transport),
        Arc::new(OneQuestionLlm {
            expected_outcome: "success",
        }),
        vec![Persona::explorer()],
    );

    let outcome = subject.interview(&[echo_tool()]).await;
    let profile = &outcome.profiles[0];
    assert_eq!(profile.interactions.len(), 1);
    assert!(profile.interactions[0].error.is_some());
    assert!(profile
        .limitations
        .iter()
        .any(|n| n.contains("every interview invocation failed")));
}

#[tokio::test]
async fn cancellation_before_start_yields_cancelled_outcome() {
    let transport = ScriptedTransport::new(Behavior::Echo);
    let subject = interviewer(
        Arc::clone(&transport),
        Arc::new(OneQuestionLlm {
            expected_outcome: "success",
        }),
        vec![Persona::explorer()],
    );

    subject.cancel_token().cancel();
    let outcome = subject.interview(&[echo_tool()]).await;
    assert!(outcome.cancelled);
    assert!(outcome.profiles.is_empty());
    assert_eq!(transport.call_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn merge_is_deterministic_across_persona_order() {
    // Whatever order passes finish in, merged interactions follow persona
    // id order; with identical questions both orderings look the same, so
    // distinguish personas through the tool list the second pass sees.
    let transport = ScriptedTransport::new(Behavior::Echo);
    let personas = vec![Persona::explorer(), Persona::adversary()];
    let subject = interviewer(
        Arc::clone(&transport),
        Arc::new(OneQuestionLlm {
            expected_outcome: "either",
        }),
        personas,
    );

    let tools = vec![echo_tool()];
    let first = subject.interview(&tools).await;

    let transport2 = ScriptedTransport::new(Behavior::Echo);
    let subject2 = interviewer(
        Arc::clone(&transport2),
        Arc::new(OneQuestionLlm {
            expected_outcome: "either",
        }),
        vec![Persona::adversary(), Persona::explorer()],
    );
    let second = subject2.interview(&tools).await;

    let names_first: Vec<&str> = first.profiles.iter().map(|p| p.name.as_str()).collect();
    let names_second: Vec<&str> = second.profiles.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names_first, names_second);
    assert_eq!(
        first.profiles[0].interactions.len(),
        second.profiles[0].interactions.len()
    );
}
