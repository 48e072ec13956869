//! Persona-driven interview orchestration.
//!
//! For each discovered tool, the orchestrator asks an LLM-backed generator
//! for a batch of persona-biased questions, resolves each into a concrete
//! invocation (consulting the response cache first), assesses the outcome
//! against the question's expectation, and accumulates a
//! [`ToolProfile`](vigil_types::ToolProfile) per tool. Multiple personas run
//! as separate passes, sequentially or in parallel, and their profiles merge
//! deterministically.

pub mod generator;
pub mod orchestrator;
pub mod persona;

pub use generator::QuestionGenerator;
pub use orchestrator::{InterviewConfig, InterviewOutcome, Interviewer};
pub use persona::{Persona, QuestionBias};
