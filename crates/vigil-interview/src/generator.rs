//! LLM-backed question generation, with a deterministic fallback.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use vigil_llm::{parse_json, ChatMessage, ChatOptions, Provider};
use vigil_types::{ExpectedOutcome, Question, QuestionCategory, ToolDescriptor};

use crate::persona::Persona;

/// Generates interview questions for one tool at a time.
pub struct QuestionGenerator {
    llm: Arc<dyn Provider>,
    model: String,
}

impl QuestionGenerator {
    /// Build a generator over any provider (usually a fallback chain).
    pub fn new(llm: Arc<dyn Provider>) -> Self {
        Self {
            llm,
            model: String::new(),
        }
    }

    /// Pin a specific model instead of the provider default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Generate `total` questions for a tool, biased by the persona.
    ///
    /// Malformed or failing LLM output degrades to a single minimal
    /// happy-path question so the interview can still proceed.
    pub async fn generate(
        &self,
        tool: &ToolDescriptor,
        persona: &Persona,
        total: usize,
    ) -> Vec<Question> {
        let prompt = build_prompt(tool, persona, total);
        let opts = ChatOptions {
            model: self.model.clone(),
            system: Some(persona.system_prompt.clone()),
            // Deterministic output keeps cache keys stable across runs.
            temperature: Some(0.0),
            max_tokens: Some(2048),
        };

        let raw = match self.llm.chat(&[ChatMessage::user(prompt)], &opts).await {
            Ok(completion) => completion.text,
            Err(err) => {
                warn!(tool = %tool.name, error = %err, "question generation failed, using fallback");
                return fallback_questions(tool);
            }
        };

        match parse_json::<Vec<Question>>(&raw) {
            Ok(questions) if !questions.is_empty() => {
                debug!(tool = %tool.name, persona = %persona.id, count = questions.len(), "generated questions");
                questions.into_iter().take(total.max(1)).collect()
            }
            Ok(_) => {
                warn!(tool = %tool.name, "generator returned no questions, using fallback");
                fallback_questions(tool)
            }
            Err(err) => {
                warn!(tool = %tool.name, error = %err, "unparseable generator output, using fallback");
                fallback_questions(tool)
            }
        }
    }
}

fn build_prompt(tool: &ToolDescriptor, persona: &Persona, total: usize) -> String {
    let counts = persona
        .question_bias
        .question_counts(total, &persona.categories);
    let breakdown: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(category, n)| format!("- {n} of category {}", category_name(*category)))
        .collect();

    format!(
        "You are interviewing the tool `{name}`.\n\
         Description: {description}\n\
         Input schema (JSON Schema):\n{schema}\n\n\
         Produce exactly {total} interview questions as a JSON array. Each element:\n\
         {{\"description\": string, \"category\": one of \
         \"happy_path\"|\"edge_case\"|\"error_handling\"|\"boundary\"|\"security\", \
         \"args\": object matching the input schema, \
         \"expectedOutcome\": \"success\"|\"error\"|\"either\"}}\n\n\
         Category breakdown:\n{breakdown}\n\n\
         Reply with only the JSON array.",
        name = tool.name,
        description = tool.description.as_deref().unwrap_or("(none)"),
        schema = serde_json::to_string_pretty(&tool.input_schema)
            .unwrap_or_else(|_| "{}".to_string()),
        breakdown = breakdown.join("\n"),
    )
}

fn category_name(category: QuestionCategory) -> &'static str {
    match category {
        QuestionCategory::HappyPath => "happy_path",
        QuestionCategory::EdgeCase => "edge_case",
        QuestionCategory::ErrorHandling => "error_handling",
        QuestionCategory::Boundary => "boundary",
        QuestionCategory::Security => "security",
    }
}

/// One minimal happy-path question built mechanically from the schema.
fn fallback_questions(tool: &ToolDescriptor) -> Vec<Question> {
    vec![Question {
        description: format!("call {} with minimal valid arguments", tool.name),
        category: QuestionCategory::HappyPath,
        args: minimal_args(&tool.input_schema),
        expected_outcome: ExpectedOutcome::Either,
    }]
}

/// Build placeholder arguments satisfying the schema's required properties.
fn minimal_args(schema: &Value) -> Value {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return json!({});
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut args = Map::new();
    for name in required {
        let placeholder = properties
            .get(name)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
            .map(placeholder_for_type)
            .unwrap_or(Value::Null);
        args.insert(name.to_string(), placeholder);
    }
    Value::Object(args)
}

fn placeholder_for_type(type_name: &str) -> Value {
    match type_name {
        "string" => json!("example"),
        "number" => json!(1.0),
        "integer" => json!(1),
        "boolean" => json!(true),
        "array" => json!([]),
        "object" => json!({}),
        _ => Value::Null,
    }
}
