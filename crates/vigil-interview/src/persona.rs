//! Interview personas: who is asking, and what they probe for.

use vigil_types::QuestionCategory;

/// Relative weight given to each question category. Weights are normalized
/// before use, so they only need to be non-negative.
#[derive(Debug, Clone, Copy)]
pub struct QuestionBias {
    pub happy_path: f64,
    pub edge_case: f64,
    pub error_handling: f64,
    pub boundary: f64,
    pub security: f64,
}

impl QuestionBias {
    /// Even weight across all categories.
    pub fn uniform() -> Self {
        Self {
            happy_path: 0.2,
            edge_case: 0.2,
            error_handling: 0.2,
            boundary: 0.2,
            security: 0.2,
        }
    }

    fn weight(&self, category: QuestionCategory) -> f64 {
        match category {
            QuestionCategory::HappyPath => self.happy_path,
            QuestionCategory::EdgeCase => self.edge_case,
            QuestionCategory::ErrorHandling => self.error_handling,
            QuestionCategory::Boundary => self.boundary,
            QuestionCategory::Security => self.security,
        }
    }

    /// Distribute `total` questions over `categories` proportionally to the
    /// weights, by largest remainder so the counts always sum to `total`.
    pub fn question_counts(
        &self,
        total: usize,
        categories: &[QuestionCategory],
    ) -> Vec<(QuestionCategory, usize)> {
        if total == 0 || categories.is_empty() {
            return Vec::new();
        }
        let weight_sum: f64 = categories.iter().map(|c| self.weight(*c)).sum();
        if weight_sum <= 0.0 {
            // Degenerate bias: everything lands on the first category.
            let mut counts: Vec<(QuestionCategory, usize)> =
                categories.iter().map(|c| (*c, 0)).collect();
            counts[0].1 = total;
            return counts;
        }

        let shares: Vec<f64> = categories
            .iter()
            .map(|c| self.weight(*c) / weight_sum * total as f64)
            .collect();
        let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
        let mut assigned: usize = counts.iter().sum();

        // Hand remaining questions to the largest fractional remainders.
        let mut remainders: Vec<(usize, f64)> = shares
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s - s.floor()))
            .collect();
        remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let mut cursor = 0;
        while assigned < total {
            counts[remainders[cursor % remainders.len()].0] += 1;
            assigned += 1;
            cursor += 1;
        }

        categories.iter().copied().zip(counts).collect()
    }
}

/// A persona shapes the questions the generator produces.
#[derive(Debug, Clone)]
pub struct Persona {
    /// Stable identifier, used in deterministic merge ordering.
    pub id: String,
    /// System prompt given to the question generator.
    pub system_prompt: String,
    /// Category weights.
    pub question_bias: QuestionBias,
    /// Categories this persona is allowed to ask about.
    pub categories: Vec<QuestionCategory>,
}

impl Persona {
    /// The cooperative persona: documents what the tool does when used as
    /// intended.
    pub fn explorer() -> Self {
        Self {
            id: "explorer".into(),
            system_prompt: "You are a careful integration engineer exploring an unfamiliar API. \
                            Ask questions that exercise each tool the way its documentation \
                            suggests, with realistic, well-formed arguments."
                .into(),
            question_bias: QuestionBias {
                happy_path: 0.5,
                edge_case: 0.3,
                error_handling: 0.1,
                boundary: 0.1,
                security: 0.0,
            },
            categories: vec![
                QuestionCategory::HappyPath,
                QuestionCategory::EdgeCase,
                QuestionCategory::ErrorHandling,
                QuestionCategory::Boundary,
            ],
        }
    }

    /// The hostile persona: probes failure handling and unsafe inputs.
    pub fn adversary() -> Self {
        Self {
            id: "adversary".into(),
            system_prompt: "You are a skeptical reviewer probing an API for weak spots. \
                            Ask questions with malformed, oversized, empty, and suspicious \
                            arguments, and predict how a robust server should refuse them."
                .into(),
            question_bias: QuestionBias {
                happy_path: 0.1,
                edge_case: 0.2,
                error_handling: 0.3,
                boundary: 0.2,
                security: 0.2,
            },
            categories: QuestionCategory::ALL.to_vec(),
        }
    }

    /// The default persona set for a full interview.
    pub fn default_set() -> Vec<Persona> {
        vec![Self::explorer(), Self::adversary()]
    }
}
