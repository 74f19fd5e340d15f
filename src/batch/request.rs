//! Generation request values.

use serde::{Deserialize, Serialize};

/// A named prompt-engineering strategy.
///
/// The variant order is meaningful: strategy iteration (e.g. in the
/// request builder's cross-product) follows declaration order, which keeps
/// request sequences deterministic across runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PromptStrategy {
    /// Bare problem statement, no examples or scaffolding.
    ZeroShot,
    /// Problem statement preceded by worked examples.
    FewShot,
    /// Step-by-step reasoning requested before the final code.
    #[serde(rename = "cot")]
    ChainOfThought,
    /// Prompt prefixed with a developer persona profile.
    Persona,
    /// Chain-of-thought combined with a persona preamble.
    Hybrid,
    /// Free-form template with no fixed technique.
    Template,
}

impl PromptStrategy {
    /// All strategies in declaration order.
    pub const ALL: [PromptStrategy; 6] = [
        PromptStrategy::ZeroShot,
        PromptStrategy::FewShot,
        PromptStrategy::ChainOfThought,
        PromptStrategy::Persona,
        PromptStrategy::Hybrid,
        PromptStrategy::Template,
    ];

    /// The wire/display name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStrategy::ZeroShot => "zero_shot",
            PromptStrategy::FewShot => "few_shot",
            PromptStrategy::ChainOfThought => "cot",
            PromptStrategy::Persona => "persona",
            PromptStrategy::Hybrid => "hybrid",
            PromptStrategy::Template => "template",
        }
    }
}

impl std::fmt::Display for PromptStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PromptStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero_shot" => Ok(PromptStrategy::ZeroShot),
            "few_shot" => Ok(PromptStrategy::FewShot),
            "cot" | "chain_of_thought" => Ok(PromptStrategy::ChainOfThought),
            "persona" => Ok(PromptStrategy::Persona),
            "hybrid" => Ok(PromptStrategy::Hybrid),
            "template" => Ok(PromptStrategy::Template),
            other => Err(format!("unknown prompt strategy '{}'", other)),
        }
    }
}

/// One unit of generation work.
///
/// A pure value: every field is set at construction and never mutated, so a
/// request can serve as a map or grouping key on `(strategy, model_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully rendered prompt text (variables already substituted).
    pub prompt: String,
    /// Prompting strategy the prompt was built with.
    pub strategy: PromptStrategy,
    /// Opaque identifier correlating to a problem definition.
    pub problem_id: String,
    /// Key into the backend registry.
    pub model_name: String,
}

impl GenerationRequest {
    /// Creates a new generation request.
    pub fn new(
        prompt: impl Into<String>,
        strategy: PromptStrategy,
        problem_id: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            strategy,
            problem_id: problem_id.into(),
            model_name: model_name.into(),
        }
    }

    /// The `(strategy, model)` combination this request belongs to.
    pub fn combination(&self) -> (PromptStrategy, &str) {
        (self.strategy, self.model_name.as_str())
    }
}
