//! Generation result values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::request::GenerationRequest;

/// Outcome of a single generation request.
///
/// Created exactly once by the coordinator when the backend invocation
/// completes (successfully or via a caught failure) and never mutated
/// afterwards. Carries its request so downstream consumers correlate by
/// metadata rather than by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The request this result answers.
    pub request: GenerationRequest,
    /// Whether generation succeeded.
    pub success: bool,
    /// Generated code text; empty on failure.
    pub generated_code: String,
    /// Wall-clock seconds spent strictly inside the backend call
    /// (queue wait for a concurrency slot is excluded).
    pub execution_time: f64,
    /// Whitespace-split word count of the generated text. An
    /// approximation, not a true tokenizer count; 0 on failure.
    pub token_count: usize,
    /// Human-readable failure cause; empty on success.
    pub error_message: String,
}

impl GenerationResult {
    /// Builds a successful result from generated text.
    pub(crate) fn completed(
        request: GenerationRequest,
        generated_code: String,
        elapsed: Duration,
    ) -> Self {
        let token_count = count_tokens(&generated_code);
        Self {
            request,
            success: true,
            generated_code,
            execution_time: elapsed.as_secs_f64(),
            token_count,
            error_message: String::new(),
        }
    }

    /// Builds a failed result from an error description.
    pub(crate) fn failed(
        request: GenerationRequest,
        error_message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            request,
            success: false,
            generated_code: String::new(),
            execution_time: elapsed.as_secs_f64(),
            token_count: 0,
            error_message: error_message.into(),
        }
    }
}

/// Approximate token count: whitespace-split word count.
fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::request::PromptStrategy;

    fn request() -> GenerationRequest {
        GenerationRequest::new("prompt", PromptStrategy::ZeroShot, "pb-1", "stub")
    }

    #[test]
    fn completed_counts_tokens_by_whitespace() {
        let result = GenerationResult::completed(
            request(),
            "int  sum =\n a + b;".to_string(),
            Duration::from_millis(250),
        );
        assert!(result.success);
        assert_eq!(result.token_count, 6);
        assert!(result.error_message.is_empty());
        assert!((result.execution_time - 0.25).abs() < 1e-9);
    }

    #[test]
    fn failed_has_empty_code_and_zero_tokens() {
        let result = GenerationResult::failed(request(), "backend exploded", Duration::ZERO);
        assert!(!result.success);
        assert!(result.generated_code.is_empty());
        assert_eq!(result.token_count, 0);
        assert_eq!(result.error_message, "backend exploded");
    }
}
