//! Deterministic heuristic backend for offline runs and tests.
//!
//! Produces a Java-flavored placeholder method derived from keywords in the
//! prompt. The stub never uses the failure channel: malformed input yields
//! a clearly marked placeholder comment through the success path, so runs
//! against it always complete.

use async_trait::async_trait;

use super::{GenerationOptions, ModelBackend};
use crate::error::BackendError;

/// Longest prompt excerpt echoed into the generated comment.
const PROMPT_EXCERPT_CHARS: usize = 60;

/// Heuristic code generator with no external dependencies.
#[derive(Debug, Default, Clone)]
pub struct StubBackend;

impl StubBackend {
    /// Creates a new stub backend.
    pub fn new() -> Self {
        Self
    }

    /// Derives a method name from keywords in the prompt.
    fn method_name(prompt: &str) -> &'static str {
        let lower = prompt.to_lowercase();
        if lower.contains("count") {
            if lower.contains("even") {
                "countEvenNumbers"
            } else if lower.contains("odd") {
                "countOddNumbers"
            } else if lower.contains("prime") {
                "countPrimeNumbers"
            } else {
                "countElements"
            }
        } else if lower.contains("find") {
            "findElements"
        } else if lower.contains("sum") {
            "calculateSum"
        } else {
            "processArray"
        }
    }

    /// Truncates the prompt to a short excerpt for the header comment.
    fn excerpt(prompt: &str) -> String {
        let trimmed = prompt.trim();
        if trimmed.chars().count() <= PROMPT_EXCERPT_CHARS {
            trimmed.to_string()
        } else {
            let head: String = trimmed.chars().take(PROMPT_EXCERPT_CHARS).collect();
            format!("{}...", head)
        }
    }
}

#[async_trait]
impl ModelBackend for StubBackend {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        if prompt.trim().is_empty() {
            // Malformed input is reported inline, not via the error channel.
            return Ok("// stub: empty prompt, no method to derive".to_string());
        }

        let method = Self::method_name(prompt);
        let excerpt = Self::excerpt(prompt);

        Ok(format!(
            "public class Solution {{\n    \
             public static int {method}(int[] nums) {{\n        \
             // generated for: {excerpt}\n        \
             if (nums == null || nums.length == 0) return 0;\n\n        \
             int result = 0;\n        \
             for (int num : nums) {{\n            \
             result++;\n        \
             }}\n        \
             return result;\n    \
             }}\n}}"
        ))
    }

    async fn shutdown(&self) -> Result<(), BackendError> {
        // Nothing held; shutdown is a no-op.
        Ok(())
    }
}
