//! Result aggregation into per-combination summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::{GenerationResult, PromptStrategy};

/// Aggregate metrics for one `(strategy, model)` combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationSummary {
    /// Prompting strategy.
    pub strategy: PromptStrategy,
    /// Model name.
    pub model_name: String,
    /// Requests in this combination.
    pub total: usize,
    /// Successful generations.
    pub successes: usize,
    /// Failed generations.
    pub failures: usize,
    /// successes / total.
    pub success_rate: f64,
    /// Mean backend-call duration in seconds, over all requests.
    pub average_execution_time: f64,
    /// Mean token count over successful generations; 0.0 if none.
    pub average_token_count: f64,
}

/// A full benchmark report over one batch of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// Name of the problem set that was benchmarked.
    pub problem_set: String,
    /// When the report was assembled.
    pub generated_at: DateTime<Utc>,
    /// Total requests in the batch.
    pub total_requests: usize,
    /// Total successful generations.
    pub total_successes: usize,
    /// Per-combination summaries, ordered by (strategy, model).
    pub combinations: Vec<CombinationSummary>,
}

impl BenchmarkReport {
    /// Aggregates a result list into a report.
    ///
    /// Grouping uses the request metadata embedded in each result, never
    /// result position, so reordered or partially failed batches
    /// aggregate identically.
    pub fn from_results(problem_set: impl Into<String>, results: &[GenerationResult]) -> Self {
        let mut groups: BTreeMap<(PromptStrategy, String), Vec<&GenerationResult>> =
            BTreeMap::new();
        for result in results {
            groups
                .entry((result.request.strategy, result.request.model_name.clone()))
                .or_default()
                .push(result);
        }

        let combinations = groups
            .into_iter()
            .map(|((strategy, model_name), members)| {
                let total = members.len();
                let successes = members.iter().filter(|r| r.success).count();
                let total_time: f64 = members.iter().map(|r| r.execution_time).sum();
                let success_tokens: usize = members
                    .iter()
                    .filter(|r| r.success)
                    .map(|r| r.token_count)
                    .sum();

                CombinationSummary {
                    strategy,
                    model_name,
                    total,
                    successes,
                    failures: total - successes,
                    success_rate: successes as f64 / total as f64,
                    average_execution_time: total_time / total as f64,
                    average_token_count: if successes > 0 {
                        success_tokens as f64 / successes as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            problem_set: problem_set.into(),
            generated_at: Utc::now(),
            total_requests: results.len(),
            total_successes: results.iter().filter(|r| r.success).count(),
            combinations,
        }
    }

    /// The summary for a specific combination, if present.
    pub fn combination(
        &self,
        strategy: PromptStrategy,
        model_name: &str,
    ) -> Option<&CombinationSummary> {
        self.combinations
            .iter()
            .find(|c| c.strategy == strategy && c.model_name == model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::GenerationRequest;

    fn result(
        strategy: PromptStrategy,
        model: &str,
        success: bool,
        time: f64,
        tokens: usize,
    ) -> GenerationResult {
        GenerationResult {
            request: GenerationRequest::new("p", strategy, "pb-1", model),
            success,
            generated_code: if success { "code".to_string() } else { String::new() },
            execution_time: time,
            token_count: tokens,
            error_message: if success { String::new() } else { "err".to_string() },
        }
    }

    #[test]
    fn aggregates_by_metadata_not_position() {
        // Interleave combinations deliberately; grouping must not care.
        let results = vec![
            result(PromptStrategy::ZeroShot, "a", true, 1.0, 10),
            result(PromptStrategy::ChainOfThought, "b", false, 3.0, 0),
            result(PromptStrategy::ZeroShot, "a", false, 2.0, 0),
            result(PromptStrategy::ChainOfThought, "b", true, 1.0, 30),
        ];

        let report = BenchmarkReport::from_results("basic", &results);
        assert_eq!(report.total_requests, 4);
        assert_eq!(report.total_successes, 2);
        assert_eq!(report.combinations.len(), 2);

        let zero = report
            .combination(PromptStrategy::ZeroShot, "a")
            .unwrap();
        assert_eq!(zero.total, 2);
        assert_eq!(zero.successes, 1);
        assert!((zero.success_rate - 0.5).abs() < f64::EPSILON);
        assert!((zero.average_execution_time - 1.5).abs() < 1e-9);
        // Token average counts successful generations only.
        assert!((zero.average_token_count - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_results_make_an_empty_report() {
        let report = BenchmarkReport::from_results("basic", &[]);
        assert_eq!(report.total_requests, 0);
        assert!(report.combinations.is_empty());
    }

    #[test]
    fn combinations_ordered_by_strategy_then_model() {
        let results = vec![
            result(PromptStrategy::Persona, "z", true, 1.0, 1),
            result(PromptStrategy::ZeroShot, "b", true, 1.0, 1),
            result(PromptStrategy::ZeroShot, "a", true, 1.0, 1),
        ];
        let report = BenchmarkReport::from_results("basic", &results);
        let order: Vec<(PromptStrategy, &str)> = report
            .combinations
            .iter()
            .map(|c| (c.strategy, c.model_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (PromptStrategy::ZeroShot, "a"),
                (PromptStrategy::ZeroShot, "b"),
                (PromptStrategy::Persona, "z"),
            ]
        );
    }
}
