//! Reporting: aggregation and persistence of benchmark results.
//!
//! The coordinator hands reporting a complete, ordered result list;
//! everything here correlates results back to `(strategy, model)` through
//! the request metadata each result carries. Persisted layout is plain
//! JSON under a configurable results directory.

pub mod summary;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::batch::GenerationResult;
use crate::error::ReportError;

pub use summary::{BenchmarkReport, CombinationSummary};

/// Writes raw results and reports as timestamped JSON files.
#[derive(Debug)]
pub struct ReportWriter {
    results_dir: PathBuf,
}

impl ReportWriter {
    /// Creates a writer targeting the given directory.
    ///
    /// The directory is created on first write, not here.
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Returns the results directory.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Persists the raw result list as `<set>_<timestamp>.json`.
    pub fn write_raw_results(
        &self,
        set_name: &str,
        results: &[GenerationResult],
    ) -> Result<PathBuf, ReportError> {
        let path = self.timestamped_path(set_name, "json")?;
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), results = results.len(), "Saved raw results");
        Ok(path)
    }

    /// Persists a report as `<set>_<timestamp>_report.json`.
    pub fn write_report(&self, report: &BenchmarkReport) -> Result<PathBuf, ReportError> {
        if report.total_requests == 0 {
            return Err(ReportError::NoResults);
        }
        let path = self.timestamped_path(&format!("{}_report", report.problem_set), "json")?;
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;
        info!(
            path = %path.display(),
            combinations = report.combinations.len(),
            "Saved benchmark report"
        );
        Ok(path)
    }

    /// Ensures the results directory exists and builds a timestamped path.
    fn timestamped_path(&self, stem: &str, extension: &str) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.results_dir).map_err(|e| ReportError::DirectoryFailed {
            path: self.results_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        Ok(self
            .results_dir
            .join(format!("{}_{}.{}", stem, timestamp, extension)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{GenerationRequest, PromptStrategy};

    fn sample_results() -> Vec<GenerationResult> {
        vec![GenerationResult {
            request: GenerationRequest::new("p", PromptStrategy::ZeroShot, "pb-1", "stub"),
            success: true,
            generated_code: "int x = 1;".to_string(),
            execution_time: 0.1,
            token_count: 4,
            error_message: String::new(),
        }]
    }

    #[test]
    fn writes_raw_results_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("results"));
        let results = sample_results();

        let raw_path = writer.write_raw_results("basic", &results).unwrap();
        assert!(raw_path.exists());

        let parsed: Vec<GenerationResult> =
            serde_json::from_str(&std::fs::read_to_string(&raw_path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].request.model_name, "stub");

        let report = BenchmarkReport::from_results("basic", &results);
        let report_path = writer.write_report(&report).unwrap();
        assert!(report_path.exists());
        assert!(report_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("basic_report_"));
    }

    #[test]
    fn empty_report_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let report = BenchmarkReport::from_results("basic", &[]);
        assert!(matches!(
            writer.write_report(&report),
            Err(ReportError::NoResults)
        ));
    }
}
