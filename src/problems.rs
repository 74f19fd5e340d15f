//! Problem set loading.
//!
//! Problem sets are JSON files shaped like the HumanEval/MBPP exports the
//! harness consumes: `{"problems": [{"id": ..., "description": ...}, ...]}`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DatasetError;

/// A single code-generation problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Opaque identifier, unique within a set.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Problem statement handed to prompt templates.
    pub description: String,
    /// Constraints appended to the statement.
    #[serde(default)]
    pub constraints: String,
    /// Example input for few-shot style templates.
    #[serde(default)]
    pub example_input: String,
    /// Example output for few-shot style templates.
    #[serde(default)]
    pub example_output: String,
    /// Test cases, when the source benchmark carries them.
    #[serde(default)]
    pub test_cases: Vec<String>,
    /// Reference solution, when the source benchmark carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_solution: Option<String>,
}

impl Problem {
    /// Builds the render context prompt templates see for this problem.
    pub fn template_context(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        ctx.insert("problem_description", &self.description);
        ctx.insert("constraints", &self.constraints);
        ctx.insert("example_input", &self.example_input);
        ctx.insert("example_output", &self.example_output);
        ctx
    }
}

/// An ordered collection of problems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSet {
    /// Problems in file order; the request builder iterates them as-is.
    pub problems: Vec<Problem>,
}

impl ProblemSet {
    /// Loads a problem set from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError` for a missing file, malformed JSON,
    /// duplicate problem ids, or problems with an empty description.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::NotFound(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path)?;
        let set: ProblemSet = serde_json::from_str(&raw).map_err(|e| DatasetError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        set.validate()?;
        info!(
            path = %path.display(),
            problems = set.problems.len(),
            "Loaded problem set"
        );
        Ok(set)
    }

    /// Checks id uniqueness and required fields.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let mut seen = HashSet::new();
        for problem in &self.problems {
            if !seen.insert(problem.id.as_str()) {
                return Err(DatasetError::DuplicateProblem(problem.id.clone()));
            }
            if problem.description.trim().is_empty() {
                return Err(DatasetError::MissingDescription {
                    id: problem.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Number of problems in the set.
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Whether the set has no problems.
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}
