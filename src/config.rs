//! Benchmark configuration.
//!
//! Loaded from a JSON file (the `benchmark_config.json` shape) and
//! validated before any backend is constructed. Environment variables can
//! override the execution knobs without editing the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

fn default_problem_sets_dir() -> PathBuf {
    PathBuf::from("data/input/problem_sets")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("data/results")
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f64 {
    0.2
}

/// How a named model is backed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Deterministic heuristic stub; no external resources.
    Stub {
        /// Registry name for this model.
        name: String,
    },
    /// Hosted model reached through the OpenRouter API.
    Openrouter {
        /// Registry name for this model.
        name: String,
        /// Hosted model identifier (e.g. "anthropic/claude-3-opus").
        model: String,
        /// Environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
    /// Locally loaded model with weights on disk.
    Local {
        /// Registry name for this model.
        name: String,
        /// Path to the weights file.
        weights_path: PathBuf,
    },
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

impl ModelSpec {
    /// The registry name of this model.
    pub fn name(&self) -> &str {
        match self {
            ModelSpec::Stub { name } => name,
            ModelSpec::Openrouter { name, .. } => name,
            ModelSpec::Local { name, .. } => name,
        }
    }
}

/// Top-level benchmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Prompt template library (YAML).
    pub prompts_path: PathBuf,
    /// Directory containing `<set>.json` problem sets.
    #[serde(default = "default_problem_sets_dir")]
    pub problem_sets_dir: PathBuf,
    /// Directory results and reports are written to.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Models to benchmark, in the order requests are fanned out.
    pub models: Vec<ModelSpec>,
    /// Maximum in-flight generate calls; absent means unbounded.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Per-request timeout in seconds; absent means wait for the backend.
    #[serde(default)]
    pub per_request_timeout_secs: Option<u64>,
    /// Maximum tokens per generation.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature forwarded to backends.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl BenchmarkConfig {
    /// Loads and validates configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config: BenchmarkConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.apply_env_overrides()?;
        config.validate()?;
        info!(
            path = %path.display(),
            models = config.models.len(),
            max_concurrency = ?config.max_concurrency,
            "Loaded benchmark configuration"
        );
        Ok(config)
    }

    /// Applies environment-variable overrides for the execution knobs.
    ///
    /// - `PROMPTBENCH_MAX_CONCURRENCY`
    /// - `PROMPTBENCH_TIMEOUT_SECS`
    /// - `PROMPTBENCH_RESULTS_DIR`
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("PROMPTBENCH_MAX_CONCURRENCY") {
            let parsed = val.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PROMPTBENCH_MAX_CONCURRENCY".to_string(),
                message: format!("'{}' is not a valid integer", val),
            })?;
            self.max_concurrency = Some(parsed);
        }
        if let Ok(val) = std::env::var("PROMPTBENCH_TIMEOUT_SECS") {
            let parsed = val.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PROMPTBENCH_TIMEOUT_SECS".to_string(),
                message: format!("'{}' is not a valid integer", val),
            })?;
            self.per_request_timeout_secs = Some(parsed);
        }
        if let Ok(val) = std::env::var("PROMPTBENCH_RESULTS_DIR") {
            self.results_dir = PathBuf::from(val);
        }
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &self.models {
            if !seen.insert(spec.name()) {
                return Err(ConfigError::DuplicateModel(spec.name().to_string()));
            }
        }

        if self.max_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrency".to_string(),
                message: "must be at least 1 (or unset for unbounded)".to_string(),
            });
        }

        if self.per_request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "per_request_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "temperature".to_string(),
                message: format!("{} is outside the supported range 0.0..=2.0", self.temperature),
            });
        }

        Ok(())
    }

    /// Model names in configuration order.
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name().to_string()).collect()
    }

    /// The per-request timeout as a `Duration`, when configured.
    pub fn per_request_timeout(&self) -> Option<Duration> {
        self.per_request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for BenchmarkConfig {
    /// A stub-only configuration usable without any external resources.
    fn default() -> Self {
        Self {
            prompts_path: PathBuf::from("config/prompts/basic_prompts.yaml"),
            problem_sets_dir: default_problem_sets_dir(),
            results_dir: default_results_dir(),
            models: vec![ModelSpec::Stub {
                name: "local-stub".to_string(),
            }],
            max_concurrency: Some(4),
            per_request_timeout_secs: Some(120),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}
