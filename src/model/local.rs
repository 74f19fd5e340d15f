//! Locally loaded model backend.
//!
//! Loads a serialized n-gram transition table from disk and completes
//! prompts by walking it greedily. Weights are loaded lazily on the first
//! generation call; the load is fallible (missing or corrupt file) and
//! surfaces as [`BackendError::LoadFailed`] rather than a panic, so a
//! misconfigured local model fails only the requests routed to it.
//!
//! Both loading and inference are CPU/IO-bound and run under
//! `tokio::task::spawn_blocking` so they never starve the cooperative
//! scheduler. This backend samples deterministically and ignores
//! `temperature`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use super::{GenerationOptions, ModelBackend};
use crate::error::BackendError;

/// Configuration for a local model backend.
#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    /// Display name used in logs and error messages.
    pub model_name: String,
    /// Path to the serialized weights file (JSON transition table).
    pub weights_path: PathBuf,
}

impl LocalModelConfig {
    /// Creates a configuration for the given weights file.
    pub fn new(model_name: impl Into<String>, weights_path: impl Into<PathBuf>) -> Self {
        Self {
            model_name: model_name.into(),
            weights_path: weights_path.into(),
        }
    }
}

/// Serialized weights format.
#[derive(Debug, Deserialize)]
struct WeightsFile {
    /// Token -> candidate continuations, ordered by preference.
    transitions: HashMap<String, Vec<String>>,
    /// Tokens emitted when no transition matches.
    #[serde(default)]
    fallback: Vec<String>,
}

/// A loaded model held in memory between calls.
struct LoadedModel {
    transitions: HashMap<String, Vec<String>>,
    fallback: Vec<String>,
}

impl LoadedModel {
    /// Reads and validates a weights file.
    fn load(model_name: &str, path: &Path) -> Result<Self, BackendError> {
        let raw = std::fs::read_to_string(path).map_err(|e| BackendError::LoadFailed {
            model: model_name.to_string(),
            reason: format!("cannot read '{}': {}", path.display(), e),
        })?;

        let weights: WeightsFile =
            serde_json::from_str(&raw).map_err(|e| BackendError::LoadFailed {
                model: model_name.to_string(),
                reason: format!("invalid weights file '{}': {}", path.display(), e),
            })?;

        if weights.transitions.is_empty() {
            return Err(BackendError::LoadFailed {
                model: model_name.to_string(),
                reason: "weights file contains no transitions".to_string(),
            });
        }

        Ok(Self {
            transitions: weights.transitions,
            fallback: weights.fallback,
        })
    }

    /// Greedy continuation: follow the first-ranked transition from the
    /// last prompt token, up to `max_tokens` emitted tokens.
    fn complete(&self, prompt: &str, max_tokens: u32) -> String {
        let mut current = prompt
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_lowercase();

        let mut output = Vec::new();
        let mut fallback_cursor = 0usize;

        for _ in 0..max_tokens {
            let next = match self.transitions.get(&current) {
                Some(candidates) if !candidates.is_empty() => candidates[0].clone(),
                _ => {
                    if self.fallback.is_empty() {
                        break;
                    }
                    let token = self.fallback[fallback_cursor % self.fallback.len()].clone();
                    fallback_cursor += 1;
                    token
                }
            };
            current = next.to_lowercase();
            output.push(next);
        }

        output.join(" ")
    }
}

/// Backend that serves completions from a locally loaded model.
pub struct LocalModelBackend {
    config: LocalModelConfig,
    /// Lazily populated on first use; cleared by `shutdown`.
    model: Mutex<Option<Arc<LoadedModel>>>,
}

impl LocalModelBackend {
    /// Creates a backend for the given configuration.
    ///
    /// The weights file is not touched until the first generation call.
    pub fn new(config: LocalModelConfig) -> Self {
        Self {
            config,
            model: Mutex::new(None),
        }
    }

    /// Returns the loaded model, loading it on first use.
    ///
    /// A failed load is not cached: a later call retries, so a weights
    /// file dropped into place mid-run starts working without a restart.
    async fn model(&self) -> Result<Arc<LoadedModel>, BackendError> {
        let mut guard = self.model.lock().await;
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }

        let name = self.config.model_name.clone();
        let path = self.config.weights_path.clone();
        info!(model = %name, path = %path.display(), "Loading local model weights");

        let loaded = tokio::task::spawn_blocking(move || LoadedModel::load(&name, &path))
            .await
            .map_err(|e| BackendError::Inference(format!("weight loading panicked: {}", e)))??;

        let model = Arc::new(loaded);
        *guard = Some(Arc::clone(&model));
        Ok(model)
    }
}

#[async_trait]
impl ModelBackend for LocalModelBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        let model = self.model().await?;
        let prompt = prompt.to_string();
        let max_tokens = options.max_tokens;

        tokio::task::spawn_blocking(move || model.complete(&prompt, max_tokens))
            .await
            .map_err(|e| BackendError::Inference(format!("inference panicked: {}", e)))
    }

    async fn shutdown(&self) -> Result<(), BackendError> {
        let mut guard = self.model.lock().await;
        if guard.take().is_some() {
            info!(model = %self.config.model_name, "Released local model weights");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_weights(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn generates_from_transition_table() {
        let weights = write_weights(
            r#"{
                "transitions": {
                    "numbers": ["public", "static"],
                    "public": ["class"],
                    "class": ["Solution"]
                },
                "fallback": ["{", "}"]
            }"#,
        );

        let backend = LocalModelBackend::new(LocalModelConfig::new("tiny", weights.path()));
        let code = backend
            .generate("sum two numbers", &GenerationOptions::new().with_max_tokens(5))
            .await
            .unwrap();

        assert_eq!(code, "public class Solution { }");
    }

    #[tokio::test]
    async fn missing_weights_is_a_load_error() {
        let backend = LocalModelBackend::new(LocalModelConfig::new(
            "tiny",
            "/nonexistent/weights.json",
        ));
        let err = backend
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::LoadFailed { .. }));
    }

    #[tokio::test]
    async fn corrupt_weights_is_a_load_error() {
        let weights = write_weights("not json at all");
        let backend = LocalModelBackend::new(LocalModelConfig::new("tiny", weights.path()));
        let err = backend
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::LoadFailed { .. }));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_safe_before_use() {
        let weights = write_weights(r#"{"transitions": {"a": ["b"]}}"#);
        let backend = LocalModelBackend::new(LocalModelConfig::new("tiny", weights.path()));

        // Never used yet.
        backend.shutdown().await.unwrap();

        backend
            .generate("a", &GenerationOptions::default())
            .await
            .unwrap();
        backend.shutdown().await.unwrap();
        backend.shutdown().await.unwrap();

        // Still usable after shutdown: weights reload lazily.
        let code = backend
            .generate("a", &GenerationOptions::new().with_max_tokens(1))
            .await
            .unwrap();
        assert_eq!(code, "b");
    }
}
