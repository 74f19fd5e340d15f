//! Model backends for code generation.
//!
//! This module defines the capability contract every code-generation model
//! implements, plus the registry the batch coordinator resolves model names
//! against. Three backend variants ship with the crate:
//!
//! - [`StubBackend`]: deterministic heuristic generator, never fails
//! - [`OpenRouterBackend`]: remote API-backed generation over HTTP
//! - [`LocalModelBackend`]: lazily loaded local model with blocking
//!   inference offloaded to a worker thread
//!
//! Heterogeneity across variants (native token counts, response envelopes,
//! markdown fences) is resolved once, inside each adapter: `generate`
//! always returns plain generated text.

pub mod local;
pub mod openrouter;
pub mod stub;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::BackendError;

pub use local::{LocalModelBackend, LocalModelConfig};
pub use openrouter::OpenRouterBackend;
pub use stub::StubBackend;

/// Options forwarded to every backend generation call.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature. Backends that sample deterministically may
    /// ignore this and document doing so.
    pub temperature: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.2,
        }
    }
}

impl GenerationOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Capability contract for a pluggable code-generation model.
///
/// `generate` either returns generated text or a typed [`BackendError`];
/// it must not panic on bad input. Backends have no obligation to enforce
/// their own wall-clock limit; the batch coordinator imposes a cooperative
/// per-request timeout on top of this call. Backends doing CPU-bound work
/// must offload it to a blocking execution context themselves so the async
/// scheduler is never starved.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generates code text for a fully rendered prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError>;

    /// Releases any resources held by the backend (loaded weights,
    /// sessions). Idempotent: safe to call multiple times or on an
    /// instance that never served a request.
    async fn shutdown(&self) -> Result<(), BackendError>;
}

/// Mapping from model name to a live backend instance.
///
/// Built once per benchmark run and shared read-only across all in-flight
/// requests; entries are never replaced or mutated after construction.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ModelBackend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend under the given model name.
    ///
    /// Registering the same name twice replaces the earlier instance;
    /// callers that need to reject duplicates check [`contains`] first.
    ///
    /// [`contains`]: BackendRegistry::contains
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn ModelBackend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Resolves a backend by model name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelBackend>> {
        self.backends.get(name).cloned()
    }

    /// Returns whether a model name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Returns the registered model names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Shuts down every registered backend.
    ///
    /// Individual shutdown failures are logged and do not prevent the
    /// remaining backends from being shut down.
    pub async fn shutdown_all(&self) {
        for (name, backend) in &self.backends {
            if let Err(e) = backend.shutdown().await {
                warn!(model = %name, error = %e, "Backend shutdown failed");
            }
        }
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("models", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options = GenerationOptions::default();
        assert_eq!(options.max_tokens, 200);
        assert!((options.temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn options_builder() {
        let options = GenerationOptions::new()
            .with_max_tokens(512)
            .with_temperature(0.7);
        assert_eq!(options.max_tokens, 512);
        assert!((options.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn registry_lookup_and_names() {
        let mut registry = BackendRegistry::new();
        assert!(registry.is_empty());

        registry.register("stub-b", Arc::new(StubBackend::new()));
        registry.register("stub-a", Arc::new(StubBackend::new()));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("stub-a"));
        assert!(registry.get("stub-a").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["stub-a", "stub-b"]);
    }

    #[tokio::test]
    async fn registry_shutdown_all_is_safe_on_unused_backends() {
        let mut registry = BackendRegistry::new();
        registry.register("stub", Arc::new(StubBackend::new()));
        // Shutdown twice: must be idempotent even though no request ran.
        registry.shutdown_all().await;
        registry.shutdown_all().await;
    }
}
