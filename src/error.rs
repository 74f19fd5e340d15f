//! Error types for promptbench operations.
//!
//! Defines error types for the major subsystems:
//! - Model backends (remote API, local weights, lifecycle)
//! - Benchmark configuration loading and validation
//! - Prompt template parsing and rendering
//! - Problem set loading
//! - Result and report persistence

use thiserror::Error;

/// Errors raised by model backends during generation or lifecycle operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Missing API key: {0} environment variable not set")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse model response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model load failed for '{model}': {reason}")]
    LoadFailed { model: String, reason: String },

    #[error("Local inference failed: {0}")]
    Inference(String),

    #[error("Malformed completion: {0}")]
    MalformedCompletion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading or validating benchmark configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to parse config file '{path}': {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("No models configured: at least one model is required")]
    NoModels,

    #[error("Duplicate model name '{0}' in configuration")]
    DuplicateModel(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during prompt template operations.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Duplicate template name '{0}' found during loading")]
    DuplicateName(String),

    #[error("Failed to parse prompt file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Unknown persona '{persona}' referenced by template '{template}'")]
    UnknownPersona { template: String, persona: String },

    #[error("Template rendering error: {0}")]
    Render(#[from] tera::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading problem sets.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Problem set '{0}' not found")]
    NotFound(String),

    #[error("Failed to parse problem set '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Duplicate problem id '{0}' in problem set")]
    DuplicateProblem(String),

    #[error("Problem '{id}' is missing a description")]
    MissingDescription { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while writing results or reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to create results directory '{path}': {reason}")]
    DirectoryFailed { path: String, reason: String },

    #[error("No results to report")]
    NoResults,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
