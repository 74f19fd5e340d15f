//! promptbench: prompt-engineering benchmark harness for code-generation
//! models.
//!
//! Expands a problem set × prompting strategy × model cross-product into
//! generation requests, executes them concurrently against pluggable model
//! backends with bounded concurrency and per-request failure isolation,
//! and aggregates the ordered results into per-combination reports.

// Core modules
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod problems;
pub mod prompts;
pub mod report;
pub mod runner;

// Re-export commonly used error types
pub use error::{BackendError, ConfigError, DatasetError, PromptError, ReportError};
