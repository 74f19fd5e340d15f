//! Batch generation: requests, results, and the coordinator.
//!
//! This is the crate's core. The flow:
//!
//! 1. The request builder expands problems × strategies × templates ×
//!    models into an ordered sequence of [`GenerationRequest`]s.
//! 2. [`BatchCoordinator::batch_generate`] executes them against the
//!    backend registry with bounded concurrency and per-request failure
//!    isolation.
//! 3. The returned [`GenerationResult`]s preserve input order
//!    (`results[i].request == requests[i]`), which reporting relies on.

pub mod coordinator;
pub mod request;
pub mod result;

pub use coordinator::{BatchCoordinator, BatchStats, CoordinatorConfig};
pub use request::{GenerationRequest, PromptStrategy};
pub use result::GenerationResult;
