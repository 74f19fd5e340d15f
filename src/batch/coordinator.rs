//! Batch generation coordinator.
//!
//! Fans a batch of [`GenerationRequest`]s out against the backend registry
//! with bounded concurrency, isolates per-request failures, and reassembles
//! [`GenerationResult`]s in the original request order regardless of
//! completion order.
//!
//! The coordinator never performs blocking I/O itself; its only suspension
//! points are the backend `generate` calls (and the semaphore wait in front
//! of them). Backends doing CPU-bound work are responsible for offloading
//! it to a blocking execution context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::model::{BackendRegistry, GenerationOptions, ModelBackend};

use super::request::GenerationRequest;
use super::result::GenerationResult;

/// Configuration for the batch coordinator.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Maximum number of `generate` calls in flight at once; `None` means
    /// unbounded. A resource-protection knob for heavy local backends, not
    /// a correctness requirement.
    pub max_concurrency: Option<usize>,
    /// Per-request wall-clock limit. An overlong call is recorded as a
    /// failed result; the abandoned backend future is dropped, not
    /// preempted, so a non-cancellable backend may keep computing in the
    /// background.
    pub per_request_timeout: Option<Duration>,
    /// Options forwarded to every backend call.
    pub options: GenerationOptions,
}

impl CoordinatorConfig {
    /// Creates a configuration with no concurrency bound and no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of in-flight generate calls.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// Sets the per-request timeout.
    pub fn with_per_request_timeout(mut self, timeout: Duration) -> Self {
        self.per_request_timeout = Some(timeout);
        self
    }

    /// Sets the generation options forwarded to backends.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrency".to_string(),
                message: "must be at least 1 (or unset for unbounded)".to_string(),
            });
        }
        if self.per_request_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                key: "per_request_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Snapshot of coordinator statistics.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// Requests that produced a successful result.
    pub completed: u64,
    /// Requests that produced a failed result.
    pub failed: u64,
    /// Backend calls currently in flight.
    pub in_flight: usize,
    /// Average backend-call duration across all finished requests.
    pub average_duration: Duration,
}

impl BatchStats {
    /// Total requests processed (success + failure).
    pub fn total_processed(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Shared counters behind the stats snapshot.
#[derive(Debug)]
struct SharedBatchStats {
    completed: AtomicU64,
    failed: AtomicU64,
    total_duration_ms: AtomicU64,
    in_flight: AtomicU64,
}

impl SharedBatchStats {
    fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    fn record_success(&self, duration: Duration) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self, duration: Duration) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn snapshot(&self) -> BatchStats {
        let completed = self.completed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let total = completed + failed;
        let average_duration = if total > 0 {
            Duration::from_millis(self.total_duration_ms.load(Ordering::SeqCst) / total)
        } else {
            Duration::ZERO
        };

        BatchStats {
            completed,
            failed,
            in_flight: self.in_flight.load(Ordering::SeqCst) as usize,
            average_duration,
        }
    }
}

/// RAII guard for the in-flight gauge.
struct InFlightGuard<'a>(&'a SharedBatchStats);

impl<'a> InFlightGuard<'a> {
    fn enter(stats: &'a SharedBatchStats) -> Self {
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Coordinates concurrent generation across a shared backend registry.
#[derive(Debug)]
pub struct BatchCoordinator {
    registry: Arc<BackendRegistry>,
    config: CoordinatorConfig,
    limiter: Option<Arc<Semaphore>>,
    stats: Arc<SharedBatchStats>,
}

impl BatchCoordinator {
    /// Creates a coordinator over the given registry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid concurrency bound or timeout.
    /// Caller-setup mistakes are raised here, never converted into
    /// per-result failures.
    pub fn new(
        registry: Arc<BackendRegistry>,
        config: CoordinatorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let limiter = config
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n)));

        Ok(Self {
            registry,
            config,
            limiter,
            stats: Arc::new(SharedBatchStats::new()),
        })
    }

    /// Executes a batch of requests and returns results in request order.
    ///
    /// The returned vector has the same length as the input and
    /// `results[i].request == requests[i]` for every index, regardless of
    /// the order in which backends complete. The batch itself never fails:
    /// unknown model names, backend errors, timeouts, and panics inside a
    /// backend all become `success == false` results for their own request
    /// only.
    pub async fn batch_generate(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Vec<GenerationResult> {
        if requests.is_empty() {
            return Vec::new();
        }

        let total = requests.len();
        info!(
            total,
            max_concurrency = ?self.config.max_concurrency,
            "Dispatching generation batch"
        );

        let (fallbacks, handles): (Vec<GenerationRequest>, Vec<JoinHandle<GenerationResult>>) =
            requests
                .into_iter()
                .map(|request| {
                    let registry = Arc::clone(&self.registry);
                    let limiter = self.limiter.clone();
                    let timeout = self.config.per_request_timeout;
                    let options = self.config.options.clone();
                    let stats = Arc::clone(&self.stats);
                    // Keep a copy so a panicking backend still yields a
                    // result correlated to its request.
                    let fallback = request.clone();
                    let handle = tokio::spawn(async move {
                        execute_one(registry, limiter, timeout, options, stats, request).await
                    });
                    (fallback, handle)
                })
                .unzip();

        // join_all preserves spawn order, which reassembles the output in
        // request order; completions race freely underneath.
        let joined = futures::future::join_all(handles).await;

        let results: Vec<GenerationResult> = fallbacks
            .into_iter()
            .zip(joined)
            .map(|(fallback, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        model = %fallback.model_name,
                        problem = %fallback.problem_id,
                        error = %e,
                        "Generation task panicked"
                    );
                    self.stats.record_failure(Duration::ZERO);
                    GenerationResult::failed(
                        fallback,
                        format!("generation task panicked: {}", e),
                        Duration::ZERO,
                    )
                }
            })
            .collect();

        let stats = self.stats.snapshot();
        info!(
            total,
            completed = stats.completed,
            failed = stats.failed,
            "Generation batch finished"
        );

        results
    }

    /// Returns a snapshot of the coordinator's statistics.
    pub fn stats(&self) -> BatchStats {
        self.stats.snapshot()
    }

    /// Returns the coordinator's configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}

/// Executes a single request against its backend.
///
/// Every failure mode inside this function is converted into a failed
/// [`GenerationResult`]; nothing propagates to sibling requests.
async fn execute_one(
    registry: Arc<BackendRegistry>,
    limiter: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
    options: GenerationOptions,
    stats: Arc<SharedBatchStats>,
    request: GenerationRequest,
) -> GenerationResult {
    let Some(backend) = registry.get(&request.model_name) else {
        warn!(model = %request.model_name, "Model not found in backend registry");
        stats.record_failure(Duration::ZERO);
        let message = format!(
            "unknown model '{}': not present in backend registry",
            request.model_name
        );
        return GenerationResult::failed(request, message, Duration::ZERO);
    };

    // Wait for a concurrency slot before starting the clock; queue time is
    // not execution time.
    let _permit = match &limiter {
        Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                stats.record_failure(Duration::ZERO);
                return GenerationResult::failed(
                    request,
                    format!("concurrency limiter closed: {}", e),
                    Duration::ZERO,
                );
            }
        },
        None => None,
    };

    let _gauge = InFlightGuard::enter(stats.as_ref());
    let started = Instant::now();

    let outcome = invoke_backend(backend.as_ref(), &request.prompt, &options, timeout).await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(code) => {
            debug!(
                model = %request.model_name,
                problem = %request.problem_id,
                strategy = %request.strategy,
                duration_ms = elapsed.as_millis(),
                "Generation completed"
            );
            stats.record_success(elapsed);
            GenerationResult::completed(request, code, elapsed)
        }
        Err(message) => {
            warn!(
                model = %request.model_name,
                problem = %request.problem_id,
                strategy = %request.strategy,
                duration_ms = elapsed.as_millis(),
                error = %message,
                "Generation failed"
            );
            stats.record_failure(elapsed);
            GenerationResult::failed(request, message, elapsed)
        }
    }
}

/// Invokes `generate`, applying the cooperative timeout when configured.
async fn invoke_backend(
    backend: &dyn ModelBackend,
    prompt: &str,
    options: &GenerationOptions,
    timeout: Option<Duration>,
) -> Result<String, String> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, backend.generate(prompt, options)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!(
                "generation timeout after {:.1}s",
                limit.as_secs_f64()
            )),
        },
        None => backend
            .generate(prompt, options)
            .await
            .map_err(|e| e.to_string()),
    }
}
