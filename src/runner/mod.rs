//! Benchmark runner: wires configuration, prompts, backends, the batch
//! coordinator, and reporting into one run.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::batch::{BatchCoordinator, CoordinatorConfig, GenerationResult};
use crate::config::{BenchmarkConfig, ModelSpec};
use crate::error::{BackendError, ConfigError, DatasetError, PromptError, ReportError};
use crate::model::{
    BackendRegistry, GenerationOptions, LocalModelBackend, LocalModelConfig, OpenRouterBackend,
    StubBackend,
};
use crate::problems::ProblemSet;
use crate::prompts::{PersonaLibrary, PromptLibrary, RequestBuilder};
use crate::report::{BenchmarkReport, ReportWriter};

/// Errors that can occur while setting up or driving a benchmark run.
///
/// These are caller-setup failures and surface immediately; once a batch
/// is dispatched, per-request faults live inside the results instead.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Backend setup error: {0}")]
    Backend(#[from] BackendError),
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Ordered results, index-corresponding to the built requests.
    pub results: Vec<GenerationResult>,
    /// Aggregated report.
    pub report: BenchmarkReport,
    /// Where the raw results were written.
    pub raw_path: std::path::PathBuf,
    /// Where the report was written.
    pub report_path: std::path::PathBuf,
}

/// Drives benchmark runs end to end.
#[derive(Debug)]
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    prompts: PromptLibrary,
    personas: PersonaLibrary,
    registry: Arc<BackendRegistry>,
    coordinator: BatchCoordinator,
    writer: ReportWriter,
}

impl BenchmarkRunner {
    /// Builds a runner from validated configuration.
    ///
    /// Backend construction happens here: a missing API key or other
    /// registry-construction failure is raised immediately rather than
    /// deferred into per-result failures.
    pub fn new(config: BenchmarkConfig) -> Result<Self, RunnerError> {
        config.validate()?;

        let prompts = PromptLibrary::from_path(&config.prompts_path)?;
        let registry = Arc::new(build_registry(&config)?);

        let mut coordinator_config = CoordinatorConfig::new().with_options(
            GenerationOptions::new()
                .with_max_tokens(config.max_tokens)
                .with_temperature(config.temperature),
        );
        if let Some(n) = config.max_concurrency {
            coordinator_config = coordinator_config.with_max_concurrency(n);
        }
        if let Some(timeout) = config.per_request_timeout() {
            coordinator_config = coordinator_config.with_per_request_timeout(timeout);
        }

        let coordinator = BatchCoordinator::new(Arc::clone(&registry), coordinator_config)?;
        let writer = ReportWriter::new(&config.results_dir);

        Ok(Self {
            config,
            prompts,
            personas: PersonaLibrary::default(),
            registry,
            coordinator,
            writer,
        })
    }

    /// Runs the benchmark against the named problem set.
    ///
    /// Loads `<problem_sets_dir>/<set_name>.json`, builds the request
    /// cross-product, batch-generates, and persists raw results plus the
    /// aggregated report.
    pub async fn run(&self, set_name: &str) -> Result<RunOutcome, RunnerError> {
        let set_path = self
            .config
            .problem_sets_dir
            .join(format!("{}.json", set_name));
        let problem_set = ProblemSet::from_path(&set_path)?;

        if problem_set.is_empty() {
            warn!(set = %set_name, "Problem set contains no problems");
        }

        let builder = RequestBuilder::new(
            &self.prompts,
            &self.personas,
            self.config.model_names(),
        );
        let requests = builder.build(&problem_set.problems)?;
        info!(
            set = %set_name,
            problems = problem_set.len(),
            requests = requests.len(),
            "Starting benchmark run"
        );

        let results = self.coordinator.batch_generate(requests).await;

        let raw_path = self.writer.write_raw_results(set_name, &results)?;
        let report = BenchmarkReport::from_results(set_name, &results);
        let report_path = self.writer.write_report(&report)?;

        info!(
            set = %set_name,
            total = report.total_requests,
            successes = report.total_successes,
            "Benchmark run complete"
        );

        Ok(RunOutcome {
            results,
            report,
            raw_path,
            report_path,
        })
    }

    /// Shuts down every backend in the registry.
    pub async fn shutdown(&self) {
        self.registry.shutdown_all().await;
    }

    /// The runner's configuration.
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// The backend registry.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Coordinator statistics for the run so far.
    pub fn stats(&self) -> crate::batch::BatchStats {
        self.coordinator.stats()
    }
}

/// Builds the backend registry from model specs.
pub fn build_registry(config: &BenchmarkConfig) -> Result<BackendRegistry, RunnerError> {
    let mut registry = BackendRegistry::new();

    for spec in &config.models {
        match spec {
            ModelSpec::Stub { name } => {
                registry.register(name, Arc::new(StubBackend::new()));
            }
            ModelSpec::Openrouter {
                name,
                model,
                api_key_env,
            } => {
                let api_key = std::env::var(api_key_env)
                    .map_err(|_| BackendError::MissingApiKey(api_key_env.clone()))?;
                registry.register(
                    name,
                    Arc::new(OpenRouterBackend::new(api_key, model.clone())),
                );
            }
            ModelSpec::Local { name, weights_path } => {
                registry.register(
                    name,
                    Arc::new(LocalModelBackend::new(LocalModelConfig::new(
                        name.clone(),
                        weights_path.clone(),
                    ))),
                );
            }
        }
    }

    info!(models = ?registry.names(), "Backend registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn stub_config(dir: &std::path::Path) -> BenchmarkConfig {
        let prompts_path = write_file(
            dir,
            "prompts.yaml",
            r#"
prompts:
  - name: zero_shot_basic
    strategy: zero_shot
    template: "Write code for: {{ problem_description }}"
    variables: [problem_description]
"#,
        );

        write_file(
            dir,
            "sets/basic.json",
            r#"{"problems": [
                {"id": "pb-1", "description": "Sum two numbers"},
                {"id": "pb-2", "description": "Count even numbers"}
            ]}"#,
        );

        BenchmarkConfig {
            prompts_path,
            problem_sets_dir: dir.join("sets"),
            results_dir: dir.join("results"),
            models: vec![ModelSpec::Stub {
                name: "local-stub".to_string(),
            }],
            max_concurrency: Some(2),
            per_request_timeout_secs: Some(10),
            max_tokens: 200,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn end_to_end_run_with_stub_backend() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BenchmarkRunner::new(stub_config(dir.path())).unwrap();

        let outcome = runner.run("basic").await.unwrap();

        // 2 problems x 1 template x 1 model.
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|r| r.success));
        assert_eq!(outcome.results[0].request.problem_id, "pb-1");
        assert_eq!(outcome.results[1].request.problem_id, "pb-2");
        assert!(outcome.raw_path.exists());
        assert!(outcome.report_path.exists());
        assert_eq!(outcome.report.total_requests, 2);

        runner.shutdown().await;
    }

    #[tokio::test]
    async fn missing_problem_set_is_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BenchmarkRunner::new(stub_config(dir.path())).unwrap();
        let err = runner.run("nonexistent").await.unwrap_err();
        assert!(matches!(err, RunnerError::Dataset(_)));
    }

    #[test]
    fn missing_api_key_fails_registry_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = stub_config(dir.path());
        config.models.push(ModelSpec::Openrouter {
            name: "remote".to_string(),
            model: "test/model".to_string(),
            api_key_env: "PROMPTBENCH_TEST_KEY_THAT_IS_NOT_SET".to_string(),
        });

        let err = BenchmarkRunner::new(config).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Backend(BackendError::MissingApiKey(_))
        ));
    }
}
