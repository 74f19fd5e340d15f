//! CLI command definitions for promptbench.

use clap::Parser;
use tracing::info;

use crate::batch::PromptStrategy;
use crate::config::BenchmarkConfig;
use crate::problems::ProblemSet;
use crate::prompts::PromptLibrary;
use crate::runner::BenchmarkRunner;

/// Default configuration file location.
const DEFAULT_CONFIG: &str = "config/benchmark_config.json";

/// Prompt-engineering benchmark harness for code-generation models.
#[derive(Parser)]
#[command(name = "promptbench")]
#[command(about = "Compare prompting strategies across code-generation models")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run a benchmark over a problem set.
    Run(RunArgs),

    /// Validate configuration, prompts, and a problem set without running.
    Check(CheckArgs),
}

/// Arguments for `promptbench run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Problem set name (resolved as <problem_sets_dir>/<set>.json).
    #[arg(short, long)]
    pub set: String,

    /// Path to the benchmark configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: String,

    /// Override the maximum number of in-flight generate calls.
    #[arg(long, env = "PROMPTBENCH_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Override the per-request timeout in seconds.
    #[arg(long, env = "PROMPTBENCH_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

/// Arguments for `promptbench check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the benchmark configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: String,

    /// Problem set to validate alongside the configuration.
    #[arg(short, long)]
    pub set: Option<String>,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Executes the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_benchmark(args).await,
        Commands::Check(args) => check_setup(args),
    }
}

/// Handles `promptbench run`.
async fn run_benchmark(args: RunArgs) -> anyhow::Result<()> {
    let mut config = BenchmarkConfig::from_path(&args.config)?;
    if let Some(n) = args.max_concurrency {
        config.max_concurrency = Some(n);
    }
    if let Some(secs) = args.timeout_secs {
        config.per_request_timeout_secs = Some(secs);
    }
    config.validate()?;

    let runner = BenchmarkRunner::new(config)?;
    let outcome = runner.run(&args.set).await;
    runner.shutdown().await;
    let outcome = outcome?;

    println!("Benchmark '{}' complete", args.set);
    println!(
        "  {} requests, {} succeeded",
        outcome.report.total_requests, outcome.report.total_successes
    );
    println!();
    println!(
        "  {:<12} {:<20} {:>8} {:>10} {:>10}",
        "strategy", "model", "success", "avg s", "avg tokens"
    );
    for summary in &outcome.report.combinations {
        println!(
            "  {:<12} {:<20} {:>7.0}% {:>10.2} {:>10.1}",
            summary.strategy.to_string(),
            summary.model_name,
            summary.success_rate * 100.0,
            summary.average_execution_time,
            summary.average_token_count
        );
    }
    println!();
    println!("  raw results: {}", outcome.raw_path.display());
    println!("  report:      {}", outcome.report_path.display());

    Ok(())
}

/// Handles `promptbench check`.
fn check_setup(args: CheckArgs) -> anyhow::Result<()> {
    let config = BenchmarkConfig::from_path(&args.config)?;
    info!(models = ?config.model_names(), "Configuration is valid");

    let prompts = PromptLibrary::from_path(&config.prompts_path)?;
    let strategies: Vec<PromptStrategy> = prompts.strategies();
    println!(
        "prompts: {} templates across {} strategies",
        prompts.len(),
        strategies.len()
    );
    for strategy in strategies {
        let names: Vec<&str> = prompts
            .templates_for(strategy)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        println!("  {}: {}", strategy, names.join(", "));
    }

    println!("models: {}", config.model_names().join(", "));

    if let Some(set_name) = args.set {
        let path = config.problem_sets_dir.join(format!("{}.json", set_name));
        let set = ProblemSet::from_path(&path)?;
        println!("problem set '{}': {} problems", set_name, set.len());
    }

    Ok(())
}
