//! Command-line interface for promptbench.
//!
//! Provides commands for running benchmarks and validating setup.

mod commands;

pub use commands::{parse_cli, run_with_cli, CheckArgs, Cli, Commands, RunArgs};
