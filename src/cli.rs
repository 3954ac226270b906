// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{ExecutionPolicy, Operation};

/// Command-line arguments for `pmdispatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pmdispatch",
    version,
    about = "Run package-manager operations in their own terminals and collect the results.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job catalogue (TOML).
    #[arg(long, value_name = "PATH", default_value = "Pmdispatch.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PMDISPATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Dispatch jobs and report their outcomes.
    Run(RunArgs),
    /// Show surfaces recorded by the last session and their status.
    List,
    /// Close every recorded surface and clear the registry.
    Close,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Operation to run for each job.
    #[arg(long, value_name = "OP", default_value = "upgrade")]
    pub operation: Operation,

    /// Only run these jobs, in this order (repeatable).
    #[arg(long = "only", value_name = "ID")]
    pub only: Vec<String>,

    /// Spawn unprivileged jobs all at once.
    #[arg(long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Run unprivileged jobs one after another.
    #[arg(long)]
    pub sequential: bool,

    /// Close a job's surface shortly after it succeeds.
    #[arg(long)]
    pub auto_close: bool,

    /// Run jobs as plain child processes instead of opening surfaces.
    #[arg(long)]
    pub headless: bool,

    /// Don't offer to close surfaces at the end of the run.
    #[arg(long)]
    pub no_close_prompt: bool,

    /// Validate the catalogue and print the execution plan without running.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Policy requested on the command line, if any.
    pub fn policy(&self) -> Option<ExecutionPolicy> {
        if self.parallel {
            Some(ExecutionPolicy::Parallel)
        } else if self.sequential {
            Some(ExecutionPolicy::Sequential)
        } else {
            None
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
