// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::{QueueBackendKind, RunMode};

/// Command-line arguments for `batchdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "batchdag",
    version,
    about = "Generate per-sample job scripts and drive them through a batch queue in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Step table (TSV with Name, Type, Parents, Resources columns).
    ///
    /// Default: `<pipeline-root>/etc/allsteps.tsv`.
    #[arg(long, value_name = "PATH")]
    pub step: Option<PathBuf>,

    /// Directory receiving job scripts, completion markers and the run log.
    #[arg(long, value_name = "PATH")]
    pub work_dir: PathBuf,

    /// Sample table (TSV with a `sampleID` column).
    #[arg(long, value_name = "PATH")]
    pub info: PathBuf,

    /// Root of the pipeline installation (holds `script/` and `etc/`).
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub pipeline_root: PathBuf,

    /// Optional settings file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write job scripts and exit without submitting anything.
    #[arg(long, conflicts_with = "submit_only")]
    pub create_only: bool,

    /// Submit previously written scripts without regenerating them.
    #[arg(long)]
    pub submit_only: bool,

    /// Override the queue backend from the settings file.
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub queue: Option<QueueBackendKind>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BATCHDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate tables, print the job graph, touch nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn mode(&self) -> RunMode {
        if self.create_only {
            RunMode::CreateOnly
        } else if self.submit_only {
            RunMode::SubmitOnly
        } else {
            RunMode::CreateAndSubmit
        }
    }

    pub fn step_table_path(&self) -> PathBuf {
        self.step
            .clone()
            .unwrap_or_else(|| self.pipeline_root.join("etc").join("allsteps.tsv"))
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
