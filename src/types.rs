use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a pipeline step fans out over the sample table.
///
/// - `Single`: one job per sample.
/// - `Batch`: exactly one job for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Single,
    Batch,
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(StepType::Single),
            "batch" => Ok(StepType::Batch),
            other => Err(format!(
                "invalid step type: {other} (expected \"single\" or \"batch\")"
            )),
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepType::Single => f.write_str("single"),
            StepType::Batch => f.write_str("batch"),
        }
    }
}

/// Which queue implementation drives submitted jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackendKind {
    /// Sun-Grid-Engine style `qsub` / `qstat` / `qdel`.
    Sge,
    /// Local process pool, useful without a cluster.
    Local,
}

impl Default for QueueBackendKind {
    fn default() -> Self {
        QueueBackendKind::Sge
    }
}

/// What a single invocation of the tool does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Write job scripts, then drive the job graph to completion.
    CreateAndSubmit,
    /// Write job scripts and exit.
    CreateOnly,
    /// Assume scripts exist and only drive the job graph.
    SubmitOnly,
}

impl RunMode {
    pub fn creates_scripts(self) -> bool {
        !matches!(self, RunMode::SubmitOnly)
    }

    pub fn submits_jobs(self) -> bool {
        !matches!(self, RunMode::CreateOnly)
    }
}
