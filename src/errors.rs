// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("step '{step}' declares unknown parent step '{parent}'")]
    UnknownParentStep { step: String, parent: String },

    #[error("Cyclic dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Queue depth query before submitting job '{job}' failed: {reason}")]
    QueueQueryError { job: String, reason: String },

    #[error("Submission of job '{job}' failed: {reason}")]
    SubmissionError { job: String, reason: String },

    #[error("Job '{job}' failed: it left the queue without a completion marker")]
    JobFailure { job: String },

    #[error("Run stalled: {0} incomplete job(s) can never become ready")]
    Stalled(usize),

    #[error("Queue command failed: {0}")]
    QueueCommand(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BatchdagError>;
