// src/dag/job.rs

//! Job nodes and their per-run states.

use std::fmt;

use indexmap::IndexSet;

use crate::dag::JobKey;
use crate::types::StepType;

/// Opaque identifier the queue returned for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueHandle(String);

impl QueueHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored completion status. Only ever moves from `Incomplete` to `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Incomplete,
    Complete,
}

/// Scheduling state of a job, derived from its status, handle and parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Some parent is not complete yet.
    Waiting,
    /// All parents are complete; not submitted yet.
    Ready,
    /// Submitted to the queue in this run.
    Submitted,
    /// A completion marker was observed.
    Complete,
    /// Left the queue without a marker; the run aborts.
    Failed,
}

/// A node of the job graph.
#[derive(Debug, Clone)]
pub struct Job {
    pub key: JobKey,
    pub step_type: StepType,
    pub status: JobStatus,
    /// Set exactly once, when the job is submitted in this run.
    pub handle: Option<QueueHandle>,
    pub parents: IndexSet<JobKey>,
    pub children: IndexSet<JobKey>,
    /// Copied from the step definition; forwarded verbatim on submission.
    pub resources: String,
}

impl Job {
    pub fn new(key: JobKey, step_type: StepType, resources: impl Into<String>) -> Self {
        Self {
            key,
            step_type,
            status: JobStatus::Incomplete,
            handle: None,
            parents: IndexSet::new(),
            children: IndexSet::new(),
            resources: resources.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_submitted(&self) -> bool {
        self.handle.is_some()
    }
}
