// src/queue/backend.rs

//! Pluggable queue backend abstraction.
//!
//! The runtime talks to a `QueueBackend` instead of shelling out directly.
//! Production uses [`super::SgeQueue`]; [`super::LocalQueue`] runs scripts
//! on this machine; tests provide scripted fakes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::dag::{Job, JobKey, QueueHandle};
use crate::errors::Result;
use crate::layout::JobLayout;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything a backend needs to submit one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub key: JobKey,
    pub script: PathBuf,
    /// Working directory for the job (the script's directory).
    pub work_dir: PathBuf,
    /// Opaque resource request, forwarded verbatim.
    pub resources: String,
}

impl SubmitRequest {
    pub fn for_job(job: &Job, layout: &JobLayout) -> Self {
        Self {
            key: job.key.clone(),
            script: layout.script_path(&job.key),
            work_dir: layout.script_dir(&job.key),
            resources: job.resources.clone(),
        }
    }
}

/// Narrow interface to the external batch queue.
///
/// Errors mean the query or command itself failed; how fatal that is
/// depends on the call (see `engine::Runtime`).
pub trait QueueBackend: Send {
    /// Number of this user's jobs currently queued or running.
    fn depth(&mut self) -> BoxFuture<'_, Result<usize>>;

    /// Submit a job script; returns the handle used for later queries.
    fn submit(&mut self, request: SubmitRequest) -> BoxFuture<'_, Result<QueueHandle>>;

    /// Whether the queue still lists `handle` as queued or running.
    fn is_alive<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<bool>>;

    /// Best-effort cancellation.
    fn cancel<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<()>>;
}
