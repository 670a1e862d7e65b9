// src/queue/local.rs

//! Local process pool standing in for the cluster queue.
//!
//! Every submission becomes a Tokio task that waits for one of `slots`
//! permits and then runs the job script with the configured interpreter.
//! A job is "alive" (queued or running) until that task finishes, which
//! happens after the script exited, so a script-written completion marker
//! is always visible before the job leaves the queue.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tokio::process::Command;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, info, warn};

use crate::dag::QueueHandle;
use crate::errors::{BatchdagError, Result};
use crate::queue::backend::{BoxFuture, QueueBackend, SubmitRequest};

/// Internal handle for a submitted job.
///
/// - `cancel` asks the job task to kill its process (or to never start it).
/// - `handle` is the Tokio task that owns the process.
struct ActiveJob {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ActiveJob {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

pub struct LocalQueue {
    interpreter: String,
    slots: Arc<Semaphore>,
    next_id: u64,
    jobs: HashMap<String, ActiveJob>,
}

impl std::fmt::Debug for LocalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalQueue")
            .field("interpreter", &self.interpreter)
            .field("available_slots", &self.slots.available_permits())
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

impl LocalQueue {
    pub fn new(interpreter: impl Into<String>, slots: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            slots: Arc::new(Semaphore::new(slots.max(1))),
            next_id: 0,
            jobs: HashMap::new(),
        }
    }
}

impl QueueBackend for LocalQueue {
    fn depth(&mut self) -> BoxFuture<'_, Result<usize>> {
        self.jobs.retain(|_, job| job.is_alive());
        let depth = self.jobs.len();
        Box::pin(async move { Ok(depth) })
    }

    fn submit(&mut self, request: SubmitRequest) -> BoxFuture<'_, Result<QueueHandle>> {
        Box::pin(async move {
            self.next_id += 1;
            let id = self.next_id.to_string();

            let stdout = open_log(&request.script, "o", &id)?;
            let stderr = open_log(&request.script, "e", &id)?;

            let mut cmd = Command::new(&self.interpreter);
            cmd.arg(&request.script)
                .current_dir(&request.work_dir)
                .stdin(Stdio::null())
                .stdout(stdout)
                .stderr(stderr)
                .kill_on_drop(true);

            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            let slots = Arc::clone(&self.slots);
            let job_id = id.clone();
            let key = request.key.clone();

            let handle = tokio::spawn(async move {
                run_local_job(cmd, slots, cancel_rx, &job_id).await;
                debug!(job = %key, handle = %job_id, "local job finished");
            });

            self.jobs.insert(
                id.clone(),
                ActiveJob {
                    cancel: Some(cancel_tx),
                    handle,
                },
            );

            info!(job = %request.key, handle = %id, "local job queued");
            Ok(QueueHandle::new(id))
        })
    }

    /// A finished job is forgotten once reported; unknown handles are gone.
    fn is_alive<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<bool>> {
        let alive = self
            .jobs
            .get(handle.as_str())
            .is_some_and(|job| job.is_alive());
        if !alive {
            self.jobs.remove(handle.as_str());
        }
        Box::pin(async move { Ok(alive) })
    }

    fn cancel<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let job = self.jobs.get_mut(handle.as_str()).ok_or_else(|| {
                BatchdagError::QueueCommand(format!("unknown local job {handle}"))
            })?;

            match job.cancel.take() {
                Some(cancel) => {
                    if cancel.send(()).is_err() {
                        debug!(%handle, "local job already finished while cancelling");
                    }
                    Ok(())
                }
                None => Err(BatchdagError::QueueCommand(format!(
                    "local job {handle} was already cancelled"
                ))),
            }
        })
    }
}

/// `<script>.o<id>` / `<script>.e<id>` next to the script, like SGE's defaults.
fn open_log(script: &Path, stream: &str, id: &str) -> Result<File> {
    let name = script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string());
    let path = script.with_file_name(format!("{name}.{stream}{id}"));
    let file = File::create(&path).with_context(|| format!("creating job log {:?}", path))?;
    Ok(file)
}

async fn run_local_job(
    mut cmd: Command,
    slots: Arc<Semaphore>,
    mut cancel_rx: oneshot::Receiver<()>,
    job_id: &str,
) {
    // Wait for a slot; a cancellation while queued means the job never runs.
    let _permit = tokio::select! {
        permit = slots.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                warn!(handle = %job_id, "local job pool closed before job started");
                return;
            }
        },
        _ = &mut cancel_rx => {
            info!(handle = %job_id, "local job cancelled before it started");
            return;
        }
    };

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(handle = %job_id, error = %e, "failed to start local job");
            return;
        }
    };

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => {
                debug!(handle = %job_id, exit_code = status.code(), "local job exited");
            }
            Err(e) => {
                warn!(handle = %job_id, error = %e, "waiting for local job failed");
            }
        },
        cancel = &mut cancel_rx => {
            if cancel.is_ok() {
                info!(handle = %job_id, "cancellation requested; killing local job");
                if let Err(e) = child.kill().await {
                    warn!(handle = %job_id, error = %e, "failed to kill local job");
                }
            } else {
                // Sender dropped without cancelling; keep waiting for the process.
                let _ = child.wait().await;
            }
        }
    }
}
