// src/engine/runtime.rs

use std::fmt;

use tokio::time::sleep;
use tracing::{debug, error, info, warn, Instrument};

use crate::dag::{JobGraph, JobKey, Scheduler};
use crate::errors::{BatchdagError, Result};
use crate::oracle::CompletionOracle;
use crate::queue::{QueueBackend, SubmitRequest};

use super::context::RunContext;
use super::throttle::wait_for_slot;
use super::{RoundProgress, RunSummary};

/// What happened to one frontier job during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobProgress {
    /// `seeded` is set when the marker predated the run.
    Completed { newly_ready: usize, seeded: bool },
    Submitted,
    Pending,
}

/// Drives a [`Scheduler`] to completion against a queue.
///
/// Each round walks a snapshot of the frontier. For every job the marker is
/// checked first (cheap, local); only then is the queue consulted
/// (expensive, shared):
///
/// - marker present → complete; children whose parents are all complete
///   join the frontier
/// - not yet submitted → wait for a slot under the ceiling, submit
/// - submitted and still listed → keep waiting
/// - submitted, no longer listed, no marker → wait the confirmation delay,
///   check the marker once more, otherwise fail the run
///
/// A round that readies no new job is followed by `poll_interval` of sleep.
/// Any fatal error cancels every in-flight job before it is returned.
pub struct Runtime<Q: QueueBackend, O: CompletionOracle> {
    ctx: RunContext,
    scheduler: Scheduler,
    queue: Q,
    oracle: O,
}

impl<Q: QueueBackend, O: CompletionOracle> fmt::Debug for Runtime<Q, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("ctx", &self.ctx)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<Q: QueueBackend, O: CompletionOracle> Runtime<Q, O> {
    /// Take ownership of the graph and seed it from the oracle.
    pub fn new(ctx: RunContext, graph: JobGraph, queue: Q, oracle: O) -> Self {
        let scheduler = Scheduler::new(graph, &oracle);
        Self {
            ctx,
            scheduler,
            queue,
            oracle,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run until every job is complete or the run aborts.
    pub async fn run(mut self) -> Result<RunSummary> {
        let span = self.ctx.span().clone();
        self.drive().instrument(span).await
    }

    async fn drive(&mut self) -> Result<RunSummary> {
        info!(
            jobs = self.scheduler.graph().len(),
            roots = self.scheduler.frontier().len(),
            already_complete = self.scheduler.seeded_complete(),
            "starting run"
        );

        let mut rounds: u64 = 0;
        let mut completed = 0usize;

        while !self.scheduler.is_idle() {
            rounds += 1;

            let progress = match self.run_round().await {
                Ok(progress) => progress,
                Err(err) => {
                    self.abort(&err).await;
                    return Err(err);
                }
            };

            completed += progress.completed;

            debug!(
                round = rounds,
                completed = progress.completed,
                submitted = progress.submitted,
                newly_ready = progress.newly_ready,
                tracked = self.scheduler.frontier().len(),
                "round finished"
            );

            if self.scheduler.is_idle() {
                break;
            }

            if progress.newly_ready == 0 {
                sleep(self.ctx.settings().poll_interval).await;
            }
        }

        if !self.scheduler.all_complete() {
            let incomplete = self.scheduler.incomplete_count();
            error!(incomplete, "frontier drained with incomplete jobs");
            return Err(BatchdagError::Stalled(incomplete));
        }

        let summary = RunSummary {
            total_jobs: self.scheduler.graph().len(),
            already_complete: self.scheduler.seeded_complete(),
            submitted: self.scheduler.submitted_count(),
            completed,
            rounds,
        };
        info!(
            jobs = summary.total_jobs,
            submitted = summary.submitted,
            completed = summary.completed,
            already_complete = summary.already_complete,
            "all jobs finished"
        );
        Ok(summary)
    }

    async fn run_round(&mut self) -> Result<RoundProgress> {
        let mut progress = RoundProgress::default();

        for key in self.scheduler.frontier().snapshot() {
            match self.advance(&key).await? {
                JobProgress::Completed { newly_ready, seeded } => {
                    if !seeded {
                        progress.completed += 1;
                    }
                    progress.newly_ready += newly_ready;
                }
                JobProgress::Submitted => progress.submitted += 1,
                JobProgress::Pending => {}
            }
        }

        Ok(progress)
    }

    async fn advance(&mut self, key: &JobKey) -> Result<JobProgress> {
        if self.oracle.is_complete(key) {
            return Ok(self.complete(key));
        }

        let handle = match self.scheduler.handle_of(key) {
            Some(handle) => handle.clone(),
            None => {
                if !self.scheduler.parents_complete(key) {
                    debug!(job = %key, "tracked job still has incomplete parents");
                    return Ok(JobProgress::Pending);
                }
                self.submit(key).await?;
                return Ok(JobProgress::Submitted);
            }
        };

        match self.queue.is_alive(&handle).await {
            Ok(true) => Ok(JobProgress::Pending),
            Ok(false) => self.confirm_failure(key).await,
            Err(e) => {
                warn!(
                    job = %key,
                    %handle,
                    error = %e,
                    "status query failed; retrying next round"
                );
                Ok(JobProgress::Pending)
            }
        }
    }

    fn complete(&mut self, key: &JobKey) -> JobProgress {
        let seeded = self
            .scheduler
            .graph()
            .get(key)
            .is_some_and(|job| job.is_complete());
        let ready = self.scheduler.mark_complete(key);
        if seeded {
            debug!(job = %key, newly_ready = ready.len(), "job was complete before the run");
        } else {
            info!(job = %key, newly_ready = ready.len(), "job finished");
        }
        JobProgress::Completed {
            newly_ready: ready.len(),
            seeded,
        }
    }

    async fn submit(&mut self, key: &JobKey) -> Result<()> {
        let settings = *self.ctx.settings();
        let depth = wait_for_slot(
            &mut self.queue,
            key,
            settings.max_queued_jobs,
            settings.throttle_interval,
        )
        .await?;

        let job = self.scheduler.graph().get(key).ok_or_else(|| {
            BatchdagError::SubmissionError {
                job: key.to_string(),
                reason: "job is not part of the graph".to_string(),
            }
        })?;
        let request = SubmitRequest::for_job(job, self.ctx.layout());

        let handle = self.queue.submit(request).await.map_err(|e| {
            error!(job = %key, error = %e, "submission failed");
            BatchdagError::SubmissionError {
                job: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        info!(job = %key, %handle, depth, "job submitted");
        self.scheduler.record_submission(key, handle)
    }

    /// The queue no longer lists the job and no marker was seen. Deregistration
    /// can race with marker creation, so wait and look once more.
    async fn confirm_failure(&mut self, key: &JobKey) -> Result<JobProgress> {
        let delay = self.ctx.settings().failure_confirm_delay;
        warn!(
            job = %key,
            delay = ?delay,
            "job left the queue without a completion marker; re-checking"
        );
        sleep(delay).await;

        if self.oracle.is_complete(key) {
            debug!(job = %key, "marker appeared during confirmation delay");
            return Ok(self.complete(key));
        }

        error!(job = %key, "job failed");
        self.scheduler.mark_failed(key);
        Err(BatchdagError::JobFailure {
            job: key.to_string(),
        })
    }

    /// Cancel every submitted, not-yet-complete job the scheduler tracks,
    /// except the one that failed.
    async fn abort(&mut self, err: &BatchdagError) {
        let failed = self.scheduler.failed_job().cloned();
        let mut cancelled = 0usize;

        for (key, handle) in self.scheduler.in_flight() {
            if failed.as_ref() == Some(&key) || self.oracle.is_complete(&key) {
                continue;
            }
            match self.queue.cancel(&handle).await {
                Ok(()) => {
                    cancelled += 1;
                    info!(job = %key, %handle, "cancelled in-flight job");
                }
                Err(e) => {
                    warn!(job = %key, %handle, error = %e, "failed to cancel job");
                }
            }
        }

        error!(error = %err, cancelled, "run aborted");
    }
}
