use tracing::{debug, warn};

use crate::dag::frontier::Frontier;
use crate::dag::graph::JobGraph;
use crate::dag::job::{JobState, JobStatus, QueueHandle};
use crate::dag::JobKey;
use crate::errors::{BatchdagError, Result};
use crate::oracle::CompletionOracle;

/// Scheduler owns the job graph for one run plus the frontier.
///
/// It is responsible for:
/// - seeding already-complete jobs from the completion oracle
/// - deciding when a job is ready (all parents complete)
/// - recording submissions, completions and the failure that aborts a run
/// - moving newly-ready children into the frontier
///
/// It performs no IO; `engine::Runtime` drives it against a queue.
#[derive(Debug)]
pub struct Scheduler {
    graph: JobGraph,
    frontier: Frontier,
    failed: Option<JobKey>,
    seeded_complete: usize,
}

impl Scheduler {
    /// Take ownership of `graph`, mark every job whose marker already exists
    /// as complete and seed the frontier with the graph's roots.
    pub fn new<O: CompletionOracle + ?Sized>(mut graph: JobGraph, oracle: &O) -> Self {
        let mut seeded_complete = 0;
        for job in graph.jobs_mut() {
            if oracle.is_complete(&job.key) {
                job.status = JobStatus::Complete;
                seeded_complete += 1;
                debug!(job = %job.key, "marker present at start; job already complete");
            }
        }

        let frontier = graph.roots().into_iter().collect();

        Self {
            graph,
            frontier,
            failed: None,
            seeded_complete,
        }
    }

    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Number of jobs that were already complete when the run started.
    pub fn seeded_complete(&self) -> usize {
        self.seeded_complete
    }

    pub fn failed_job(&self) -> Option<&JobKey> {
        self.failed.as_ref()
    }

    /// Scheduling state of `key`, or `None` for unknown keys.
    pub fn state_of(&self, key: &JobKey) -> Option<JobState> {
        let job = self.graph.get(key)?;
        let state = if job.is_complete() {
            JobState::Complete
        } else if self.failed.as_ref() == Some(key) {
            JobState::Failed
        } else if job.is_submitted() {
            JobState::Submitted
        } else if self.parents_complete(key) {
            JobState::Ready
        } else {
            JobState::Waiting
        };
        Some(state)
    }

    /// Whether every parent of `key` is complete. True for roots.
    pub fn parents_complete(&self, key: &JobKey) -> bool {
        self.graph
            .parents_of(key)
            .into_iter()
            .all(|parent| self.graph.get(parent).is_some_and(|p| p.is_complete()))
    }

    /// Handle of a submitted job.
    pub fn handle_of(&self, key: &JobKey) -> Option<&QueueHandle> {
        self.graph.get(key).and_then(|job| job.handle.as_ref())
    }

    /// Mark `key` complete, retire it from the frontier and enqueue every
    /// child whose parents are now all complete.
    ///
    /// Returns the children that entered the frontier.
    pub fn mark_complete(&mut self, key: &JobKey) -> Vec<JobKey> {
        match self.graph.get_mut(key) {
            Some(job) => job.status = JobStatus::Complete,
            None => {
                warn!(job = %key, "completion for unknown job; ignoring");
                return Vec::new();
            }
        }
        self.frontier.retire(key);

        let children: Vec<JobKey> = self.graph.children_of(key).into_iter().cloned().collect();
        let mut newly_ready = Vec::new();
        for child in children {
            if self.parents_complete(&child) && self.frontier.enqueue(child.clone()) {
                debug!(job = %child, parent = %key, "all parents complete; job ready");
                newly_ready.push(child);
            }
        }
        newly_ready
    }

    /// Record the queue handle of a freshly submitted job.
    ///
    /// A job is submitted at most once per run; a second handle is rejected.
    pub fn record_submission(&mut self, key: &JobKey, handle: QueueHandle) -> Result<()> {
        let job = self.graph.get_mut(key).ok_or_else(|| {
            BatchdagError::SubmissionError {
                job: key.to_string(),
                reason: "job is not part of the graph".to_string(),
            }
        })?;

        if let Some(existing) = &job.handle {
            return Err(BatchdagError::SubmissionError {
                job: key.to_string(),
                reason: format!("already submitted as {existing}"),
            });
        }

        job.handle = Some(handle);
        Ok(())
    }

    pub fn mark_failed(&mut self, key: &JobKey) {
        warn!(job = %key, "job marked failed; run will abort");
        self.failed = Some(key.clone());
    }

    /// Frontier jobs that were submitted and are not complete, with handles.
    pub fn in_flight(&self) -> Vec<(JobKey, QueueHandle)> {
        self.frontier
            .iter()
            .filter_map(|key| {
                let job = self.graph.get(key)?;
                if job.is_complete() {
                    return None;
                }
                job.handle.clone().map(|handle| (key.clone(), handle))
            })
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.frontier.is_empty()
    }

    pub fn all_complete(&self) -> bool {
        self.graph.jobs().all(|job| job.is_complete())
    }

    pub fn incomplete_count(&self) -> usize {
        self.graph.jobs().filter(|job| !job.is_complete()).count()
    }

    /// Number of jobs submitted in this run.
    pub fn submitted_count(&self) -> usize {
        self.graph.jobs().filter(|job| job.is_submitted()).count()
    }
}
