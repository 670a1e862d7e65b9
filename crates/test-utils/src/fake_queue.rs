use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use batchdag::dag::{JobKey, QueueHandle};
use batchdag::errors::{BatchdagError, Result};
use batchdag::queue::{BoxFuture, QueueBackend, SubmitRequest};
use indexmap::IndexMap;

use crate::memory_oracle::MemoryOracle;

/// How a fake job behaves once submitted.
///
/// Time is measured in queue calls: every `depth`, `submit` and `is_alive`
/// advances the fake clock by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Writes its marker and leaves the queue `n` ticks after submission.
    FinishAfter(u64),
    /// Stays queued until cancelled.
    Hold,
    /// Leaves the queue one tick after submission without a marker.
    Vanish,
    /// Leaves the queue one tick after submission; the marker only shows up
    /// once the runtime has noticed the job is gone.
    Race,
}

/// Something the runtime asked the queue to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Submitted(JobKey),
    Cancelled(JobKey),
}

#[derive(Debug)]
struct FakeJob {
    key: JobKey,
    behaviour: Behaviour,
    submitted_at: u64,
    listed: bool,
}

#[derive(Debug)]
struct State {
    clock: u64,
    next_id: u64,
    jobs: IndexMap<String, FakeJob>,
    default_behaviour: Behaviour,
    overrides: HashMap<JobKey, Behaviour>,
    events: Vec<QueueEvent>,
    listed_at_submit: Vec<usize>,
    marked_at_submit: Vec<usize>,
    fail_depth: bool,
    fail_submit: HashSet<JobKey>,
    is_alive_failures: u32,
}

/// Scripted in-memory queue.
///
/// Clones share state: hand one to the runtime and inspect another.
#[derive(Debug, Clone)]
pub struct FakeQueue {
    state: Arc<Mutex<State>>,
    oracle: MemoryOracle,
}

impl FakeQueue {
    /// Jobs default to `FinishAfter(2)`.
    pub fn new(oracle: MemoryOracle) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                clock: 0,
                next_id: 1000,
                jobs: IndexMap::new(),
                default_behaviour: Behaviour::FinishAfter(2),
                overrides: HashMap::new(),
                events: Vec::new(),
                listed_at_submit: Vec::new(),
                marked_at_submit: Vec::new(),
                fail_depth: false,
                fail_submit: HashSet::new(),
                is_alive_failures: 0,
            })),
            oracle,
        }
    }

    pub fn with_default(self, behaviour: Behaviour) -> Self {
        self.state.lock().unwrap().default_behaviour = behaviour;
        self
    }

    pub fn with_behaviour(self, key: JobKey, behaviour: Behaviour) -> Self {
        self.state.lock().unwrap().overrides.insert(key, behaviour);
        self
    }

    pub fn fail_depth_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_depth = fail;
    }

    pub fn fail_submission_of(self, key: JobKey) -> Self {
        self.state.lock().unwrap().fail_submit.insert(key);
        self
    }

    /// The next `n` status queries return an error.
    pub fn fail_status_queries(self, n: u32) -> Self {
        self.state.lock().unwrap().is_alive_failures = n;
        self
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn submitted(&self) -> Vec<JobKey> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                QueueEvent::Submitted(key) => Some(key),
                QueueEvent::Cancelled(_) => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<JobKey> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                QueueEvent::Cancelled(key) => Some(key),
                QueueEvent::Submitted(_) => None,
            })
            .collect()
    }

    /// How many jobs were listed right before each submission.
    pub fn listed_at_submit(&self) -> Vec<usize> {
        self.state.lock().unwrap().listed_at_submit.clone()
    }

    /// How many markers existed right before each submission.
    pub fn marked_at_submit(&self) -> Vec<usize> {
        self.state.lock().unwrap().marked_at_submit.clone()
    }

    fn tick(&self, state: &mut State) {
        state.clock += 1;
        let now = state.clock;
        for job in state.jobs.values_mut().filter(|j| j.listed) {
            match job.behaviour {
                Behaviour::FinishAfter(n) if now >= job.submitted_at + n => {
                    self.oracle.mark(job.key.clone());
                    job.listed = false;
                }
                Behaviour::Vanish | Behaviour::Race if now > job.submitted_at => {
                    job.listed = false;
                }
                _ => {}
            }
        }
    }
}

fn listed(state: &State) -> usize {
    state.jobs.values().filter(|j| j.listed).count()
}

impl QueueBackend for FakeQueue {
    fn depth(&mut self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            self.tick(&mut state);
            if state.fail_depth {
                return Err(BatchdagError::QueueCommand("qstat: connection refused".into()));
            }
            Ok(listed(&state))
        })
    }

    fn submit(&mut self, request: SubmitRequest) -> BoxFuture<'_, Result<QueueHandle>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            self.tick(&mut state);
            if state.fail_submit.contains(&request.key) {
                return Err(BatchdagError::QueueCommand("qsub: rejected".into()));
            }

            let count = listed(&state);
            state.listed_at_submit.push(count);
            state.marked_at_submit.push(self.oracle.count());

            let behaviour = state
                .overrides
                .get(&request.key)
                .copied()
                .unwrap_or(state.default_behaviour);
            if behaviour == Behaviour::FinishAfter(0) {
                self.oracle.mark(request.key.clone());
            }

            let id = state.next_id.to_string();
            state.next_id += 1;
            let submitted_at = state.clock;
            state.events.push(QueueEvent::Submitted(request.key.clone()));
            state.jobs.insert(
                id.clone(),
                FakeJob {
                    key: request.key,
                    behaviour,
                    submitted_at,
                    listed: behaviour != Behaviour::FinishAfter(0),
                },
            );
            Ok(QueueHandle::new(id))
        })
    }

    fn is_alive<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            self.tick(&mut state);
            if state.is_alive_failures > 0 {
                state.is_alive_failures -= 1;
                return Err(BatchdagError::QueueCommand("qstat: timed out".into()));
            }

            let job = state
                .jobs
                .get(handle.as_str())
                .ok_or_else(|| BatchdagError::QueueCommand(format!("unknown job {handle}")))?;
            if !job.listed && job.behaviour == Behaviour::Race {
                self.oracle.mark(job.key.clone());
            }
            Ok(job.listed)
        })
    }

    fn cancel<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(handle.as_str())
                .ok_or_else(|| BatchdagError::QueueCommand(format!("unknown job {handle}")))?;
            job.listed = false;
            let key = job.key.clone();
            state.events.push(QueueEvent::Cancelled(key));
            Ok(())
        })
    }
}
