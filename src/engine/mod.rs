// src/engine/mod.rs

//! Orchestration engine for batchdag.
//!
//! The synchronous state machine lives in [`crate::dag::Scheduler`]; this
//! module is the async shell around it:
//! - [`context`] holds everything scoped to one run (layout, timing, span)
//! - [`throttle`] gates submissions on the queue depth ceiling
//! - [`runtime`] is the polling loop that submits, monitors and aborts

pub mod context;
pub mod runtime;
pub mod throttle;

pub use context::RunContext;
pub use runtime::Runtime;
pub use throttle::wait_for_slot;

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_jobs: usize,
    /// Jobs whose marker already existed when the run started.
    pub already_complete: usize,
    /// Jobs submitted to the queue during this run.
    pub submitted: usize,
    /// Jobs observed finishing during this run, not counting those in
    /// `already_complete`.
    pub completed: usize,
    /// Scheduling rounds the loop went through.
    pub rounds: u64,
}

/// Progress made by one pass over the frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundProgress {
    pub completed: usize,
    pub submitted: usize,
    /// Children that entered the frontier; zero means the loop sleeps.
    pub newly_ready: usize,
}
