// src/dag/mod.rs

//! Job graph and scheduling state.
//!
//! - [`key`] defines [`JobKey`], the identity of every job.
//! - [`job`] holds graph nodes and their derived [`JobState`].
//! - [`graph`] expands the step and sample tables into a [`JobGraph`].
//! - [`frontier`] is the ordered set of jobs actively tracked in a run.
//! - [`scheduler`] contains the synchronous per-run state machine.

pub mod frontier;
pub mod graph;
pub mod job;
pub mod key;
pub mod scheduler;

pub use frontier::Frontier;
pub use graph::JobGraph;
pub use job::{Job, JobState, JobStatus, QueueHandle};
pub use key::JobKey;
pub use scheduler::Scheduler;
