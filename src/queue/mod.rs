// src/queue/mod.rs

//! Queue adapters.
//!
//! - [`backend`] defines the [`QueueBackend`] trait the runtime consumes.
//! - [`sge`] talks to a Sun-Grid-Engine style cluster via shell commands.
//! - [`local`] runs job scripts in a local process pool.
//! - [`shell`] runs a command line and captures its output.

pub mod backend;
pub mod local;
pub mod sge;
pub mod shell;

pub use backend::{BoxFuture, QueueBackend, SubmitRequest};
pub use local::LocalQueue;
pub use sge::SgeQueue;
