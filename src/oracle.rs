// src/oracle.rs

//! Completion oracle: the single source of truth for "this job is done".
//!
//! The production oracle checks for `<script>.complete` on disk. Because the
//! marker outlives the process, a rerun against the same work directory
//! skips everything that already finished.

use std::fmt::Debug;

use crate::dag::JobKey;
use crate::fs::{FileSystem, RealFileSystem};
use crate::layout::JobLayout;

/// Answers whether a job's durable completion marker exists.
///
/// Implementations must be side-effect free; the scheduler calls this
/// repeatedly and in any order.
pub trait CompletionOracle: Send + Sync + Debug {
    fn is_complete(&self, key: &JobKey) -> bool;
}

/// Marker-file oracle backed by a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct MarkerOracle<F: FileSystem = RealFileSystem> {
    fs: F,
    layout: JobLayout,
}

impl<F: FileSystem> MarkerOracle<F> {
    pub fn new(fs: F, layout: JobLayout) -> Self {
        Self { fs, layout }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }
}

impl<F: FileSystem> CompletionOracle for MarkerOracle<F> {
    fn is_complete(&self, key: &JobKey) -> bool {
        self.fs.exists(&self.layout.marker_path(key))
    }
}
