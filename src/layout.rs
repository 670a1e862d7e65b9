// src/layout.rs

//! Mapping from job keys to on-disk locations inside the work directory.
//!
//! ```text
//! <work_dir>/<sample>/shell/<step>.sh           single-type job script
//! <work_dir>/shell/<step>.sh                    batch job script
//! <script>.complete                             completion marker
//! ```

use std::path::{Path, PathBuf};

use crate::dag::JobKey;

/// Directory name holding job scripts, per sample and for the whole run.
pub const SCRIPT_DIR: &str = "shell";

/// Suffix appended to a job script path to form its completion marker.
pub const MARKER_SUFFIX: &str = ".complete";

/// Name under which the sample table is copied into the work directory.
pub const SAMPLE_LIST_NAME: &str = "input.list";

/// Name of the run log inside the work directory.
pub const LOG_FILE_NAME: &str = "auto.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    work_dir: PathBuf,
}

impl JobLayout {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Directory holding the job's script; also its working directory on the queue.
    pub fn script_dir(&self, key: &JobKey) -> PathBuf {
        match key.sample() {
            Some(sample) => self.work_dir.join(sample).join(SCRIPT_DIR),
            None => self.work_dir.join(SCRIPT_DIR),
        }
    }

    pub fn script_path(&self, key: &JobKey) -> PathBuf {
        self.script_dir(key).join(format!("{}.sh", key.step()))
    }

    pub fn marker_path(&self, key: &JobKey) -> PathBuf {
        self.script_dir(key)
            .join(format!("{}.sh{}", key.step(), MARKER_SUFFIX))
    }

    pub fn sample_list_path(&self) -> PathBuf {
        self.work_dir.join(SAMPLE_LIST_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(LOG_FILE_NAME)
    }
}
