// src/config/model.rs

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::types::{QueueBackendKind, StepType};

/// One row of the step table.
///
/// ```text
/// Name    Type    Parents       Resources
/// align   single  None          -l vf=4G,p=4
/// merge   batch   align         -l vf=8G,p=1
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
    pub name: String,
    pub step_type: StepType,
    /// Declared parent step names, in declaration order, without duplicates.
    /// Empty for root steps.
    pub parents: Vec<String>,
    /// Opaque resource request, forwarded verbatim to the queue.
    pub resources: String,
}

impl StepDef {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// One row of the sample table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDef {
    pub id: String,
    /// Every non-`sampleID` column, in table column order.
    pub fields: IndexMap<String, String>,
}

impl SampleDef {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }
}

/// All steps, keyed by name, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepTable {
    pub steps: IndexMap<String, StepDef>,
}

impl StepTable {
    pub fn get(&self, name: &str) -> Option<&StepDef> {
        self.steps.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDef> {
        self.steps.values()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// All samples, keyed by `sampleID`, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleTable {
    pub samples: IndexMap<String, SampleDef>,
}

impl SampleTable {
    pub fn get(&self, id: &str) -> Option<&SampleDef> {
        self.samples.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleDef> {
        self.samples.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Settings file as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// max_queued_jobs = 4000
/// throttle_interval = "600s"
///
/// [queue]
/// backend = "sge"
/// ```
///
/// All sections are optional and have the defaults used on the cluster.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSettings {
    #[serde(default)]
    pub scheduler: RawSchedulerSection,

    #[serde(default)]
    pub queue: QueueSection,

    #[serde(default)]
    pub scripts: ScriptsSection,
}

/// `[scheduler]` section with durations still as strings (`"60s"`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawSchedulerSection {
    /// Throttle ceiling: no submission while this many of our jobs are queued.
    #[serde(default = "default_max_queued_jobs")]
    pub max_queued_jobs: usize,

    #[serde(default = "default_throttle_interval")]
    pub throttle_interval: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_failure_confirm_delay")]
    pub failure_confirm_delay: String,
}

fn default_max_queued_jobs() -> usize {
    4000
}

fn default_throttle_interval() -> String {
    "600s".to_string()
}

fn default_poll_interval() -> String {
    "60s".to_string()
}

fn default_failure_confirm_delay() -> String {
    "60s".to_string()
}

impl Default for RawSchedulerSection {
    fn default() -> Self {
        Self {
            max_queued_jobs: default_max_queued_jobs(),
            throttle_interval: default_throttle_interval(),
            poll_interval: default_poll_interval(),
            failure_confirm_delay: default_failure_confirm_delay(),
        }
    }
}

/// `[queue]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSection {
    #[serde(default)]
    pub backend: QueueBackendKind,

    #[serde(default = "default_submit_cmd")]
    pub submit_cmd: String,

    #[serde(default = "default_status_cmd")]
    pub status_cmd: String,

    #[serde(default = "default_cancel_cmd")]
    pub cancel_cmd: String,

    /// Owner of the jobs counted towards the throttle ceiling.
    ///
    /// If `None`, `$USER` is used, falling back to `whoami`.
    #[serde(default)]
    pub user: Option<String>,

    /// Number of scripts the local backend runs at once.
    #[serde(default = "default_local_slots")]
    pub local_slots: usize,
}

fn default_submit_cmd() -> String {
    "qsub".to_string()
}

fn default_status_cmd() -> String {
    "qstat".to_string()
}

fn default_cancel_cmd() -> String {
    "qdel".to_string()
}

fn default_local_slots() -> usize {
    4
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            backend: QueueBackendKind::default(),
            submit_cmd: default_submit_cmd(),
            status_cmd: default_status_cmd(),
            cancel_cmd: default_cancel_cmd(),
            user: None,
            local_slots: default_local_slots(),
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    /// Program used to run pipeline step scripts (and local jobs).
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// If true, generated scripts run under `set -e` and create their own
    /// completion marker as the last command.
    #[serde(default)]
    pub touch_marker: bool,
}

fn default_interpreter() -> String {
    "sh".to_string()
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            touch_marker: false,
        }
    }
}

/// Scheduler timing and throttling, with durations parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub max_queued_jobs: usize,
    pub throttle_interval: Duration,
    pub poll_interval: Duration,
    pub failure_confirm_delay: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_queued_jobs: default_max_queued_jobs(),
            throttle_interval: Duration::from_secs(600),
            poll_interval: Duration::from_secs(60),
            failure_confirm_delay: Duration::from_secs(60),
        }
    }
}

/// Validated settings.
///
/// Only constructible through `TryFrom<RawSettings>` (see `config::validate`)
/// or [`Settings::default`].
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub queue: QueueSection,
    pub scripts: ScriptsSection,
}
