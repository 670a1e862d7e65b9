// src/dag/key.rs

use std::fmt;

/// Identity of a schedulable job: a step, scoped to one sample for
/// single-type steps or to the whole run for batch steps.
///
/// Ordering is by step name, then sample (batch keys sort first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    step: String,
    sample: Option<String>,
}

impl JobKey {
    /// Key of a per-sample job.
    pub fn single(step: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            sample: Some(sample.into()),
        }
    }

    /// Key of the run-wide job of a batch step.
    pub fn batch(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            sample: None,
        }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }

    pub fn is_batch(&self) -> bool {
        self.sample.is_none()
    }
}

/// `step[sample]` for single jobs, plain `step` for batch jobs.
impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sample {
            Some(sample) => write!(f, "{}[{}]", self.step, sample),
            None => f.write_str(&self.step),
        }
    }
}
