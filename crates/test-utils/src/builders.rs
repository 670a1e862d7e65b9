#![allow(dead_code)]

use batchdag::config::{SampleDef, SampleTable, StepDef, StepTable};
use batchdag::types::StepType;
use indexmap::IndexMap;

/// Builder for `StepTable` to simplify test setup.
///
/// Performs no validation, so tests can describe broken tables too.
#[derive(Debug, Default)]
pub struct StepTableBuilder {
    steps: IndexMap<String, StepDef>,
}

impl StepTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(self, name: &str, parents: &[&str]) -> Self {
        self.step(name, StepType::Single, parents, "")
    }

    pub fn batch(self, name: &str, parents: &[&str]) -> Self {
        self.step(name, StepType::Batch, parents, "")
    }

    pub fn step(mut self, name: &str, step_type: StepType, parents: &[&str], resources: &str) -> Self {
        self.steps.insert(
            name.to_string(),
            StepDef {
                name: name.to_string(),
                step_type,
                parents: parents.iter().map(|p| p.to_string()).collect(),
                resources: resources.to_string(),
            },
        );
        self
    }

    pub fn build(self) -> StepTable {
        StepTable { steps: self.steps }
    }
}

/// Builder for `SampleTable`.
#[derive(Debug, Default)]
pub struct SampleTableBuilder {
    samples: IndexMap<String, SampleDef>,
}

impl SampleTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add samples with no extra fields.
    pub fn ids(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self = self.sample(id, &[]);
        }
        self
    }

    pub fn sample(mut self, id: &str, fields: &[(&str, &str)]) -> Self {
        self.samples.insert(
            id.to_string(),
            SampleDef {
                id: id.to_string(),
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        );
        self
    }

    pub fn build(self) -> SampleTable {
        SampleTable {
            samples: self.samples,
        }
    }
}
