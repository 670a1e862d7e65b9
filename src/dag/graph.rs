// src/dag/graph.rs

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::{SampleTable, StepDef, StepTable};
use crate::dag::job::Job;
use crate::dag::JobKey;
use crate::errors::{BatchdagError, Result};
use crate::types::StepType;

/// The expanded job graph: one node per (step, sample) for single steps and
/// one per batch step, with parent→child edges between them.
///
/// Node order is deterministic: steps in table order, samples in table order.
#[derive(Debug, Clone)]
pub struct JobGraph {
    jobs: IndexMap<JobKey, Job>,
}

impl JobGraph {
    /// Expand steps × samples into jobs and wire the edges.
    ///
    /// For each declared parent `p` of step `s`:
    ///
    /// | child  | parent | edges                                          |
    /// |--------|--------|------------------------------------------------|
    /// | single | single | `s[x] ← p[x]` for every sample `x`             |
    /// | single | batch  | `s[x] ← p` for every sample `x`                |
    /// | batch  | single | `s ← p[x]` for every sample `x`                |
    /// | batch  | batch  | `s ← p`                                        |
    ///
    /// Fails with `UnknownParentStep` for undeclared parents and with
    /// `CyclicDependency` if the expanded graph is not a DAG.
    pub fn build(steps: &StepTable, samples: &SampleTable) -> Result<Self> {
        let mut graph = Self {
            jobs: IndexMap::new(),
        };

        for step in steps.iter() {
            for key in expand_step(step, samples) {
                graph
                    .jobs
                    .insert(key.clone(), Job::new(key, step.step_type, &step.resources));
            }
        }

        for step in steps.iter() {
            for parent_name in step.parents.iter() {
                let parent = steps.get(parent_name).ok_or_else(|| {
                    BatchdagError::UnknownParentStep {
                        step: step.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?;

                for (from, to) in step_edges(step, parent, samples) {
                    graph.add_parent(&to, from);
                }
            }
        }

        graph.link_children();
        graph.topological_order()?;

        debug!(
            jobs = graph.len(),
            edges = graph.edge_count(),
            roots = graph.roots().len(),
            "job graph built"
        );

        Ok(graph)
    }

    fn add_parent(&mut self, child: &JobKey, parent: JobKey) {
        if let Some(job) = self.jobs.get_mut(child) {
            job.parents.insert(parent);
        }
    }

    /// Fill every `children` set as the exact transpose of `parents`.
    fn link_children(&mut self) {
        let edges: Vec<(JobKey, JobKey)> = self
            .jobs
            .values()
            .flat_map(|job| job.parents.iter().map(|p| (p.clone(), job.key.clone())))
            .collect();

        for job in self.jobs.values_mut() {
            job.children.clear();
        }
        for (parent, child) in edges {
            if let Some(job) = self.jobs.get_mut(&parent) {
                job.children.insert(child);
            }
        }
    }

    /// Keys in an order where every parent precedes its children.
    pub fn topological_order(&self) -> Result<Vec<JobKey>> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

        for idx in 0..self.jobs.len() {
            graph.add_node(idx);
        }
        for (child_idx, job) in self.jobs.values().enumerate() {
            for parent in job.parents.iter() {
                if let Some(parent_idx) = self.jobs.get_index_of(parent) {
                    graph.add_edge(parent_idx, child_idx, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.jobs.get_index(idx).map(|(k, _)| k.clone()))
                .collect()),
            Err(cycle) => {
                let key = self
                    .jobs
                    .get_index(cycle.node_id())
                    .map(|(k, _)| k.to_string())
                    .unwrap_or_default();
                Err(BatchdagError::CyclicDependency(format!(
                    "cycle in job graph involving job '{key}'"
                )))
            }
        }
    }

    pub fn get(&self, key: &JobKey) -> Option<&Job> {
        self.jobs.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &JobKey) -> Option<&mut Job> {
        self.jobs.get_mut(key)
    }

    pub fn contains(&self, key: &JobKey) -> bool {
        self.jobs.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &JobKey> {
        self.jobs.keys()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub(crate) fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs without parents, in graph order. These seed the frontier.
    pub fn roots(&self) -> Vec<JobKey> {
        self.jobs
            .values()
            .filter(|job| job.is_root())
            .map(|job| job.key.clone())
            .collect()
    }

    /// Immediate parents of a job (empty for unknown keys).
    pub fn parents_of(&self, key: &JobKey) -> Vec<&JobKey> {
        self.jobs
            .get(key)
            .map(|job| job.parents.iter().collect())
            .unwrap_or_default()
    }

    /// Immediate children of a job (empty for unknown keys).
    pub fn children_of(&self, key: &JobKey) -> Vec<&JobKey> {
        self.jobs
            .get(key)
            .map(|job| job.children.iter().collect())
            .unwrap_or_default()
    }

    /// Total number of parent→child edges.
    pub fn edge_count(&self) -> usize {
        self.jobs.values().map(|job| job.parents.len()).sum()
    }
}

/// Job keys produced by one step.
fn expand_step(step: &StepDef, samples: &SampleTable) -> Vec<JobKey> {
    match step.step_type {
        StepType::Single => samples
            .ids()
            .map(|sample| JobKey::single(&step.name, sample))
            .collect(),
        StepType::Batch => vec![JobKey::batch(&step.name)],
    }
}

/// `(parent, child)` edges contributed by one declared parent of `step`.
fn step_edges(step: &StepDef, parent: &StepDef, samples: &SampleTable) -> Vec<(JobKey, JobKey)> {
    match (step.step_type, parent.step_type) {
        (StepType::Single, StepType::Single) => samples
            .ids()
            .map(|s| (JobKey::single(&parent.name, s), JobKey::single(&step.name, s)))
            .collect(),
        (StepType::Single, StepType::Batch) => samples
            .ids()
            .map(|s| (JobKey::batch(&parent.name), JobKey::single(&step.name, s)))
            .collect(),
        (StepType::Batch, StepType::Single) => samples
            .ids()
            .map(|s| (JobKey::single(&parent.name, s), JobKey::batch(&step.name)))
            .collect(),
        (StepType::Batch, StepType::Batch) => {
            vec![(JobKey::batch(&parent.name), JobKey::batch(&step.name))]
        }
    }
}

