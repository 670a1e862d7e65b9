// src/dag/frontier.rs

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::dag::JobKey;

/// Jobs the scheduler is actively tracking (ready or submitted), in the
/// order they entered.
///
/// A key is present at most once and enters at most once per run: a retired
/// key is never tracked again. Keys leave only through [`Frontier::retire`].
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    queue: IndexSet<JobKey>,
    entered: HashSet<JobKey>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key at the back. Returns `false` if it is tracked or was
    /// tracked earlier in the run.
    pub fn enqueue(&mut self, key: JobKey) -> bool {
        if !self.entered.insert(key.clone()) {
            return false;
        }
        self.queue.insert(key)
    }

    /// Whether the key has ever entered, retired or not.
    pub fn has_entered(&self, key: &JobKey) -> bool {
        self.entered.contains(key)
    }

    /// Stop tracking a key. Returns `false` if it was not tracked.
    pub fn retire(&mut self, key: &JobKey) -> bool {
        self.queue.shift_remove(key)
    }

    pub fn contains(&self, key: &JobKey) -> bool {
        self.queue.contains(key)
    }

    /// Copy of the current contents, front to back.
    ///
    /// A scheduling round walks this snapshot, so keys enqueued during the
    /// round are first visited in the next one.
    pub fn snapshot(&self) -> Vec<JobKey> {
        self.queue.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobKey> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl FromIterator<JobKey> for Frontier {
    fn from_iter<I: IntoIterator<Item = JobKey>>(iter: I) -> Self {
        let mut frontier = Self::new();
        for key in iter {
            frontier.enqueue(key);
        }
        frontier
    }
}
