use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use batchdag::dag::JobKey;
use batchdag::oracle::CompletionOracle;

/// In-memory completion markers.
///
/// Clones share the same set, so a test can hand one clone to the runtime
/// and a second one to a fake queue that "writes" markers.
#[derive(Debug, Clone, Default)]
pub struct MemoryOracle {
    markers: Arc<Mutex<HashSet<JobKey>>>,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_complete<I: IntoIterator<Item = JobKey>>(keys: I) -> Self {
        let oracle = Self::new();
        for key in keys {
            oracle.mark(key);
        }
        oracle
    }

    pub fn mark(&self, key: JobKey) {
        self.markers.lock().unwrap().insert(key);
    }

    pub fn count(&self) -> usize {
        self.markers.lock().unwrap().len()
    }
}

impl CompletionOracle for MemoryOracle {
    fn is_complete(&self, key: &JobKey) -> bool {
        self.markers.lock().unwrap().contains(key)
    }
}
