//! In-process checkpoint backend used for tests and as a stand-in reference
//! for a multi-process (relational) backend — the engine treats it
//! identically to [`crate::checkpoint::RedbCheckpointBackend`] through the
//! same trait (spec §4.7).

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use taskforge_traits::{CheckpointBackend, CheckpointResult, WorkflowState};

#[derive(Default)]
pub struct InMemoryCheckpointBackend {
    snapshots: DashMap<String, WorkflowState>,
    history: RwLock<Vec<(String, WorkflowState)>>,
}

impl InMemoryCheckpointBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_len(&self, thread_id: &str) -> usize {
        self.history
            .read()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == thread_id)
            .count()
    }
}

#[async_trait]
impl CheckpointBackend for InMemoryCheckpointBackend {
    async fn save(&self, thread_id: &str, state: &WorkflowState) -> CheckpointResult<()> {
        self.snapshots.insert(thread_id.to_string(), state.clone());
        self.history
            .write()
            .unwrap()
            .push((thread_id.to_string(), state.clone()));
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> CheckpointResult<Option<WorkflowState>> {
        Ok(self.snapshots.get(thread_id).map(|s| s.clone()))
    }

    async fn delete(&self, thread_id: &str) -> CheckpointResult<()> {
        self.snapshots.remove(thread_id);
        Ok(())
    }
}
