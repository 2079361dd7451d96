//! Embedded-file checkpoint backend (C7), grounded on the teacher's
//! `checkpoint.rs`: a primary table holding the latest snapshot per thread,
//! plus an append-only history index so a thread's checkpoint lineage can
//! be inspected without re-reading every write.

use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use taskforge_traits::{CheckpointBackend, CheckpointError, CheckpointResult, WorkflowState};

use crate::range_utils::prefix_range;

/// thread_id -> serialized WorkflowState JSON (most recent only).
const LATEST_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("workflow_checkpoints");

/// "{thread_id}:{seq}" -> serialized WorkflowState JSON (full history).
const HISTORY_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("workflow_checkpoint_history");

/// "{thread_id}:{seq}" -> seq, used only to find the next sequence number.
const SEQ_TABLE: TableDefinition<&str, u64> = TableDefinition::new("workflow_checkpoint_seq");

pub struct RedbCheckpointBackend {
    db: Arc<Database>,
}

impl RedbCheckpointBackend {
    pub fn open(path: impl AsRef<std::path::Path>) -> CheckpointResult<Self> {
        let db = Database::create(path).map_err(|e| CheckpointError::Io(e.to_string()))?;
        Self::from_database(Arc::new(db))
    }

    pub fn from_database(db: Arc<Database>) -> CheckpointResult<Self> {
        let write_txn = db
            .begin_write()
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        write_txn
            .open_table(LATEST_TABLE)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        write_txn
            .open_table(HISTORY_TABLE)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        write_txn
            .open_table(SEQ_TABLE)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        write_txn.commit().map_err(|e| CheckpointError::Io(e.to_string()))?;
        Ok(Self { db })
    }

    fn next_seq(&self, thread_id: &str) -> CheckpointResult<u64> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let table = read_txn
            .open_table(SEQ_TABLE)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let current = table
            .get(thread_id)
            .map_err(|e| CheckpointError::Io(e.to_string()))?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(current + 1)
    }

    /// Every checkpoint ever written for a thread id, oldest first.
    pub fn history(&self, thread_id: &str) -> CheckpointResult<Vec<WorkflowState>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let table = read_txn
            .open_table(HISTORY_TABLE)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let prefix = format!("{thread_id}:");
        let (start, end) = prefix_range(&prefix);
        let mut states = Vec::new();
        for entry in table
            .range(start.as_str()..end.as_str())
            .map_err(|e| CheckpointError::Io(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| CheckpointError::Io(e.to_string()))?;
            let state: WorkflowState = serde_json::from_slice(value.value())
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
            states.push(state);
        }
        Ok(states)
    }
}

#[async_trait]
impl CheckpointBackend for RedbCheckpointBackend {
    async fn save(&self, thread_id: &str, state: &WorkflowState) -> CheckpointResult<()> {
        let bytes =
            serde_json::to_vec(state).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let seq = self.next_seq(thread_id)?;
        let history_key = format!("{thread_id}:{seq:020}");

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        {
            let mut latest = write_txn
                .open_table(LATEST_TABLE)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
            latest
                .insert(thread_id, bytes.as_slice())
                .map_err(|e| CheckpointError::Io(e.to_string()))?;

            let mut history = write_txn
                .open_table(HISTORY_TABLE)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
            history
                .insert(history_key.as_str(), bytes.as_slice())
                .map_err(|e| CheckpointError::Io(e.to_string()))?;

            let mut seq_table = write_txn
                .open_table(SEQ_TABLE)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
            seq_table
                .insert(thread_id, seq)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| CheckpointError::Io(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> CheckpointResult<Option<WorkflowState>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let table = read_txn
            .open_table(LATEST_TABLE)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        match table.get(thread_id).map_err(|e| CheckpointError::Io(e.to_string()))? {
            Some(value) => {
                let state: WorkflowState = serde_json::from_slice(value.value())
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, thread_id: &str) -> CheckpointResult<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        {
            let mut latest = write_txn
                .open_table(LATEST_TABLE)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
            latest
                .remove(thread_id)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;

            let mut seq_table = write_txn
                .open_table(SEQ_TABLE)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
            seq_table
                .remove(thread_id)
                .map_err(|e| CheckpointError::Io(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| CheckpointError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RedbCheckpointBackend {
        let db = Arc::new(
            Database::builder()
                .create_with_backend(redb::backends::InMemoryBackend::new())
                .unwrap(),
        );
        RedbCheckpointBackend::from_database(db).unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let backend = backend();
        let state = WorkflowState::new("/tmp/ws");
        backend.save("thread-1", &state).await.unwrap();
        let loaded = backend.load("thread-1").await.unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().workspace, "/tmp/ws");
    }

    #[tokio::test]
    async fn test_load_missing_thread_returns_none() {
        let backend = backend();
        assert!(backend.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_twice_keeps_latest_and_full_history() {
        let backend = backend();
        let mut state = WorkflowState::new("/tmp/ws");
        backend.save("thread-1", &state).await.unwrap();
        state.iteration = 1;
        backend.save("thread-1", &state).await.unwrap();

        let latest = backend.load("thread-1").await.unwrap().unwrap();
        assert_eq!(latest.iteration, 1);

        let history = backend.history("thread-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].iteration, 0);
        assert_eq!(history[1].iteration, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_latest() {
        let backend = backend();
        let state = WorkflowState::new("/tmp/ws");
        backend.save("thread-1", &state).await.unwrap();
        backend.delete("thread-1").await.unwrap();
        assert!(backend.load("thread-1").await.unwrap().is_none());
    }
}
