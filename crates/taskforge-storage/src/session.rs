//! Session storage: thread-scoped durable identity for a task across
//! restarts (spec §3, §4.7). Grounded on the teacher's `chat_session.rs`
//! byte-level storage shape, typed here instead of left raw since the
//! session record itself (unlike a checkpoint blob) is read structurally.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

/// Durable identity of a task across restarts (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub thread_id: String,
    pub task_type: String,
    pub workspace: String,
    pub status: SessionStatus,
    pub metadata: HashMap<String, Value>,
    pub checkpoint_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Session storage backed by redb, grounded on the teacher's
/// `ChatSessionStorage`.
#[derive(Clone)]
pub struct SessionStorage {
    db: Arc<Database>,
}

impl SessionStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SESSIONS_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    fn put(&self, session: &Session) -> Result<()> {
        let bytes = serde_json::to_vec(session)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS_TABLE)?;
            table.insert(session.id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Generates a fresh session id and thread id (spec §6).
    pub fn create_session(
        &self,
        description: impl Into<String>,
        task_type: impl Into<String>,
        workspace: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Session> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut meta = metadata.unwrap_or_default();
        meta.entry("description".to_string())
            .or_insert_with(|| Value::String(description.into()));

        let session = Session {
            id: Uuid::new_v4().to_string(),
            thread_id: Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            workspace: workspace.into(),
            status: SessionStatus::Active,
            metadata: meta,
            checkpoint_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.put(&session)?;
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Increments the checkpoint counter; the state snapshot itself is
    /// written by the checkpoint backend keyed by thread id (spec §6).
    pub fn record_checkpoint(&self, id: &str) -> Result<()> {
        if let Some(mut session) = self.get_session(id)? {
            session.checkpoint_count += 1;
            session.updated_at = chrono::Utc::now().timestamp_millis();
            self.put(&session)?;
        }
        Ok(())
    }

    pub fn complete_session(&self, id: &str) -> Result<()> {
        if let Some(mut session) = self.get_session(id)? {
            session.status = SessionStatus::Completed;
            session.updated_at = chrono::Utc::now().timestamp_millis();
            self.put(&session)?;
        }
        Ok(())
    }

    pub fn fail_session(&self, id: &str) -> Result<()> {
        if let Some(mut session) = self.get_session(id)? {
            session.status = SessionStatus::Failed;
            session.updated_at = chrono::Utc::now().timestamp_millis();
            self.put(&session)?;
        }
        Ok(())
    }

    pub fn list_active(&self) -> Result<Vec<Session>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let session: Session = serde_json::from_slice(value.value())?;
            if session.status == SessionStatus::Active {
                out.push(session);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SessionStorage {
        let db = Arc::new(
            Database::builder()
                .create_with_backend(redb::backends::InMemoryBackend::new())
                .unwrap(),
        );
        SessionStorage::new(db).unwrap()
    }

    #[test]
    fn test_create_then_get_session() {
        let storage = storage();
        let session = storage
            .create_session("fix the bug", "coding", "/tmp/ws", None)
            .unwrap();
        let fetched = storage.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.thread_id, session.thread_id);
        assert_eq!(fetched.status, SessionStatus::Active);
    }

    #[test]
    fn test_record_checkpoint_increments_counter() {
        let storage = storage();
        let session = storage
            .create_session("task", "general", "/tmp/ws", None)
            .unwrap();
        storage.record_checkpoint(&session.id).unwrap();
        storage.record_checkpoint(&session.id).unwrap();
        let fetched = storage.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.checkpoint_count, 2);
    }

    #[test]
    fn test_complete_session_removes_from_active_set() {
        let storage = storage();
        let session = storage
            .create_session("task", "general", "/tmp/ws", None)
            .unwrap();
        assert_eq!(storage.list_active().unwrap().len(), 1);
        storage.complete_session(&session.id).unwrap();
        assert_eq!(storage.list_active().unwrap().len(), 0);
        assert_eq!(
            storage.get_session(&session.id).unwrap().unwrap().status,
            SessionStatus::Completed
        );
    }
}
