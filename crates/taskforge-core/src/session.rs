//! Session & checkpoint facade (C7): wraps `taskforge_storage::SessionStorage`
//! and a `CheckpointBackend` trait object behind the contract spec §4.7
//! names directly, so the orchestrator facade never touches either
//! storage type concretely.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use taskforge_storage::{Session, SessionStorage};
use taskforge_traits::{CheckpointBackend, WorkflowState};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
    #[error("no session found for id '{0}'")]
    NotFound(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

pub struct SessionManager {
    sessions: SessionStorage,
    checkpoints: Arc<dyn CheckpointBackend>,
}

impl SessionManager {
    pub fn new(sessions: SessionStorage, checkpoints: Arc<dyn CheckpointBackend>) -> Self {
        Self { sessions, checkpoints }
    }

    pub fn create_session(
        &self,
        description: impl Into<String>,
        task_type: impl Into<String>,
        workspace: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> SessionResult<Session> {
        Ok(self.sessions.create_session(description, task_type, workspace, metadata)?)
    }

    pub fn get_session(&self, id: &str) -> SessionResult<Option<Session>> {
        Ok(self.sessions.get_session(id)?)
    }

    /// Increments the session's checkpoint counter; the snapshot itself is
    /// written separately via [`save_checkpoint`](Self::save_checkpoint).
    pub fn record_checkpoint(&self, id: &str) -> SessionResult<()> {
        Ok(self.sessions.record_checkpoint(id)?)
    }

    pub fn complete_session(&self, id: &str) -> SessionResult<()> {
        Ok(self.sessions.complete_session(id)?)
    }

    pub fn fail_session(&self, id: &str) -> SessionResult<()> {
        Ok(self.sessions.fail_session(id)?)
    }

    pub async fn save_checkpoint(&self, session_id: &str, thread_id: &str, state: &WorkflowState) -> SessionResult<()> {
        self.checkpoints
            .save(thread_id, state)
            .await
            .map_err(|e| SessionError::Checkpoint(e.to_string()))?;
        self.record_checkpoint(session_id)?;
        Ok(())
    }

    pub async fn load_state(&self, thread_id: &str) -> SessionResult<Option<WorkflowState>> {
        self.checkpoints
            .load(thread_id)
            .await
            .map_err(|e| SessionError::Checkpoint(e.to_string()))
    }

    pub async fn has_checkpoint(&self, thread_id: &str) -> SessionResult<bool> {
        self.checkpoints
            .has_checkpoint(thread_id)
            .await
            .map_err(|e| SessionError::Checkpoint(e.to_string()))
    }

    /// Structural check against the §3 invariants; used to decide whether
    /// a loaded snapshot is safe to resume from.
    pub fn validate_state(&self, state: &WorkflowState, max_iterations: u32) -> bool {
        state.validate(max_iterations).is_ok()
    }

    /// Loads and validates the most recent snapshot for a thread. A
    /// snapshot failing validation is rejected (`Ok(None)`); the caller
    /// decides whether to restart the task or abort.
    pub async fn resume(&self, thread_id: &str, max_iterations: u32) -> SessionResult<Option<WorkflowState>> {
        match self.load_state(thread_id).await? {
            Some(state) if self.validate_state(&state, max_iterations) => Ok(Some(state)),
            Some(_) => Ok(None),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskforge_storage::InMemoryCheckpointBackend;

    fn manager() -> SessionManager {
        let db = Arc::new(
            redb::Database::builder()
                .create_with_backend(redb::backends::InMemoryBackend::new())
                .unwrap(),
        );
        let sessions = SessionStorage::new(db).unwrap();
        SessionManager::new(sessions, Arc::new(InMemoryCheckpointBackend::new()))
    }

    #[tokio::test]
    async fn test_create_record_and_load_round_trip() {
        let manager = manager();
        let session = manager.create_session("fix bug", "coding", "/tmp/ws", None).unwrap();
        let mut state = WorkflowState::new("/tmp/ws");
        state.iteration = 2;
        manager.save_checkpoint(&session.id, &session.thread_id, &state).await.unwrap();

        let fetched = manager.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.checkpoint_count, 1);

        let loaded = manager.load_state(&session.thread_id).await.unwrap().unwrap();
        assert_eq!(loaded.iteration, 2);
    }

    #[tokio::test]
    async fn test_resume_rejects_invalid_snapshot() {
        let manager = manager();
        let session = manager.create_session("task", "general", "/tmp/ws", None).unwrap();
        let mut state = WorkflowState::new("/tmp/ws");
        state.iteration = 100;
        manager.save_checkpoint(&session.id, &session.thread_id, &state).await.unwrap();

        let resumed = manager.resume(&session.thread_id, 10).await.unwrap();
        assert!(resumed.is_none());
    }

    #[tokio::test]
    async fn test_has_checkpoint_reflects_saved_state() {
        let manager = manager();
        let session = manager.create_session("task", "general", "/tmp/ws", None).unwrap();
        assert!(!manager.has_checkpoint(&session.thread_id).await.unwrap());
        let state = WorkflowState::new("/tmp/ws");
        manager.save_checkpoint(&session.id, &session.thread_id, &state).await.unwrap();
        assert!(manager.has_checkpoint(&session.thread_id).await.unwrap());
    }
}
