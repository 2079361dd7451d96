//! Checkpoint backend boundary (C7). The engine treats embedded-file and
//! relational implementations identically through this trait (spec §4.7).

use async_trait::async_trait;

use crate::state::WorkflowState;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("no snapshot for thread {0}")]
    NotFound(String),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Opaque key-value mapping with key = thread id, value = serialized state.
/// Implementations may choose any encoding; state must round-trip
/// byte-exactly through save/load (spec §6).
#[async_trait]
pub trait CheckpointBackend: Send + Sync {
    /// Write-new-then-swap: a failed write must not corrupt the previous
    /// snapshot. Concurrent writes to the same thread id are serialized.
    async fn save(&self, thread_id: &str, state: &WorkflowState) -> CheckpointResult<()>;

    /// Reads the most recent snapshot for a thread id.
    async fn load(&self, thread_id: &str) -> CheckpointResult<Option<WorkflowState>>;

    async fn has_checkpoint(&self, thread_id: &str) -> CheckpointResult<bool> {
        Ok(self.load(thread_id).await?.is_some())
    }

    async fn delete(&self, thread_id: &str) -> CheckpointResult<()>;
}
