//! TaskForge Storage - embedded persistence layer
//!
//! Provides the durable checkpoint and session backends behind the
//! `CheckpointBackend` trait boundary, using redb as the embedded
//! database. Higher-level orchestration lives in `taskforge-core`.

pub mod checkpoint;
pub mod memory_checkpoint;
pub mod range_utils;
mod simple_storage;
pub mod session;

pub use checkpoint::RedbCheckpointBackend;
pub use memory_checkpoint::InMemoryCheckpointBackend;
pub use session::{Session, SessionStatus, SessionStorage};
pub use simple_storage::SimpleStorage;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

/// Central storage manager that opens the database file and initializes
/// every storage subsystem against it.
pub struct Storage {
    db: Arc<Database>,
    pub checkpoints: RedbCheckpointBackend,
    pub sessions: SessionStorage,
}

impl Storage {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let checkpoints = RedbCheckpointBackend::from_database(db.clone())
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let sessions = SessionStorage::new(db.clone())?;
        Ok(Self {
            db,
            checkpoints,
            sessions,
        })
    }

    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
