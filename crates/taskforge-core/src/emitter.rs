//! Update emission boundary, grounded on the teacher's `StreamEmitter`
//! trait (`restflow-ai/src/agent/stream.rs`): producers depend on this
//! trait object rather than a concrete channel, so the workflow engine,
//! dispatcher, and sub-agent manager never need to know whether updates
//! are headed to a CLI, a websocket, or a test harness.

use async_trait::async_trait;
use taskforge_traits::Update;

#[async_trait]
pub trait UpdateEmitter: Send + Sync {
    /// Backpressure is intentional (spec §5): a slow consumer blocks the
    /// producer rather than have updates dropped.
    async fn emit(&self, update: Update);
}

/// Channel-backed emitter; the receiving half is wrapped into a stream by
/// the orchestrator facade.
pub struct ChannelEmitter {
    sender: tokio::sync::mpsc::Sender<Update>,
}

impl ChannelEmitter {
    pub fn new(sender: tokio::sync::mpsc::Sender<Update>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl UpdateEmitter for ChannelEmitter {
    async fn emit(&self, update: Update) {
        // The receiver is only ever dropped once the orchestrator facade's
        // stream is itself dropped; at that point there is nothing left
        // for this update to reach, so a send failure is not an error.
        let _ = self.sender.send(update).await;
    }
}

/// No-op emitter for sub-agent runs or tests that don't need progress
/// updates surfaced.
#[derive(Default)]
pub struct NullEmitter;

#[async_trait]
impl UpdateEmitter for NullEmitter {
    async fn emit(&self, _update: Update) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_emitter_delivers_updates_in_order() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let emitter = ChannelEmitter::new(tx);
        emitter
            .emit(Update::Status {
                task_id: "t1".into(),
                timestamp: 0,
                message: "starting".into(),
            })
            .await;
        emitter
            .emit(Update::Completed {
                task_id: "t1".into(),
                timestamp: 1,
                result: "done".into(),
            })
            .await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, Update::Status { .. }));
        let second = rx.recv().await.unwrap();
        assert!(second.is_terminal());
    }
}
