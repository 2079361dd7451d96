//! Structured log sink (C8.1): an append-only sequence of records, mirrored
//! to `tracing` at write time so operators get both the in-process buffer
//! and the process's normal log stream.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Thinking,
    ToolCall,
    Prompt,
    Result,
    Error,
    Workflow,
    Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: i64,
    pub level: String,
    pub node: String,
    pub agent: String,
    pub event_type: LogKind,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<u64>,
}

/// Append-only structured log, guarded by a single `RwLock` (writes are
/// infrequent relative to reads of the tail for UI display).
#[derive(Default)]
pub struct StructuredLog {
    records: RwLock<Vec<LogRecord>>,
}

impl StructuredLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        level: impl Into<String>,
        node: impl Into<String>,
        agent: impl Into<String>,
        event_type: LogKind,
        content: impl Into<String>,
    ) {
        let record = LogRecord {
            timestamp: chrono::Utc::now().timestamp_millis(),
            level: level.into(),
            node: node.into(),
            agent: agent.into(),
            event_type,
            content: content.into(),
            metadata: Value::Null,
            token_usage: None,
        };
        tracing::debug!(
            node = %record.node,
            agent = %record.agent,
            event_type = ?record.event_type,
            "{}",
            record.content
        );
        // A poisoned lock would mean a prior writer panicked mid-update;
        // logging must never propagate that into the caller, so the
        // record is simply dropped from the buffer.
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }

    pub fn tail(&self, n: usize) -> Vec<LogRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_tail() {
        let log = StructuredLog::new();
        log.record("INFO", "plan", "main", LogKind::Thinking, "considering options");
        log.record("INFO", "execute", "main", LogKind::ToolCall, "running tool");
        let tail = log.tail(1);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].content, "running tool");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_tail_larger_than_log_returns_everything() {
        let log = StructuredLog::new();
        log.record("INFO", "plan", "main", LogKind::Workflow, "started");
        assert_eq!(log.tail(50).len(), 1);
    }
}
