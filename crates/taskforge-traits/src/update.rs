//! Typed progress events emitted on the orchestrator's output stream (C9).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One typed progress event. Ordering constraints (spec §4.9):
/// for a given tool call, its `ToolCall` event precedes its `ToolResult`
/// event; `Completed`/`Error`/`Cancelled` are terminal — nothing follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    Status {
        task_id: String,
        timestamp: i64,
        message: String,
    },
    Thinking {
        task_id: String,
        timestamp: i64,
        content: String,
    },
    Artifact {
        task_id: String,
        timestamp: i64,
        name: String,
        content: Value,
    },
    ToolCall {
        task_id: String,
        timestamp: i64,
        call_id: String,
        tool_name: String,
        parameters: Value,
    },
    ToolResult {
        task_id: String,
        timestamp: i64,
        call_id: String,
        success: bool,
        result: Option<Value>,
        error: Option<String>,
    },
    SubAgentSpawned {
        task_id: String,
        timestamp: i64,
        agent_id: String,
        agent_type: String,
        description: String,
    },
    SubAgentResult {
        task_id: String,
        timestamp: i64,
        agent_id: String,
        success: bool,
        result: Option<String>,
    },
    Progress {
        task_id: String,
        timestamp: i64,
        iteration: u32,
        max_iterations: u32,
    },
    Completed {
        task_id: String,
        timestamp: i64,
        result: String,
    },
    Error {
        task_id: String,
        timestamp: i64,
        message: String,
        component: String,
        retried: bool,
        suggestion: String,
    },
    Cancelled {
        task_id: String,
        timestamp: i64,
    },
}

impl Update {
    pub fn task_id(&self) -> &str {
        match self {
            Update::Status { task_id, .. }
            | Update::Thinking { task_id, .. }
            | Update::Artifact { task_id, .. }
            | Update::ToolCall { task_id, .. }
            | Update::ToolResult { task_id, .. }
            | Update::SubAgentSpawned { task_id, .. }
            | Update::SubAgentResult { task_id, .. }
            | Update::Progress { task_id, .. }
            | Update::Completed { task_id, .. }
            | Update::Error { task_id, .. }
            | Update::Cancelled { task_id, .. } => task_id,
        }
    }

    /// Whether this Update must be the last one emitted for its task.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Update::Completed { .. } | Update::Error { .. } | Update::Cancelled { .. }
        )
    }

    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_updates() {
        let completed = Update::Completed {
            task_id: "t1".into(),
            timestamp: 0,
            result: "ok".into(),
        };
        assert!(completed.is_terminal());

        let status = Update::Status {
            task_id: "t1".into(),
            timestamp: 0,
            message: "working".into(),
        };
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let update = Update::Completed {
            task_id: "t1".into(),
            timestamp: 1,
            result: "done".into(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["task_id"], "t1");
    }
}
