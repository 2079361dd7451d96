//! Tool logger (C8.3): start/end invocation records with parameters,
//! results, success, and duration; exposes success-rate/duration stats.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool_name: String,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub parameters: Value,
    pub result: Option<Value>,
    pub success: Option<bool>,
    pub duration_ms: Option<u64>,
}

#[derive(Default)]
pub struct ToolLogger {
    invocations: RwLock<Vec<ToolInvocation>>,
}

impl ToolLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, call_id: impl Into<String>, tool_name: impl Into<String>, parameters: Value) {
        let invocation = ToolInvocation {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            started_at: chrono::Utc::now().timestamp_millis(),
            ended_at: None,
            parameters,
            result: None,
            success: None,
            duration_ms: None,
        };
        tracing::debug!(call_id = %invocation.call_id, tool = %invocation.tool_name, "tool call started");
        if let Ok(mut invocations) = self.invocations.write() {
            invocations.push(invocation);
        }
    }

    pub fn end(&self, call_id: &str, success: bool, result: Option<Value>) {
        let ended_at = chrono::Utc::now().timestamp_millis();
        if let Ok(mut invocations) = self.invocations.write() {
            if let Some(invocation) = invocations.iter_mut().rev().find(|i| i.call_id == call_id) {
                invocation.duration_ms = Some((ended_at - invocation.started_at).max(0) as u64);
                invocation.ended_at = Some(ended_at);
                invocation.success = Some(success);
                invocation.result = result;
            }
        }
        tracing::debug!(call_id, success, "tool call finished");
    }

    pub fn success_rate(&self) -> f64 {
        let invocations = self.invocations.read().unwrap_or_else(|e| e.into_inner());
        let finished: Vec<_> = invocations.iter().filter_map(|i| i.success).collect();
        if finished.is_empty() {
            return 0.0;
        }
        finished.iter().filter(|s| **s).count() as f64 / finished.len() as f64
    }

    pub fn mean_duration_ms(&self) -> u64 {
        let invocations = self.invocations.read().unwrap_or_else(|e| e.into_inner());
        let durations: Vec<u64> = invocations.iter().filter_map(|i| i.duration_ms).collect();
        if durations.is_empty() {
            return 0;
        }
        durations.iter().sum::<u64>() / durations.len() as u64
    }

    pub fn for_tool(&self, tool_name: &str) -> Vec<ToolInvocation> {
        self.invocations
            .read()
            .map(|invocations| {
                invocations
                    .iter()
                    .filter(|i| i.tool_name == tool_name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_then_end_records_success_and_duration() {
        let logger = ToolLogger::new();
        logger.start("call-1", "read_file", serde_json::json!({"path": "a.txt"}));
        logger.end("call-1", true, Some(serde_json::json!("contents")));
        let calls = logger.for_tool("read_file");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].success, Some(true));
        assert!(calls[0].duration_ms.is_some());
    }

    #[test]
    fn test_success_rate_across_multiple_calls() {
        let logger = ToolLogger::new();
        logger.start("c1", "t", Value::Null);
        logger.end("c1", true, None);
        logger.start("c2", "t", Value::Null);
        logger.end("c2", false, None);
        assert_eq!(logger.success_rate(), 0.5);
    }
}
