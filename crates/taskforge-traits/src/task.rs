//! Core data-model types shared across the orchestrator (see spec §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Task domain, produced by the intent router (C4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Coding,
    Research,
    Data,
    General,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Coding => "coding",
            Domain::Research => "research",
            Domain::Data => "data",
            Domain::General => "general",
        }
    }
}

/// Task lifecycle status. Terminal states are write-once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// One operator request processed end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub domain: Domain,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

impl Task {
    pub fn new(description: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            domain,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            start_time: chrono::Utc::now().timestamp_millis(),
            end_time: None,
        }
    }

    /// Write-once terminal transition. No-op if already terminal.
    pub fn complete(&mut self, result: String) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.end_time = Some(chrono::Utc::now().timestamp_millis());
    }

    pub fn fail(&mut self, error: String) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.end_time = Some(chrono::Utc::now().timestamp_millis());
    }

    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Cancelled;
        self.end_time = Some(chrono::Utc::now().timestamp_millis());
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Append-only conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: i64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            metadata: HashMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Append-only record of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub parameters: Value,
    pub result: Option<Value>,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: i64,
    pub duration_ms: u64,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            parameters,
            result: None,
            success: false,
            error: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            duration_ms: 0,
        }
    }

    pub fn succeed(mut self, result: Value, duration_ms: u64) -> Self {
        self.result = Some(result);
        self.success = true;
        self.duration_ms = duration_ms;
        self
    }

    pub fn fail(mut self, error: impl Into<String>, duration_ms: u64) -> Self {
        self.error = Some(error.into());
        self.success = false;
        self.duration_ms = duration_ms;
        self
    }
}

/// One of the twelve fixed sub-agent roles (spec §3). Per REDESIGN FLAGS
/// open question (b), the tool allowlist for each role is a configuration
/// point, not hardcoded here — see `taskforge-core::subagent::roster`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    CodeReader,
    Analyzer,
    Tester,
    Reviewer,
    DocWriter,
    DataCleaner,
    Researcher,
    Planner,
    Debugger,
    Refactorer,
    Summarizer,
    Generalist,
}

impl AgentType {
    pub const ALL: [AgentType; 12] = [
        AgentType::CodeReader,
        AgentType::Analyzer,
        AgentType::Tester,
        AgentType::Reviewer,
        AgentType::DocWriter,
        AgentType::DataCleaner,
        AgentType::Researcher,
        AgentType::Planner,
        AgentType::Debugger,
        AgentType::Refactorer,
        AgentType::Summarizer,
        AgentType::Generalist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::CodeReader => "code-reader",
            AgentType::Analyzer => "analyzer",
            AgentType::Tester => "tester",
            AgentType::Reviewer => "reviewer",
            AgentType::DocWriter => "doc-writer",
            AgentType::DataCleaner => "data-cleaner",
            AgentType::Researcher => "researcher",
            AgentType::Planner => "planner",
            AgentType::Debugger => "debugger",
            AgentType::Refactorer => "refactorer",
            AgentType::Summarizer => "summarizer",
            AgentType::Generalist => "generalist",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubAgentStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Record of one spawned sub-agent (child workflow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAgentInfo {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub task_description: String,
    pub status: SubAgentStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl SubAgentInfo {
    pub fn new(agent_type: AgentType, task_description: impl Into<String>) -> Self {
        Self {
            agent_id: Uuid::new_v4().to_string(),
            agent_type,
            task_description: task_description.into(),
            status: SubAgentStatus::Pending,
            result: None,
            error: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, result: String) {
        self.status = SubAgentStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(chrono::Utc::now().timestamp_millis());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SubAgentStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(chrono::Utc::now().timestamp_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_terminal_is_write_once() {
        let mut task = Task::new("do a thing", Domain::General);
        task.complete("done".to_string());
        let end_time = task.end_time;
        task.fail("too late".to_string());
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("done"));
        assert_eq!(task.end_time, end_time);
    }

    #[test]
    fn test_subagent_roster_has_twelve_roles() {
        assert_eq!(AgentType::ALL.len(), 12);
    }
}
