//! [`WorkflowState`]: the single record threaded through plan/execute/reflect.
//!
//! Each field documents its reducer (spec §3): append-only sequences merge
//! by concatenation, mappings merge right-biased, counters only increase,
//! and `last_write_wins` scalars are simply overwritten.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::task::{Message, SubAgentInfo, TaskStatus, ToolCall};

/// Monotonic approval gate for plan steps marked sensitive (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Transitions are monotonic: `pending -> {approved, rejected}` only.
    pub fn transition(&mut self, next: ApprovalStatus) -> bool {
        if *self != ApprovalStatus::Pending {
            return false;
        }
        *self = next;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Append-only: concat.
    pub messages: Vec<Message>,
    /// Append-only: concat.
    pub tool_calls: Vec<ToolCall>,
    /// Append-only: concat.
    pub sub_agents: Vec<SubAgentInfo>,
    /// Append-only: concat.
    pub errors: Vec<String>,
    /// Append-only: concat.
    pub review_results: Vec<String>,
    /// Append-only: concat.
    pub debug_logs: Vec<String>,
    /// Append-only: concat.
    pub findings: Vec<String>,

    /// Mapping: right-biased merge.
    pub context: HashMap<String, Value>,
    /// Mapping: right-biased merge.
    pub memory: HashMap<String, Value>,

    /// Monotonically increasing.
    pub iteration: u32,
    /// Monotonically increasing.
    pub retry_count: u32,
    /// Monotonically increasing.
    pub streaming_tokens: u64,

    /// Last-write-wins.
    pub task_status: TaskStatus,
    /// Last-write-wins.
    pub should_continue: bool,
    /// Last-write-wins.
    pub next_node: Option<String>,
    /// Last-write-wins.
    pub last_tool_result: Option<Value>,

    /// Set at creation, immutable thereafter.
    pub workspace: String,

    /// Monotonic: `pending -> {approved, rejected}`.
    pub approval_status: ApprovalStatus,
}

impl WorkflowState {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            tool_calls: Vec::new(),
            sub_agents: Vec::new(),
            errors: Vec::new(),
            review_results: Vec::new(),
            debug_logs: Vec::new(),
            findings: Vec::new(),
            context: HashMap::new(),
            memory: HashMap::new(),
            iteration: 0,
            retry_count: 0,
            streaming_tokens: 0,
            task_status: TaskStatus::Pending,
            should_continue: true,
            next_node: Some("plan".to_string()),
            last_tool_result: None,
            workspace: workspace.into(),
            approval_status: ApprovalStatus::Pending,
        }
    }

    /// Merge another state's append-only/mapping fields into this one,
    /// per the reducer contract. Scalars from `other` win (last-write-wins).
    pub fn merge(&mut self, other: WorkflowState) {
        self.messages.extend(other.messages);
        self.tool_calls.extend(other.tool_calls);
        self.sub_agents.extend(other.sub_agents);
        self.errors.extend(other.errors);
        self.review_results.extend(other.review_results);
        self.debug_logs.extend(other.debug_logs);
        self.findings.extend(other.findings);

        for (k, v) in other.context {
            self.context.insert(k, v);
        }
        for (k, v) in other.memory {
            self.memory.insert(k, v);
        }

        self.iteration = self.iteration.max(other.iteration);
        self.retry_count = self.retry_count.max(other.retry_count);
        self.streaming_tokens = self.streaming_tokens.max(other.streaming_tokens);

        self.task_status = other.task_status;
        self.should_continue = other.should_continue;
        self.next_node = other.next_node;
        self.last_tool_result = other.last_tool_result;
    }

    /// Force a terminal failed state, e.g. when the iteration bound is
    /// crossed (spec §3 invariant).
    pub fn force_failed(&mut self, reason: impl Into<String>) {
        self.task_status = TaskStatus::Failed;
        self.should_continue = false;
        self.errors.push(reason.into());
    }

    /// Structural validation against the §3 invariants, used by
    /// `CheckpointBackend::validate_state` (C7).
    pub fn validate(&self, max_iterations: u32) -> Result<(), String> {
        if self.iteration > max_iterations {
            return Err(format!(
                "iteration {} exceeds max_iterations {}",
                self.iteration, max_iterations
            ));
        }
        if self.task_status.is_terminal() && self.should_continue {
            return Err("terminal task_status must imply should_continue=false".to_string());
        }
        Ok(())
    }
}
