//! Action dispatcher (C9): translates a planner-emitted `{action,
//! parameters}` object into a tool call (gated by C2), a terminal
//! `COMPLETE`, or a `DELEGATE_TO_SUB_AGENT` call into C6. Unknown actions
//! are reported back as a step-level error, never a task failure.

use std::sync::Arc;

use serde_json::Value;
use taskforge_ai::{AccessMode, SecurityPolicy};
use taskforge_traits::{Task, ToolOutcome, ToolRegistry, ToolSchema};

use crate::observability::ToolLogger;
use crate::subagent::{SubAgentManager, SubtaskRequest};

pub const COMPLETE_ACTION: &str = "COMPLETE";
pub const DELEGATE_ACTION: &str = "DELEGATE_TO_SUB_AGENT";

#[derive(Debug)]
pub enum StepOutcome {
    ToolSuccess(Value),
    ToolError(String),
    /// A safety violation is a step-level failure (spec §7): it is
    /// reported back into the plan, never aborts the task directly.
    SafetyViolation(String),
    Complete(String),
    Delegated(String),
    UnknownAction(String),
    InvalidParameters(String),
}

/// Translates dispatcher-level actions into tool calls, gated by the
/// tool-safety policy, with `COMPLETE`/`DELEGATE_TO_SUB_AGENT` handled as
/// dispatcher-level terminals rather than registered tools.
pub struct ActionDispatcher {
    registry: ToolRegistry,
    safety: Arc<SecurityPolicy>,
    sub_agents: Arc<SubAgentManager>,
    tool_logger: Option<Arc<ToolLogger>>,
}

impl ActionDispatcher {
    pub fn new(registry: ToolRegistry, safety: Arc<SecurityPolicy>, sub_agents: Arc<SubAgentManager>) -> Self {
        Self {
            registry,
            safety,
            sub_agents,
            tool_logger: None,
        }
    }

    /// Attaches a tool logger; every successful tool lookup that reaches
    /// actual execution gets a start/end record.
    pub fn with_tool_logger(mut self, tool_logger: Arc<ToolLogger>) -> Self {
        self.tool_logger = Some(tool_logger);
        self
    }

    pub async fn dispatch(&self, action: &str, parameters: Value, parent_task: &Task) -> StepOutcome {
        let action = action.to_uppercase();

        if action == COMPLETE_ACTION {
            return match parameters.get("result").and_then(Value::as_str) {
                Some(result) => StepOutcome::Complete(result.to_string()),
                None => StepOutcome::InvalidParameters("COMPLETE requires a 'result' string".to_string()),
            };
        }

        if action == DELEGATE_ACTION {
            return self.delegate(parameters, parent_task).await;
        }

        let Some(tool) = self.registry.get(&action) else {
            return StepOutcome::UnknownAction(format!("no tool registered for action '{action}'"));
        };

        if let Some(violation) = self.check_safety(&action, &parameters) {
            return StepOutcome::SafetyViolation(violation);
        }

        let call_id = uuid::Uuid::new_v4().to_string();
        if let Some(logger) = &self.tool_logger {
            logger.start(call_id.clone(), action.clone(), parameters.clone());
        }

        let outcome = tool.execute(parameters).await;

        if let Some(logger) = &self.tool_logger {
            match &outcome {
                ToolOutcome::Success(value) => logger.end(&call_id, true, Some(value.clone())),
                ToolOutcome::Error(message) => logger.end(&call_id, false, Some(serde_json::json!(message))),
            }
        }

        match outcome {
            ToolOutcome::Success(value) => StepOutcome::ToolSuccess(value),
            ToolOutcome::Error(message) => StepOutcome::ToolError(message),
        }
    }

    fn check_safety(&self, action: &str, parameters: &Value) -> Option<String> {
        if let Some(command) = parameters.get("command").and_then(Value::as_str) {
            if let Some(violation) = self.safety.check_command(command) {
                return Some(violation.message);
            }
        }
        if let Some(path) = parameters.get("path").and_then(Value::as_str) {
            let mode = if action.contains("WRITE") || action.contains("DELETE") {
                AccessMode::Write
            } else {
                AccessMode::Read
            };
            if let Some(violation) = self.safety.check_file_access(path, mode) {
                return Some(violation.message);
            }
        }
        None
    }

    /// Tool schemas available to the planner, used to populate the plan
    /// prompt's list of callable actions.
    pub fn available_actions(&self) -> Vec<ToolSchema> {
        self.registry.schemas()
    }

    async fn delegate(&self, parameters: Value, parent_task: &Task) -> StepOutcome {
        let Some(description) = parameters.get("description").and_then(Value::as_str) else {
            return StepOutcome::InvalidParameters(
                "DELEGATE_TO_SUB_AGENT requires a 'description' string".to_string(),
            );
        };

        let request = SubtaskRequest {
            description: description.to_string(),
            context: parameters.get("context").cloned().unwrap_or(Value::Null),
        };

        let aggregated = self.sub_agents.execute_with_subagents(parent_task, request).await;
        StepOutcome::Delegated(aggregated.combined_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use taskforge_ai::SafetyConfig;
    use taskforge_traits::{Domain, Tool};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, parameters: Value) -> ToolOutcome {
            ToolOutcome::Success(parameters)
        }
    }

    fn test_task() -> Task {
        Task::new("demo task", Domain::General)
    }

    #[tokio::test]
    async fn test_complete_action_is_a_terminal_outcome() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let dispatcher = ActionDispatcher::new(
            registry,
            Arc::new(SecurityPolicy::new(SafetyConfig::disabled())),
            crate::subagent::test_support::empty_manager(),
        );
        let outcome = dispatcher
            .dispatch("complete", serde_json::json!({"result": "all done"}), &test_task())
            .await;
        assert!(matches!(outcome, StepOutcome::Complete(r) if r == "all done"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_fatal() {
        let dispatcher = ActionDispatcher::new(
            ToolRegistry::new(),
            Arc::new(SecurityPolicy::new(SafetyConfig::disabled())),
            crate::subagent::test_support::empty_manager(),
        );
        let outcome = dispatcher
            .dispatch("RUN_NONEXISTENT", Value::Null, &test_task())
            .await;
        assert!(matches!(outcome, StepOutcome::UnknownAction(_)));
    }

    #[tokio::test]
    async fn test_denylisted_command_is_a_safety_violation_not_a_tool_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let safety = SafetyConfig {
            enabled: true,
            command_denylist: vec!["rm -rf /".to_string()],
            ..Default::default()
        };
        let dispatcher = ActionDispatcher::new(
            registry,
            Arc::new(SecurityPolicy::new(safety)),
            crate::subagent::test_support::empty_manager(),
        );
        let outcome = dispatcher
            .dispatch("ECHO", serde_json::json!({"command": "rm -rf /tmp"}), &test_task())
            .await;
        assert!(matches!(outcome, StepOutcome::SafetyViolation(_)));
    }
}
