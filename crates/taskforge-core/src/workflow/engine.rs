//! Workflow engine (C5): the hand-rolled `plan → execute → reflect → plan
//! …` state machine. REDESIGN FLAGS call for replacing an external graph
//! library with an explicit state machine carrying its own iteration and
//! recursion limits as first-class fields; this is that replacement.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use taskforge_ai::CachingLlmGateway;
use taskforge_ai::llm::{CompletionRequest, Message as LlmMessage};
use taskforge_ai::{Complexity, StateOptimizer};
use taskforge_traits::{ApprovalStatus, Message, MessageRole, Task, TaskStatus, ToolCall, Update, WorkflowState};

use crate::dispatcher::{ActionDispatcher, StepOutcome};
use crate::emitter::UpdateEmitter;
use crate::workflow::greeting::{self, CANNED_GREETING_REPLY};
use crate::workflow::plan::{self, Plan, PLAN_INSTRUCTION_TEMPLATE};

/// The three cyclic nodes plus the terminal/gate states (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowNode {
    Planning,
    Executing,
    Reflecting,
    AwaitingApproval,
    Completed,
    Failed,
    Cancelled,
}

/// Consecutive reflect passes with no new ToolCall and no new assistant
/// message before a no-progress failure is declared.
const NO_PROGRESS_WINDOW: u32 = 3;
const SIMPLE_ITERATION_CAP: u32 = 10;

fn hard_cap_for_complexity(complexity: Complexity, max_iterations: u32) -> u32 {
    match complexity {
        Complexity::Simple => SIMPLE_ITERATION_CAP.min(max_iterations),
        // Moderate gets half of the configured ceiling, floored at the
        // simple cap — an explicit choice where the spec left a gap.
        Complexity::Moderate => (max_iterations / 2).max(SIMPLE_ITERATION_CAP).min(max_iterations),
        Complexity::Complex | Complexity::Critical => max_iterations,
    }
}

pub struct WorkflowEngine {
    gateway: Arc<CachingLlmGateway>,
    dispatcher: Arc<ActionDispatcher>,
    optimizer: StateOptimizer,
    emitter: Arc<dyn UpdateEmitter>,
    max_iterations: u32,
    recursion_limit: u32,
}

impl WorkflowEngine {
    pub fn new(
        gateway: Arc<CachingLlmGateway>,
        dispatcher: Arc<ActionDispatcher>,
        optimizer: StateOptimizer,
        emitter: Arc<dyn UpdateEmitter>,
        max_iterations: u32,
        recursion_limit: u32,
    ) -> Self {
        Self {
            gateway,
            dispatcher,
            optimizer,
            emitter,
            max_iterations,
            recursion_limit,
        }
    }

    /// Drives `task` to completion (or `awaiting_approval`/`failed`) from
    /// `state`. Returns the node the run stopped at — `AwaitingApproval`
    /// means the caller must supply an external decision and call
    /// [`resume_after_approval`](Self::resume_after_approval) before
    /// calling `run` again with the same state.
    pub async fn run(&self, task: &mut Task, mut state: WorkflowState, complexity: Complexity) -> (WorkflowState, WorkflowNode) {
        if greeting::is_greeting(&task.description) {
            task.complete(CANNED_GREETING_REPLY.to_string());
            state.task_status = TaskStatus::Completed;
            state.should_continue = false;
            state.messages.push(Message::new(MessageRole::Assistant, CANNED_GREETING_REPLY));
            self.emit_completed(task, CANNED_GREETING_REPLY).await;
            return (state, WorkflowNode::Completed);
        }

        if state.approval_status == ApprovalStatus::Pending && state.context.contains_key("pending_approval") {
            return (state, WorkflowNode::AwaitingApproval);
        }

        let hard_cap = hard_cap_for_complexity(complexity, self.max_iterations);
        let mut recursion_count = 0u32;
        let mut stale_iterations = 0u32;

        loop {
            recursion_count += 1;
            if recursion_count > self.recursion_limit {
                state.force_failed("recursion_limit exceeded");
                task.fail("recursion_limit exceeded".to_string());
                self.emit_error(task, "recursion_limit exceeded", "engine", false).await;
                return (state, WorkflowNode::Failed);
            }

            let tool_calls_before = state.tool_calls.len();
            let messages_before = state.messages.len();

            // plan node
            let mut plan = self.current_or_generated_plan(task, &mut state).await;

            let Some(step_index) = plan.next_unfinished_index() else {
                // Every step completed without an explicit COMPLETE action;
                // treat as no-progress rather than looping forever.
                stale_iterations += 1;
                if stale_iterations >= NO_PROGRESS_WINDOW {
                    state.force_failed("plan exhausted with no terminal action");
                    task.fail("plan exhausted with no terminal action".to_string());
                    self.emit_error(task, "plan exhausted with no terminal action", "engine", false).await;
                    return (state, WorkflowNode::Failed);
                }
                state.context.remove("plan");
                continue;
            };

            if plan.steps[step_index].sensitive && state.approval_status == ApprovalStatus::Pending {
                state.context.insert("pending_approval".to_string(), Value::Bool(true));
                state.context.insert("plan".to_string(), plan.to_value());
                return (state, WorkflowNode::AwaitingApproval);
            }

            // execute node
            let step = plan.steps[step_index].clone();
            let outcome = self
                .dispatcher
                .dispatch(&step.action, step.parameters.clone(), task)
                .await;
            self.apply_execute_outcome(task, &mut state, &mut plan, step_index, &step.action, step.parameters.clone(), outcome)
                .await;
            state.context.insert("plan".to_string(), plan.to_value());
            state.iteration += 1;

            if state.task_status.is_terminal() {
                return self.finish(task, state).await;
            }

            // reflect node
            self.emit_progress(task, state.iteration, hard_cap).await;

            if state.iteration >= hard_cap {
                let reason = format!("max iterations ({hard_cap}) reached without a terminal action");
                state.force_failed(reason.clone());
                task.fail(reason.clone());
                self.emit_error(task, &reason, "engine", false).await;
                return (state, WorkflowNode::Failed);
            }

            let made_progress = state.tool_calls.len() > tool_calls_before || state.messages.len() > messages_before;
            if made_progress {
                stale_iterations = 0;
            } else {
                stale_iterations += 1;
                if stale_iterations >= NO_PROGRESS_WINDOW {
                    state.force_failed("no progress across recent iterations");
                    task.fail("no progress across recent iterations".to_string());
                    self.emit_error(task, "no progress across recent iterations", "engine", false).await;
                    return (state, WorkflowNode::Failed);
                }
            }

            self.optimizer.optimize(&mut state);
            state.should_continue = true;
            state.next_node = Some("plan".to_string());
        }
    }

    /// Resolves an `awaiting_approval` gate. `approved = false` fails the
    /// task outright; `approved = true` lets the next `run` call proceed
    /// past the sensitive step. Idempotent: a second call on an
    /// already-resolved state is a no-op, matching `ApprovalStatus`'s
    /// monotonic transition.
    pub fn resume_after_approval(&self, state: &mut WorkflowState, approved: bool) {
        let next = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        state.approval_status.transition(next);
        state.context.remove("pending_approval");
        if !approved {
            state.force_failed("sensitive step rejected by approver");
        }
    }

    async fn current_or_generated_plan(&self, task: &Task, state: &mut WorkflowState) -> Plan {
        let existing = state.context.get("plan").and_then(Plan::from_value);
        if let Some(plan) = existing {
            if !plan.all_completed() {
                return plan;
            }
        }

        self.emit_thinking(task, "planning next steps").await;
        let actions = self.dispatcher.available_actions();
        let action_list = actions
            .iter()
            .map(|a| format!("- {} :: {}", a.name, a.description))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Task: {}\n\nAvailable actions:\n{action_list}\n\nPrior findings: {:?}\nPrior step errors: {:?}",
            task.description, state.findings, state.errors
        );
        let request = CompletionRequest::new(vec![
            LlmMessage::system(PLAN_INSTRUCTION_TEMPLATE),
            LlmMessage::user(prompt),
        ]);

        match self.gateway.complete(request).await {
            Ok(response) => {
                let text = response.content.unwrap_or_default();
                plan::parse_plan(&text).unwrap_or_else(|| single_complete_step_fallback(&text))
            }
            Err(error) => single_complete_step_fallback(&error.to_string()),
        }
    }

    async fn apply_execute_outcome(
        &self,
        task: &mut Task,
        state: &mut WorkflowState,
        plan: &mut Plan,
        step_index: usize,
        action: &str,
        parameters: Value,
        outcome: StepOutcome,
    ) {
        let call_id = uuid::Uuid::new_v4().to_string();
        self.emit_tool_call(task, &call_id, action, &parameters).await;
        let started = Instant::now();

        match outcome {
            StepOutcome::ToolSuccess(result) => {
                let call = ToolCall::new(action, parameters).succeed(result.clone(), started.elapsed().as_millis() as u64);
                state.last_tool_result = Some(result.clone());
                state.tool_calls.push(call);
                plan.mark_completed(step_index);
                self.emit_tool_result(task, &call_id, true, Some(result), None).await;
            }
            StepOutcome::ToolError(message) => {
                let call = ToolCall::new(action, parameters).fail(message.clone(), started.elapsed().as_millis() as u64);
                state.errors.push(message.clone());
                state.tool_calls.push(call);
                plan.mark_completed(step_index);
                self.emit_tool_result(task, &call_id, false, None, Some(message)).await;
            }
            StepOutcome::SafetyViolation(message) => {
                let call = ToolCall::new(action, parameters).fail(message.clone(), started.elapsed().as_millis() as u64);
                state.errors.push(format!("safety violation: {message}"));
                state.tool_calls.push(call);
                plan.mark_completed(step_index);
                self.emit_tool_result(task, &call_id, false, None, Some(message)).await;
            }
            StepOutcome::Complete(result) => {
                task.complete(result.clone());
                state.task_status = TaskStatus::Completed;
                state.should_continue = false;
                plan.mark_completed(step_index);
                self.emit_tool_result(task, &call_id, true, Some(Value::String(result)), None).await;
            }
            StepOutcome::Delegated(result) => {
                state.last_tool_result = Some(Value::String(result.clone()));
                plan.mark_completed(step_index);
                self.emit_tool_result(task, &call_id, true, Some(Value::String(result)), None).await;
            }
            StepOutcome::UnknownAction(message) | StepOutcome::InvalidParameters(message) => {
                // Not fatal: fed back to the planner as a step-level error so
                // it can correct itself within the iteration cap.
                state.errors.push(message.clone());
                plan.mark_completed(step_index);
                self.emit_tool_result(task, &call_id, false, None, Some(message)).await;
            }
        }
    }

    async fn finish(&self, task: &Task, state: WorkflowState) -> (WorkflowState, WorkflowNode) {
        match task.status {
            TaskStatus::Completed => {
                self.emit_completed(task, task.result.as_deref().unwrap_or_default()).await;
                (state, WorkflowNode::Completed)
            }
            TaskStatus::Failed => {
                self.emit_error(task, task.error.as_deref().unwrap_or("task failed"), "engine", false).await;
                (state, WorkflowNode::Failed)
            }
            TaskStatus::Cancelled => {
                self.emitter
                    .emit(Update::Cancelled {
                        task_id: task.id.clone(),
                        timestamp: Update::now_ms(),
                    })
                    .await;
                (state, WorkflowNode::Cancelled)
            }
            _ => (state, WorkflowNode::Reflecting),
        }
    }

    async fn emit_thinking(&self, task: &Task, content: &str) {
        self.emitter
            .emit(Update::Thinking {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                content: content.to_string(),
            })
            .await;
    }

    async fn emit_progress(&self, task: &Task, iteration: u32, max_iterations: u32) {
        self.emitter
            .emit(Update::Progress {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                iteration,
                max_iterations,
            })
            .await;
    }

    async fn emit_tool_call(&self, task: &Task, call_id: &str, tool_name: &str, parameters: &Value) {
        self.emitter
            .emit(Update::ToolCall {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                call_id: call_id.to_string(),
                tool_name: tool_name.to_string(),
                parameters: parameters.clone(),
            })
            .await;
    }

    async fn emit_tool_result(&self, task: &Task, call_id: &str, success: bool, result: Option<Value>, error: Option<String>) {
        self.emitter
            .emit(Update::ToolResult {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                call_id: call_id.to_string(),
                success,
                result,
                error,
            })
            .await;
    }

    async fn emit_completed(&self, task: &Task, result: &str) {
        self.emitter
            .emit(Update::Completed {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                result: result.to_string(),
            })
            .await;
    }

    async fn emit_error(&self, task: &Task, message: &str, component: &str, retried: bool) {
        self.emitter
            .emit(Update::Error {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                message: message.to_string(),
                component: component.to_string(),
                retried,
                suggestion: "review the task description and retry".to_string(),
            })
            .await;
    }
}

fn single_complete_step_fallback(reasoning_text: &str) -> Plan {
    Plan {
        steps: vec![plan::PlanStep {
            action: "COMPLETE".to_string(),
            parameters: serde_json::json!({"result": format!("unable to produce a structured plan: {reasoning_text}")}),
            success_predicate: None,
            sensitive: false,
            completed: false,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use taskforge_ai::llm::{Endpoint, EndpointTable, FailoverGateway, HealthCheckConfig, MockLlmClient, MockStep, RetryConfig};
    use taskforge_ai::{OptimizerConfig, SafetyConfig, SecurityPolicy};
    use taskforge_traits::{Domain, ToolRegistry};

    use crate::emitter::ChannelEmitter;
    use crate::subagent::test_support::empty_manager;

    fn gateway_with_steps(steps: Vec<MockStep>) -> Arc<CachingLlmGateway> {
        let client = MockLlmClient::from_steps("model", steps);
        let table = EndpointTable::new(
            vec![Arc::new(Endpoint::new(Arc::new(client), 0))],
            HealthCheckConfig::default(),
        );
        Arc::new(CachingLlmGateway::new(FailoverGateway::new(table, RetryConfig::default()), 10, Duration::from_secs(60)))
    }

    struct EchoTool;

    #[async_trait::async_trait]
    impl taskforge_traits::Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, parameters: Value) -> taskforge_traits::ToolOutcome {
            taskforge_traits::ToolOutcome::Success(parameters)
        }
    }

    fn test_engine(steps: Vec<MockStep>) -> (WorkflowEngine, tokio::sync::mpsc::Receiver<Update>) {
        let gateway = gateway_with_steps(steps);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let dispatcher = Arc::new(ActionDispatcher::new(
            registry,
            Arc::new(SecurityPolicy::new(SafetyConfig::disabled())),
            empty_manager(),
        ));
        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let engine = WorkflowEngine::new(
            gateway,
            dispatcher,
            StateOptimizer::new(OptimizerConfig::default()),
            Arc::new(ChannelEmitter::new(tx)),
            25,
            50,
        );
        (engine, rx)
    }

    #[tokio::test]
    async fn test_greeting_short_circuits_with_zero_iterations() {
        let (engine, _rx) = test_engine(vec![]);
        let mut task = Task::new("hello", Domain::General);
        let state = WorkflowState::new("/tmp/ws");
        let (state, node) = engine.run(&mut task, state, Complexity::Simple).await;
        assert_eq!(node, WorkflowNode::Completed);
        assert_eq!(state.iteration, 0);
        assert!(state.tool_calls.is_empty());
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_complete_action_terminates_the_loop() {
        let plan_json = serde_json::json!({"steps": [{"action": "COMPLETE", "parameters": {"result": "all set"}}]}).to_string();
        let (engine, _rx) = test_engine(vec![MockStep::text(plan_json)]);
        let mut task = Task::new("do a real task that is not a greeting", Domain::General);
        let state = WorkflowState::new("/tmp/ws");
        let (state, node) = engine.run(&mut task, state, Complexity::Simple).await;
        assert_eq!(node, WorkflowNode::Completed);
        assert_eq!(task.result.as_deref(), Some("all set"));
        assert_eq!(state.iteration, 1);
    }

    #[tokio::test]
    async fn test_sensitive_step_enters_awaiting_approval() {
        let plan_json = serde_json::json!({
            "steps": [{"action": "COMPLETE", "parameters": {"result": "done"}, "sensitive": true}]
        })
        .to_string();
        let (engine, _rx) = test_engine(vec![MockStep::text(plan_json)]);
        let mut task = Task::new("do a sensitive real task", Domain::General);
        let state = WorkflowState::new("/tmp/ws");
        let (state, node) = engine.run(&mut task, state, Complexity::Simple).await;
        assert_eq!(node, WorkflowNode::AwaitingApproval);
        assert_eq!(state.iteration, 0);
    }

    #[tokio::test]
    async fn test_iteration_hard_cap_fails_the_task() {
        // Every plan round returns a non-terminal, already-completed
        // no-op step so the loop is driven purely by the hard cap.
        let steps: Vec<MockStep> = (0..SIMPLE_ITERATION_CAP)
            .map(|_| MockStep::text(serde_json::json!({"steps": [{"action": "ECHO", "parameters": {"n": 1}}]}).to_string()))
            .collect();
        let (engine, _rx) = test_engine(steps);
        let mut task = Task::new("a task with no terminal action ever", Domain::General);
        let state = WorkflowState::new("/tmp/ws");
        let (state, node) = engine.run(&mut task, state, Complexity::Simple).await;
        assert_eq!(node, WorkflowNode::Failed);
        assert_eq!(state.iteration, SIMPLE_ITERATION_CAP);
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.as_deref().unwrap_or_default().contains("max iterations"));
    }
}
