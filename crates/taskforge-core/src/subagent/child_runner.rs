//! Wires a sub-agent's work to a genuinely nested [`WorkflowEngine`] run
//! (spec §4.6: isolated child state — a read-only context snapshot, empty
//! messages — and a shorter iteration cap). Each child gets its own
//! dispatcher scoped to its role's tool allowlist and its own sub-agent
//! manager wired to [`NullRunner`], so sub-agents cannot themselves spawn
//! grandchildren — decomposition is one level deep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use taskforge_ai::{CachingLlmGateway, Complexity, OptimizerConfig, SecurityPolicy, StateOptimizer};
use taskforge_traits::{AgentType, Domain, Task, TaskStatus, ToolRegistry, WorkflowState};

use crate::dispatcher::ActionDispatcher;
use crate::emitter::NullEmitter;
use crate::subagent::manager::{ChildRunner, NullRunner, SubAgentManager};
use crate::subagent::roster::Roster;
use crate::workflow::WorkflowEngine;

pub struct WorkflowChildRunner {
    gateway: Arc<CachingLlmGateway>,
    registry: ToolRegistry,
    safety: Arc<SecurityPolicy>,
    roster: Arc<Roster>,
    optimizer: OptimizerConfig,
    default_iteration_cap: u32,
    recursion_limit: u32,
}

impl WorkflowChildRunner {
    pub fn new(
        gateway: Arc<CachingLlmGateway>,
        registry: ToolRegistry,
        safety: Arc<SecurityPolicy>,
        roster: Arc<Roster>,
        optimizer: OptimizerConfig,
        default_iteration_cap: u32,
        recursion_limit: u32,
    ) -> Self {
        Self {
            gateway,
            registry,
            safety,
            roster,
            optimizer,
            default_iteration_cap,
            recursion_limit,
        }
    }
}

#[async_trait]
impl ChildRunner for WorkflowChildRunner {
    async fn run(&self, agent_type: AgentType, description: &str, context: &Value) -> Result<String, String> {
        let role = self.roster.get(agent_type);
        let allowed_tools = role.map(|r| r.allowed_tools.clone()).unwrap_or_default();
        let iteration_cap = role.map(|r| r.max_iterations).unwrap_or(self.default_iteration_cap).min(self.default_iteration_cap.max(1));

        let child_registry = self.registry.filtered(&allowed_tools);
        let leaf_sub_agents = Arc::new(SubAgentManager::new(None, Roster::with_defaults(), 1, Duration::from_secs(1), Arc::new(NullRunner)));
        let dispatcher = Arc::new(ActionDispatcher::new(child_registry, self.safety.clone(), leaf_sub_agents));
        let optimizer = StateOptimizer::new(self.optimizer.clone());
        let engine = WorkflowEngine::new(
            self.gateway.clone(),
            dispatcher,
            optimizer,
            Arc::new(NullEmitter),
            iteration_cap,
            self.recursion_limit,
        );

        let mut task = Task::new(description, Domain::General);
        let mut state = WorkflowState::new("");
        state.messages.clear();
        if let Value::Object(map) = context {
            for (key, value) in map {
                state.context.insert(key.clone(), value.clone());
            }
        }

        let (_final_state, _node) = engine.run(&mut task, state, Complexity::Simple).await;

        match task.status {
            TaskStatus::Completed => Ok(task.result.unwrap_or_default()),
            _ => Err(task.error.unwrap_or_else(|| "child workflow did not complete".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use taskforge_ai::llm::{CachingLlmGateway as Gateway, Endpoint, EndpointTable, FailoverGateway, HealthCheckConfig, MockLlmClient, MockStep, RetryConfig};
    use taskforge_ai::SafetyConfig;

    fn gateway(steps: Vec<MockStep>) -> Arc<Gateway> {
        let client = MockLlmClient::from_steps("model", steps);
        let table = EndpointTable::new(vec![Arc::new(Endpoint::new(Arc::new(client), 0))], HealthCheckConfig::default());
        Arc::new(Gateway::new(FailoverGateway::new(table, RetryConfig::default()), 10, StdDuration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_child_runner_completes_a_greeting_subtask_with_zero_tool_calls() {
        let runner = WorkflowChildRunner::new(
            gateway(vec![]),
            ToolRegistry::new(),
            Arc::new(SecurityPolicy::new(SafetyConfig::disabled())),
            Arc::new(Roster::with_defaults()),
            OptimizerConfig::default(),
            10,
            20,
        );

        let result = runner.run(AgentType::Generalist, "hello", &Value::Null).await;
        assert!(result.is_ok());
    }
}
