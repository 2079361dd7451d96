//! State Optimizer (C3): keeps a [`WorkflowState`] within configured size
//! bounds between iterations, grounded on the teacher's `Cache` eviction
//! shape but applied to message/tool-call history truncation instead of
//! cache eviction.

use serde::{Deserialize, Serialize};
use taskforge_traits::WorkflowState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub max_messages: usize,
    pub max_tool_calls: usize,
    pub max_context_kb: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_tool_calls: 100,
            max_context_kb: 256,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizerReport {
    pub messages_truncated: usize,
    pub tool_calls_truncated: usize,
    pub context_over_budget: bool,
    pub context_size_kb: usize,
}

pub struct StateOptimizer {
    config: OptimizerConfig,
}

impl StateOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Truncates `messages`/`tool_calls` from the head when over their
    /// configured caps; `context` is only measured and logged, never
    /// silently dropped — the caller decides what to do about it.
    pub fn optimize(&self, state: &mut WorkflowState) -> OptimizerReport {
        let mut report = OptimizerReport::default();

        if state.messages.len() > self.config.max_messages {
            let drop_count = state.messages.len() - self.config.max_messages;
            state.messages.drain(0..drop_count);
            report.messages_truncated = drop_count;
        }

        if state.tool_calls.len() > self.config.max_tool_calls {
            let drop_count = state.tool_calls.len() - self.config.max_tool_calls;
            state.tool_calls.drain(0..drop_count);
            report.tool_calls_truncated = drop_count;
        }

        let context_bytes = serde_json::to_vec(&state.context).map(|v| v.len()).unwrap_or(0);
        let context_kb = context_bytes / 1024;
        report.context_size_kb = context_kb;
        if context_kb > self.config.max_context_kb {
            report.context_over_budget = true;
            tracing::warn!(
                context_size_kb = context_kb,
                max_context_kb = self.config.max_context_kb,
                "workflow context exceeds configured budget"
            );
        }

        if report.messages_truncated > 0 || report.tool_calls_truncated > 0 {
            tracing::debug!(
                messages_truncated = report.messages_truncated,
                tool_calls_truncated = report.tool_calls_truncated,
                "truncated oldest workflow history to stay within configured caps"
            );
        }

        report
    }
}
