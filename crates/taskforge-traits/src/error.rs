//! Shared orchestrator error taxonomy (spec §7), grounded on
//! `restflow-ai/src/error.rs`'s `AiError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("all LLM endpoints unavailable after retries")]
    AllEndpointsUnavailable,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("safety violation: {0}")]
    SafetyViolation(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("planner error: {0}")]
    Planner(String),

    #[error("exceeded max iterations ({0})")]
    MaxIterations(u32),

    #[error("exceeded recursion limit ({0})")]
    RecursionLimit(u32),

    #[error("task cancelled")]
    Cancelled,

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] crate::checkpoint::CheckpointError),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Whether retrying the same operation might succeed. Mirrors
    /// `AiError::is_retryable` from the teacher's `llm/retry.rs`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestratorError::Llm(_))
    }

    /// Component name for user-visible error messages (spec §7).
    pub fn component(&self) -> &'static str {
        match self {
            OrchestratorError::Config(_) => "config",
            OrchestratorError::AllEndpointsUnavailable | OrchestratorError::Llm(_) => {
                "llm-gateway"
            }
            OrchestratorError::SafetyViolation(_) => "tool-safety",
            OrchestratorError::Tool(_) => "tool",
            OrchestratorError::Planner(_) => "workflow-engine",
            OrchestratorError::MaxIterations(_) | OrchestratorError::RecursionLimit(_) => {
                "workflow-engine"
            }
            OrchestratorError::Cancelled => "orchestrator",
            OrchestratorError::Checkpoint(_) => "session-checkpoint",
            OrchestratorError::Invariant(_) => "orchestrator",
            OrchestratorError::Json(_) => "serialization",
        }
    }

    /// Suggested next action surfaced to the operator (spec §7).
    pub fn suggestion(&self) -> String {
        match self {
            OrchestratorError::MaxIterations(n) => {
                format!("re-run with max_iterations higher than {n}")
            }
            OrchestratorError::RecursionLimit(n) => {
                format!("re-run with recursion_limit higher than {n}")
            }
            OrchestratorError::AllEndpointsUnavailable => {
                "check endpoint health and configured URLs".to_string()
            }
            OrchestratorError::SafetyViolation(_) => {
                "adjust the tool-safety policy or rephrase the request".to_string()
            }
            _ => "inspect the error detail and retry the task".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_is_retryable() {
        assert!(OrchestratorError::Llm("timeout".into()).is_retryable());
        assert!(!OrchestratorError::MaxIterations(5).is_retryable());
    }

    #[test]
    fn test_suggestion_names_the_bound() {
        let err = OrchestratorError::MaxIterations(10);
        assert!(err.suggestion().contains("10"));
    }
}
