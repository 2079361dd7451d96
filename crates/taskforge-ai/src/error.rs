//! Error types for the AI module, grounded on the teacher's `error.rs`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("all endpoints unavailable after retries")]
    AllEndpointsUnavailable,

    #[error("malformed response: {0}")]
    InvalidFormat(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AiError>;

impl AiError {
    /// Timeouts and malformed responses are retryable; anything else is
    /// terminal for the current endpoint (spec §4.1 failure semantics).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::Llm(_) | AiError::InvalidFormat(_))
    }
}
