//! LLM Gateway (spec §4.1): a provider-agnostic `LlmClient` trait, a
//! deterministic mock implementation, endpoint health tracking, a
//! failover/retry decorator, and a response-cache decorator on top of that.

pub mod caching_gateway;
pub mod client;
pub mod endpoint;
pub mod failover;
pub mod mock_client;

pub use caching_gateway::CachingLlmGateway;
pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, StreamChunk,
    StreamResult, TokenUsage, ToolCallRequest,
};
pub use endpoint::{Endpoint, EndpointTable, Health, HealthCheckConfig};
pub use failover::{FailoverGateway, RetryConfig};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
