//! Failover + retry decorator, grounded on the teacher's
//! `RetryingLlmClient` (`llm/retry.rs`): exponential backoff per endpoint,
//! falling through to the next endpoint on a terminal error or retry
//! exhaustion (spec §4.1).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::{AiError, Result};
use crate::llm::client::{CompletionRequest, CompletionResponse, LlmClient, StreamResult};
use crate::llm::endpoint::EndpointTable;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_secs: f64,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

impl RetryConfig {
    /// `base^attempt` seconds, jittered by a small random factor (spec
    /// §4.1 retry policy).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_secs.powi(attempt as i32);
        let jitter = 1.0 + rand::rng().random_range(-self.jitter_fraction..=self.jitter_fraction);
        Duration::from_secs_f64((base * jitter).max(0.0))
    }
}

/// Tries each healthy endpoint in priority order, retrying transient
/// failures within an endpoint before falling through to the next one.
pub struct FailoverGateway {
    endpoints: Arc<EndpointTable>,
    retry: RetryConfig,
}

impl FailoverGateway {
    pub fn new(endpoints: Arc<EndpointTable>, retry: RetryConfig) -> Self {
        Self { endpoints, retry }
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let candidates = self.endpoints.ordered_candidates().await;
        let mut last_error = None;

        for endpoint in &candidates {
            for attempt in 0..self.retry.max_attempts {
                match endpoint.client.complete(request.clone()).await {
                    Ok(response) => {
                        self.endpoints.mark_success(endpoint).await;
                        return Ok(response);
                    }
                    Err(error) => {
                        let retryable = error.is_retryable();
                        last_error = Some(error);
                        if !retryable {
                            break;
                        }
                        if attempt + 1 < self.retry.max_attempts {
                            tracing::warn!(
                                provider = endpoint.client.provider(),
                                attempt = attempt + 1,
                                "retrying LLM request"
                            );
                            tokio::time::sleep(self.retry.delay_for(attempt + 1)).await;
                        }
                    }
                }
            }
            self.endpoints.mark_failure(endpoint).await;
        }

        Err(last_error.unwrap_or(AiError::AllEndpointsUnavailable))
    }

    pub fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        // Streaming bypasses cache and failover retry loop (spec §4.1):
        // the first healthy endpoint handles the whole stream.
        let endpoints = self.endpoints.clone();
        Box::pin(async_stream::try_stream! {
            let candidates = endpoints.ordered_candidates().await;
            let Some(endpoint) = candidates.into_iter().next() else {
                Err(AiError::AllEndpointsUnavailable)?;
                return;
            };
            let mut stream = endpoint.client.complete_stream(request);
            use futures::StreamExt;
            while let Some(item) = stream.next().await {
                yield item?;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::Message;
    use crate::llm::endpoint::{Endpoint, HealthCheckConfig};
    use crate::llm::mock_client::{MockLlmClient, MockStep};

    #[tokio::test]
    async fn test_falls_through_to_second_endpoint_on_terminal_error() {
        let primary = MockLlmClient::new("primary");
        primary.push_step(MockStep::error("boom")).await;
        let secondary = MockLlmClient::from_steps("secondary", vec![MockStep::text("ok")]);

        let table = EndpointTable::new(
            vec![
                Arc::new(Endpoint::new(Arc::new(primary), 0)),
                Arc::new(Endpoint::new(Arc::new(secondary), 1)),
            ],
            HealthCheckConfig::default(),
        );
        let gateway = FailoverGateway::new(
            table,
            RetryConfig {
                max_attempts: 1,
                backoff_base_secs: 0.0,
                jitter_fraction: 0.0,
            },
        );

        let response = gateway
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_all_endpoints_unavailable() {
        let a = MockLlmClient::new("a");
        a.push_step(MockStep::error("down")).await;
        let table = EndpointTable::new(
            vec![Arc::new(Endpoint::new(Arc::new(a), 0))],
            HealthCheckConfig::default(),
        );
        let gateway = FailoverGateway::new(
            table,
            RetryConfig {
                max_attempts: 1,
                backoff_base_secs: 0.0,
                jitter_fraction: 0.0,
            },
        );
        let result = gateway
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await;
        assert!(result.is_err());
    }
}
