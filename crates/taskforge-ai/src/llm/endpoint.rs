//! Endpoint health tracking for the gateway's failover path (spec §4.1).
//! The health table is guarded the way the teacher guards `SecurityPolicy`
//! in `SecurityChecker` — a single `RwLock` read on the hot path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::llm::client::LlmClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
}

pub struct Endpoint {
    pub client: Arc<dyn LlmClient>,
    pub priority: u32,
    health: RwLock<Health>,
    failure_count: RwLock<u32>,
}

impl Endpoint {
    pub fn new(client: Arc<dyn LlmClient>, priority: u32) -> Self {
        Self {
            client,
            priority,
            health: RwLock::new(Health::Healthy),
            failure_count: RwLock::new(0),
        }
    }

    pub async fn is_healthy(&self) -> bool {
        *self.health.read().await == Health::Healthy
    }

    async fn record_success(&self) {
        *self.failure_count.write().await = 0;
        *self.health.write().await = Health::Healthy;
    }

    async fn record_failure(&self, threshold: u32) {
        let mut count = self.failure_count.write().await;
        *count += 1;
        if *count >= threshold {
            *self.health.write().await = Health::Unhealthy;
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub probe_interval: Duration,
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(30),
            failure_threshold: 3,
        }
    }
}

/// Priority-ordered endpoint table with a background health prober.
pub struct EndpointTable {
    endpoints: Vec<Arc<Endpoint>>,
    config: HealthCheckConfig,
}

impl EndpointTable {
    pub fn new(mut endpoints: Vec<Arc<Endpoint>>, config: HealthCheckConfig) -> Arc<Self> {
        endpoints.sort_by_key(|e| e.priority);
        Arc::new(Self { endpoints, config })
    }

    /// Endpoints in priority order; if every endpoint is unhealthy, returns
    /// all of them anyway (degraded mode, spec §4.1) so a stale health
    /// cache can never permanently wedge the gateway.
    pub async fn ordered_candidates(&self) -> Vec<Arc<Endpoint>> {
        let mut healthy = Vec::new();
        for endpoint in &self.endpoints {
            if endpoint.is_healthy().await {
                healthy.push(endpoint.clone());
            }
        }
        if healthy.is_empty() {
            self.endpoints.clone()
        } else {
            healthy
        }
    }

    pub async fn mark_success(&self, endpoint: &Arc<Endpoint>) {
        endpoint.record_success().await;
    }

    pub async fn mark_failure(&self, endpoint: &Arc<Endpoint>) {
        endpoint.record_failure(self.config.failure_threshold).await;
    }

    /// Background probe loop, grounded on the teacher's
    /// `Cache::cleanup_loop` pattern: a `tokio::spawn`ed task that wakes on
    /// a fixed interval and re-derives health from a trivial probe call.
    pub fn spawn_prober(self: &Arc<Self>, cancel: CancellationToken) {
        let table = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(table.config.probe_interval) => {}
                }
                for endpoint in &table.endpoints {
                    let probe = endpoint
                        .client
                        .complete(crate::llm::client::CompletionRequest::new(vec![
                            crate::llm::client::Message::user("ping"),
                        ]))
                        .await;
                    match probe {
                        Ok(_) => table.mark_success(endpoint).await,
                        Err(_) => table.mark_failure(endpoint).await,
                    }
                }
            }
        });
    }
}
