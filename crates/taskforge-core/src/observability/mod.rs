//! Observability (C8): four independently optional sinks, all safe for
//! concurrent writes and never raising into the caller — grounded on the
//! teacher's `runtime/channel/tool_trace_emitter.rs` /
//! `runtime/background_agent/event_log.rs` "append + emit tracing event"
//! pattern.

mod decisions;
mod log;
mod metrics_sink;
mod tool_log;

use std::sync::Arc;

pub use decisions::{Decision, DecisionTracker};
pub use log::{LogKind, LogRecord, StructuredLog};
pub use metrics_sink::{MetricSample, MetricsSink};
pub use tool_log::{ToolInvocation, ToolLogger};

/// Bundles the four sinks behind one shared handle so the orchestrator
/// facade and the dispatcher it builds can each hold a clone without
/// threading four separate `Arc`s through every constructor.
pub struct ObservabilityHub {
    pub log: Arc<StructuredLog>,
    pub decisions: Arc<DecisionTracker>,
    pub tools: Arc<ToolLogger>,
    pub metrics: Arc<MetricsSink>,
}

impl ObservabilityHub {
    pub fn new() -> Self {
        Self {
            log: Arc::new(StructuredLog::new()),
            decisions: Arc::new(DecisionTracker::new()),
            tools: Arc::new(ToolLogger::new()),
            metrics: Arc::new(MetricsSink::new()),
        }
    }
}

impl Default for ObservabilityHub {
    fn default() -> Self {
        Self::new()
    }
}
