//! LLM Gateway, Tool-Safety Policy, Cache & Optimizer, and Intent Router
//! (C1-C4): the AI-facing half of the orchestrator.

pub mod cache;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod optimizer;
pub mod router;
pub mod security;

pub use error::{AiError, Result};
pub use llm::CachingLlmGateway;
pub use metrics::{Acquisition, PerfMonitor, TimerSnapshot};
pub use optimizer::{OptimizerConfig, OptimizerReport, StateOptimizer};
pub use router::{Complexity, IntentClassification, IntentRouter};
pub use security::{AccessMode, SafetyConfig, SecurityPolicy, Stats as SecurityStats, Violation, ViolationKind};
