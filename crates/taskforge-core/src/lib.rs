//! Orchestrator crate: config loading, the action dispatcher, the
//! sub-agent manager, the plan/execute/reflect workflow engine, the
//! session/checkpoint facade, observability sinks, and the orchestrator
//! facade that wires all of the above into a single `Update` stream.

pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod observability;
pub mod orchestrator;
pub mod session;
pub mod subagent;
pub mod workflow;

pub use config::{Config, ConfigError};
pub use dispatcher::{ActionDispatcher, StepOutcome};
pub use emitter::{ChannelEmitter, NullEmitter, UpdateEmitter};
pub use observability::ObservabilityHub;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use session::{SessionError, SessionManager, SessionResult};
pub use subagent::{Aggregated, ChildRunner, NullRunner, Roster, SubAgentManager, SubtaskRequest, SubtaskResult, WorkflowChildRunner};
pub use workflow::{is_greeting, Plan, PlanStep, WorkflowEngine, WorkflowNode, CANNED_GREETING_REPLY};
