//! Workflow engine (C5): greeting short-circuit, plan types, and the
//! plan/execute/reflect state machine.

mod engine;
mod greeting;
mod plan;

pub use engine::{WorkflowEngine, WorkflowNode};
pub use greeting::{is_greeting, CANNED_GREETING_REPLY};
pub use plan::{parse_plan, Plan, PlanStep, PLAN_INSTRUCTION_TEMPLATE};
