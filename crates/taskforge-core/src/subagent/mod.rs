//! Sub-agent manager (C6): task decomposition, roster, parallel execution.

mod child_runner;
mod manager;
mod roster;

pub use child_runner::WorkflowChildRunner;
pub use manager::{Aggregated, ChildRunner, NullRunner, SubAgentManager, SubtaskRequest, SubtaskResult};
pub use roster::{RoleDefinition, Roster};

#[cfg(test)]
pub use manager::test_support;
