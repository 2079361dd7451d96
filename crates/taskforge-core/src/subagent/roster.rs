//! Per-role tool allowlist configuration, grounded on the teacher's
//! `AgentDefinitionRegistry` (`runtime/subagent/definition.rs`) but
//! simplified to the twelve fixed roles the domain model already names
//! rather than an open-ended registry of operator-defined agent types.

use std::collections::HashMap;

use taskforge_traits::AgentType;

/// One row of the roster: a role's display purpose and the tool names it
/// may call when the dispatcher builds its child registry.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub agent_type: AgentType,
    pub description: &'static str,
    pub allowed_tools: Vec<String>,
    pub max_iterations: u32,
}

/// Maps each of the twelve fixed roles to its tool allowlist. Built with
/// sane defaults; callers may override a role's allowlist via
/// [`Roster::set_allowed_tools`] before wiring the sub-agent manager.
pub struct Roster {
    roles: HashMap<AgentType, RoleDefinition>,
}

impl Roster {
    /// Builds the roster with the built-in default allowlists. Unknown or
    /// narrowly-scoped tool names are expected to be filtered down further
    /// by `ToolRegistry::filtered` at spawn time, so these lists are
    /// intentionally permissive categories rather than exact tool names.
    pub fn with_defaults() -> Self {
        let mut roles = HashMap::new();
        for (agent_type, description, tools, max_iterations) in DEFAULT_ROLES {
            roles.insert(
                agent_type,
                RoleDefinition {
                    agent_type,
                    description,
                    allowed_tools: tools.iter().map(|s| s.to_string()).collect(),
                    max_iterations,
                },
            );
        }
        Self { roles }
    }

    pub fn get(&self, agent_type: AgentType) -> Option<&RoleDefinition> {
        self.roles.get(&agent_type)
    }

    pub fn set_allowed_tools(&mut self, agent_type: AgentType, tools: Vec<String>) {
        if let Some(role) = self.roles.get_mut(&agent_type) {
            role.allowed_tools = tools;
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::with_defaults()
    }
}

type RoleRow = (AgentType, &'static str, &'static [&'static str], u32);

const DEFAULT_ROLES: &[RoleRow] = &[
    (AgentType::CodeReader, "reads and summarizes source code", &["read_file", "search", "list_directory"], 8),
    (AgentType::Analyzer, "analyzes data or code for patterns", &["read_file", "search"], 10),
    (AgentType::Tester, "runs and interprets test suites", &["read_file", "run_command"], 12),
    (AgentType::Reviewer, "reviews changes for correctness and style", &["read_file", "search"], 10),
    (AgentType::DocWriter, "writes or updates documentation", &["read_file", "write_file"], 8),
    (AgentType::DataCleaner, "cleans and normalizes structured data", &["read_file", "write_file"], 10),
    (AgentType::Researcher, "gathers information from available sources", &["search", "read_file"], 12),
    (AgentType::Planner, "decomposes a task into ordered subtasks", &[], 6),
    (AgentType::Debugger, "investigates and diagnoses failures", &["read_file", "search", "run_command"], 15),
    (AgentType::Refactorer, "restructures code without changing behavior", &["read_file", "write_file", "search"], 12),
    (AgentType::Summarizer, "condenses prior results into a summary", &[], 4),
    (AgentType::Generalist, "handles miscellaneous subtasks", &["read_file", "write_file", "search", "run_command"], 10),
];
