//! Tool trait and registry boundary (spec §1: concrete tool implementations
//! — filesystem, git, shell, search — are an out-of-scope collaborator; the
//! core only sees this typed registry).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// JSON-Schema-shaped description of a tool's parameters, surfaced to the
/// LLM gateway so it can be included in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Outcome of one tool invocation — a value, never an exception (§9
/// design note: typed outcomes replace exceptions for control flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolOutcome {
    Success(Value),
    Error(String),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

/// Core trait implemented by every registered tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, parameters: Value) -> ToolOutcome;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Registry of tools looked up by uppercase action name (spec §4.9).
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_uppercase(), tool);
    }

    pub fn get(&self, action_name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&action_name.to_uppercase()).cloned()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Restrict to an allowlist of tool names (used to build a per-role
    /// registry for sub-agents, spec §4.6).
    pub fn filtered(&self, allowlist: &[String]) -> ToolRegistry {
        let allow: std::collections::HashSet<String> =
            allowlist.iter().map(|s| s.to_uppercase()).collect();
        ToolRegistry {
            tools: self
                .tools
                .iter()
                .filter(|(name, _)| allow.contains(*name))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, parameters: Value) -> ToolOutcome {
            ToolOutcome::Success(parameters)
        }
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("ECHO").is_some());
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_filtered_registry_restricts_allowlist() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let empty = registry.filtered(&[]);
        assert!(empty.get("echo").is_none());
        let allowed = registry.filtered(&["echo".to_string()]);
        assert!(allowed.get("echo").is_some());
    }
}
