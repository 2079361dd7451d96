//! Plan types attached to `context["plan"]` by the plan node (spec §4.5
//! step 2). A plan is a flat ordered list of steps; each step names a
//! dispatcher action, its parameters, and an optional success predicate
//! evaluated by the reflect node.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PLAN_INSTRUCTION_TEMPLATE: &str = r#"Produce a JSON object describing a plan to accomplish the task. Shape:
{"steps": [{"action": string (uppercase dispatcher action name), "parameters": object, "success_predicate": string | null, "sensitive": bool}]}
Available actions include registered tools, "COMPLETE" (parameters: {"result": string}) to finish the task, and "DELEGATE_TO_SUB_AGENT" (parameters: {"description": string, "context": object}) to hand off to specialized sub-agents.
Return only the JSON object."#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub success_predicate: Option<String>,
    /// Policy hook for C5's `awaiting_approval` state: a step the planner
    /// flags as sensitive pauses execution for external approval.
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn next_unfinished(&self) -> Option<&PlanStep> {
        self.steps.iter().find(|s| !s.completed)
    }

    pub fn next_unfinished_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| !s.completed)
    }

    pub fn mark_completed(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            step.completed = true;
        }
    }

    pub fn all_completed(&self) -> bool {
        self.steps.iter().all(|s| s.completed)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Parses the first `{...}` object out of an LLM completion's free text.
pub fn parse_plan(text: &str) -> Option<Plan> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    serde_json::from_str(&text[start..=end]).ok()
}
