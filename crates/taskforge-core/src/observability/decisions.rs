//! Decision tracker (C8.2): records explicit agent decisions with
//! reasoning, alternatives considered, and confidence, keyed for
//! per-agent retrieval and aggregate statistics.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: i64,
    pub agent: String,
    pub choice: String,
    pub reasoning: String,
    pub alternatives: Vec<String>,
    pub confidence: f32,
}

#[derive(Default)]
pub struct DecisionTracker {
    decisions: RwLock<Vec<Decision>>,
}

impl DecisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        agent: impl Into<String>,
        choice: impl Into<String>,
        reasoning: impl Into<String>,
        alternatives: Vec<String>,
        confidence: f32,
    ) {
        let decision = Decision {
            timestamp: chrono::Utc::now().timestamp_millis(),
            agent: agent.into(),
            choice: choice.into(),
            reasoning: reasoning.into(),
            alternatives,
            confidence,
        };
        tracing::debug!(agent = %decision.agent, choice = %decision.choice, confidence, "agent decision");
        if let Ok(mut decisions) = self.decisions.write() {
            decisions.push(decision);
        }
    }

    pub fn by_agent(&self, agent: &str) -> Vec<Decision> {
        self.decisions
            .read()
            .map(|d| d.iter().filter(|d| d.agent == agent).cloned().collect())
            .unwrap_or_default()
    }

    pub fn mean_confidence(&self) -> f32 {
        let decisions = self.decisions.read().unwrap_or_else(|e| e.into_inner());
        if decisions.is_empty() {
            return 0.0;
        }
        decisions.iter().map(|d| d.confidence).sum::<f32>() / decisions.len() as f32
    }

    pub fn len(&self) -> usize {
        self.decisions.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_agent_filters_to_that_agent() {
        let tracker = DecisionTracker::new();
        tracker.record("planner", "use parallel strategy", "subtasks are independent", vec![], 0.8);
        tracker.record("reflect", "stop", "success predicate met", vec![], 0.9);
        assert_eq!(tracker.by_agent("planner").len(), 1);
        assert_eq!(tracker.by_agent("missing").len(), 0);
    }

    #[test]
    fn test_mean_confidence() {
        let tracker = DecisionTracker::new();
        tracker.record("a", "x", "r", vec![], 0.4);
        tracker.record("a", "y", "r", vec![], 0.6);
        assert!((tracker.mean_confidence() - 0.5).abs() < 1e-6);
    }
}
