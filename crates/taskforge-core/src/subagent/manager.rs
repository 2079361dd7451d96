//! Sub-agent manager (C6): LLM-driven decomposition of a task into
//! dependent subtasks, executed in parallel batches bounded by a
//! semaphore, aggregated back into a single result. Grounded on the
//! teacher's `runtime/subagent/spawn.rs` (the `max_parallel_agents`
//! bound, the per-subagent timeout, tracking running/completed/failed
//! counts) generalized from a flat spawn API to dependency-ordered
//! batches, since this system's subtasks can depend on one another.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskforge_ai::CachingLlmGateway;
use taskforge_ai::llm::{CompletionRequest, Message};
use taskforge_traits::{AgentType, Task};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::subagent::roster::Roster;

const DECOMPOSE_INSTRUCTION: &str = r#"Decide whether the following task benefits from decomposition into independent or dependent subtasks handled by specialized agents. Respond with a single JSON object of the shape:
{"complexity": "simple"|"moderate"|"complex", "requires_decomposition": bool, "subtasks": [{"id": string, "description": string, "agent_type": one of "code_reader","analyzer","tester","reviewer","doc_writer","data_cleaner","researcher","planner","debugger","refactorer","summarizer","generalist", "depends_on": [string]}], "execution_strategy": "sequential"|"parallel"|"mixed", "aggregation": "concatenate"|"list"|"summarize"}
Return only the JSON object."#;

#[derive(Debug, Clone)]
pub struct SubtaskRequest {
    pub description: String,
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubtaskSpec {
    id: String,
    description: String,
    agent_type: AgentType,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// How dependent batches are ordered for execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SubtaskExecutionStrategy {
    /// Declared order, one at a time, regardless of `depends_on`.
    Sequential,
    /// All subtasks in a single batch, `depends_on` ignored.
    Parallel,
    /// Topologically sorted batches honoring `depends_on` (the default).
    Mixed,
}

fn default_execution_strategy() -> SubtaskExecutionStrategy {
    SubtaskExecutionStrategy::Mixed
}

/// How completed subtask outputs are combined into one result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AggregationStrategy {
    Concatenate,
    List,
    Summarize,
}

fn default_aggregation_strategy() -> AggregationStrategy {
    AggregationStrategy::Concatenate
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecompositionPlan {
    #[serde(default)]
    requires_decomposition: bool,
    #[serde(default)]
    subtasks: Vec<SubtaskSpec>,
    #[serde(default = "default_execution_strategy")]
    execution_strategy: SubtaskExecutionStrategy,
    #[serde(default = "default_aggregation_strategy")]
    aggregation: AggregationStrategy,
}

#[derive(Debug, Clone)]
pub struct SubtaskResult {
    pub id: String,
    pub agent_type: AgentType,
    pub success: bool,
    pub output: String,
    pub duration_ms: u64,
}

/// Tallies success/failure totals across a run's subtasks (spec §4: "Counters
/// track success and failure totals.").
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtaskCounts {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Aggregated {
    pub success: bool,
    /// A short status line ("3 of 4 subtasks succeeded"), distinct from
    /// `combined_result`'s full aggregated text.
    pub summary: String,
    pub combined_result: String,
    pub results: Vec<SubtaskResult>,
    pub counts: SubtaskCounts,
    pub total_duration_ms: u64,
}

/// Executes one subtask's work, independent of how it's run (LLM call,
/// tool dispatch, nested workflow). The workflow engine supplies the real
/// implementation; tests use stand-ins.
#[async_trait]
pub trait ChildRunner: Send + Sync {
    async fn run(&self, agent_type: AgentType, description: &str, context: &serde_json::Value) -> Result<String, String>;
}

/// A runner with nothing wired up; only reachable when decomposition
/// yields zero subtasks, since then it's never invoked.
pub struct NullRunner;

#[async_trait]
impl ChildRunner for NullRunner {
    async fn run(&self, _agent_type: AgentType, _description: &str, _context: &serde_json::Value) -> Result<String, String> {
        Err("no child runner configured".to_string())
    }
}

pub struct SubAgentManager {
    gateway: Option<Arc<CachingLlmGateway>>,
    roster: Roster,
    max_parallel: usize,
    subtask_timeout: Duration,
    runner: Arc<dyn ChildRunner>,
}

impl SubAgentManager {
    pub fn new(
        gateway: Option<Arc<CachingLlmGateway>>,
        roster: Roster,
        max_parallel: usize,
        subtask_timeout: Duration,
        runner: Arc<dyn ChildRunner>,
    ) -> Self {
        Self {
            gateway,
            roster,
            max_parallel,
            subtask_timeout,
            runner,
        }
    }

    pub async fn execute_with_subagents(&self, parent_task: &Task, request: SubtaskRequest) -> Aggregated {
        let started = Instant::now();

        let plan = match self.decompose(&request).await {
            Some(plan) if plan.requires_decomposition && !plan.subtasks.is_empty() => plan,
            _ => {
                return Aggregated {
                    success: false,
                    summary: "no subtasks were produced; nothing to delegate".to_string(),
                    combined_result: format!(
                        "no subtasks were produced for '{}'; nothing to delegate",
                        parent_task.description
                    ),
                    results: Vec::new(),
                    counts: SubtaskCounts::default(),
                    total_duration_ms: started.elapsed().as_millis() as u64,
                };
            }
        };

        let batches = match plan.execution_strategy {
            SubtaskExecutionStrategy::Sequential => plan.subtasks.iter().cloned().map(|s| vec![s]).collect(),
            SubtaskExecutionStrategy::Parallel => vec![plan.subtasks.clone()],
            SubtaskExecutionStrategy::Mixed => match topological_batches(&plan.subtasks) {
                Some(batches) => batches,
                None => {
                    tracing::warn!("cycle detected in subtask dependencies, falling back to sequential order");
                    plan.subtasks.iter().cloned().map(|s| vec![s]).collect()
                }
            },
        };

        let semaphore = Arc::new(Semaphore::new(self.max_parallel.max(1)));
        let mut results: Vec<SubtaskResult> = Vec::new();

        for batch in batches {
            let mut handles = Vec::with_capacity(batch.len());
            for subtask in batch {
                let semaphore = semaphore.clone();
                let runner = self.runner.clone();
                let subtask_timeout = self.subtask_timeout;
                let context = request.context.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                    let start = Instant::now();
                    let outcome = timeout(
                        subtask_timeout,
                        runner.run(subtask.agent_type, &subtask.description, &context),
                    )
                    .await;
                    let duration_ms = start.elapsed().as_millis() as u64;
                    match outcome {
                        Ok(Ok(output)) => SubtaskResult {
                            id: subtask.id,
                            agent_type: subtask.agent_type,
                            success: true,
                            output,
                            duration_ms,
                        },
                        Ok(Err(error)) => SubtaskResult {
                            id: subtask.id,
                            agent_type: subtask.agent_type,
                            success: false,
                            output: error,
                            duration_ms,
                        },
                        Err(_) => SubtaskResult {
                            id: subtask.id,
                            agent_type: subtask.agent_type,
                            success: false,
                            output: "subtask timed out".to_string(),
                            duration_ms,
                        },
                    }
                }));
            }
            for handle in handles {
                if let Ok(result) = handle.await {
                    results.push(result);
                }
            }
        }

        let success = !results.is_empty() && results.iter().all(|r| r.success);
        let counts = SubtaskCounts {
            succeeded: results.iter().filter(|r| r.success).count(),
            failed: results.iter().filter(|r| !r.success).count(),
        };
        let summary = format!("{} of {} subtasks succeeded", counts.succeeded, results.len());
        let combined_result = self.aggregate(&results, plan.aggregation).await;

        Aggregated {
            success,
            summary,
            combined_result,
            results,
            counts,
            total_duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn decompose(&self, request: &SubtaskRequest) -> Option<DecompositionPlan> {
        let gateway = self.gateway.as_ref()?;
        let completion_request = CompletionRequest::new(vec![
            Message::system(DECOMPOSE_INSTRUCTION),
            Message::user(request.description.clone()),
        ]);
        let response = gateway.complete(completion_request).await.ok()?;
        let content = response.content?;
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        serde_json::from_str(&content[start..=end]).ok()
    }

    async fn aggregate(&self, results: &[SubtaskResult], strategy: AggregationStrategy) -> String {
        if results.is_empty() {
            return "no subtask results to aggregate".to_string();
        }
        match strategy {
            AggregationStrategy::Concatenate => results.iter().map(|r| r.output.clone()).collect::<Vec<_>>().join("\n"),
            AggregationStrategy::List => results
                .iter()
                .map(|r| format!("- [{}] {}", r.agent_type.as_str(), r.output))
                .collect::<Vec<_>>()
                .join("\n"),
            AggregationStrategy::Summarize => match &self.gateway {
                Some(gateway) => {
                    let joined = results.iter().map(|r| r.output.clone()).collect::<Vec<_>>().join("\n---\n");
                    let request = CompletionRequest::new(vec![
                        Message::system("Summarize the following subtask results into one cohesive answer."),
                        Message::user(joined.clone()),
                    ]);
                    match gateway.complete(request).await {
                        Ok(response) => response.content.unwrap_or(joined),
                        Err(_) => joined,
                    }
                }
                None => results.iter().map(|r| r.output.clone()).collect::<Vec<_>>().join("\n"),
            },
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }
}

/// Kahn's algorithm grouped into parallel-executable batches. Returns
/// `None` if a cycle makes a full topological order impossible.
fn topological_batches(subtasks: &[SubtaskSpec]) -> Option<Vec<Vec<SubtaskSpec>>> {
    let index_of: HashMap<&str, usize> = subtasks.iter().enumerate().map(|(i, s)| (s.id.as_str(), i)).collect();
    let by_id: HashMap<&str, &SubtaskSpec> = subtasks.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut remaining_deps: HashMap<&str, HashSet<&str>> = subtasks
        .iter()
        .map(|s| {
            let deps: HashSet<&str> = s.depends_on.iter().map(String::as_str).filter(|d| by_id.contains_key(d)).collect();
            (s.id.as_str(), deps)
        })
        .collect();

    let mut batches = Vec::new();
    let mut done: HashSet<&str> = HashSet::new();

    while done.len() < subtasks.len() {
        let mut ready: Vec<&str> = remaining_deps
            .iter()
            .filter(|(id, deps)| !done.contains(*id) && deps.iter().all(|d| done.contains(d)))
            .map(|(id, _)| *id)
            .collect();

        if ready.is_empty() {
            return None;
        }

        // HashMap iteration order is unspecified; restore declared order within the batch.
        ready.sort_by_key(|id| index_of[id]);

        for id in &ready {
            done.insert(id);
        }
        batches.push(ready.iter().map(|id| (*by_id[id]).clone()).collect());
        for deps in remaining_deps.values_mut() {
            deps.retain(|d| !done.contains(d));
        }
    }

    Some(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_traits::Domain;

    struct EchoRunner;

    #[async_trait]
    impl ChildRunner for EchoRunner {
        async fn run(&self, agent_type: AgentType, description: &str, _context: &serde_json::Value) -> Result<String, String> {
            Ok(format!("{}:{}", agent_type.as_str(), description))
        }
    }

    fn spec(id: &str, depends_on: &[&str]) -> SubtaskSpec {
        SubtaskSpec {
            id: id.to_string(),
            description: format!("do {id}"),
            agent_type: AgentType::Generalist,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_topological_batches_groups_independent_subtasks() {
        let subtasks = vec![spec("a", &[]), spec("b", &[]), spec("c", &["a", "b"])];
        let batches = topological_batches(&subtasks).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1][0].id, "c");
    }

    #[test]
    fn test_topological_batches_detects_cycle() {
        let subtasks = vec![spec("a", &["b"]), spec("b", &["a"])];
        assert!(topological_batches(&subtasks).is_none());
    }

    #[test]
    fn test_topological_batches_preserves_declared_order_within_a_batch() {
        let subtasks = vec![spec("d", &[]), spec("c", &[]), spec("b", &[]), spec("a", &[])];
        let batches = topological_batches(&subtasks).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].iter().map(|s| s.id.clone()).collect::<Vec<_>>(),
            vec!["d", "c", "b", "a"]
        );
    }

    #[tokio::test]
    async fn test_empty_decomposition_yields_unsuccessful_but_non_fatal_aggregate() {
        let manager = SubAgentManager::new(None, Roster::with_defaults(), 4, Duration::from_secs(5), Arc::new(NullRunner));
        let task = Task::new("parent task", Domain::General);
        let aggregated = manager
            .execute_with_subagents(
                &task,
                SubtaskRequest {
                    description: "do something".to_string(),
                    context: serde_json::Value::Null,
                },
            )
            .await;
        assert!(!aggregated.success);
        assert!(aggregated.results.is_empty());
    }

    #[tokio::test]
    async fn test_decomposed_subtasks_run_through_the_child_runner_and_concatenate() {
        use taskforge_ai::llm::{Endpoint, EndpointTable, FailoverGateway, HealthCheckConfig, MockLlmClient, MockStep, RetryConfig};

        let plan_json = serde_json::json!({
            "complexity": "moderate",
            "requires_decomposition": true,
            "subtasks": [
                {"id": "a", "description": "read the file", "agent_type": "code_reader", "depends_on": []},
                {"id": "b", "description": "summarize findings", "agent_type": "summarizer", "depends_on": ["a"]},
            ],
            "execution_strategy": "mixed",
            "aggregation": "list",
        })
        .to_string();

        let client = MockLlmClient::from_steps("planner-model", vec![MockStep::text(plan_json)]);
        let table = EndpointTable::new(
            vec![Arc::new(Endpoint::new(Arc::new(client), 0))],
            HealthCheckConfig::default(),
        );
        let gateway = Arc::new(CachingLlmGateway::new(
            FailoverGateway::new(table, RetryConfig::default()),
            10,
            Duration::from_secs(60),
        ));

        let manager = SubAgentManager::new(Some(gateway), Roster::with_defaults(), 2, Duration::from_secs(5), Arc::new(EchoRunner));
        let task = Task::new("parent task", Domain::General);
        let aggregated = manager
            .execute_with_subagents(
                &task,
                SubtaskRequest {
                    description: "investigate and summarize".to_string(),
                    context: serde_json::Value::Null,
                },
            )
            .await;

        assert!(aggregated.success);
        assert_eq!(aggregated.results.len(), 2);
        assert!(aggregated.combined_result.contains("code-reader"));
        assert!(aggregated.combined_result.contains("summarizer"));
    }
}

pub mod test_support {
    use super::*;

    pub fn empty_manager() -> Arc<SubAgentManager> {
        Arc::new(SubAgentManager::new(
            None,
            Roster::with_defaults(),
            1,
            Duration::from_secs(5),
            Arc::new(NullRunner),
        ))
    }
}
