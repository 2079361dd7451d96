//! Orchestrator facade (C9): `execute_task` wires the intent router,
//! workflow engine, sub-agent manager, and session/checkpoint layer
//! together and exposes the whole run as a stream of [`Update`]s.

use std::sync::Arc;

use taskforge_ai::{CachingLlmGateway, IntentRouter, OptimizerConfig, SecurityPolicy, StateOptimizer};
use taskforge_traits::{Domain, Task, Update};
use tokio_stream::wrappers::ReceiverStream;

use crate::dispatcher::ActionDispatcher;
use crate::emitter::ChannelEmitter;
use crate::observability::{LogKind, ObservabilityHub};
use crate::session::SessionManager;
use crate::subagent::SubAgentManager;
use crate::workflow::WorkflowEngine;

pub struct OrchestratorConfig {
    pub max_iterations: u32,
    pub recursion_limit: u32,
    pub optimizer: OptimizerConfig,
    pub router_confidence_threshold: f32,
    pub update_channel_capacity: usize,
}

pub struct Orchestrator {
    gateway: Arc<CachingLlmGateway>,
    registry: taskforge_traits::ToolRegistry,
    safety: Arc<SecurityPolicy>,
    sub_agents: Arc<SubAgentManager>,
    session_manager: Arc<SessionManager>,
    router: Arc<IntentRouter>,
    observability: Arc<ObservabilityHub>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<CachingLlmGateway>,
        registry: taskforge_traits::ToolRegistry,
        safety: Arc<SecurityPolicy>,
        sub_agents: Arc<SubAgentManager>,
        session_manager: Arc<SessionManager>,
        config: OrchestratorConfig,
    ) -> Self {
        let router = Arc::new(IntentRouter::new(config.router_confidence_threshold));
        Self {
            gateway,
            registry,
            safety,
            sub_agents,
            session_manager,
            router,
            observability: Arc::new(ObservabilityHub::new()),
            config,
        }
    }

    /// Exposes the shared observability sinks for operator-facing
    /// dashboards or tests; populated as tasks run.
    pub fn observability(&self) -> &Arc<ObservabilityHub> {
        &self.observability
    }

    /// Runs one task end-to-end, returning a stream of [`Update`]s.
    /// `task_id`, when given, is treated as a thread id to resume from its
    /// most recent checkpoint; otherwise a fresh session is created.
    pub async fn execute_task(&self, description: String, task_id: Option<String>, domain: Option<Domain>) -> ReceiverStream<Update> {
        let (tx, rx) = tokio::sync::mpsc::channel(self.config.update_channel_capacity);
        let emitter = Arc::new(ChannelEmitter::new(tx));

        let gateway = self.gateway.clone();
        let dispatcher = Arc::new(
            ActionDispatcher::new(self.registry.clone(), self.safety.clone(), self.sub_agents.clone())
                .with_tool_logger(self.observability.tools.clone()),
        );
        let session_manager = self.session_manager.clone();
        let router = self.router.clone();
        let observability = self.observability.clone();
        let max_iterations = self.config.max_iterations;
        let recursion_limit = self.config.recursion_limit;
        let optimizer = StateOptimizer::new(self.config.optimizer.clone());

        tokio::spawn(async move {
            Self::run_task(
                description,
                task_id,
                domain,
                gateway,
                dispatcher,
                session_manager,
                router,
                observability,
                optimizer,
                emitter,
                max_iterations,
                recursion_limit,
            )
            .await;
        });

        ReceiverStream::new(rx)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_task(
        description: String,
        task_id: Option<String>,
        domain: Option<Domain>,
        gateway: Arc<CachingLlmGateway>,
        dispatcher: Arc<ActionDispatcher>,
        session_manager: Arc<SessionManager>,
        router: Arc<IntentRouter>,
        observability: Arc<ObservabilityHub>,
        optimizer: StateOptimizer,
        emitter: Arc<ChannelEmitter>,
        max_iterations: u32,
        recursion_limit: u32,
    ) {
        let classification = router.classify(&gateway, &description).await;
        let resolved_domain = domain.unwrap_or(classification.domain);
        observability.decisions.record(
            "router",
            format!("{} ({:?})", resolved_domain.as_str(), classification.complexity),
            classification.reasoning.clone(),
            Vec::new(),
            classification.confidence,
        );

        let mut task = Task::new(description.clone(), resolved_domain);
        observability.log.record("INFO", "orchestrator", "router", LogKind::Task, format!("task {} started", task.id));
        observability.metrics.counter("tasks_started", 1.0);
        emitter
            .emit(Update::Status {
                task_id: task.id.clone(),
                timestamp: Update::now_ms(),
                message: format!("classified as {} ({:?} complexity)", resolved_domain.as_str(), classification.complexity),
            })
            .await;

        let session = match session_manager.create_session(description.clone(), resolved_domain.as_str(), "./workspaces/default", None) {
            Ok(session) => session,
            Err(error) => {
                emitter
                    .emit(Update::Error {
                        task_id: task.id.clone(),
                        timestamp: Update::now_ms(),
                        message: format!("failed to create session: {error}"),
                        component: "session".to_string(),
                        retried: false,
                        suggestion: "check persistence backend configuration".to_string(),
                    })
                    .await;
                return;
            }
        };

        let thread_id = task_id.unwrap_or_else(|| session.thread_id.clone());
        let state = match session_manager.resume(&thread_id, max_iterations).await {
            Ok(Some(state)) => state,
            Ok(None) => taskforge_traits::WorkflowState::new(session.workspace.clone()),
            Err(_) => taskforge_traits::WorkflowState::new(session.workspace.clone()),
        };

        let engine = WorkflowEngine::new(gateway, dispatcher, optimizer, emitter.clone(), max_iterations, recursion_limit);
        let (final_state, _node) = engine.run(&mut task, state, classification.complexity).await;

        let checkpoint_result = session_manager.save_checkpoint(&session.id, &thread_id, &final_state).await;
        if checkpoint_result.is_err() {
            tracing::warn!(session_id = %session.id, "failed to persist final checkpoint");
        }

        match task.status {
            taskforge_traits::TaskStatus::Completed => {
                let _ = session_manager.complete_session(&session.id);
                observability.metrics.counter("tasks_completed", 1.0);
                observability
                    .log
                    .record("INFO", "orchestrator", "engine", LogKind::Task, format!("task {} completed", task.id));
            }
            taskforge_traits::TaskStatus::Failed => {
                let _ = session_manager.fail_session(&session.id);
                observability.metrics.counter("tasks_failed", 1.0);
                observability.log.record(
                    "ERROR",
                    "orchestrator",
                    "engine",
                    LogKind::Task,
                    format!("task {} failed: {}", task.id, task.error.as_deref().unwrap_or("unknown")),
                );
            }
            _ => {}
        }
    }
}
