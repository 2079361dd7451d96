mod cli;
mod error;
mod output;
mod tools;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use futures::StreamExt;
use tracing_appender::non_blocking::WorkerGuard;

use cli::{Cli, Commands};
use taskforge_ai::llm::{CachingLlmGateway, Endpoint, EndpointTable, FailoverGateway, MockLlmClient};
use taskforge_core::{Config, OrchestratorConfig, Orchestrator, Roster, SessionManager, SubAgentManager, WorkflowChildRunner};
use taskforge_ai::SecurityPolicy;
use taskforge_storage::Storage;
use taskforge_traits::ToolRegistry;

fn init_logging(level: &str, verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { level };

    if std::fs::create_dir_all("./logs").is_ok() {
        let file_appender = tracing_appender::rolling::daily("./logs", "taskforge.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(false)
            .with_env_filter(level.to_lowercase())
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(level.to_lowercase())
        .init();
    None
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let verbose = cli.verbose;
    let format = cli.format;

    let (description, thread_id, domain) = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "taskforge", &mut io::stdout());
            return;
        }
        Commands::Run { description, thread_id, domain } => (description, thread_id, domain),
    };

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => error::handle_startup_error(err.into()),
    };

    let _log_guard = init_logging(&config.logging.level, verbose);

    let endpoints: Vec<Arc<Endpoint>> = config
        .llm
        .endpoints
        .iter()
        .map(|entry| Arc::new(Endpoint::new(Arc::new(MockLlmClient::new(entry.name.clone())), entry.priority)))
        .collect();
    let table = EndpointTable::new(endpoints, config.llm.health_check_config());
    let failover = FailoverGateway::new(table, config.llm.retry_config());
    let gateway = Arc::new(CachingLlmGateway::new(failover, config.llm.cache_capacity, config.llm.cache_ttl()));

    if std::fs::create_dir_all(&config.workspace.root).is_err() {
        error::handle_startup_error(anyhow::anyhow!("failed to create workspace root '{}'", config.workspace.root));
    }

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(tools::RunCommandTool::new(config.workflows.timeout_seconds)));
    registry.register(Arc::new(tools::ReadFileTool::new(config.workspace.root.clone())));
    registry.register(Arc::new(tools::WriteFileTool::new(config.workspace.root.clone())));
    registry.register(Arc::new(tools::SearchTool::new(config.workspace.root.clone())));

    let safety = Arc::new(SecurityPolicy::new(config.tools.safety.clone()));
    let roster = Arc::new(Roster::with_defaults());

    let child_runner = WorkflowChildRunner::new(
        gateway.clone(),
        registry.clone(),
        safety.clone(),
        roster.clone(),
        config.workflows.optimizer.clone(),
        config.workflows.max_iterations,
        config.workflows.recursion_limit,
    );
    let sub_agents = Arc::new(SubAgentManager::new(
        Some(gateway.clone()),
        Roster::with_defaults(),
        config.workflows.max_parallel,
        Duration::from_secs(config.workflows.timeout_seconds),
        Arc::new(child_runner),
    ));

    let storage = match Storage::open(&config.persistence.path) {
        Ok(storage) => storage,
        Err(err) => error::handle_startup_error(err),
    };
    let session_manager = Arc::new(SessionManager::new(storage.sessions, Arc::new(storage.checkpoints)));

    let orchestrator = Orchestrator::new(
        gateway,
        registry,
        safety,
        sub_agents,
        session_manager,
        OrchestratorConfig {
            max_iterations: config.workflows.max_iterations,
            recursion_limit: config.workflows.recursion_limit,
            optimizer: config.workflows.optimizer.clone(),
            router_confidence_threshold: config.llm.router_confidence_threshold,
            update_channel_capacity: 64,
        },
    );

    let mut stream = orchestrator.execute_task(description, thread_id, domain.map(Into::into)).await;
    let mut exit_code = output::EXIT_FAILED;
    while let Some(update) = stream.next().await {
        output::print_update(&update, format);
        if update.is_terminal() {
            exit_code = output::exit_code_for(&update);
        }
    }

    std::process::exit(exit_code);
}
