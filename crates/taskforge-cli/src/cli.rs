use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Output format for the `run` command's update stream.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "taskforge")]
#[command(version, about = "On-premise agentic task orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the orchestrator's YAML config file.
    #[arg(long, global = true, env = "TASKFORGE_CONFIG", default_value = "taskforge.yaml")]
    pub config: String,

    /// Enable debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for streamed updates.
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a task and stream its progress to completion.
    Run {
        /// Natural-language task description.
        description: String,

        /// Resume an existing thread instead of starting a fresh session.
        #[arg(long)]
        thread_id: Option<String>,

        /// Force a domain instead of letting the intent router classify it.
        #[arg(long, value_enum)]
        domain: Option<DomainArg>,
    },

    /// Generate shell completions for this binary.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DomainArg {
    Coding,
    Research,
    Data,
    General,
}

impl From<DomainArg> for taskforge_traits::Domain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::Coding => taskforge_traits::Domain::Coding,
            DomainArg::Research => taskforge_traits::Domain::Research,
            DomainArg::Data => taskforge_traits::Domain::Data,
            DomainArg::General => taskforge_traits::Domain::General,
        }
    }
}
