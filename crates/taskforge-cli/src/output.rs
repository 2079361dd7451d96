//! Renders the orchestrator's `Update` stream to the terminal and maps its
//! terminal variant to the process exit code (spec §6: 0 completed,
//! 1 failed, 2 cancelled, 3 config/startup error — this module covers the
//! first three).

use colored::Colorize;
use taskforge_traits::Update;

use crate::cli::OutputFormat;

pub const EXIT_COMPLETED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_CANCELLED: i32 = 2;

pub fn print_update(update: &Update, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(update) {
                println!("{line}");
            }
        }
        OutputFormat::Text => print_text(update),
    }
}

fn print_text(update: &Update) {
    match update {
        Update::Status { message, .. } => println!("{} {}", "status".dimmed(), message),
        Update::Thinking { content, .. } => println!("{} {}", "thinking".blue(), content),
        Update::Artifact { name, .. } => println!("{} {}", "artifact".magenta(), name),
        Update::ToolCall { tool_name, parameters, .. } => {
            println!("{} {} {}", "tool_call".cyan(), tool_name, parameters)
        }
        Update::ToolResult { success, error, .. } => {
            if *success {
                println!("{}", "tool_result ok".green());
            } else {
                println!("{} {}", "tool_result failed".red(), error.clone().unwrap_or_default());
            }
        }
        Update::SubAgentSpawned { agent_type, description, .. } => {
            println!("{} {} — {}", "sub_agent".yellow(), agent_type, description)
        }
        Update::SubAgentResult { agent_id, success, .. } => {
            println!("{} {} ({})", "sub_agent_result".yellow(), agent_id, if *success { "ok" } else { "failed" })
        }
        Update::Progress { iteration, max_iterations, .. } => {
            println!("{} {}/{}", "progress".dimmed(), iteration, max_iterations)
        }
        Update::Completed { result, .. } => println!("{}\n{}", "completed".green().bold(), result),
        Update::Error { message, component, .. } => {
            println!("{} [{}] {}", "error".red().bold(), component, message)
        }
        Update::Cancelled { .. } => println!("{}", "cancelled".yellow().bold()),
    }
}

pub fn exit_code_for(update: &Update) -> i32 {
    match update {
        Update::Completed { .. } => EXIT_COMPLETED,
        Update::Error { .. } => EXIT_FAILED,
        Update::Cancelled { .. } => EXIT_CANCELLED,
        _ => EXIT_FAILED,
    }
}
