//! Concrete tool implementations: the engine and dispatcher only see the
//! `Tool` trait and a registry keyed by action name, so binding actual
//! filesystem/shell access to those names is this binary's job.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use taskforge_traits::{Tool, ToolOutcome};
use tokio::process::Command;

const MAX_OUTPUT_BYTES: usize = 200_000;

fn truncate(value: &str) -> String {
    if value.len() <= MAX_OUTPUT_BYTES {
        return value.to_string();
    }
    let mut end = MAX_OUTPUT_BYTES;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[output truncated]", &value[..end])
}

/// Resolves a task-supplied relative path against `root`, rejecting any
/// path that would escape it. Walks components by hand instead of
/// `Path::join` + `starts_with`: the latter compares unnormalized
/// component sequences, so a root of `/ws` joined with `../../etc/passwd`
/// still lexically "starts with" `/ws` even though it escapes — only a
/// relative pop-stack walk actually catches that.
fn resolve_in_root(root: &Path, path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            std::path::Component::Normal(part) => relative.push(part),
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            std::path::Component::RootDir | std::path::Component::Prefix(_) => return None,
        }
    }
    Some(root.join(relative))
}

/// Runs a shell command. The dispatcher's tool-safety check runs before
/// `execute` is ever called, so this tool trusts the command it receives.
pub struct RunCommandTool {
    timeout_secs: u64,
}

impl RunCommandTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command and return its combined stdout/stderr."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "the shell command to run"}
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, parameters: Value) -> ToolOutcome {
        let Some(command) = parameters.get("command").and_then(Value::as_str) else {
            return ToolOutcome::Error("missing 'command' parameter".to_string());
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = match tokio::time::timeout(std::time::Duration::from_secs(self.timeout_secs), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => return ToolOutcome::Error(format!("failed to spawn command: {error}")),
            Err(_) => return ToolOutcome::Error(format!("command timed out after {}s", self.timeout_secs)),
        };

        let stdout = truncate(&String::from_utf8_lossy(&output.stdout));
        let stderr = truncate(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            ToolOutcome::Success(json!({"stdout": stdout, "stderr": stderr}))
        } else {
            ToolOutcome::Error(format!("exit status {}: {stderr}", output.status))
        }
    }
}

/// Reads or writes a UTF-8 file under a configured root directory.
pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        resolve_in_root(&self.root, path)
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file relative to the task workspace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"]
        })
    }

    async fn execute(&self, parameters: Value) -> ToolOutcome {
        let Some(path) = parameters.get("path").and_then(Value::as_str) else {
            return ToolOutcome::Error("missing 'path' parameter".to_string());
        };
        let Some(resolved) = self.resolve(path) else {
            return ToolOutcome::Error(format!("path '{path}' escapes the workspace root"));
        };
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => ToolOutcome::Success(json!(truncate(&content))),
            Err(error) => ToolOutcome::Error(format!("failed to read '{path}': {error}")),
        }
    }
}

pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        resolve_in_root(&self.root, path)
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write a UTF-8 text file relative to the task workspace, creating parent directories as needed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, parameters: Value) -> ToolOutcome {
        let (Some(path), Some(content)) = (
            parameters.get("path").and_then(Value::as_str),
            parameters.get("content").and_then(Value::as_str),
        ) else {
            return ToolOutcome::Error("missing 'path' or 'content' parameter".to_string());
        };
        let Some(resolved) = self.resolve(path) else {
            return ToolOutcome::Error(format!("path '{path}' escapes the workspace root"));
        };
        if let Some(parent) = resolved.parent() {
            if let Err(error) = tokio::fs::create_dir_all(parent).await {
                return ToolOutcome::Error(format!("failed to create parent directories: {error}"));
            }
        }
        match tokio::fs::write(&resolved, content).await {
            Ok(()) => ToolOutcome::Success(json!({"bytes_written": content.len()})),
            Err(error) => ToolOutcome::Error(format!("failed to write '{path}': {error}")),
        }
    }
}

/// Greps a workspace-relative directory for a literal substring, one match
/// per line, grounded on the teacher's recursive-walk search tools.
pub struct SearchTool {
    root: PathBuf,
}

impl SearchTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(dir: &Path, pattern: &str, matches: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                Self::walk(&path, pattern, matches);
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for (line_no, line) in content.lines().enumerate() {
                if line.contains(pattern) {
                    matches.push(format!("{}:{}: {}", path.display(), line_no + 1, line.trim()));
                }
                if matches.len() >= 200 {
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search text files under the task workspace for a literal substring."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"pattern": {"type": "string"}},
            "required": ["pattern"]
        })
    }

    async fn execute(&self, parameters: Value) -> ToolOutcome {
        let Some(pattern) = parameters.get("pattern").and_then(Value::as_str) else {
            return ToolOutcome::Error("missing 'pattern' parameter".to_string());
        };
        let root = self.root.clone();
        let pattern = pattern.to_string();
        let matches = tokio::task::spawn_blocking(move || {
            let mut matches = Vec::new();
            SearchTool::walk(&root, &pattern, &mut matches);
            matches
        })
        .await
        .unwrap_or_default();
        ToolOutcome::Success(json!(matches))
    }
}
