//! Orchestrator configuration: YAML file + environment overrides, grounded
//! on the teacher's config-loading convention of `serde_yaml` with
//! `#[serde(deny_unknown_fields)]` and a strict post-parse validation pass.

use serde::{Deserialize, Serialize};
use std::path::Path;

use taskforge_ai::{OptimizerConfig, SafetyConfig};
use taskforge_ai::llm::{HealthCheckConfig as EndpointHealthConfig, RetryConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mode: String,
    pub llm: LlmSection,
    #[serde(default)]
    pub workflows: WorkflowSection,
    #[serde(default)]
    pub tools: ToolsSection,
    pub persistence: PersistenceSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub performance: PerformanceSection,
    #[serde(default)]
    pub development: DevelopmentSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointEntry {
    pub name: String,
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSection {
    pub endpoints: Vec<EndpointEntry>,
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub retry_backoff_base_secs: f64,
    #[serde(default = "default_probe_interval_secs")]
    pub health_probe_interval_secs: u64,
    #[serde(default = "default_failure_threshold")]
    pub health_failure_threshold: u32,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_confidence_threshold")]
    pub router_confidence_threshold: f32,
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_backoff_base() -> f64 {
    2.0
}
fn default_probe_interval_secs() -> u64 {
    30
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_cache_capacity() -> usize {
    1000
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_confidence_threshold() -> f32 {
    0.6
}

impl LlmSection {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            backoff_base_secs: self.retry_backoff_base_secs,
            jitter_fraction: 0.1,
        }
    }

    pub fn health_check_config(&self) -> EndpointHealthConfig {
        EndpointHealthConfig {
            probe_interval: std::time::Duration::from_secs(self.health_probe_interval_secs),
            failure_threshold: self.health_failure_threshold,
        }
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "OptimizerConfig::default")]
    pub optimizer: OptimizerConfig,
}

fn default_max_iterations() -> u32 {
    25
}
fn default_recursion_limit() -> u32 {
    50
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_max_parallel() -> usize {
    5
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            recursion_limit: default_recursion_limit(),
            timeout_seconds: default_timeout_secs(),
            max_parallel: default_max_parallel(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceSection {
    pub backend: String,
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "./taskforge.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSection {
    #[serde(default = "default_workspace_root")]
    pub root: String,
    #[serde(default)]
    pub isolate_per_session: bool,
    #[serde(default)]
    pub cleanup_on_success: bool,
}

fn default_workspace_root() -> String {
    "./workspaces".to_string()
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            isolate_per_session: false,
            cleanup_on_success: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceSection {
    #[serde(default)]
    pub enable_metrics: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevelopmentSection {
    #[serde(default)]
    pub use_mock_llm: bool,
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
// `redb` is the only backend this workspace's storage crate actually opens;
// `sqlite`/`postgresql` are accepted so a config authored against the
// documented names still loads.
const VALID_PERSISTENCE_BACKENDS: &[&str] = &["sqlite", "postgresql", "redb"];

/// Recursively collects the dotted paths of every scalar (non-mapping,
/// non-sequence, non-null) leaf in a YAML value tree.
fn collect_scalar_paths(value: &serde_yaml::Value, prefix: String, paths: &mut Vec<String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = k.as_str() else { continue };
                let path = if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") };
                collect_scalar_paths(v, path, paths);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_scalar_paths(item, format!("{prefix}.{i}"), paths);
            }
        }
        serde_yaml::Value::Null => {}
        _ => paths.push(prefix),
    }
}

/// Parses a raw environment variable string into the most specific YAML
/// scalar type it matches: bool, then int, then float, falling back to string.
fn parse_scalar(raw: &str) -> serde_yaml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return serde_yaml::Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return serde_yaml::Value::Number(serde_yaml::Number::from(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return serde_yaml::Value::Number(serde_yaml::Number::from(f));
    }
    serde_yaml::Value::String(raw.to_string())
}

/// Walks a dotted path into a YAML value tree and overwrites the leaf it
/// names. Returns `false` if the path doesn't resolve to an existing leaf.
fn set_at_path(value: &mut serde_yaml::Value, path: &str, new_value: serde_yaml::Value) -> bool {
    match path.split_once('.') {
        Some((head, rest)) => match value {
            serde_yaml::Value::Mapping(map) => {
                let Some(child) = map.get_mut(&serde_yaml::Value::String(head.to_string())) else {
                    return false;
                };
                set_at_path(child, rest, new_value)
            }
            serde_yaml::Value::Sequence(items) => {
                let Ok(index) = head.parse::<usize>() else { return false };
                let Some(child) = items.get_mut(index) else { return false };
                set_at_path(child, rest, new_value)
            }
            _ => false,
        },
        None => match value {
            serde_yaml::Value::Mapping(map) => {
                map.insert(serde_yaml::Value::String(path.to_string()), new_value);
                true
            }
            serde_yaml::Value::Sequence(items) => {
                let Ok(index) = path.parse::<usize>() else { return false };
                if index >= items.len() {
                    return false;
                }
                items[index] = new_value;
                true
            }
            _ => false,
        },
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Any leaf setting may be overridden by an environment variable named
    /// after its dotted path, uppercased (e.g. `WORKFLOWS.MAX_ITERATIONS`,
    /// `LLM.ENDPOINTS.0.NAME`). Applied before validation.
    fn apply_env_overrides(&mut self) {
        let Ok(mut value) = serde_yaml::to_value(&*self) else {
            return;
        };

        let mut paths = Vec::new();
        collect_scalar_paths(&value, String::new(), &mut paths);

        let mut overridden = false;
        for path in paths {
            if let Ok(raw) = std::env::var(path.to_uppercase()) {
                if set_at_path(&mut value, &path, parse_scalar(&raw)) {
                    overridden = true;
                }
            }
        }

        if overridden {
            if let Ok(config) = serde_yaml::from_value(value) {
                *self = config;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mode != "on-premise" {
            return Err(ConfigError::Invalid(format!(
                "mode must be 'on-premise', got '{}'",
                self.mode
            )));
        }
        if self.llm.endpoints.is_empty() {
            return Err(ConfigError::Invalid("llm.endpoints must be non-empty".to_string()));
        }
        if self.workflows.max_iterations < 1 {
            return Err(ConfigError::Invalid("workflows.max_iterations must be >= 1".to_string()));
        }
        if self.workflows.timeout_seconds < 60 {
            return Err(ConfigError::Invalid(
                "workflows.timeout_seconds must be >= 60".to_string(),
            ));
        }
        if !VALID_PERSISTENCE_BACKENDS.contains(&self.persistence.backend.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "persistence.backend must be one of {VALID_PERSISTENCE_BACKENDS:?}, got '{}'",
                self.persistence.backend
            )));
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {VALID_LOG_LEVELS:?}, got '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}
