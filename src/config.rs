//! Configuration for alertflow.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ALERTFLOW_RULES, ALERTFLOW_WORKFLOWS,
//!    ALERTFLOW_EMAIL_BODIES, ALERTFLOW_ADDR, SAFE_BROWSING_API_KEY)
//! 2. Config file (.alertflow/config.yaml)
//! 3. Defaults (config/*.json relative to the working directory)
//!
//! Config file discovery:
//! - Searches current directory and parents for .alertflow/config.yaml,
//!   then falls back to ~/.alertflow/config.yaml
//! - Paths in config file are relative to the project root (the parent of .alertflow/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::actions::ReputationConfig;
use crate::core::retry::RetryPolicy;
use crate::core::DEFAULT_MAX_PARALLEL;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

const CONFIG_DIR: &str = ".alertflow";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub executor: Option<ExecutorConfig>,
    #[serde(default)]
    pub reputation: Option<ReputationFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Rules file (relative to project root)
    pub rules: Option<String>,
    /// Workflow definitions file
    pub workflows: Option<String>,
    /// Email body reference data
    pub email_bodies: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    pub parallel: Option<bool>,
    pub max_parallel: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReputationFileConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry: Option<RetryPolicy>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub rules_path: PathBuf,
    pub workflows_path: PathBuf,
    pub email_bodies_path: PathBuf,
    /// HTTP bind address
    pub address: String,
    pub executor: ExecutorSettings,
    pub reputation: ReputationConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Use the bounded-parallel path for enrichment
    pub parallel: bool,
    /// Concurrency ceiling of the parallel path
    pub max_parallel: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            parallel: false,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge config file values, environment overrides, and defaults
fn resolve(
    config_path: Option<&Path>,
    file: Option<ConfigFile>,
    env: impl Fn(&str) -> Option<String>,
    cwd: &Path,
) -> ResolvedConfig {
    // Base directory is the parent of .alertflow/ (i.e., grandparent of config.yaml)
    let base_dir = config_path
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(cwd);

    let file_paths = file.as_ref().map(|f| f.paths.clone()).unwrap_or_default();

    let pick_path = |var: &str, configured: Option<&String>, default: &str| -> PathBuf {
        if let Some(value) = env(var) {
            PathBuf::from(value)
        } else if let Some(configured) = configured {
            resolve_path(base_dir, configured)
        } else {
            cwd.join(default)
        }
    };

    let rules_path = pick_path("ALERTFLOW_RULES", file_paths.rules.as_ref(), "config/rules.json");
    let workflows_path = pick_path(
        "ALERTFLOW_WORKFLOWS",
        file_paths.workflows.as_ref(),
        "config/workflows.json",
    );
    let email_bodies_path = pick_path(
        "ALERTFLOW_EMAIL_BODIES",
        file_paths.email_bodies.as_ref(),
        "config/email_bodies.json",
    );

    let address = env("ALERTFLOW_ADDR")
        .or_else(|| {
            file.as_ref()
                .and_then(|f| f.server.as_ref())
                .and_then(|s| s.address.clone())
        })
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    let executor_file = file.as_ref().and_then(|f| f.executor.as_ref());
    let executor = ExecutorSettings {
        parallel: executor_file
            .and_then(|e| e.parallel)
            .unwrap_or(false),
        max_parallel: executor_file
            .and_then(|e| e.max_parallel)
            .unwrap_or(DEFAULT_MAX_PARALLEL)
            .clamp(1, Semaphore::MAX_PERMITS),
    };

    let mut reputation = ReputationConfig::default();
    if let Some(rep) = file.as_ref().and_then(|f| f.reputation.as_ref()) {
        if let Some(url) = &rep.api_url {
            reputation.api_url = url.clone();
        }
        if let Some(client_id) = &rep.client_id {
            reputation.client_id = client_id.clone();
        }
        if let Some(timeout) = rep.timeout_seconds {
            reputation.timeout_seconds = timeout;
        }
        if let Some(retry) = &rep.retry {
            reputation.retry = retry.clone();
        }
        reputation.api_key = rep.api_key.clone();
    }
    if let Some(key) = env("SAFE_BROWSING_API_KEY") {
        reputation.api_key = Some(key);
    }

    ResolvedConfig {
        rules_path,
        workflows_path,
        email_bodies_path,
        address,
        executor,
        reputation,
        config_file: config_path.map(Path::to_path_buf),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config_file = find_config_file();

    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    Ok(resolve(
        config_file.as_deref(),
        file,
        |var| std::env::var(var).ok(),
        &cwd,
    ))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{e:#}")));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
