//! Configuration for the engine, server, and cluster.
//!
//! Parsed from `drossel.toml` with environment-variable overrides. Every
//! section has workable defaults so a bare `DrosselConfig::default()` runs.
//! Strategy, codec, and limits are orthogonal fields — any combination is
//! legal and chosen at startup, never at runtime.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::CodecKind;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for one drossel deployment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DrosselConfig {
    /// Task-execution engine: strategy, limits, codec.
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP server integration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Process-level cluster supervisor.
    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl DrosselConfig {
    /// Parse config from a TOML string, apply env overrides, validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Environment overrides for the knobs that change per deployment.
    fn apply_env_overrides(&mut self) {
        if let Ok(strategy) = std::env::var("DROSSEL_STRATEGY") {
            if let Ok(kind) = strategy.parse() {
                self.engine.strategy = kind;
            }
        }
        if let Ok(bind) = std::env::var("DROSSEL_BIND") {
            self.server.bind = bind;
        }
        if let Ok(workers) = std::env::var("DROSSEL_CLUSTER_WORKERS") {
            if let Ok(n) = workers.parse() {
                self.cluster.workers = n;
            }
        }
    }

    /// Validate the config: limits must be non-zero and consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.queue_capacity == 0 {
            return Err(ConfigError::Invalid("engine.queue_capacity must be > 0".into()));
        }
        if self.engine.concurrency_limit == 0 {
            return Err(ConfigError::Invalid("engine.concurrency_limit must be > 0".into()));
        }
        if self.engine.pool_size == Some(0) {
            return Err(ConfigError::Invalid("engine.pool_size must be > 0 when set".into()));
        }
        if self.engine.strategy == StrategyKind::ThreadPool
            && self.engine.concurrency_limit > self.engine.resolved_pool_size()
        {
            return Err(ConfigError::Invalid(format!(
                "engine.concurrency_limit ({}) exceeds the thread pool size ({})",
                self.engine.concurrency_limit,
                self.engine.resolved_pool_size()
            )));
        }
        if self.cluster.restart.max_restarts == 0 {
            return Err(ConfigError::Invalid("cluster.restart.max_restarts must be > 0".into()));
        }
        Ok(())
    }
}

// ── Engine section ──────────────────────────────────────────────────

/// Which execution strategy runs the compute step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Synchronous execution on the calling runtime thread (baseline).
    InProcess,
    /// Fixed rayon thread pool inside the process.
    #[default]
    ThreadPool,
    /// Pool of worker OS processes behind a serialization boundary.
    ProcessPool,
    /// Complete immediately without computing (control group).
    Null,
}

impl std::str::FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_process" => Ok(Self::InProcess),
            "thread_pool" => Ok(Self::ThreadPool),
            "process_pool" => Ok(Self::ProcessPool),
            "null" => Ok(Self::Null),
            other => Err(ConfigError::Invalid(format!("unknown strategy: {other}"))),
        }
    }
}

/// Task-execution engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Execution strategy.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Worker count for the pool strategies. 0 or absent = available cores.
    #[serde(default)]
    pub pool_size: Option<usize>,

    /// Maximum queued-but-not-dispatched entries before submissions are
    /// rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum simultaneously executing entries.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Payload codec for the worker boundary and HTTP responses.
    #[serde(default)]
    pub codec: CodecKind,

    /// Path to the worker binary for the process pool. Absent = a sibling
    /// of the current executable named `drossel-worker`.
    #[serde(default)]
    pub worker_binary: Option<String>,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_concurrency_limit() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            pool_size: None,
            queue_capacity: default_queue_capacity(),
            concurrency_limit: default_concurrency_limit(),
            codec: CodecKind::default(),
            worker_binary: None,
        }
    }
}

impl EngineConfig {
    /// Pool size with the cores default applied.
    pub fn resolved_pool_size(&self) -> usize {
        match self.pool_size {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

// ── Server section ──────────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Grace period for draining in-flight tasks at shutdown.
    #[serde(default = "default_drain_secs")]
    pub drain_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

fn default_drain_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            drain_timeout_secs: default_drain_secs(),
        }
    }
}

impl ServerConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

// ── Cluster section ─────────────────────────────────────────────────

/// Cluster supervisor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of sibling server processes. 0 = available cores.
    #[serde(default)]
    pub workers: usize,

    /// Public address the supervisor accepts connections on.
    #[serde(default = "default_cluster_bind")]
    pub bind: String,

    /// First port assigned to workers; worker `i` listens on `base_port + i`.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Restart policy for crashed workers.
    #[serde(default)]
    pub restart: RestartConfig,

    /// Grace period for worker drain at shutdown.
    #[serde(default = "default_drain_secs")]
    pub drain_timeout_secs: u64,
}

fn default_cluster_bind() -> String {
    "127.0.0.1:8000".into()
}

fn default_base_port() -> u16 {
    8100
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            bind: default_cluster_bind(),
            base_port: default_base_port(),
            restart: RestartConfig::default(),
            drain_timeout_secs: default_drain_secs(),
        }
    }
}

impl ClusterConfig {
    /// Worker count with the cores default applied.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2)
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

/// Bounded exponential backoff for worker restarts, with crash-loop
/// escalation: more than `max_restarts` crashes inside `window_secs` halts
/// the worker slot instead of looping forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Crash-count threshold inside the window before the slot is halted.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_backoff_initial_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    10_000
}

fn default_max_restarts() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            max_restarts: default_max_restarts(),
            window_secs: default_window_secs(),
        }
    }
}
