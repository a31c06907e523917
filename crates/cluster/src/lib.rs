//! Process-level cluster supervisor.
//!
//! Scales one server+queue+strategy unit across N sibling OS processes:
//! spawns them, probes readiness, restarts crashes with bounded backoff,
//! and round-robins inbound TCP connections across the ready set. Sibling
//! processes share nothing; all coordination lives here.

pub mod backoff;
pub mod proxy;
pub mod supervisor;

use thiserror::Error;

pub use backoff::{RestartBackoff, RestartDecision};
pub use proxy::Proxy;
pub use supervisor::{ClusterSupervisor, WorkerProcState, WorkerSpec};

/// Errors from cluster management.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn worker process: {0}")]
    Spawn(std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
