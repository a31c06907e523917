//! Execution strategies.
//!
//! One trait, four implementations. The queue treats them identically; the
//! concurrency mechanism (none, rayon threads, worker processes) and the
//! failure model behind `execute` are the only differences. Strategy choice
//! happens once, at construction time, from configuration.

pub mod in_process;
pub mod process_pool;
pub mod thread_pool;

use std::sync::Arc;

use async_trait::async_trait;

use drossel_core::{
    ComputeRegistry, EngineConfig, EventSink, StrategyKind, Task, TaskError, TaskId, TaskOutput,
};

use crate::error::EngineError;

/// Observable state of one worker slot, owned exclusively by its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Busy,
    /// Process-pool only: the worker died and its replacement is spawning.
    Crashed,
}

/// A mechanism for executing one task and yielding its result or failure.
#[async_trait]
pub trait TaskStrategy: Send + Sync {
    /// Strategy name for logs and `/stats`.
    fn name(&self) -> &'static str;

    /// Maximum number of tasks this strategy can run in parallel.
    fn capacity(&self) -> usize;

    /// Execute the task to a terminal outcome. Never panics; compute panics
    /// and worker deaths surface as [`TaskError`] values.
    async fn execute(&self, task: Task) -> Result<TaskOutput, TaskError>;

    /// Best-effort interruption of an in-flight task. Returns whether the
    /// strategy could act on it; the default cannot.
    async fn abort(&self, task_id: TaskId) -> bool {
        let _ = task_id;
        false
    }

    /// Release strategy resources (worker processes, threads).
    async fn shutdown(&self) {}
}

/// Blanket impl so `Arc<dyn TaskStrategy>` composes directly.
#[async_trait]
impl<T: TaskStrategy + ?Sized> TaskStrategy for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, TaskError> {
        (**self).execute(task).await
    }

    async fn abort(&self, task_id: TaskId) -> bool {
        (**self).abort(task_id).await
    }

    async fn shutdown(&self) {
        (**self).shutdown().await;
    }
}

/// Build the strategy the config names. The registry and sink are shared
/// with the rest of the process graph; nothing global is created here.
pub fn build_strategy(
    config: &EngineConfig,
    registry: Arc<ComputeRegistry>,
    sink: Arc<dyn EventSink>,
) -> Result<Arc<dyn TaskStrategy>, EngineError> {
    let strategy: Arc<dyn TaskStrategy> = match config.strategy {
        StrategyKind::InProcess => Arc::new(in_process::InProcessStrategy::new(registry)),
        StrategyKind::Null => Arc::new(in_process::NullStrategy),
        StrategyKind::ThreadPool => Arc::new(thread_pool::ThreadPoolStrategy::new(
            config.resolved_pool_size(),
            registry,
        )?),
        StrategyKind::ProcessPool => Arc::new(process_pool::ProcessPoolStrategy::spawn(
            process_pool::ProcessPoolConfig::from_engine(config)?,
            sink,
        )?),
    };
    tracing::info!(strategy = strategy.name(), capacity = strategy.capacity(), "strategy ready");
    Ok(strategy)
}

/// Render a caught panic payload for a `Compute` failure message.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "compute panicked".to_string()
    }
}
