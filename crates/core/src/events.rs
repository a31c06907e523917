//! Structured engine events and the logging sink boundary.
//!
//! The engine reports what happened — completions, failures, crashes,
//! saturation — to an injected [`EventSink`]. Where those events go
//! (console, file, collector) is the sink's business, not the engine's.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::task::TaskId;

/// Failure classification carried on events, mirroring [`TaskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Compute,
    WorkerCrashed,
    QueueSaturated,
    Timeout,
    Cancelled,
}

impl From<&TaskError> for FailureKind {
    fn from(err: &TaskError) -> Self {
        match err {
            TaskError::Compute { .. } => FailureKind::Compute,
            TaskError::WorkerCrashed { .. } => FailureKind::WorkerCrashed,
            TaskError::QueueSaturated { .. } => FailureKind::QueueSaturated,
            TaskError::Timeout { .. } => FailureKind::Timeout,
            TaskError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Emitted when a task completes successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub task_id: TaskId,
    /// Compute kind that ran.
    pub kind: String,
    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
}

/// Emitted when a task completes with any failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailed {
    pub task_id: TaskId,
    pub kind: String,
    pub failure: FailureKind,
}

/// Emitted when a worker process/thread dies abnormally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerCrashed {
    pub worker_id: u32,
    /// Task that was in flight on the worker, if any.
    pub task_id: Option<TaskId>,
}

/// Emitted when a submission is rejected at admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSaturated {
    pub capacity: usize,
}

/// Every event the engine can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    TaskCompleted(TaskCompleted),
    TaskFailed(TaskFailed),
    WorkerCrashed(WorkerCrashed),
    QueueSaturated(QueueSaturated),
}

/// Injected logging sink.
///
/// `emit` is synchronous and must be cheap — strategies call it from rayon
/// threads and worker driver tasks.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Blanket impl so `Arc<dyn EventSink>` can be passed around directly.
impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: EngineEvent) {
        (**self).emit(event);
    }
}

/// Default sink: forwards events to `tracing` with structured fields.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::TaskCompleted(e) => {
                tracing::info!(task_id = %e.task_id, kind = %e.kind, duration_ms = e.duration_ms, "task completed");
            }
            EngineEvent::TaskFailed(e) => {
                tracing::warn!(task_id = %e.task_id, kind = %e.kind, failure = ?e.failure, "task failed");
            }
            EngineEvent::WorkerCrashed(e) => {
                tracing::error!(worker_id = e.worker_id, task_id = ?e.task_id.map(|id| id.to_string()), "worker crashed");
            }
            EngineEvent::QueueSaturated(e) => {
                tracing::warn!(capacity = e.capacity, "queue saturated, submission rejected");
            }
        }
    }
}

/// Sink that drops everything. Useful for benchmarks and tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}
