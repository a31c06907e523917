use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal outcome failures for a task. Delivered exactly once through the
/// completion handle; none are retried by the engine.
///
/// Serializable because compute failures cross the worker process boundary.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskError {
    /// The task's own compute logic failed (error return or panic).
    #[error("compute failed: {message}")]
    Compute { message: String },

    /// The worker executing the task died. The result is lost; the worker
    /// slot is respawned before further dispatch.
    #[error("worker {worker_id} crashed while executing the task")]
    WorkerCrashed { worker_id: u32 },

    /// Rejected at admission: the backlog is full. Callers shed load or
    /// retry later; the queue never blocks a saturated submission.
    #[error("queue saturated at capacity {capacity}")]
    QueueSaturated { capacity: usize },

    /// The task's deadline elapsed before a result was produced.
    #[error("deadline of {after:?} elapsed")]
    Timeout { after: Duration },

    /// The caller withdrew interest before completion.
    #[error("cancelled by caller")]
    Cancelled,
}

impl TaskError {
    /// Compute failure from any displayable error.
    pub fn compute(err: impl std::fmt::Display) -> Self {
        Self::Compute {
            message: err.to_string(),
        }
    }

    /// Compute failure for an unregistered kind.
    pub fn unknown_kind(kind: &str) -> Self {
        Self::Compute {
            message: format!("unknown compute kind: {kind}"),
        }
    }
}

/// Errors from the payload encode/decode boundary.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode error: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode error: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),
}

/// Outcome type delivered through a completion handle.
pub type TaskResult = Result<crate::task::TaskOutput, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = TaskError::QueueSaturated { capacity: 64 };
        assert!(err.to_string().contains("64"));

        let err = TaskError::unknown_kind("nope");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn taxonomy_survives_the_wire() {
        let err = TaskError::WorkerCrashed { worker_id: 3 };
        let bytes = rmp_serde::to_vec(&err).unwrap();
        let back: TaskError = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, err);
    }
}
