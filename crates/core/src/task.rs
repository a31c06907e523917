use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a submitted task.
///
/// Wrapper around a UUID so identifiers stay valid across the worker
/// process boundary and across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority. FIFO order is preserved within a level;
/// higher levels drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
}

impl Priority {
    /// All levels, highest first. Dispatch scans in this order.
    pub const DESCENDING: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];
}

/// One unit of CPU-bound work.
///
/// The compute step is referenced by `kind` and resolved through a
/// [`ComputeRegistry`](crate::registry::ComputeRegistry) — a closure cannot
/// cross the worker process boundary, a name can. Tasks are immutable after
/// construction; the queue owns them from submission to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned at construction.
    pub id: TaskId,
    /// Registered compute-function name (e.g. "fib").
    pub kind: String,
    /// Arbitrary JSON payload handed to the compute function.
    pub payload: serde_json::Value,
    /// When the task was created by the caller.
    pub submitted_at: DateTime<Utc>,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// Optional deadline, measured from `submitted_at`. The queue completes
    /// the task with `Timeout` once it elapses.
    #[serde(default)]
    pub deadline: Option<Duration>,
}

impl Task {
    /// Create a task with default priority and no deadline.
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: TaskId::new(),
            kind: kind.into(),
            payload,
            submitted_at: Utc::now(),
            priority: Priority::default(),
            deadline: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Successful result of one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    /// The task this output belongs to.
    pub task_id: TaskId,
    /// Value produced by the compute function.
    pub value: serde_json::Value,
    /// Wall-clock execution time of the compute step.
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::DESCENDING[0], Priority::High);
    }

    #[test]
    fn task_builder_defaults() {
        let task = Task::new("fib", serde_json::json!({"n": 30}));
        assert_eq!(task.kind, "fib");
        assert_eq!(task.priority, Priority::Normal);
        assert!(task.deadline.is_none());
    }

    #[test]
    fn task_survives_the_wire() {
        let task = Task::new("primes", serde_json::json!({"limit": 1000}))
            .with_priority(Priority::High)
            .with_deadline(Duration::from_secs(5));
        let bytes = rmp_serde::to_vec(&task).unwrap();
        let back: Task = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back.id, task.id);
        assert_eq!(back.priority, Priority::High);
        assert_eq!(back.deadline, Some(Duration::from_secs(5)));
    }
}
