//! Baseline strategies: synchronous in-process execution and the null
//! strategy that skips the compute step entirely.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use drossel_core::{ComputeRegistry, Task, TaskError, TaskOutput};

use super::{panic_message, TaskStrategy};

/// Runs the compute function inline on the calling runtime thread.
///
/// Deliberately blocking: this is the latency/throughput baseline the other
/// strategies are measured against, so it must not introduce any
/// parallelism of its own. Control yields back to the runtime only at the
/// natural await points around the call.
pub struct InProcessStrategy {
    registry: Arc<ComputeRegistry>,
}

impl InProcessStrategy {
    pub fn new(registry: Arc<ComputeRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl TaskStrategy for InProcessStrategy {
    fn name(&self) -> &'static str {
        "in_process"
    }

    fn capacity(&self) -> usize {
        1
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, TaskError> {
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| self.registry.execute(&task)));
        match result {
            Ok(Ok(value)) => Ok(TaskOutput {
                task_id: task.id,
                value,
                duration: start.elapsed(),
            }),
            Ok(Err(err)) => Err(err),
            Err(payload) => Err(TaskError::Compute {
                message: panic_message(payload),
            }),
        }
    }
}

/// Completes immediately with a null value, never invoking the compute
/// function. The overhead control group: everything measured through it is
/// queue and transport cost.
pub struct NullStrategy;

#[async_trait]
impl TaskStrategy for NullStrategy {
    fn name(&self) -> &'static str {
        "null"
    }

    fn capacity(&self) -> usize {
        1
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, TaskError> {
        Ok(TaskOutput {
            task_id: task.id,
            value: serde_json::Value::Null,
            duration: std::time::Duration::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Arc<ComputeRegistry> {
        ComputeRegistry::standard()
    }

    #[tokio::test]
    async fn computes_inline() {
        let strategy = InProcessStrategy::new(registry());
        let output = strategy
            .execute(Task::new("fib", json!({"n": 10})))
            .await
            .unwrap();
        assert_eq!(output.value["value"], "55");
    }

    #[tokio::test]
    async fn compute_error_surfaces() {
        let strategy = InProcessStrategy::new(registry());
        let err = strategy
            .execute(Task::new("fib", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Compute { .. }));
    }

    #[tokio::test]
    async fn panic_becomes_compute_error() {
        let mut reg = ComputeRegistry::new();
        reg.register("boom", |_| panic!("deliberate"));
        let strategy = InProcessStrategy::new(Arc::new(reg));
        let err = strategy
            .execute(Task::new("boom", json!(null)))
            .await
            .unwrap_err();
        match err {
            TaskError::Compute { message } => assert!(message.contains("deliberate")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_strategy_skips_compute() {
        let strategy = NullStrategy;
        let output = strategy
            .execute(Task::new("does-not-exist", json!(null)))
            .await
            .unwrap();
        assert_eq!(output.value, serde_json::Value::Null);
    }
}
