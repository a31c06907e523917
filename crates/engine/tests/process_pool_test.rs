//! End-to-end tests for the process-pool strategy against the real
//! `drossel-worker` binary.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use drossel_core::{CodecKind, NullSink, Priority, Task, TaskError};
use drossel_engine::{
    AsyncTaskQueue, ProcessPoolConfig, ProcessPoolStrategy, QueueConfig, TaskStrategy,
};

fn pool(size: usize, codec: CodecKind) -> ProcessPoolStrategy {
    let config = ProcessPoolConfig::new(size, env!("CARGO_BIN_EXE_drossel-worker"), codec);
    ProcessPoolStrategy::spawn(config, Arc::new(NullSink)).expect("spawn worker pool")
}

#[tokio::test]
async fn computes_across_the_process_boundary() {
    let strategy = pool(2, CodecKind::Msgpack);
    let output = strategy
        .execute(Task::new("fib", json!({"n": 30})))
        .await
        .unwrap();
    assert_eq!(output.value["value"], "832040");
    strategy.shutdown().await;
}

#[tokio::test]
async fn json_codec_crosses_the_boundary_too() {
    let strategy = pool(1, CodecKind::Json);
    let output = strategy
        .execute(Task::new("primes", json!({"limit": 100})))
        .await
        .unwrap();
    assert_eq!(output.value["count"], 25);
    strategy.shutdown().await;
}

#[tokio::test]
async fn compute_errors_come_back_as_compute_not_crash() {
    let strategy = pool(1, CodecKind::Msgpack);
    let err = strategy
        .execute(Task::new("fib", json!({"wrong": true})))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Compute { .. }));

    // The worker survived the compute error.
    let output = strategy
        .execute(Task::new("fib", json!({"n": 10})))
        .await
        .unwrap();
    assert_eq!(output.value["value"], "55");
    strategy.shutdown().await;
}

#[tokio::test]
async fn unknown_kind_is_rejected_by_the_worker() {
    let strategy = pool(1, CodecKind::Msgpack);
    let err = strategy
        .execute(Task::new("no_such_kind", json!(null)))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Compute { .. }));
    strategy.shutdown().await;
}

#[tokio::test]
async fn worker_crash_is_detected_and_slot_respawns() {
    let strategy = pool(1, CodecKind::Msgpack);

    let err = strategy
        .execute(Task::new("abort", json!(null)))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::WorkerCrashed { worker_id: 0 }));

    // The slot respawned; unrelated work completes afterwards.
    let output = strategy
        .execute(Task::new("fib", json!({"n": 20})))
        .await
        .unwrap();
    assert_eq!(output.value["value"], "6765");
    strategy.shutdown().await;
}

#[tokio::test]
async fn crash_in_one_worker_leaves_the_other_undisturbed() {
    let strategy = Arc::new(pool(2, CodecKind::Msgpack));

    // Occupy worker A with a long sleep, crash worker B, and check the
    // sleeper still completes normally.
    let sleeper = {
        let s = Arc::clone(&strategy);
        tokio::spawn(async move { s.execute(Task::new("sleep_ms", json!({"ms": 300}))).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let crash = strategy
        .execute(Task::new("abort", json!(null)))
        .await
        .unwrap_err();
    assert!(matches!(crash, TaskError::WorkerCrashed { .. }));

    let output = sleeper.await.unwrap().unwrap();
    assert_eq!(output.value["slept_ms"], 300);
    strategy.shutdown().await;
}

#[tokio::test]
async fn queue_and_process_pool_compose() {
    let strategy = Arc::new(pool(2, CodecKind::Msgpack));
    let queue = AsyncTaskQueue::new(
        QueueConfig {
            capacity: 8,
            concurrency_limit: 2,
        },
        strategy,
        Arc::new(NullSink),
    );

    let handles: Vec<_> = (0..6)
        .map(|i| {
            queue
                .submit(
                    Task::new("fib", json!({"n": 10 + i})).with_priority(Priority::Normal),
                )
                .unwrap()
        })
        .collect();

    for handle in handles {
        handle.wait().await.unwrap();
    }
    assert_eq!(queue.stats().in_flight, 0);
    assert_eq!(queue.stats().backlog, 0);
}
