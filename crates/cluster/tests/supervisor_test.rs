//! Supervisor lifecycle tests using throwaway shell commands as workers.

use std::time::Duration;

use drossel_cluster::{ClusterSupervisor, WorkerProcState, WorkerSpec};
use drossel_core::{ClusterConfig, RestartConfig};

fn cluster_config(workers: usize, max_restarts: u32) -> ClusterConfig {
    ClusterConfig {
        workers,
        bind: "127.0.0.1:0".into(),
        base_port: 0,
        restart: RestartConfig {
            backoff_initial_ms: 20,
            backoff_max_ms: 100,
            max_restarts,
            window_secs: 60,
        },
        drain_timeout_secs: 2,
    }
}

/// Poll until the predicate holds or the deadline passes.
async fn wait_until(
    supervisor: &ClusterSupervisor,
    timeout: Duration,
    predicate: impl Fn(&[WorkerProcState]) -> bool,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate(&supervisor.worker_states()) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn crash_looping_worker_escalates_to_failed() {
    // A worker that exits immediately crashes on every start.
    let spec = WorkerSpec::opaque("/bin/sh", vec!["-c".into(), "exit 1".into()]);
    let supervisor = ClusterSupervisor::new(cluster_config(1, 2), spec);
    supervisor.start();

    let failed = wait_until(&supervisor, Duration::from_secs(5), |states| {
        states == [WorkerProcState::Failed]
    })
    .await;
    assert!(failed, "slot should halt after repeated crashes");
    supervisor.shutdown().await;
}

#[tokio::test]
async fn long_running_workers_reach_ready_and_terminate_on_shutdown() {
    let spec = WorkerSpec::opaque("/bin/sh", vec!["-c".into(), "sleep 30".into()]);
    let supervisor = ClusterSupervisor::new(cluster_config(2, 3), spec);
    supervisor.start();

    let ready = wait_until(&supervisor, Duration::from_secs(5), |states| {
        states.iter().all(|s| *s == WorkerProcState::Ready)
    })
    .await;
    assert!(ready);
    assert_eq!(supervisor.ready_count(), 2);

    supervisor.shutdown().await;
    assert!(supervisor
        .worker_states()
        .iter()
        .all(|s| *s == WorkerProcState::Terminated));
    assert_eq!(supervisor.ready_count(), 0);
}

#[tokio::test]
async fn crashed_worker_restarts_within_backoff_window() {
    // Each run lives 200ms then dies; the supervisor keeps bringing it back
    // until the crash window fills.
    let spec = WorkerSpec::opaque("/bin/sh", vec!["-c".into(), "sleep 0.2".into()]);
    let supervisor = ClusterSupervisor::new(cluster_config(1, 5), spec);
    supervisor.start();

    // Observe at least one full crash→restart→ready cycle.
    let crashed_once = wait_until(&supervisor, Duration::from_secs(5), |states| {
        matches!(
            states[0],
            WorkerProcState::Crashed | WorkerProcState::Backoff | WorkerProcState::Starting
        )
    })
    .await;
    assert!(crashed_once);

    let ready_again = wait_until(&supervisor, Duration::from_secs(5), |states| {
        states == [WorkerProcState::Ready]
    })
    .await;
    assert!(ready_again, "worker should come back after backoff");
    supervisor.shutdown().await;
}
