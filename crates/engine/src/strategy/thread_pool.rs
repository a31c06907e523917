//! Intra-process parallel execution on a fixed rayon thread pool.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use drossel_core::{ComputeRegistry, Task, TaskError, TaskId, TaskOutput};

use super::{panic_message, TaskStrategy, WorkerState};
use crate::error::EngineError;

/// One pool slot. The strategy is the sole writer of slot state.
struct Slot {
    state: WorkerState,
    current: Option<TaskId>,
}

/// Slot bookkeeping shared between the async side and pool threads.
struct SlotBoard {
    slots: Mutex<Vec<Slot>>,
    /// Round-robin cursor for idle-slot selection.
    cursor: AtomicUsize,
    /// Signalled whenever a slot returns to idle.
    freed: Notify,
}

impl SlotBoard {
    fn new(size: usize) -> Self {
        let slots = (0..size)
            .map(|_| Slot {
                state: WorkerState::Idle,
                current: None,
            })
            .collect();
        Self {
            slots: Mutex::new(slots),
            cursor: AtomicUsize::new(0),
            freed: Notify::new(),
        }
    }

    /// Claim the next idle slot round-robin, if any.
    fn try_claim(&self, task_id: TaskId) -> Option<usize> {
        let mut slots = self.slots.lock().unwrap();
        let len = slots.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for offset in 0..len {
            let idx = (start + offset) % len;
            if slots[idx].state == WorkerState::Idle {
                slots[idx].state = WorkerState::Busy;
                slots[idx].current = Some(task_id);
                return Some(idx);
            }
        }
        None
    }

    fn release(&self, idx: usize) {
        let mut slots = self.slots.lock().unwrap();
        slots[idx].state = WorkerState::Idle;
        slots[idx].current = None;
        drop(slots);
        self.freed.notify_waiters();
    }
}

/// Fixed-size pool of parallel workers inside the process.
///
/// At most `pool_size` tasks execute at once; the queue's concurrency limit
/// keeps callers from over-committing, so claiming normally succeeds on the
/// first scan. A compute panic is confined to its slot: the payload is
/// caught, reported as a `Compute` failure, and the slot returns to the
/// idle set.
pub struct ThreadPoolStrategy {
    pool: rayon::ThreadPool,
    board: Arc<SlotBoard>,
    registry: Arc<ComputeRegistry>,
    pool_size: usize,
}

impl ThreadPoolStrategy {
    pub fn new(pool_size: usize, registry: Arc<ComputeRegistry>) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pool_size)
            .thread_name(|i| format!("drossel-pool-{i}"))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build thread pool: {e}")))?;
        Ok(Self {
            pool,
            board: Arc::new(SlotBoard::new(pool_size)),
            registry,
            pool_size,
        })
    }

    /// Claim an idle slot, waiting for a release if every slot is busy
    /// (only reachable when an abandoned deadline overshoot is still
    /// occupying its thread).
    async fn claim(&self, task_id: TaskId) -> usize {
        loop {
            let freed = self.board.freed.notified();
            if let Some(idx) = self.board.try_claim(task_id) {
                return idx;
            }
            freed.await;
        }
    }

    /// Snapshot of slot states, for stats and tests.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.board.slots.lock().unwrap().iter().map(|s| s.state).collect()
    }
}

#[async_trait]
impl TaskStrategy for ThreadPoolStrategy {
    fn name(&self) -> &'static str {
        "thread_pool"
    }

    fn capacity(&self) -> usize {
        self.pool_size
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, TaskError> {
        let slot = self.claim(task.id).await;
        let (tx, rx) = oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let board = Arc::clone(&self.board);

        self.pool.spawn(move || {
            let start = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| registry.execute(&task)));
            let outcome = match result {
                Ok(Ok(value)) => Ok(TaskOutput {
                    task_id: task.id,
                    value,
                    duration: start.elapsed(),
                }),
                Ok(Err(err)) => Err(err),
                Err(payload) => Err(TaskError::Compute {
                    message: panic_message(payload),
                }),
            };
            board.release(slot);
            // Receiver may be gone if the caller abandoned the task.
            let _ = tx.send(outcome);
        });

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::Compute {
                message: "pool worker dropped the result channel".into(),
            }),
        }
    }
}
