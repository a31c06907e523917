//! Bounded, ordered admission control in front of a strategy.
//!
//! Two independent limits: `capacity` bounds the backlog of
//! queued-but-not-dispatched entries (overflow is rejected immediately, never
//! blocked), and `concurrency_limit` bounds simultaneous execution. Dispatch
//! is FIFO within a priority level, higher levels first. Every entry resolves
//! its completion handle exactly once.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;

use drossel_core::{
    events, EngineConfig, EngineEvent, EventSink, FailureKind, Priority, Task, TaskError, TaskId,
    TaskResult,
};

use crate::strategy::TaskStrategy;

/// Poll interval for drain progress checks.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Queue limits.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Maximum queued-but-not-dispatched entries.
    pub capacity: usize,
    /// Maximum simultaneously executing entries.
    pub concurrency_limit: usize,
}

impl QueueConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            capacity: config.queue_capacity,
            concurrency_limit: config.concurrency_limit,
        }
    }
}

/// Point-in-time queue counters, served on `/stats`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStats {
    pub capacity: usize,
    pub concurrency_limit: usize,
    pub backlog: usize,
    pub in_flight: usize,
}

/// The single-fire completion side of one entry. The sender is taken exactly
/// once — whoever takes it (normal completion, timeout, cancellation) is the
/// one delivery that happens.
type CompletionSlot = Arc<Mutex<Option<oneshot::Sender<TaskResult>>>>;

fn complete(slot: &CompletionSlot, result: TaskResult) -> bool {
    let sender = slot.lock().unwrap().take();
    match sender {
        Some(tx) => {
            let _ = tx.send(result);
            true
        }
        None => false,
    }
}

/// A task waiting in the backlog.
struct QueueEntry {
    task: Task,
    slot: CompletionSlot,
}

/// Book-keeping for an entry that has been handed to the strategy.
struct DispatchedEntry {
    kind: String,
    slot: CompletionSlot,
}

struct QueueState {
    /// One FIFO lane per priority level.
    backlog: HashMap<Priority, VecDeque<QueueEntry>>,
    backlog_len: usize,
    in_flight: usize,
    dispatched: HashMap<TaskId, DispatchedEntry>,
    /// Set during drain: all further submissions are rejected.
    closed: bool,
}

impl QueueState {
    fn pop_next(&mut self) -> Option<QueueEntry> {
        for priority in Priority::DESCENDING {
            if let Some(lane) = self.backlog.get_mut(&priority) {
                if let Some(entry) = lane.pop_front() {
                    self.backlog_len -= 1;
                    return Some(entry);
                }
            }
        }
        None
    }
}

struct QueueInner {
    config: QueueConfig,
    strategy: Arc<dyn TaskStrategy>,
    sink: Arc<dyn EventSink>,
    state: Mutex<QueueState>,
}

/// Handle to one submitted task. Await [`wait`](CompletionHandle::wait) for
/// the single outcome, or [`cancel`](CompletionHandle::cancel) to withdraw.
pub struct CompletionHandle {
    task_id: TaskId,
    rx: oneshot::Receiver<TaskResult>,
    queue: AsyncTaskQueue,
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}

impl CompletionHandle {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Wait for the task's terminal outcome.
    pub async fn wait(self) -> TaskResult {
        match self.rx.await {
            Ok(result) => result,
            // The queue was torn down before completing the entry.
            Err(_) => Err(TaskError::Cancelled),
        }
    }

    /// Withdraw interest. Queued entries complete `Cancelled`; dispatched
    /// entries complete `Cancelled` and the strategy is asked to abort them
    /// best-effort. Returns whether the entry was still known to the queue.
    pub fn cancel(&self) -> bool {
        self.queue.cancel(self.task_id)
    }
}

/// Bounded asynchronous task queue in front of one [`TaskStrategy`].
#[derive(Clone)]
pub struct AsyncTaskQueue {
    inner: Arc<QueueInner>,
}

impl AsyncTaskQueue {
    pub fn new(
        config: QueueConfig,
        strategy: Arc<dyn TaskStrategy>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                config,
                strategy,
                sink,
                state: Mutex::new(QueueState {
                    backlog: HashMap::new(),
                    backlog_len: 0,
                    in_flight: 0,
                    dispatched: HashMap::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Submit a task. Dispatches immediately when under the concurrency
    /// limit, otherwise appends to the backlog; a full backlog rejects with
    /// `QueueSaturated` without blocking.
    pub fn submit(&self, task: Task) -> Result<CompletionHandle, TaskError> {
        let (tx, rx) = oneshot::channel();
        let slot: CompletionSlot = Arc::new(Mutex::new(Some(tx)));
        let task_id = task.id;

        {
            let mut state = self.inner.state.lock().unwrap();
            if state.closed || state.backlog_len == self.inner.config.capacity {
                drop(state);
                self.inner
                    .sink
                    .emit(EngineEvent::QueueSaturated(events::QueueSaturated {
                        capacity: self.inner.config.capacity,
                    }));
                return Err(TaskError::QueueSaturated {
                    capacity: self.inner.config.capacity,
                });
            }

            if state.in_flight < self.inner.config.concurrency_limit {
                state.in_flight += 1;
                state.dispatched.insert(
                    task_id,
                    DispatchedEntry {
                        kind: task.kind.clone(),
                        slot: Arc::clone(&slot),
                    },
                );
                drop(state);
                self.spawn_entry(task, Arc::clone(&slot));
            } else {
                state
                    .backlog
                    .entry(task.priority)
                    .or_default()
                    .push_back(QueueEntry {
                        task,
                        slot: Arc::clone(&slot),
                    });
                state.backlog_len += 1;
            }
        }

        Ok(CompletionHandle {
            task_id,
            rx,
            queue: self.clone(),
        })
    }

    /// Cancel an entry by ID. See [`CompletionHandle::cancel`].
    pub fn cancel(&self, task_id: TaskId) -> bool {
        let mut state = self.inner.state.lock().unwrap();

        // Still queued: remove from its lane and complete.
        for priority in Priority::DESCENDING {
            if let Some(lane) = state.backlog.get_mut(&priority) {
                let pos = lane.iter().position(|e| e.task.id == task_id);
                if let Some(entry) = pos.and_then(|p| lane.remove(p)) {
                    state.backlog_len -= 1;
                    drop(state);
                    if complete(&entry.slot, Err(TaskError::Cancelled)) {
                        self.emit_failure(task_id, &entry.task.kind, &TaskError::Cancelled);
                    }
                    return true;
                }
            }
        }

        // Dispatched: take the completion now, abort best-effort.
        if let Some(entry) = state.dispatched.get(&task_id) {
            let kind = entry.kind.clone();
            let slot = Arc::clone(&entry.slot);
            drop(state);
            if complete(&slot, Err(TaskError::Cancelled)) {
                self.emit_failure(task_id, &kind, &TaskError::Cancelled);
            }
            let strategy = Arc::clone(&self.inner.strategy);
            tokio::spawn(async move {
                strategy.abort(task_id).await;
            });
            return true;
        }

        false
    }

    /// Current counters.
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock().unwrap();
        QueueStats {
            capacity: self.inner.config.capacity,
            concurrency_limit: self.inner.config.concurrency_limit,
            backlog: state.backlog_len,
            in_flight: state.in_flight,
        }
    }

    /// Name of the strategy behind this queue.
    pub fn strategy_name(&self) -> &'static str {
        self.inner.strategy.name()
    }

    /// Close admission and wait for the queue to empty. Entries still
    /// pending when the grace period ends are completed `Cancelled`.
    /// Returns whether the queue drained fully in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.inner.state.lock().unwrap().closed = true;
        let deadline = Instant::now() + grace;

        loop {
            {
                let state = self.inner.state.lock().unwrap();
                if state.in_flight == 0 && state.backlog_len == 0 {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }

        // Grace expired: cancel whatever is left.
        let (backlog_leftovers, dispatched_leftovers) = {
            let mut state = self.inner.state.lock().unwrap();
            let mut backlog = Vec::new();
            while let Some(entry) = state.pop_next() {
                backlog.push(entry);
            }
            let dispatched: Vec<(TaskId, DispatchedEntry)> = state
                .dispatched
                .iter()
                .map(|(id, e)| {
                    (
                        *id,
                        DispatchedEntry {
                            kind: e.kind.clone(),
                            slot: Arc::clone(&e.slot),
                        },
                    )
                })
                .collect();
            (backlog, dispatched)
        };

        for entry in backlog_leftovers {
            if complete(&entry.slot, Err(TaskError::Cancelled)) {
                self.emit_failure(entry.task.id, &entry.task.kind, &TaskError::Cancelled);
            }
        }
        for (task_id, entry) in dispatched_leftovers {
            if complete(&entry.slot, Err(TaskError::Cancelled)) {
                self.emit_failure(task_id, &entry.kind, &TaskError::Cancelled);
            }
            self.inner.strategy.abort(task_id).await;
        }
        false
    }

    // ── Dispatch internals ───────────────────────────────────────────

    fn spawn_entry(&self, task: Task, slot: CompletionSlot) {
        let queue = self.clone();
        tokio::spawn(async move {
            queue.run_entry(task, slot).await;
        });
    }

    /// Execute one dispatched entry to completion, then hand the freed
    /// capacity to the backlog head.
    async fn run_entry(&self, task: Task, slot: CompletionSlot) {
        let task_id = task.id;
        let kind = task.kind.clone();
        let deadline = remaining_deadline(&task);

        let result = match deadline {
            // Deadline elapsed while the entry sat in the backlog.
            Some(remaining) if remaining.is_zero() => Err(TaskError::Timeout {
                after: task.deadline.unwrap_or_default(),
            }),
            Some(remaining) => {
                let after = task.deadline.unwrap_or_default();
                // The strategy call keeps running on its worker even when the
                // deadline fires first; the slot frees when it finishes.
                let exec = tokio::spawn({
                    let strategy = Arc::clone(&self.inner.strategy);
                    let task = task.clone();
                    async move { strategy.execute(task).await }
                });
                match tokio::time::timeout(remaining, exec).await {
                    Ok(Ok(result)) => {
                        // A blocking strategy can return late; the deadline
                        // still decides the outcome.
                        if remaining_deadline(&task).is_some_and(|r| r.is_zero()) {
                            Err(TaskError::Timeout { after })
                        } else {
                            result
                        }
                    }
                    Ok(Err(join_err)) => Err(TaskError::Compute {
                        message: format!("strategy task failed: {join_err}"),
                    }),
                    Err(_) => Err(TaskError::Timeout { after }),
                }
            }
            None => self.inner.strategy.execute(task.clone()).await,
        };

        if complete(&slot, result.clone()) {
            match &result {
                Ok(output) => {
                    self.inner
                        .sink
                        .emit(EngineEvent::TaskCompleted(events::TaskCompleted {
                            task_id,
                            kind: kind.clone(),
                            duration_ms: output.duration.as_millis() as u64,
                        }));
                }
                Err(err) => self.emit_failure(task_id, &kind, err),
            }
        }

        // Free the capacity and pull the next entry, if any.
        let next = {
            let mut state = self.inner.state.lock().unwrap();
            state.dispatched.remove(&task_id);
            state.in_flight -= 1;
            match state.pop_next() {
                Some(entry) => {
                    state.in_flight += 1;
                    state.dispatched.insert(
                        entry.task.id,
                        DispatchedEntry {
                            kind: entry.task.kind.clone(),
                            slot: Arc::clone(&entry.slot),
                        },
                    );
                    Some(entry)
                }
                None => None,
            }
        };
        if let Some(entry) = next {
            self.spawn_entry(entry.task, entry.slot);
        }
    }

    fn emit_failure(&self, task_id: TaskId, kind: &str, err: &TaskError) {
        self.inner.sink.emit(EngineEvent::TaskFailed(events::TaskFailed {
            task_id,
            kind: kind.to_string(),
            failure: FailureKind::from(err),
        }));
    }
}

/// Time left until the task's deadline, measured from its submission
/// timestamp. `None` when the task has no deadline; `Some(ZERO)` when it has
/// already elapsed.
fn remaining_deadline(task: &Task) -> Option<Duration> {
    let deadline = task.deadline?;
    let elapsed = chrono::Utc::now()
        .signed_duration_since(task.submitted_at)
        .to_std()
        .unwrap_or_default();
    Some(deadline.saturating_sub(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drossel_core::{NullSink, TaskOutput};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Strategy whose tasks start immediately but only finish when the test
    /// releases them. Records dispatch order and the concurrency high-water
    /// mark.
    #[derive(Default)]
    struct GateStrategy {
        started: Mutex<Vec<TaskId>>,
        gates: Mutex<HashMap<TaskId, Arc<Notify>>>,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl GateStrategy {
        fn release(&self, task_id: TaskId) {
            if let Some(gate) = self.gates.lock().unwrap().get(&task_id) {
                gate.notify_one();
            }
        }

        fn started(&self) -> Vec<TaskId> {
            self.started.lock().unwrap().clone()
        }

        /// Wait until `n` tasks have been dispatched to the strategy.
        async fn wait_started(&self, n: usize) {
            for _ in 0..200 {
                if self.started.lock().unwrap().len() >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("timed out waiting for {n} dispatches");
        }
    }

    #[async_trait]
    impl TaskStrategy for GateStrategy {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn capacity(&self) -> usize {
            usize::MAX
        }

        async fn execute(&self, task: Task) -> TaskResult {
            let gate = Arc::new(Notify::new());
            let notified = {
                self.started.lock().unwrap().push(task.id);
                self.gates.lock().unwrap().insert(task.id, Arc::clone(&gate));
                gate.notified()
            };
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            notified.await;

            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(TaskOutput {
                task_id: task.id,
                value: serde_json::Value::Null,
                duration: Duration::ZERO,
            })
        }
    }

    /// Strategy that completes after a fixed tokio sleep.
    struct SleepStrategy(Duration);

    #[async_trait]
    impl TaskStrategy for SleepStrategy {
        fn name(&self) -> &'static str {
            "sleep"
        }

        fn capacity(&self) -> usize {
            usize::MAX
        }

        async fn execute(&self, task: Task) -> TaskResult {
            tokio::time::sleep(self.0).await;
            Ok(TaskOutput {
                task_id: task.id,
                value: serde_json::Value::Null,
                duration: self.0,
            })
        }
    }

    fn queue_with(
        capacity: usize,
        concurrency_limit: usize,
        strategy: Arc<dyn TaskStrategy>,
    ) -> AsyncTaskQueue {
        AsyncTaskQueue::new(
            QueueConfig {
                capacity,
                concurrency_limit,
            },
            strategy,
            Arc::new(NullSink),
        )
    }

    fn task() -> Task {
        Task::new("noop", json!(null))
    }

    #[tokio::test]
    async fn saturation_scenario_capacity_two_limit_one() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(2, 1, gate.clone());

        let t1 = queue.submit(task()).unwrap();
        let t2 = queue.submit(task()).unwrap();
        let t3 = queue.submit(task()).unwrap();

        // T1 dispatched immediately, T2/T3 queued, T4 rejected outright.
        gate.wait_started(1).await;
        let err = queue.submit(task()).unwrap_err();
        assert!(matches!(err, TaskError::QueueSaturated { capacity: 2 }));
        assert_eq!(queue.stats().backlog, 2);
        assert_eq!(queue.stats().in_flight, 1);

        // T1 completes, then T2 dispatches; then T3.
        gate.release(t1.task_id());
        t1.wait().await.unwrap();
        gate.wait_started(2).await;
        assert_eq!(gate.started()[1], t2.task_id());

        gate.release(t2.task_id());
        t2.wait().await.unwrap();
        gate.wait_started(3).await;
        assert_eq!(gate.started()[2], t3.task_id());

        gate.release(t3.task_id());
        t3.wait().await.unwrap();
        assert_eq!(queue.stats().in_flight, 0);
        assert_eq!(queue.stats().backlog, 0);
    }

    #[tokio::test]
    async fn fifo_order_among_queued_entries() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(8, 1, gate.clone());

        let first = queue.submit(task()).unwrap();
        gate.wait_started(1).await;

        let queued: Vec<_> = (0..5).map(|_| queue.submit(task()).unwrap()).collect();
        let expected: Vec<_> = queued.iter().map(|h| h.task_id()).collect();

        gate.release(first.task_id());
        first.wait().await.unwrap();
        for (i, handle) in queued.into_iter().enumerate() {
            gate.wait_started(2 + i).await;
            gate.release(handle.task_id());
            handle.wait().await.unwrap();
        }
        assert_eq!(&gate.started()[1..], &expected[..]);
    }

    #[tokio::test]
    async fn higher_priority_dispatches_first() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(8, 1, gate.clone());

        let first = queue.submit(task()).unwrap();
        gate.wait_started(1).await;

        let low = queue.submit(task().with_priority(Priority::Low)).unwrap();
        let normal = queue.submit(task()).unwrap();
        let high = queue.submit(task().with_priority(Priority::High)).unwrap();

        let expected = [high.task_id(), normal.task_id(), low.task_id()];
        gate.release(first.task_id());
        first.wait().await.unwrap();

        for (i, handle) in [high, normal, low].into_iter().enumerate() {
            gate.wait_started(2 + i).await;
            assert_eq!(gate.started()[1 + i], expected[i]);
            gate.release(handle.task_id());
            handle.wait().await.unwrap();
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() {
        let gate_counted = Arc::new(GateStrategy::default());
        let queue = queue_with(64, 3, gate_counted.clone());
        let handles: Vec<_> = (0..20).map(|_| queue.submit(task()).unwrap()).collect();

        // Release everything as it starts; the queue feeds new work as
        // capacity frees, never exceeding the limit.
        let releaser = {
            let gate = Arc::clone(&gate_counted);
            tokio::spawn(async move {
                let mut released = 0usize;
                while released < 20 {
                    let started = gate.started();
                    for id in started.iter().skip(released) {
                        gate.release(*id);
                        released += 1;
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
            })
        };

        for handle in handles {
            handle.wait().await.unwrap();
        }
        releaser.await.unwrap();
        assert!(gate_counted.max_running.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate_counted.started().len(), 20);
    }

    #[tokio::test]
    async fn cancel_queued_entry_completes_cancelled() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(4, 1, gate.clone());

        let running = queue.submit(task()).unwrap();
        gate.wait_started(1).await;
        let queued = queue.submit(task()).unwrap();
        let last = queue.submit(task()).unwrap();

        assert!(queued.cancel());
        let cancelled_id = queued.task_id();
        assert!(matches!(queued.wait().await, Err(TaskError::Cancelled)));
        assert_eq!(queue.stats().backlog, 1);

        // The cancelled entry never reaches the strategy; the next one does.
        gate.release(running.task_id());
        running.wait().await.unwrap();
        gate.wait_started(2).await;
        assert_eq!(gate.started()[1], last.task_id());
        assert!(!gate.started().contains(&cancelled_id));

        gate.release(last.task_id());
        last.wait().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_dispatched_entry_is_best_effort() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(4, 1, gate.clone());

        let running = queue.submit(task()).unwrap();
        gate.wait_started(1).await;
        let running_id = running.task_id();

        assert!(queue.cancel(running_id));
        assert!(matches!(running.wait().await, Err(TaskError::Cancelled)));

        // The strategy call is still in flight; releasing it frees capacity
        // and delivers nothing twice.
        gate.release(running_id);
        for _ in 0..100 {
            if queue.stats().in_flight == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(queue.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn cancel_unknown_id_is_a_noop() {
        let queue = queue_with(4, 1, Arc::new(GateStrategy::default()));
        assert!(!queue.cancel(TaskId::new()));
    }

    #[tokio::test]
    async fn deadline_elapsed_before_dispatch_times_out_without_executing() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(4, 1, gate.clone());

        let blocker = queue.submit(task()).unwrap();
        gate.wait_started(1).await;

        let doomed = queue
            .submit(task().with_deadline(Duration::from_millis(20)))
            .unwrap();
        let doomed_id = doomed.task_id();
        tokio::time::sleep(Duration::from_millis(50)).await;

        gate.release(blocker.task_id());
        blocker.wait().await.unwrap();

        assert!(matches!(doomed.wait().await, Err(TaskError::Timeout { .. })));
        assert!(!gate.started().contains(&doomed_id));
    }

    #[tokio::test]
    async fn deadline_during_execution_times_out() {
        let queue = queue_with(4, 1, Arc::new(SleepStrategy(Duration::from_millis(500))));
        let handle = queue
            .submit(task().with_deadline(Duration::from_millis(30)))
            .unwrap();
        assert!(matches!(handle.wait().await, Err(TaskError::Timeout { .. })));
    }

    #[tokio::test]
    async fn tasks_without_deadline_complete_normally() {
        let queue = queue_with(4, 2, Arc::new(SleepStrategy(Duration::from_millis(10))));
        let handle = queue.submit(task()).unwrap();
        assert!(handle.wait().await.is_ok());
    }

    #[tokio::test]
    async fn drain_finishes_inflight_and_rejects_new_work() {
        let queue = queue_with(4, 2, Arc::new(SleepStrategy(Duration::from_millis(20))));
        let h1 = queue.submit(task()).unwrap();
        let h2 = queue.submit(task()).unwrap();

        let drained = queue.drain(Duration::from_secs(2)).await;
        assert!(drained);
        assert!(h1.wait().await.is_ok());
        assert!(h2.wait().await.is_ok());

        let err = queue.submit(task()).unwrap_err();
        assert!(matches!(err, TaskError::QueueSaturated { .. }));
    }

    #[tokio::test]
    async fn drain_grace_expiry_cancels_leftovers() {
        let gate = Arc::new(GateStrategy::default());
        let queue = queue_with(4, 1, gate.clone());

        let running = queue.submit(task()).unwrap();
        gate.wait_started(1).await;
        let queued = queue.submit(task()).unwrap();

        let drained = queue.drain(Duration::from_millis(50)).await;
        assert!(!drained);
        assert!(matches!(running.wait().await, Err(TaskError::Cancelled)));
        assert!(matches!(queued.wait().await, Err(TaskError::Cancelled)));

        gate.release(gate.started()[0]);
    }
}
