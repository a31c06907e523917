//! Parallel execution on a pool of worker OS processes.
//!
//! Each slot owns one child process running the `drossel-worker` binary and
//! a driver task that feeds it framed requests over stdin/stdout. Payloads
//! cross the boundary through the injected codec, so compute functions can
//! never close over parent memory. A dead child is detected by its broken
//! pipe, reported as `WorkerCrashed`, and replaced before the slot accepts
//! further work.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use drossel_core::{
    events, CodecKind, EngineConfig, EngineEvent, EventSink, PayloadCodec, Task, TaskError, TaskId,
    TaskOutput,
};

use crate::error::EngineError;
use crate::protocol::{read_frame, write_frame, WorkerReply, WorkerRequest, PROTOCOL_VERSION};

use super::{TaskStrategy, WorkerState};

/// Delay between respawn attempts when the worker binary itself cannot be
/// started (missing or non-executable).
const RESPAWN_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Settings for the process pool.
#[derive(Debug, Clone)]
pub struct ProcessPoolConfig {
    pub pool_size: usize,
    pub worker_binary: PathBuf,
    pub codec: CodecKind,
}

impl ProcessPoolConfig {
    pub fn new(pool_size: usize, worker_binary: impl Into<PathBuf>, codec: CodecKind) -> Self {
        Self {
            pool_size,
            worker_binary: worker_binary.into(),
            codec,
        }
    }

    /// Resolve from the engine config; the default binary is a sibling of
    /// the current executable.
    pub fn from_engine(config: &EngineConfig) -> Result<Self, EngineError> {
        let worker_binary = match &config.worker_binary {
            Some(path) => PathBuf::from(path),
            None => default_worker_binary()?,
        };
        Ok(Self {
            pool_size: config.resolved_pool_size(),
            worker_binary,
            codec: config.codec,
        })
    }
}

fn default_worker_binary() -> Result<PathBuf, EngineError> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| EngineError::Config("current executable has no parent directory".into()))?;
    Ok(dir.join("drossel-worker"))
}

/// A spawned child with its pipe ends taken.
struct WorkerChild {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

fn spawn_child(binary: &PathBuf, worker_id: u32) -> Result<WorkerChild, EngineError> {
    let mut child = Command::new(binary)
        .arg("--worker-id")
        .arg(worker_id.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EngineError::Spawn {
            binary: binary.clone(),
            source,
        })?;
    let stdin = child.stdin.take().ok_or(EngineError::ChannelClosed)?;
    let stdout = child.stdout.take().ok_or(EngineError::ChannelClosed)?;
    Ok(WorkerChild {
        child,
        stdin,
        stdout,
    })
}

/// Work handed to a slot's driver task.
enum Dispatch {
    Run {
        request: WorkerRequest,
        reply: oneshot::Sender<Result<WorkerReply, TaskError>>,
    },
    Shutdown,
}

/// One pool slot: the channel into its driver plus observable state.
struct WorkerSlot {
    id: u32,
    tx: mpsc::UnboundedSender<Dispatch>,
    kill_tx: mpsc::UnboundedSender<TaskId>,
    state: Arc<Mutex<WorkerState>>,
    current: Arc<Mutex<Option<TaskId>>>,
}

/// Pool of worker processes behind a message-passing boundary.
pub struct ProcessPoolStrategy {
    workers: Vec<WorkerSlot>,
    cursor: AtomicUsize,
    codec: Arc<dyn PayloadCodec>,
    codec_kind: CodecKind,
}

impl ProcessPoolStrategy {
    /// Spawn all worker children and their driver tasks. Fails fast if the
    /// binary cannot be started at all.
    pub fn spawn(
        config: ProcessPoolConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let mut workers = Vec::with_capacity(config.pool_size);
        for id in 0..config.pool_size as u32 {
            let child = spawn_child(&config.worker_binary, id)?;
            let (tx, rx) = mpsc::unbounded_channel();
            let (kill_tx, kill_rx) = mpsc::unbounded_channel();
            let state = Arc::new(Mutex::new(WorkerState::Idle));
            let current = Arc::new(Mutex::new(None));
            tokio::spawn(drive(
                id,
                config.worker_binary.clone(),
                child,
                rx,
                kill_rx,
                Arc::clone(&state),
                Arc::clone(&current),
                Arc::clone(&sink),
            ));
            workers.push(WorkerSlot {
                id,
                tx,
                kill_tx,
                state,
                current,
            });
            tracing::info!(worker_id = id, binary = %config.worker_binary.display(), "spawned worker");
        }
        Ok(Self {
            workers,
            cursor: AtomicUsize::new(0),
            codec: config.codec.build(),
            codec_kind: config.codec,
        })
    }

    /// Next idle slot round-robin; all busy falls back to plain round-robin
    /// (per-worker queues stay FIFO).
    fn pick_slot(&self) -> &WorkerSlot {
        let len = self.workers.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for offset in 0..len {
            let slot = &self.workers[(start + offset) % len];
            if *slot.state.lock().unwrap() == WorkerState::Idle {
                return slot;
            }
        }
        &self.workers[start % len]
    }

    /// Snapshot of slot states, for stats and tests.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers
            .iter()
            .map(|w| *w.state.lock().unwrap())
            .collect()
    }
}

#[async_trait]
impl TaskStrategy for ProcessPoolStrategy {
    fn name(&self) -> &'static str {
        "process_pool"
    }

    fn capacity(&self) -> usize {
        self.workers.len()
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, TaskError> {
        let payload = self
            .codec
            .encode(&task.payload)
            .map_err(|e| TaskError::compute(format!("payload encode failed: {e}")))?;
        let request = WorkerRequest {
            version: PROTOCOL_VERSION,
            task_id: task.id,
            kind: task.kind.clone(),
            payload,
            codec: self.codec_kind,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let slot = self.pick_slot();
        slot.tx
            .send(Dispatch::Run {
                request,
                reply: reply_tx,
            })
            .map_err(|_| TaskError::Cancelled)?;

        match reply_rx.await {
            Ok(Ok(reply)) => {
                let bytes = reply.result?;
                let value = self
                    .codec
                    .decode(&bytes)
                    .map_err(|e| TaskError::compute(format!("result decode failed: {e}")))?;
                Ok(TaskOutput {
                    task_id: task.id,
                    value,
                    duration: Duration::from_millis(reply.duration_ms),
                })
            }
            Ok(Err(err)) => Err(err),
            // Driver went away during shutdown.
            Err(_) => Err(TaskError::Cancelled),
        }
    }

    async fn abort(&self, task_id: TaskId) -> bool {
        for slot in &self.workers {
            if *slot.current.lock().unwrap() == Some(task_id) {
                let _ = slot.kill_tx.send(task_id);
                tracing::debug!(worker_id = slot.id, task_id = %task_id, "abort requested");
                return true;
            }
        }
        false
    }

    async fn shutdown(&self) {
        for slot in &self.workers {
            let _ = slot.tx.send(Dispatch::Shutdown);
        }
    }
}

/// Driver loop for one slot. Owns the child; respawns it on crash before
/// taking the next dispatch, so a dead worker never receives work.
#[allow(clippy::too_many_arguments)]
async fn drive(
    worker_id: u32,
    binary: PathBuf,
    mut child: WorkerChild,
    mut rx: mpsc::UnboundedReceiver<Dispatch>,
    mut kill_rx: mpsc::UnboundedReceiver<TaskId>,
    state: Arc<Mutex<WorkerState>>,
    current: Arc<Mutex<Option<TaskId>>>,
    sink: Arc<dyn EventSink>,
) {
    while let Some(dispatch) = rx.recv().await {
        let (request, reply) = match dispatch {
            Dispatch::Run { request, reply } => (request, reply),
            Dispatch::Shutdown => break,
        };
        let task_id = request.task_id;
        *state.lock().unwrap() = WorkerState::Busy;
        *current.lock().unwrap() = Some(task_id);

        match exchange(&mut child, &request, &mut kill_rx).await {
            Ok(worker_reply) => {
                let _ = reply.send(Ok(worker_reply));
            }
            Err(reason) => {
                tracing::warn!(worker_id, task_id = %task_id, reason = %reason, "worker died mid-task");
                sink.emit(EngineEvent::WorkerCrashed(events::WorkerCrashed {
                    worker_id,
                    task_id: Some(task_id),
                }));
                let _ = reply.send(Err(TaskError::WorkerCrashed { worker_id }));

                *state.lock().unwrap() = WorkerState::Crashed;
                let _ = child.child.start_kill();
                child = respawn(&binary, worker_id).await;
            }
        }

        *current.lock().unwrap() = None;
        *state.lock().unwrap() = WorkerState::Idle;
    }

    let _ = child.child.start_kill();
    tracing::debug!(worker_id, "worker driver stopped");
}

/// Send one request and wait for its reply, watching for abort requests.
/// Any pipe failure means the child is gone.
async fn exchange(
    child: &mut WorkerChild,
    request: &WorkerRequest,
    kill_rx: &mut mpsc::UnboundedReceiver<TaskId>,
) -> Result<WorkerReply, String> {
    write_frame(&mut child.stdin, request)
        .await
        .map_err(|e| format!("request write failed: {e}"))?;

    // The read stays pinned across abort checks so a stale abort for an
    // earlier task cannot tear a half-read frame off the stream.
    let read_fut = read_frame::<_, WorkerReply>(&mut child.stdout);
    tokio::pin!(read_fut);
    loop {
        tokio::select! {
            victim = kill_rx.recv() => {
                match victim {
                    Some(id) if id == request.task_id => {
                        let _ = child.child.start_kill();
                        return Err("killed on abort".into());
                    }
                    // Stale abort for an earlier task.
                    Some(_) => continue,
                    // Kill channel gone (strategy dropped); finish the read.
                    None => return reply_from((&mut read_fut).await),
                }
            }
            frame = &mut read_fut => {
                return reply_from(frame);
            }
        }
    }
}

fn reply_from(frame: Result<Option<WorkerReply>, EngineError>) -> Result<WorkerReply, String> {
    match frame {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => Err("worker closed its stdout".into()),
        Err(e) => Err(e.to_string()),
    }
}

/// Replace a dead child, retrying until the binary spawns.
async fn respawn(binary: &PathBuf, worker_id: u32) -> WorkerChild {
    loop {
        match spawn_child(binary, worker_id) {
            Ok(child) => {
                tracing::info!(worker_id, "worker respawned");
                return child;
            }
            Err(e) => {
                tracing::error!(worker_id, error = %e, "worker respawn failed, retrying");
                tokio::time::sleep(RESPAWN_RETRY_DELAY).await;
            }
        }
    }
}
