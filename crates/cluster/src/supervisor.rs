//! Worker-process lifecycle management.
//!
//! One manager task per worker slot runs the state machine
//! `Starting → Ready → {Crashed → Backoff → Starting} | ShuttingDown →
//! Terminated`, with `Failed` as the crash-loop escalation. Children get
//! their stdout/stderr piped through aligned, colored log prefixes.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Notify;

use drossel_core::ClusterConfig;

use crate::backoff::{RestartBackoff, RestartDecision};
use crate::proxy::Proxy;
use crate::ClusterError;

// ── ANSI color palette for worker log prefixes ──────────────────────

const COLORS: &[&str] = &[
    "\x1b[36m", // cyan
    "\x1b[33m", // yellow
    "\x1b[32m", // green
    "\x1b[35m", // magenta
    "\x1b[34m", // blue
    "\x1b[91m", // bright red
    "\x1b[92m", // bright green
    "\x1b[93m", // bright yellow
];
const RESET: &str = "\x1b[0m";

/// Interval between readiness probes while a worker is starting.
const READY_PROBE_INTERVAL: Duration = Duration::from_millis(200);

/// How long to wait for a worker to become ready before treating the
/// start as a crash.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle state of one worker process slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerProcState {
    Starting,
    Ready,
    Crashed,
    Backoff,
    ShuttingDown,
    Terminated,
    /// Crash-loop escalation: the slot is halted and no longer restarted.
    Failed,
}

/// Command template for worker processes. `{port}` and `{id}` in arguments
/// and environment values are substituted per worker.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Probe `127.0.0.1:port` with TCP connects before marking Ready.
    /// Disable for workers that expose no listening socket.
    pub wait_ready: bool,
}

impl WorkerSpec {
    /// Spec for a worker with no listening port (readiness = spawned).
    pub fn opaque(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: HashMap::new(),
            wait_ready: false,
        }
    }

    /// Spec for a server worker probed on its `{port}`.
    pub fn server(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: HashMap::new(),
            wait_ready: true,
        }
    }

    fn render(template: &str, id: u32, port: u16) -> String {
        template
            .replace("{port}", &port.to_string())
            .replace("{id}", &id.to_string())
    }

    fn command(&self, id: u32, port: u16) -> Command {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            cmd.arg(Self::render(arg, id, port));
        }
        for (key, value) in &self.env {
            cmd.env(key, Self::render(value, id, port));
        }
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Shared view of one worker slot, read by the proxy.
pub(crate) struct SlotShared {
    pub(crate) id: u32,
    pub(crate) port: u16,
    pub(crate) state: Mutex<WorkerProcState>,
    pub(crate) ready: AtomicBool,
}

impl SlotShared {
    fn set_state(&self, state: WorkerProcState) {
        *self.state.lock().unwrap() = state;
        self.ready
            .store(state == WorkerProcState::Ready, Ordering::SeqCst);
    }
}

/// Supervisor for N sibling worker processes plus the connection proxy.
pub struct ClusterSupervisor {
    config: ClusterConfig,
    spec: WorkerSpec,
    slots: Arc<Vec<Arc<SlotShared>>>,
    shutdown: Arc<Notify>,
    shutting_down: Arc<AtomicBool>,
    managers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl ClusterSupervisor {
    pub fn new(config: ClusterConfig, spec: WorkerSpec) -> Self {
        let workers = config.resolved_workers();
        let slots = (0..workers as u32)
            .map(|id| {
                Arc::new(SlotShared {
                    id,
                    port: config.base_port + id as u16,
                    state: Mutex::new(WorkerProcState::Starting),
                    ready: AtomicBool::new(false),
                })
            })
            .collect();
        Self {
            config,
            spec,
            slots: Arc::new(slots),
            shutdown: Arc::new(Notify::new()),
            shutting_down: Arc::new(AtomicBool::new(false)),
            managers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn every worker's manager task. Returns immediately; crashes and
    /// restarts are handled in the background until [`shutdown`].
    ///
    /// [`shutdown`]: ClusterSupervisor::shutdown
    pub fn start(&self) {
        let mut managers = self.managers.lock().unwrap();
        for slot in self.slots.iter() {
            let handle = tokio::spawn(manage_slot(
                Arc::clone(slot),
                self.spec.clone(),
                self.config.restart.clone(),
                self.config.drain_timeout(),
                Arc::clone(&self.shutdown),
                Arc::clone(&self.shutting_down),
            ));
            managers.push(handle);
        }
        tracing::info!(workers = self.slots.len(), "cluster supervisor started");
    }

    /// Bind the public endpoint and serve connections until shutdown.
    pub async fn serve_proxy(&self) -> Result<(), ClusterError> {
        let proxy = Proxy::bind(&self.config.bind).await?;
        proxy
            .run(Arc::clone(&self.slots), Arc::clone(&self.shutdown))
            .await
    }

    /// Graceful shutdown: stop accepting, terminate workers (SIGTERM, then
    /// force kill after the drain grace), and wait for managers to finish.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        let managers: Vec<_> = self.managers.lock().unwrap().drain(..).collect();
        for manager in managers {
            let _ = manager.await;
        }
        tracing::info!("cluster supervisor stopped");
    }

    /// Snapshot of worker slot states.
    pub fn worker_states(&self) -> Vec<WorkerProcState> {
        self.slots
            .iter()
            .map(|s| *s.state.lock().unwrap())
            .collect()
    }

    /// Number of workers currently accepting connections.
    pub fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.ready.load(Ordering::SeqCst))
            .count()
    }
}

/// Manager loop for one worker slot.
async fn manage_slot(
    slot: Arc<SlotShared>,
    spec: WorkerSpec,
    restart: drossel_core::RestartConfig,
    drain_timeout: Duration,
    shutdown: Arc<Notify>,
    shutting_down: Arc<AtomicBool>,
) {
    let mut backoff = RestartBackoff::new(restart);

    loop {
        if shutting_down.load(Ordering::SeqCst) {
            slot.set_state(WorkerProcState::Terminated);
            return;
        }
        slot.set_state(WorkerProcState::Starting);
        tracing::info!(worker = slot.id, port = slot.port, program = %spec.program, "starting worker");

        let mut child = match spawn_worker(&spec, &slot) {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(worker = slot.id, error = %e, "spawn failed");
                match backoff.on_crash(Instant::now()) {
                    RestartDecision::Restart(delay) => {
                        slot.set_state(WorkerProcState::Backoff);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => continue,
                            _ = shutdown.notified() => {
                                slot.set_state(WorkerProcState::Terminated);
                                return;
                            }
                        }
                    }
                    RestartDecision::GiveUp => {
                        slot.set_state(WorkerProcState::Failed);
                        tracing::error!(worker = slot.id, "crash loop, slot halted");
                        return;
                    }
                }
            }
        };

        // Readiness: probe the worker's port, or take the spawn on faith.
        if spec.wait_ready {
            let became_ready = tokio::select! {
                ready = wait_for_ready(slot.port, READY_TIMEOUT) => ready,
                _ = shutdown.notified() => {
                    terminate(&slot, &mut child, drain_timeout).await;
                    return;
                }
            };
            if !became_ready {
                tracing::error!(worker = slot.id, port = slot.port, "worker never became ready");
                let _ = child.kill().await;
                // Falls through to the crash handling below.
            } else {
                slot.set_state(WorkerProcState::Ready);
                tracing::info!(worker = slot.id, port = slot.port, "worker ready");
            }
        } else {
            slot.set_state(WorkerProcState::Ready);
        }

        // Wait for the child to exit or for shutdown.
        if shutting_down.load(Ordering::SeqCst) {
            terminate(&slot, &mut child, drain_timeout).await;
            return;
        }
        let status = tokio::select! {
            status = child.wait() => status,
            _ = shutdown.notified() => {
                terminate(&slot, &mut child, drain_timeout).await;
                return;
            }
        };

        if shutting_down.load(Ordering::SeqCst) {
            slot.set_state(WorkerProcState::Terminated);
            return;
        }

        // Any exit outside shutdown is a crash.
        let code = status.as_ref().ok().and_then(|s| s.code());
        slot.set_state(WorkerProcState::Crashed);
        tracing::error!(worker = slot.id, code = ?code, "worker exited unexpectedly");

        match backoff.on_crash(Instant::now()) {
            RestartDecision::Restart(delay) => {
                slot.set_state(WorkerProcState::Backoff);
                tracing::info!(worker = slot.id, delay_ms = delay.as_millis() as u64, "restarting after backoff");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.notified() => {
                        slot.set_state(WorkerProcState::Terminated);
                        return;
                    }
                }
            }
            RestartDecision::GiveUp => {
                slot.set_state(WorkerProcState::Failed);
                tracing::error!(
                    worker = slot.id,
                    recent = backoff.recent_crashes(),
                    "crash loop, slot halted"
                );
                return;
            }
        }
    }
}

/// Spawn a worker child and pipe its output through prefixed log lines.
fn spawn_worker(spec: &WorkerSpec, slot: &SlotShared) -> Result<Child, ClusterError> {
    let mut child = spec
        .command(slot.id, slot.port)
        .spawn()
        .map_err(ClusterError::Spawn)?;

    let color = COLORS[slot.id as usize % COLORS.len()];
    let prefix = format!("{color}worker.{}{RESET} │ ", slot.id);

    if let Some(stdout) = child.stdout.take() {
        let prefix = prefix.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{prefix}{line}");
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{prefix}{line}");
            }
        });
    }

    Ok(child)
}

/// Probe the worker's port until it accepts a connection.
async fn wait_for_ready(port: u16, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return true;
        }
        tokio::time::sleep(READY_PROBE_INTERVAL).await;
    }
    false
}

/// Ask the child to terminate (SIGTERM on unix), force-kill after the grace
/// period.
async fn terminate(slot: &SlotShared, child: &mut Child, grace: Duration) {
    slot.set_state(WorkerProcState::ShuttingDown);

    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let _ = std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .output();
        tracing::info!(worker = slot.id, pid, "sent SIGTERM");
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(_) => tracing::info!(worker = slot.id, "worker exited gracefully"),
        Err(_) => {
            tracing::warn!(worker = slot.id, "drain grace expired, force killing");
            let _ = child.kill().await;
        }
    }
    slot.set_state(WorkerProcState::Terminated);
}
