// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker/agent lifecycle manager (spec section 4.7, component C7).
//!
//! `spawn_worker ─ready→ running ─exit→ [restart? → starting | failed]`
//! `running ─pid gone→ zombie → (removed)`

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use poppo_core::{Clock, ErrorKind, PoppoError, Result, SystemClock, Worker, WorkerId, WorkerStatus};
use tracing::{info, warn};

/// What the manager needs from a real child process, abstracted so tests
/// can inject a fake instead of shelling out.
#[async_trait]
pub trait WorkerProcess: Send + Sync {
    /// Start the worker, returning its pid once the OS has accepted the spawn.
    async fn spawn(&self, id: WorkerId, config: &WorkerSpawnConfig) -> std::io::Result<u32>;

    /// Whether the worker announced `ready` on its control channel within
    /// `startup_timeout`. Polled once per lifecycle tick while `Starting`.
    async fn is_ready(&self, id: WorkerId) -> bool;

    /// Whether the process backing `id` is still alive at the OS level.
    async fn is_alive(&self, id: WorkerId) -> bool;

    /// Send a graceful shutdown control message (`SIGTERM`-equivalent).
    async fn request_stop(&self, id: WorkerId);

    /// Forcefully terminate (`SIGKILL`-equivalent).
    async fn kill(&self, id: WorkerId);
}

#[derive(Debug, Clone)]
pub struct WorkerSpawnConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub project_id: Option<poppo_core::ProjectId>,
    pub max_concurrent: u32,
    pub weight: f64,
}

/// Tuning knobs sourced from `ConfigDocument.lifecycle`.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    pub startup_timeout_ms: u64,
    pub restart_delay_ms: u64,
    pub max_restart_attempts: u32,
    pub graceful_shutdown_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            startup_timeout_ms: 60_000,
            restart_delay_ms: 5_000,
            max_restart_attempts: poppo_core::worker::DEFAULT_MAX_RESTART_ATTEMPTS,
            graceful_shutdown_timeout_ms: 30_000,
        }
    }
}

struct Entry {
    worker: Worker,
    config: WorkerSpawnConfig,
    starting_since_ms: u64,
    stop_requested_at_ms: Option<u64>,
    /// Set when an unexpected exit has been charged against `restart_count`
    /// but the actual respawn is still waiting out `restart_delay_ms`.
    restart_due_at_ms: Option<u64>,
}

/// Owns every worker's lifecycle state. Delegates the actual process
/// operations to a `WorkerProcess` implementation so the state machine
/// itself stays free of `tokio::process` details.
pub struct LifecycleManager<P: WorkerProcess, C: Clock = SystemClock> {
    process: P,
    clock: C,
    config: LifecycleConfig,
    entries: RwLock<HashMap<WorkerId, Entry>>,
}

impl<P: WorkerProcess, C: Clock> LifecycleManager<P, C> {
    pub fn new(process: P, clock: C, config: LifecycleConfig) -> Self {
        Self { process, clock, config, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn spawn_worker(&self, config: WorkerSpawnConfig) -> Result<Worker> {
        let id = WorkerId::new();
        let now = self.clock.epoch_ms();
        let mut worker = Worker::new(id, config.project_id, config.max_concurrent, config.weight, now);

        match self.process.spawn(id, &config).await {
            Ok(pid) => worker.pid = Some(pid),
            Err(err) => {
                worker.status = WorkerStatus::Failed;
                return Err(PoppoError::new(ErrorKind::WorkerStartFailed, err.to_string()));
            }
        }

        let snapshot = worker.clone();
        self.entries
            .write()
            .insert(id, Entry { worker, config, starting_since_ms: now, stop_requested_at_ms: None, restart_due_at_ms: None });
        info!(worker_id = %id, "worker spawn initiated");
        Ok(snapshot)
    }

    /// Advance worker `id` from `Starting` to `Running` once it reports
    /// ready, or to `Failed` if `startup_timeout` elapses first. No-op for
    /// workers not currently `Starting`.
    pub async fn poll_startup(&self, id: WorkerId) -> Result<Worker> {
        let now = self.clock.epoch_ms();
        let (starting_since, was_starting) = {
            let entries = self.entries.read();
            let entry = entries.get(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;
            (entry.starting_since_ms, entry.worker.status == WorkerStatus::Starting)
        };

        if !was_starting {
            return self.get(id);
        }

        if self.process.is_ready(id).await {
            let mut entries = self.entries.write();
            let entry = entries.get_mut(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;
            entry.worker.status = WorkerStatus::Running;
            info!(worker_id = %id, "worker became ready");
            return Ok(entry.worker.clone());
        }

        if now.saturating_sub(starting_since) >= self.config.startup_timeout_ms {
            self.process.kill(id).await;
            let mut entries = self.entries.write();
            let entry = entries.get_mut(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;
            entry.worker.status = WorkerStatus::Failed;
            warn!(worker_id = %id, "worker failed to report ready within startup_timeout");
            return Ok(entry.worker.clone());
        }

        self.get(id)
    }

    /// Reap dead processes and (while running) restart them with backoff.
    /// Call on a `zombie_check_interval` cadence; handles zombie detection,
    /// scheduling a restart after an unexpected exit, and actually spawning
    /// that restart once `restart_delay_ms` has elapsed, all driven by
    /// `is_alive` returning false.
    pub async fn reap_and_restart(&self) -> Vec<WorkerId> {
        let ids: Vec<WorkerId> = self.entries.read().keys().copied().collect();
        let mut removed = Vec::new();

        for id in ids {
            let should_check = {
                let entries = self.entries.read();
                entries.get(&id).is_some_and(|e| {
                    matches!(e.worker.status, WorkerStatus::Running | WorkerStatus::Unhealthy | WorkerStatus::Stopping)
                })
            };
            if !should_check || self.process.is_alive(id).await {
                continue;
            }

            let now = self.clock.epoch_ms();

            // Decide what to do, then drop the guard before any `.await` —
            // parking_lot guards aren't `Send` across await points.
            enum Action {
                Stopped,
                Scheduled,
                Waiting,
                Restart(WorkerSpawnConfig),
                Zombie,
            }
            let action = {
                let mut entries = self.entries.write();
                let Some(entry) = entries.get_mut(&id) else { continue };
                if entry.worker.status == WorkerStatus::Stopping {
                    entry.worker.status = WorkerStatus::Stopped;
                    Action::Stopped
                } else if let Some(due) = entry.restart_due_at_ms {
                    if now < due {
                        Action::Waiting
                    } else {
                        entry.worker.status = WorkerStatus::Starting;
                        entry.worker.pid = None;
                        entry.starting_since_ms = now;
                        entry.restart_due_at_ms = None;
                        Action::Restart(entry.config.clone())
                    }
                } else if entry.worker.restart_count < self.config.max_restart_attempts {
                    entry.worker.restart_count += 1;
                    entry.restart_due_at_ms = Some(now + self.config.restart_delay_ms);
                    Action::Scheduled
                } else {
                    entry.worker.status = WorkerStatus::Zombie;
                    Action::Zombie
                }
            };

            match action {
                Action::Stopped => info!(worker_id = %id, "worker stopped"),
                Action::Waiting => {}
                Action::Scheduled => {
                    warn!(worker_id = %id, delay_ms = self.config.restart_delay_ms, "worker exited unexpectedly, restart scheduled");
                }
                Action::Restart(config) => {
                    info!(worker_id = %id, "restart delay elapsed, respawning worker");
                    let result = self.process.spawn(id, &config).await;
                    let mut entries = self.entries.write();
                    if let Some(entry) = entries.get_mut(&id) {
                        match result {
                            Ok(pid) => entry.worker.pid = Some(pid),
                            Err(err) => {
                                entry.worker.status = WorkerStatus::Failed;
                                warn!(worker_id = %id, error = %err, "restart spawn failed");
                            }
                        }
                    }
                }
                Action::Zombie => {
                    warn!(worker_id = %id, "worker exhausted restart attempts, marking zombie");
                    removed.push(id);
                }
            }
        }

        for id in &removed {
            self.entries.write().remove(id);
        }
        removed
    }

    /// Graceful stop: request shutdown, then poll `is_alive` up to
    /// `graceful_shutdown_timeout`; on timeout, escalate to `kill`.
    /// `force=true` skips straight to `kill`.
    pub async fn terminate_worker(&self, id: WorkerId, force: bool) -> Result<()> {
        {
            let mut entries = self.entries.write();
            let entry = entries.get_mut(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;
            entry.worker.status = WorkerStatus::Stopping;
            entry.stop_requested_at_ms = Some(self.clock.epoch_ms());
        }

        if force {
            self.process.kill(id).await;
            self.entries.write().remove(&id);
            return Ok(());
        }

        self.process.request_stop(id).await;

        let deadline = self.clock.epoch_ms() + self.config.graceful_shutdown_timeout_ms;
        loop {
            if !self.process.is_alive(id).await {
                self.entries.write().remove(&id);
                return Ok(());
            }
            if self.clock.epoch_ms() >= deadline {
                self.process.kill(id).await;
                self.entries.write().remove(&id);
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    pub async fn terminate_all(&self, force: bool) {
        let ids: Vec<WorkerId> = self.entries.read().keys().copied().collect();
        for id in ids {
            let _ = self.terminate_worker(id, force).await;
        }
    }

    pub fn get(&self, id: WorkerId) -> Result<Worker> {
        self.entries
            .read()
            .get(&id)
            .map(|e| e.worker.clone())
            .ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))
    }

    pub fn status(&self, id: Option<WorkerId>) -> Vec<Worker> {
        self.entries.read().values().filter(|e| id.is_none_or(|target| target == e.worker.id)).map(|e| e.worker.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Real process backend: spawns an actual child, forwards its stdout/stderr
/// to `tracing` tagged by worker id, and tracks readiness via a `{"type":
/// "ready"}` line on stdout (spec section 6's worker control channel).
pub struct RealWorkerProcess {
    children: tokio::sync::Mutex<HashMap<WorkerId, ChildHandle>>,
}

struct ChildHandle {
    child: tokio::process::Child,
    stdin: Option<tokio::process::ChildStdin>,
    ready: Arc<std::sync::atomic::AtomicBool>,
}

impl Default for RealWorkerProcess {
    fn default() -> Self {
        Self { children: tokio::sync::Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl WorkerProcess for RealWorkerProcess {
    async fn spawn(&self, id: WorkerId, config: &WorkerSpawnConfig) -> std::io::Result<u32> {
        use std::process::Stdio;
        use tokio::io::{AsyncBufReadExt, BufReader};

        let mut cmd = tokio::process::Command::new(&config.command);
        cmd.args(&config.args)
            .envs(config.env.iter().cloned())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = cmd.spawn()?;
        let pid = child.id().unwrap_or(0);
        info!(worker_id = %id, pid, command = %config.command, "worker process spawned");

        let ready = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stdin = child.stdin.take();

        if let Some(stdout) = child.stdout.take() {
            let ready = ready.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("\"ready\"") {
                        ready.store(true, std::sync::atomic::Ordering::SeqCst);
                    }
                    info!(worker_id = %id, "{line}");
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(worker_id = %id, "{line}");
                }
            });
        }

        self.children.lock().await.insert(id, ChildHandle { child, stdin, ready });
        Ok(pid)
    }

    async fn is_ready(&self, id: WorkerId) -> bool {
        self.children
            .lock()
            .await
            .get(&id)
            .map(|h| h.ready.load(std::sync::atomic::Ordering::SeqCst))
            .unwrap_or(false)
    }

    async fn is_alive(&self, id: WorkerId) -> bool {
        let mut children = self.children.lock().await;
        let Some(handle) = children.get_mut(&id) else { return false };
        matches!(handle.child.try_wait(), Ok(None))
    }

    async fn request_stop(&self, id: WorkerId) {
        use tokio::io::AsyncWriteExt;
        let mut children = self.children.lock().await;
        if let Some(handle) = children.get_mut(&id) {
            if let Some(stdin) = handle.stdin.as_mut() {
                let _ = stdin.write_all(b"{\"type\":\"shutdown\"}\n").await;
            }
        }
    }

    async fn kill(&self, id: WorkerId) {
        let mut children = self.children.lock().await;
        if let Some(mut handle) = children.remove(&id) {
            let _ = handle.child.kill().await;
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
