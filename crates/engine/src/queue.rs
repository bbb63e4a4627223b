// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global task queue (spec section 4.4): a single priority-ordered set
//! of tasks shared by every project, guarded by one lock.

use std::collections::HashMap;

use parking_lot::Mutex;
use poppo_core::{effective_priority, Clock, ErrorKind, PoppoError, ProjectId, Result, SystemClock, Task, TaskId, TaskStatus};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Tuning knobs for the queue, sourced from `ConfigDocument.task_queue`.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub max_queue_size: u64,
    pub retry_delay_ms: u64,
    pub preemption_enabled: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_queue_size: 10_000, retry_delay_ms: 1_000, preemption_enabled: false }
    }
}

/// Emitted when an enqueue outranks a running task and preemption is enabled.
/// Whether a handler actually pauses/resumes execution is outside this
/// crate's responsibility.
#[derive(Debug, Clone)]
pub struct PreemptEvent {
    pub running_task_id: TaskId,
    pub incoming_task_id: TaskId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub size: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total_ever_enqueued: u64,
}

struct Inner {
    tasks: HashMap<TaskId, Task>,
    total_completed: u64,
    total_failed: u64,
    total_cancelled: u64,
    total_ever_enqueued: u64,
}

impl Inner {
    fn queued_count(&self) -> u64 {
        self.tasks.values().filter(|t| t.status == TaskStatus::Queued).count() as u64
    }

    fn running_count(&self) -> u64 {
        self.tasks.values().filter(|t| t.status == TaskStatus::Running).count() as u64
    }
}

/// The global queue (spec component C4). Project weights are supplied by
/// the caller at the point of use (this crate does not own the project
/// registry), so `effective_priority` is always computed against the
/// caller's current view of project weight.
///
/// Generic over `C: Clock` (rather than a trait object) so tests can swap
/// in a `FakeClock`, matching the teacher's `Executor<.., C: Clock>` pattern.
pub struct TaskQueue<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    clock: C,
    config: QueueConfig,
    preempt_tx: broadcast::Sender<PreemptEvent>,
}

impl<C: Clock> TaskQueue<C> {
    pub fn new(clock: C, config: QueueConfig) -> Self {
        let (preempt_tx, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner {
                tasks: HashMap::new(),
                total_completed: 0,
                total_failed: 0,
                total_cancelled: 0,
                total_ever_enqueued: 0,
            }),
            clock,
            config,
            preempt_tx,
        }
    }

    pub fn subscribe_preemptions(&self) -> broadcast::Receiver<PreemptEvent> {
        self.preempt_tx.subscribe()
    }

    /// Enqueue `task`, returning its id. Fails with `QueueFull` once the
    /// queued-task count reaches `max_queue_size`. If preemption is enabled
    /// and this task's effective priority exceeds a running task's, emits a
    /// `PreemptEvent` carrying both ids.
    pub fn enqueue(&self, task: Task, project_weight: f64) -> Result<TaskId> {
        let mut inner = self.inner.lock();
        if inner.queued_count() >= self.config.max_queue_size {
            return Err(PoppoError::new(ErrorKind::QueueFull, "task queue is at capacity"));
        }

        let id = task.id;
        let now = self.clock.epoch_ms();
        let incoming_priority = effective_priority(task.priority, project_weight, task.waited_ms(now));

        if self.config.preemption_enabled {
            if let Some(victim) = inner
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Running && t.preemptible)
                .max_by(|a, b| {
                    effective_priority(a.priority, project_weight, a.waited_ms(now))
                        .partial_cmp(&effective_priority(b.priority, project_weight, b.waited_ms(now)))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            {
                let victim_priority = effective_priority(victim.priority, project_weight, victim.waited_ms(now));
                if incoming_priority > victim_priority {
                    let _ = self.preempt_tx.send(PreemptEvent {
                        running_task_id: victim.id,
                        incoming_task_id: id,
                    });
                }
            }
        }

        inner.total_ever_enqueued += 1;
        inner.tasks.insert(id, task);
        Ok(id)
    }

    /// The highest-`effective_priority` queued task owned by `project_id`,
    /// ties broken by earliest `enqueued_at`. Marks the returned task
    /// `Running` and records its dispatch time.
    pub fn next_for_project(&self, project_id: ProjectId, project_weight: f64) -> Option<Task> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();

        let best_id = inner
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Queued && t.project_id == project_id)
            .max_by(|a, b| {
                let ka = effective_priority(a.priority, project_weight, a.waited_ms(now));
                let kb = effective_priority(b.priority, project_weight, b.waited_ms(now));
                ka.partial_cmp(&kb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.enqueued_at_ms.cmp(&a.enqueued_at_ms))
            })
            .map(|t| t.id)?;

        let task = inner.tasks.get_mut(&best_id)?;
        task.status = TaskStatus::Running;
        task.started_at_ms = Some(now);
        Some(task.clone())
    }

    /// Mark a task complete. `result` is currently informational only (no
    /// result storage in this crate); the caller is responsible for
    /// delivering it to whoever is waiting on the task.
    pub fn complete(&self, task_id: TaskId) -> Result<Task> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let task = inner.tasks.get_mut(&task_id).ok_or_else(|| PoppoError::not_found(format!("task `{task_id}`")))?;
        task.status = TaskStatus::Completed;
        task.finished_at_ms = Some(now);
        let snapshot = task.clone();
        inner.total_completed += 1;
        Ok(snapshot)
    }

    /// Record a failure. Re-enqueues with exponential backoff
    /// (`retry_delay × 2^(attempts−1)`, capped) if `attempts < max_attempts`,
    /// else marks the task terminally failed.
    pub fn fail(&self, task_id: TaskId, error: impl Into<String>) -> Result<Task> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let task = inner.tasks.get_mut(&task_id).ok_or_else(|| PoppoError::not_found(format!("task `{task_id}`")))?;
        task.attempts += 1;
        task.last_error = Some(error.into());

        if task.attempts < task.max_attempts {
            let backoff = retry_backoff_ms(self.config.retry_delay_ms, task.attempts);
            task.status = TaskStatus::Queued;
            task.enqueued_at_ms = now.saturating_add(backoff);
            task.assigned_worker_id = None;
            task.started_at_ms = None;
            let snapshot = task.clone();
            info!(task_id = %task_id, attempts = task.attempts, backoff_ms = backoff, "task re-enqueued after failure");
            return Ok(snapshot);
        }

        task.status = TaskStatus::Failed;
        task.finished_at_ms = Some(now);
        let snapshot = task.clone();
        inner.total_failed += 1;
        warn!(task_id = %task_id, "task permanently failed after exhausting retries");
        Ok(snapshot)
    }

    /// Cancel a task in any non-terminal state.
    pub fn cancel(&self, task_id: TaskId) -> Result<Task> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let task = inner.tasks.get_mut(&task_id).ok_or_else(|| PoppoError::not_found(format!("task `{task_id}`")))?;
        if task.status.is_terminal() {
            return Err(PoppoError::new(ErrorKind::Cancelled, "task is already in a terminal state"));
        }
        task.status = TaskStatus::Cancelled;
        task.finished_at_ms = Some(now);
        let snapshot = task.clone();
        inner.total_cancelled += 1;
        Ok(snapshot)
    }

    /// The `n` queued tasks with the highest effective priority across all
    /// projects, given a uniform `default_weight` (callers that need
    /// per-project weighting should use `tasks_by_project` instead).
    pub fn peek(&self, n: usize, default_weight: f64) -> Vec<Task> {
        let inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let mut queued: Vec<_> = inner.tasks.values().filter(|t| t.status == TaskStatus::Queued).cloned().collect();
        queued.sort_by(|a, b| {
            let ka = effective_priority(a.priority, default_weight, a.waited_ms(now));
            let kb = effective_priority(b.priority, default_weight, b.waited_ms(now));
            kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.enqueued_at_ms.cmp(&b.enqueued_at_ms))
        });
        queued.truncate(n);
        queued
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        QueueStats {
            size: inner.tasks.len() as u64,
            pending: inner.queued_count(),
            processing: inner.running_count(),
            completed: inner.total_completed,
            failed: inner.total_failed,
            cancelled: inner.total_cancelled,
            total_ever_enqueued: inner.total_ever_enqueued,
        }
    }

    pub fn tasks_by_project(&self, project_id: ProjectId) -> Vec<Task> {
        self.inner.lock().tasks.values().filter(|t| t.project_id == project_id).cloned().collect()
    }
}

/// `retry_delay × 2^(attempts−1)`, capped at 10 minutes so a flapping task
/// doesn't push its next attempt arbitrarily far into the future.
fn retry_backoff_ms(retry_delay_ms: u64, attempts: u32) -> u64 {
    const CAP_MS: u64 = 10 * 60 * 1000;
    let exponent = attempts.saturating_sub(1).min(20);
    retry_delay_ms.saturating_mul(1u64 << exponent).min(CAP_MS)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
