// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record (spec section 3.2 / component C4).

use serde::{Deserialize, Serialize};

use crate::id::{ProjectId, TaskId, WorkerId};

/// Lifecycle status of a task. Terminal states are `Completed`, `Failed`,
/// and `Cancelled`; a task is in at most one of `{Queued, Running}` at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

/// A unit of work submitted by a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub task_type: String,
    pub priority: u8,
    pub payload: serde_json::Value,
    pub enqueued_at_ms: u64,
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: TaskStatus,
    pub assigned_worker_id: Option<WorkerId>,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub last_error: Option<String>,
    /// Optional wall-clock deadline (epoch ms), used by the deadline-aware
    /// scheduling strategy.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    /// Whether the handler that will run this task declares it can be
    /// paused and resumed in response to a higher-priority task.
    #[serde(default)]
    pub preemptible: bool,
}

impl Task {
    pub fn new(
        project_id: ProjectId,
        task_type: impl Into<String>,
        priority: u8,
        payload: serde_json::Value,
        enqueued_at_ms: u64,
        max_attempts: u32,
    ) -> Self {
        Self {
            id: TaskId::new(),
            project_id,
            task_type: task_type.into(),
            priority: priority.min(100),
            payload,
            enqueued_at_ms,
            attempts: 0,
            max_attempts,
            status: TaskStatus::Queued,
            assigned_worker_id: None,
            started_at_ms: None,
            finished_at_ms: None,
            last_error: None,
            deadline_ms: None,
            preemptible: false,
        }
    }

    pub fn waited_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.enqueued_at_ms)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
