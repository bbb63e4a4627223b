// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::id::ProjectId;
use crate::project::Project;
use crate::task::Task;
use std::path::PathBuf;

/// Proptest strategies for core state machine types.
#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::task::TaskStatus;
    use proptest::prelude::*;

    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Queued),
            Just(TaskStatus::Running),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Failed),
            Just(TaskStatus::Cancelled),
        ]
    }

    pub fn arb_priority() -> impl Strategy<Value = u8> {
        0u8..=100u8
    }
}

/// Builder for a `Project` with sensible test defaults.
pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { project: Project::new(ProjectId::new(), name, PathBuf::from("/test/project")) }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.project.weight = weight;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.project.priority = priority;
        self
    }

    pub fn max_concurrent(mut self, n: u32) -> Self {
        self.project.max_concurrent = n;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.project.enabled = false;
        self
    }

    pub fn build(self) -> Project {
        self.project
    }
}

/// Builder for a `Task` with sensible test defaults.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(project_id: ProjectId) -> Self {
        Self { task: Task::new(project_id, "test-task", 50, serde_json::json!({}), 0, 3) }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.task.priority = priority.min(100);
        self
    }

    pub fn enqueued_at(mut self, ms: u64) -> Self {
        self.task.enqueued_at_ms = ms;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.task.max_attempts = n;
        self
    }

    pub fn preemptible(mut self) -> Self {
        self.task.preemptible = true;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
