// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed command set the control plane accepts (spec section 4.9).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch applied to a project by `update-project`. Every field is optional;
/// only present fields are mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Parameters for `register-project`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterProjectParams {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
}

/// Parameters for `queue-task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTaskParams {
    pub project_id: String,
    pub task_type: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub preemptible: bool,
}

fn default_priority() -> u8 {
    50
}

/// The closed set of control-plane commands accepted over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "params", rename_all = "kebab-case")]
pub enum Command {
    Ping,
    Status,
    GetQueueStatus,
    QueueTask(QueueTaskParams),
    /// Pull the next runnable task. With `project_id`, pulls for that
    /// project specifically (a worker pinned to one project asking for more
    /// work); without it, the daemon treats the call as a free worker slot
    /// and lets the scheduler pick which project runs next.
    GetNextTask { #[serde(default)] project_id: Option<String> },
    CompleteTask { task_id: String, result: Value },
    FailTask { task_id: String, error: String },
    CancelTask { task_id: String },
    RegisterProject(RegisterProjectParams),
    UnregisterProject { project_id: String, #[serde(default)] force: bool },
    GetProjectInfo { project_id: String },
    UpdateProject { project_id: String, patch: ProjectPatch },
    EnableProject { project_id: String },
    DisableProject { project_id: String },
    ListProjects,
    ScaleWorkers { target: u32, #[serde(default)] forced: bool },
    GetWorkerStatus { #[serde(default)] worker_id: Option<String> },
    ConfigUpdate { patch: Value },
    ReloadConfig,
    Shutdown,
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
