// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The configuration document schema (spec section 3.6).
//!
//! `ConfigDocument` is the closed set of recognized top-level sections.
//! Unknown top-level keys are rejected at deserialize time via
//! `#[serde(deny_unknown_fields)]`; [`ConfigDocument::validate`] then checks
//! semantic invariants that serde's shape-checking can't express.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single `(path, message)` validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDiagnostic {
    pub path: String,
    pub message: String,
}

impl ConfigDiagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingStrategyKind {
    RoundRobin,
    WeightedRoundRobin,
    Priority,
    FairShare,
    DeadlineAware,
}

impl Default for SchedulingStrategyKind {
    fn default() -> Self {
        SchedulingStrategyKind::RoundRobin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategyKind {
    RoundRobin,
    LeastConnections,
    WeightedRoundRobin,
    ResponseTime,
    Random,
}

impl Default for SelectionStrategyKind {
    fn default() -> Self {
        SelectionStrategyKind::RoundRobin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_processes")]
    pub max_processes: u32,
    #[serde(default)]
    pub scheduling_strategy: SchedulingStrategyKind,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Trailing window the `fair_share` strategy measures completed-task
    /// counts over when computing each project's share.
    #[serde(default = "default_fair_share_window_ms")]
    pub fair_share_window_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_processes: default_max_processes(),
            scheduling_strategy: SchedulingStrategyKind::default(),
            port: default_port(),
            host: default_host(),
            socket_path: default_socket_path(),
            fair_share_window_ms: default_fair_share_window_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreemptionConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriorityManagementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub preemption: PreemptionConfig,
}

impl Default for PriorityManagementConfig {
    fn default() -> Self {
        Self { enabled: true, preemption: PreemptionConfig::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskQueueConfig {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: u64,
    #[serde(default)]
    pub priority_management: PriorityManagementConfig,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self { max_queue_size: default_max_queue_size(), priority_management: PriorityManagementConfig::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerPoolConfig {
    #[serde(default = "default_min_workers")]
    pub min_workers: u32,
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    #[serde(default)]
    pub strategy: SelectionStrategyKind,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { min_workers: default_min_workers(), max_workers: default_max_workers(), strategy: SelectionStrategyKind::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,
    #[serde(default = "default_max_cpu_percent")]
    pub max_cpu_percent: f64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self { max_memory_mb: default_max_memory_mb(), max_cpu_percent: default_max_cpu_percent() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), directory: default_log_directory() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatesConfig {
    #[serde(default = "default_true")]
    pub check: bool,
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self { check: true, channel: default_channel() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub discovery_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StateManagementConfig {
    File {
        #[serde(default = "default_state_directory")]
        directory: PathBuf,
    },
    RemoteKv {
        endpoint: String,
    },
}

impl Default for StateManagementConfig {
    fn default() -> Self {
        StateManagementConfig::File { directory: default_state_directory() }
    }
}

/// The full validated configuration document (spec section 3.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub task_queue: TaskQueueConfig,
    #[serde(default)]
    pub worker_pool: WorkerPoolConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub updates: UpdatesConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub state_management: StateManagementConfig,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            daemon: DaemonConfig::default(),
            task_queue: TaskQueueConfig::default(),
            worker_pool: WorkerPoolConfig::default(),
            resources: ResourcesConfig::default(),
            defaults: DefaultsConfig::default(),
            logging: LoggingConfig::default(),
            updates: UpdatesConfig::default(),
            registry: RegistryConfig::default(),
            state_management: StateManagementConfig::default(),
        }
    }
}

impl ConfigDocument {
    /// Check semantic invariants beyond what serde's shape-checking covers.
    /// Collects every diagnostic rather than stopping at the first.
    pub fn validate(&self) -> Vec<ConfigDiagnostic> {
        let mut diagnostics = Vec::new();

        if self.worker_pool.min_workers > self.worker_pool.max_workers {
            diagnostics.push(ConfigDiagnostic::new(
                "worker_pool.min_workers",
                format!(
                    "min_workers ({}) must be <= max_workers ({})",
                    self.worker_pool.min_workers, self.worker_pool.max_workers
                ),
            ));
        }
        if self.task_queue.max_queue_size == 0 {
            diagnostics.push(ConfigDiagnostic::new("task_queue.max_queue_size", "must be greater than zero"));
        }
        if self.resources.max_cpu_percent <= 0.0 || self.resources.max_cpu_percent > 100.0 {
            diagnostics.push(ConfigDiagnostic::new(
                "resources.max_cpu_percent",
                "must be in (0, 100]",
            ));
        }
        if self.defaults.retry_attempts == 0 {
            diagnostics.push(ConfigDiagnostic::new("defaults.retry_attempts", "must be at least 1"));
        }
        if let StateManagementConfig::RemoteKv { endpoint } = &self.state_management {
            if endpoint.trim().is_empty() {
                diagnostics.push(ConfigDiagnostic::new(
                    "state_management.endpoint",
                    "remote-kv backend requires a non-empty endpoint",
                ));
            }
        }
        match self.daemon.scheduling_strategy {
            SchedulingStrategyKind::RoundRobin
            | SchedulingStrategyKind::WeightedRoundRobin
            | SchedulingStrategyKind::Priority
            | SchedulingStrategyKind::FairShare
            | SchedulingStrategyKind::DeadlineAware => {}
        }

        diagnostics
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn default_true() -> bool {
    true
}
fn default_version() -> u32 {
    1
}
fn default_max_processes() -> u32 {
    4
}
fn default_port() -> u16 {
    4287
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_fair_share_window_ms() -> u64 {
    60_000
}
fn default_socket_path() -> PathBuf {
    PathBuf::from("daemon.sock")
}
fn default_max_queue_size() -> u64 {
    10_000
}
fn default_min_workers() -> u32 {
    1
}
fn default_max_workers() -> u32 {
    10
}
fn default_max_memory_mb() -> u64 {
    4_096
}
fn default_max_cpu_percent() -> f64 {
    80.0
}
fn default_polling_interval_ms() -> u64 {
    1_000
}
fn default_timeout_ms() -> u64 {
    300_000
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1_000
}
fn default_language() -> String {
    "en".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}
fn default_channel() -> String {
    "stable".to_string()
}
fn default_state_directory() -> PathBuf {
    PathBuf::from("state")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
