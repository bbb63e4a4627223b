// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric sample and aggregation types (spec section 3.5 / component C3).

use serde::{Deserialize, Serialize};

/// Default bounded history length (number of samples retained per series).
pub const DEFAULT_HISTORY_SIZE: usize = 60;
/// Default aggregation window, expressed in number of trailing samples.
pub const DEFAULT_AGGREGATION_WINDOW: usize = 5;

/// Snapshot of the global task queue's depth, taken once per sample tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskQueueSnapshot {
    pub size: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Snapshot of worker-pool counts at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerCounts {
    pub total: u32,
    pub active: u32,
    pub idle: u32,
}

/// One error observation fed to the collector via `record_error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp_ms: u64,
    pub kind: String,
    pub severity: String,
    pub context: String,
}

/// One performance observation fed to the collector via `record_performance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfRecord {
    pub timestamp_ms: u64,
    pub op: String,
    pub duration_ms: u64,
    pub success: bool,
}

/// A single point-in-time sample across every dimension the collector tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp_ms: u64,
    pub cpu_cores: Vec<f64>,
    pub memory_percent: f64,
    pub task_queue: TaskQueueSnapshot,
    pub worker_stats: WorkerCounts,
}

impl MetricSample {
    pub fn cpu_avg(&self) -> f64 {
        if self.cpu_cores.is_empty() {
            return 0.0;
        }
        self.cpu_cores.iter().sum::<f64>() / self.cpu_cores.len() as f64
    }
}

/// Result of `get_aggregated_metrics()`: latest values plus window averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub cpu_avg_per_core: Vec<f64>,
    pub cpu_avg_overall: f64,
    pub memory_latest_percent: f64,
    pub memory_window_avg_percent: f64,
    pub task_queue_latest: TaskQueueSnapshot,
    pub completed_window_total: u64,
    pub failed_window_total: u64,
    pub worker_counts_latest: WorkerCounts,
    /// Error counts grouped by `(kind, severity)`.
    pub errors_by_kind: Vec<((String, String), u64)>,
    /// Per-operation `(count, success_rate, avg_duration_ms)`.
    pub perf_by_op: Vec<(String, PerfSummary)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerfSummary {
    pub count: u64,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
