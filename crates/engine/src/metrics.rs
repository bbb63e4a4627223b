// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics collector (spec section 4.3, component C3): bounded ring buffers
//! of samples, errors, and per-operation performance, aggregated on read.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use poppo_core::{
    AggregatedMetrics, ErrorRecord, MetricSample, PerfRecord, PerfSummary, TaskQueueSnapshot, WorkerCounts,
};
use tracing::debug;

pub use poppo_core::metrics::{DEFAULT_AGGREGATION_WINDOW, DEFAULT_HISTORY_SIZE};

pub(crate) struct Ring<T> {
    cap: usize,
    pub(crate) items: VecDeque<T>,
}

impl<T> Ring<T> {
    pub(crate) fn new(cap: usize) -> Self {
        Self { cap, items: VecDeque::with_capacity(cap) }
    }

    pub(crate) fn push(&mut self, item: T) {
        if self.items.len() == self.cap {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }
}

/// Collects samples, errors, and performance records, aggregating them on
/// demand without mutating storage (spec invariant: reading never drops
/// history early).
pub struct MetricsCollector {
    samples: RwLock<Ring<MetricSample>>,
    errors: RwLock<Ring<ErrorRecord>>,
    perf: RwLock<Ring<PerfRecord>>,
    aggregation_window: usize,
}

impl MetricsCollector {
    pub fn new(history_size: usize, aggregation_window: usize) -> Self {
        Self {
            samples: RwLock::new(Ring::new(history_size)),
            errors: RwLock::new(Ring::new(history_size)),
            perf: RwLock::new(Ring::new(history_size)),
            aggregation_window,
        }
    }

    /// Record one sampling tick (CPU/memory/queue/worker snapshot).
    pub fn record_sample(&self, sample: MetricSample) {
        debug!(timestamp_ms = sample.timestamp_ms, cpu_avg = sample.cpu_avg(), "metrics tick");
        self.samples.write().push(sample);
    }

    pub fn record_error(&self, record: ErrorRecord) {
        self.errors.write().push(record);
    }

    pub fn record_performance(&self, record: PerfRecord) {
        self.perf.write().push(record);
    }

    /// Compute `AggregatedMetrics` over the last `aggregation_window` samples.
    pub fn get_aggregated_metrics(&self) -> AggregatedMetrics {
        let samples = self.samples.read();
        let window: Vec<&MetricSample> = samples.items.iter().rev().take(self.aggregation_window).collect();

        let latest = window.first().copied();
        let core_count = latest.map(|s| s.cpu_cores.len()).unwrap_or(0);

        let mut cpu_avg_per_core = vec![0.0; core_count];
        if !window.is_empty() {
            for sample in &window {
                for (i, v) in sample.cpu_cores.iter().enumerate().take(core_count) {
                    cpu_avg_per_core[i] += v;
                }
            }
            for v in &mut cpu_avg_per_core {
                *v /= window.len() as f64;
            }
        }
        let cpu_avg_overall =
            if cpu_avg_per_core.is_empty() { 0.0 } else { cpu_avg_per_core.iter().sum::<f64>() / cpu_avg_per_core.len() as f64 };

        let memory_window_avg_percent = if window.is_empty() {
            0.0
        } else {
            window.iter().map(|s| s.memory_percent).sum::<f64>() / window.len() as f64
        };

        let completed_window_total = window.first().map(|s| s.task_queue.completed).unwrap_or(0);
        let failed_window_total = window.first().map(|s| s.task_queue.failed).unwrap_or(0);

        drop(samples);

        let errors_by_kind = self.aggregate_errors();
        let perf_by_op = self.aggregate_perf();

        AggregatedMetrics {
            cpu_avg_per_core,
            cpu_avg_overall,
            memory_latest_percent: latest.map(|s| s.memory_percent).unwrap_or(0.0),
            memory_window_avg_percent,
            task_queue_latest: latest.map(|s| s.task_queue).unwrap_or(TaskQueueSnapshot::default()),
            completed_window_total,
            failed_window_total,
            worker_counts_latest: latest.map(|s| s.worker_stats).unwrap_or(WorkerCounts::default()),
            errors_by_kind,
            perf_by_op,
        }
    }

    fn aggregate_errors(&self) -> Vec<((String, String), u64)> {
        let errors = self.errors.read();
        let mut counts: HashMap<(String, String), u64> = HashMap::new();
        for record in &errors.items {
            *counts.entry((record.kind.clone(), record.severity.clone())).or_insert(0) += 1;
        }
        let mut out: Vec<_> = counts.into_iter().collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn aggregate_perf(&self) -> Vec<(String, PerfSummary)> {
        let perf = self.perf.read();
        let mut by_op: HashMap<String, (u64, u64, u64)> = HashMap::new();
        for record in &perf.items {
            let entry = by_op.entry(record.op.clone()).or_insert((0, 0, 0));
            entry.0 += 1;
            if record.success {
                entry.1 += 1;
            }
            entry.2 += record.duration_ms;
        }
        let mut out: Vec<_> = by_op
            .into_iter()
            .map(|(op, (count, successes, total_duration))| {
                let summary = PerfSummary {
                    count,
                    success_rate: if count == 0 { 0.0 } else { successes as f64 / count as f64 },
                    avg_duration_ms: if count == 0 { 0.0 } else { total_duration as f64 / count as f64 },
                };
                (op, summary)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
