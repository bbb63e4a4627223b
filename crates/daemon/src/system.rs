// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real CPU/memory sampling for the auto-scaler's `MetricSample` feed
//! (spec section 4.8's composite load factor needs actual host numbers,
//! not placeholders).

use parking_lot::Mutex;
use sysinfo::System;

/// Wraps a `sysinfo::System`, refreshed once per call to `sample`. Held
/// behind a `Mutex` since `sysinfo`'s refresh methods need `&mut self` and
/// the autoscale timer is the only caller, but `AppState` is shared via `Arc`.
pub struct SystemSampler {
    system: Mutex<System>,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self { system: Mutex::new(System::new_all()) }
    }
}

impl SystemSampler {
    /// Per-core CPU usage percentages and overall used-memory fraction,
    /// refreshed just before reading.
    pub fn sample(&self) -> (Vec<f64>, f64) {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let cpu_cores = system.cpus().iter().map(|cpu| cpu.cpu_usage() as f64).collect();
        let total = system.total_memory();
        let memory_percent = if total > 0 { system.used_memory() as f64 / total as f64 * 100.0 } else { 0.0 };

        (cpu_cores, memory_percent)
    }
}
