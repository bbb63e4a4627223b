// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-scaler (spec section 4.8, component C8): evaluates aggregated
//! metrics on a control loop and decides whether the worker pool should
//! grow, shrink, or hold steady.

use parking_lot::Mutex;
use poppo_core::{AggregatedMetrics, Clock, ScaleAction, ScalingEvent, SystemClock};

use crate::metrics::Ring;

/// Tunables for the auto-scaler's control loop (spec section 4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScalerConfig {
    pub min: u32,
    pub max: u32,
    pub scale_up_threshold: f64,
    pub scale_down_threshold: f64,
    pub memory_threshold: f64,
    pub scale_up_increment: u32,
    pub scale_down_increment: u32,
    pub cooldown_period_ms: u64,
}

impl Default for AutoScalerConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 4,
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.3,
            memory_threshold: 0.85,
            scale_up_increment: 2,
            scale_down_increment: 1,
            cooldown_period_ms: 60_000,
        }
    }
}

/// Everything `current_state()` reports back to a caller.
#[derive(Debug, Clone, Copy)]
pub struct AutoScalerState {
    pub current: u32,
    pub enabled: bool,
    pub config: AutoScalerConfig,
    pub last_action_ms: Option<u64>,
}

struct Inner {
    current: u32,
    enabled: bool,
    config: AutoScalerConfig,
    last_action_ms: Option<u64>,
    history: Ring<ScalingEvent>,
}

impl Inner {
    /// Composite load factor plus its inputs, spec section 4.8.
    fn load_factor(metrics: &AggregatedMetrics, active_workers: u32) -> (f64, f64, f64) {
        let cpu_avg = metrics.cpu_avg_overall;
        let mem_frac = metrics.memory_latest_percent / 100.0;
        let queue_pressure =
            (metrics.task_queue_latest.size as f64 / (active_workers.max(1) as f64 * 10.0)).min(1.0);
        let load = 0.4 * cpu_avg + 0.3 * mem_frac + 0.3 * queue_pressure;
        (load, mem_frac, queue_pressure)
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        match self.last_action_ms {
            Some(last) => now_ms.saturating_sub(last) < self.config.cooldown_period_ms,
            None => false,
        }
    }

    fn record(&mut self, event: ScalingEvent) -> ScalingEvent {
        self.history.push(event.clone());
        event
    }

    fn decide(&self, now_ms: u64, metrics: &AggregatedMetrics) -> ScalingEvent {
        let before = self.current;
        let active_workers = metrics.worker_counts_latest.active;
        let (load, mem_frac, queue_pressure) = Self::load_factor(metrics, active_workers);
        let snapshot = serde_json::json!({
            "load_factor": load,
            "mem_frac": mem_frac,
            "queue_pressure": queue_pressure,
            "cpu_avg": metrics.cpu_avg_overall,
        });

        if !self.enabled {
            return ScalingEvent {
                timestamp_ms: now_ms,
                action: ScaleAction::None,
                before_count: before,
                after_count: before,
                increment: 0,
                reason: "stopped".to_string(),
                metrics_snapshot: snapshot,
                forced: false,
            };
        }

        if self.in_cooldown(now_ms) {
            return ScalingEvent {
                timestamp_ms: now_ms,
                action: ScaleAction::None,
                before_count: before,
                after_count: before,
                increment: 0,
                reason: "cooldown".to_string(),
                metrics_snapshot: snapshot,
                forced: false,
            };
        }

        let memory_blocks_scale_up = mem_frac > self.config.memory_threshold;

        if !memory_blocks_scale_up && load > self.config.scale_up_threshold && before < self.config.max {
            let increment = self.config.scale_up_increment.min(self.config.max - before);
            return ScalingEvent {
                timestamp_ms: now_ms,
                action: ScaleAction::ScaleUp,
                before_count: before,
                after_count: before + increment,
                increment: increment as i32,
                reason: format!("load factor {load:.2} exceeded scale-up threshold"),
                metrics_snapshot: snapshot,
                forced: false,
            };
        }

        if load < self.config.scale_down_threshold && before > self.config.min {
            let decrement = self.config.scale_down_increment.min(before - self.config.min);
            return ScalingEvent {
                timestamp_ms: now_ms,
                action: ScaleAction::ScaleDown,
                before_count: before,
                after_count: before - decrement,
                increment: -(decrement as i32),
                reason: format!("load factor {load:.2} below scale-down threshold"),
                metrics_snapshot: snapshot,
                forced: false,
            };
        }

        let reason = if memory_blocks_scale_up {
            format!("memory fraction {mem_frac:.2} above safety threshold, scale-up suppressed")
        } else {
            format!("load factor {load:.2} within steady-state band")
        };
        ScalingEvent {
            timestamp_ms: now_ms,
            action: ScaleAction::None,
            before_count: before,
            after_count: before,
            increment: 0,
            reason,
            metrics_snapshot: snapshot,
            forced: false,
        }
    }
}

/// Control-loop auto-scaler: pure decision logic over injected metrics,
/// generic over `Clock` so cooldown is deterministically testable.
pub struct AutoScaler<C: Clock = SystemClock> {
    clock: C,
    inner: Mutex<Inner>,
}

impl<C: Clock> AutoScaler<C> {
    pub fn new(clock: C, config: AutoScalerConfig, initial_workers: u32) -> Self {
        let current = initial_workers.clamp(config.min, config.max);
        Self {
            clock,
            inner: Mutex::new(Inner {
                current,
                enabled: true,
                config,
                last_action_ms: None,
                history: Ring::new(poppo_core::scaling::DEFAULT_HISTORY_SIZE),
            }),
        }
    }

    pub fn start(&self) {
        self.inner.lock().enabled = true;
    }

    pub fn stop(&self) {
        self.inner.lock().enabled = false;
    }

    /// Idempotent: a second call within `cooldown_period` returns a
    /// `none`/`cooldown` event without mutating `current`.
    pub fn evaluate(&self, metrics: &AggregatedMetrics) -> ScalingEvent {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let event = inner.decide(now, metrics);
        if matches!(event.action, ScaleAction::ScaleUp | ScaleAction::ScaleDown) {
            inner.current = event.after_count;
            inner.last_action_ms = Some(now);
        }
        inner.record(event)
    }

    /// Bypasses thresholds and cooldown but still clamps to `[min, max]`.
    pub fn force_scale(&self, target: u32) -> ScalingEvent {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let before = inner.current;
        let clamped = target.clamp(inner.config.min, inner.config.max);
        let event = ScalingEvent {
            timestamp_ms: now,
            action: match clamped.cmp(&before) {
                std::cmp::Ordering::Greater => ScaleAction::ScaleUp,
                std::cmp::Ordering::Less => ScaleAction::ScaleDown,
                std::cmp::Ordering::Equal => ScaleAction::None,
            },
            before_count: before,
            after_count: clamped,
            increment: clamped as i32 - before as i32,
            reason: format!("forced scale to {clamped}"),
            metrics_snapshot: serde_json::Value::Null,
            forced: true,
        };
        inner.current = clamped;
        inner.last_action_ms = Some(now);
        inner.record(event)
    }

    /// Applies a new config. If it lowers `max` below the current worker
    /// count, performs the one-shot corrective scale-down immediately,
    /// bypassing cooldown (spec invariant: `min <= current <= max` always).
    pub fn update_config(&self, config: AutoScalerConfig) -> Option<ScalingEvent> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        inner.config = config;
        if inner.current > config.max {
            let before = inner.current;
            let event = ScalingEvent {
                timestamp_ms: now,
                action: ScaleAction::ScaleDown,
                before_count: before,
                after_count: config.max,
                increment: config.max as i32 - before as i32,
                reason: "corrective scale-down after max was lowered below current".to_string(),
                metrics_snapshot: serde_json::Value::Null,
                forced: false,
            };
            inner.current = config.max;
            inner.last_action_ms = Some(now);
            return Some(inner.record(event));
        }
        if inner.current < config.min {
            let before = inner.current;
            let event = ScalingEvent {
                timestamp_ms: now,
                action: ScaleAction::ScaleUp,
                before_count: before,
                after_count: config.min,
                increment: config.min as i32 - before as i32,
                reason: "corrective scale-up after min was raised above current".to_string(),
                metrics_snapshot: serde_json::Value::Null,
                forced: false,
            };
            inner.current = config.min;
            inner.last_action_ms = Some(now);
            return Some(inner.record(event));
        }
        None
    }

    pub fn history(&self, limit: usize) -> Vec<ScalingEvent> {
        let inner = self.inner.lock();
        inner.history.items.iter().rev().take(limit).cloned().collect()
    }

    pub fn current_state(&self) -> AutoScalerState {
        let inner = self.inner.lock();
        AutoScalerState {
            current: inner.current,
            enabled: inner.enabled,
            config: inner.config,
            last_action_ms: inner.last_action_ms,
        }
    }
}

#[cfg(test)]
#[path = "autoscaler_tests.rs"]
mod tests;
