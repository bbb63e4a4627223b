// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background control loops, one `tokio::spawn` per timer, each exiting on
//! `shutdown`. Grounded on the teacher's `oj-daemon/src/main.rs` pattern of
//! spawning one task per periodic concern (checkpoint, flush) alongside the
//! main engine loop, adapted here since poppo-daemon has no single serialized
//! event loop to fold these into.

use std::sync::Arc;
use std::time::Duration;

use poppo_core::{Clock, MetricSample, TaskQueueSnapshot, WorkerCounts};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatch::commit_scaling;
use crate::state::AppState;

/// Every `health_check_interval` (default 30s, spec section 4.7), reap dead
/// workers and restart them subject to `max_restart_attempts`.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Every `evaluation_interval` (default 30s, spec section 4.8), feed
/// aggregated metrics to the auto-scaler and commit its decision.
const EVALUATION_INTERVAL: Duration = Duration::from_secs(30);

/// Sticky-session bindings are swept periodically rather than lazily, so a
/// long-idle session doesn't linger forever pinned to one worker.
const STICKY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Reconciles the lifecycle manager's and the balancer's independent worker
/// views, in case a spawn/terminate updated one without the other (e.g. a
/// `reap_and_restart` replacing a worker id).
const RECONCILE_INTERVAL: Duration = Duration::from_secs(15);

pub fn spawn_all(state: Arc<AppState>, shutdown: CancellationToken) {
    spawn_health_check(Arc::clone(&state), shutdown.clone());
    spawn_autoscale(Arc::clone(&state), shutdown.clone());
    spawn_sticky_sweep(Arc::clone(&state), shutdown.clone());
    spawn_reconcile(state, shutdown);
}

fn spawn_health_check(state: Arc<AppState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let restarted = state.lifecycle.reap_and_restart().await;
                    if !restarted.is_empty() {
                        info!(count = restarted.len(), "restarted dead workers");
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    });
}

fn spawn_autoscale(state: Arc<AppState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(EVALUATION_INTERVAL);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let stats = state.queue.stats();
                    let workers = state.balancer.status(None);
                    let active = workers.iter().filter(|w| w.current_load > 0).count() as u32;
                    let (cpu_cores, memory_percent) = state.sampler.sample();
                    state.metrics.record_sample(MetricSample {
                        timestamp_ms: state.clock.epoch_ms(),
                        cpu_cores,
                        memory_percent,
                        task_queue: TaskQueueSnapshot {
                            size: stats.size,
                            pending: stats.pending,
                            processing: stats.processing,
                            completed: stats.completed,
                            failed: stats.failed,
                        },
                        worker_stats: WorkerCounts {
                            total: workers.len() as u32,
                            active,
                            idle: workers.len() as u32 - active,
                        },
                    });
                    let metrics = state.metrics.get_aggregated_metrics();
                    let event = state.autoscaler.evaluate(&metrics);
                    if event.before_count != event.after_count {
                        info!(before = event.before_count, after = event.after_count, action = ?event.action, "autoscaler decision");
                        commit_scaling(&state, event.before_count, event.after_count).await;
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    });
}

fn spawn_sticky_sweep(state: Arc<AppState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(STICKY_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = tick.tick() => state.balancer.sweep_sticky_sessions(),
                _ = shutdown.cancelled() => return,
            }
        }
    });
}

/// Drop any `balancer` worker entry whose `lifecycle` counterpart is gone
/// (e.g. reaped and replaced by a fresh id), so a stale entry never gets
/// selected for a task it can no longer serve.
fn spawn_reconcile(state: Arc<AppState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(RECONCILE_INTERVAL);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    for worker in state.balancer.status(None) {
                        if state.lifecycle.get(worker.id).is_err() {
                            warn!(worker_id = %worker.id, "dropping balancer entry with no lifecycle counterpart");
                            let _ = state.balancer.unregister_worker(worker.id);
                        }
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    });
}
