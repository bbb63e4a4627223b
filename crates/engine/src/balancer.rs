// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool and load balancer (spec section 4.6, component C6).

use std::collections::HashMap;

use parking_lot::RwLock;
use poppo_core::{Clock, ErrorKind, PoppoError, Result, SystemClock, Worker, WorkerId, WorkerStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategyKind {
    RoundRobin,
    LeastConnections,
    WeightedRoundRobin,
    ResponseTime,
    Random,
}

/// Tuning knobs sourced from `ConfigDocument.worker_pool`.
#[derive(Debug, Clone, Copy)]
pub struct BalancerConfig {
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
    pub sticky_sessions: bool,
    pub session_timeout_ms: u64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            unhealthy_threshold: poppo_core::worker::DEFAULT_UNHEALTHY_THRESHOLD,
            healthy_threshold: poppo_core::worker::DEFAULT_HEALTHY_THRESHOLD,
            sticky_sessions: false,
            session_timeout_ms: 60 * 60 * 1000,
        }
    }
}

struct StickyBinding {
    worker_id: WorkerId,
    last_used_ms: u64,
}

/// The worker pool: registration, health tracking, load accounting, and
/// pluggable selection — guarded by a single lock per the lock-per-component
/// convention the rest of this crate follows.
pub struct WorkerPool<C: Clock = SystemClock> {
    clock: C,
    config: BalancerConfig,
    workers: RwLock<HashMap<WorkerId, Worker>>,
    sticky: RwLock<HashMap<String, StickyBinding>>,
    strategy: RwLock<SelectionStrategyKind>,
    round_robin_cursor: RwLock<usize>,
    wrr_credits: RwLock<HashMap<WorkerId, f64>>,
}

impl<C: Clock> WorkerPool<C> {
    pub fn new(clock: C, config: BalancerConfig, strategy: SelectionStrategyKind) -> Self {
        Self {
            clock,
            config,
            workers: RwLock::new(HashMap::new()),
            sticky: RwLock::new(HashMap::new()),
            strategy: RwLock::new(strategy),
            round_robin_cursor: RwLock::new(0),
            wrr_credits: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_strategy(&self, strategy: SelectionStrategyKind) {
        *self.strategy.write() = strategy;
    }

    pub fn register_worker(&self, worker: Worker) {
        self.workers.write().insert(worker.id, worker);
    }

    pub fn unregister_worker(&self, id: WorkerId) -> Result<()> {
        self.workers.write().remove(&id).map(|_| ()).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))
    }

    pub fn increment_load(&self, id: WorkerId) -> Result<()> {
        let mut workers = self.workers.write();
        let worker = workers.get_mut(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;
        worker.current_load += 1;
        Ok(())
    }

    pub fn decrement_load(&self, id: WorkerId) -> Result<()> {
        let mut workers = self.workers.write();
        let worker = workers.get_mut(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;
        worker.current_load = worker.current_load.saturating_sub(1);
        Ok(())
    }

    /// Record a completed dispatch's health-check-equivalent outcome and
    /// response time, updating the healthy/unhealthy state machine.
    pub fn record_result(&self, id: WorkerId, success: bool, response_time_ms: u64) -> Result<()> {
        let mut workers = self.workers.write();
        let worker = workers.get_mut(&id).ok_or_else(|| PoppoError::not_found(format!("worker `{id}`")))?;

        const RESPONSE_TIME_SMOOTHING: f64 = 0.2;
        if worker.mean_response_time_ms == 0.0 {
            worker.mean_response_time_ms = response_time_ms as f64;
        } else {
            worker.mean_response_time_ms = worker.mean_response_time_ms * (1.0 - RESPONSE_TIME_SMOOTHING)
                + response_time_ms as f64 * RESPONSE_TIME_SMOOTHING;
        }

        if success {
            worker.total_successes += 1;
            worker.consecutive_successes += 1;
            worker.consecutive_failures = 0;
            if worker.status == WorkerStatus::Unhealthy && worker.consecutive_successes >= self.config.healthy_threshold
            {
                worker.status = WorkerStatus::Running;
            }
        } else {
            worker.total_failures += 1;
            worker.consecutive_failures += 1;
            worker.consecutive_successes = 0;
            if worker.status == WorkerStatus::Running && worker.consecutive_failures >= self.config.unhealthy_threshold
            {
                worker.status = WorkerStatus::Unhealthy;
            }
        }
        Ok(())
    }

    pub fn reset_stats(&self, id: Option<WorkerId>) {
        let mut workers = self.workers.write();
        for worker in workers.values_mut().filter(|w| id.is_none_or(|target| target == w.id)) {
            worker.total_successes = 0;
            worker.total_failures = 0;
            worker.consecutive_failures = 0;
            worker.consecutive_successes = 0;
            worker.mean_response_time_ms = 0.0;
        }
    }

    pub fn status(&self, id: Option<WorkerId>) -> Vec<Worker> {
        let workers = self.workers.read();
        workers.values().filter(|w| id.is_none_or(|target| target == w.id)).cloned().collect()
    }

    fn selectable(&self) -> Vec<Worker> {
        self.workers.read().values().filter(|w| w.status.is_selectable() && w.has_capacity()).cloned().collect()
    }

    /// Select a worker for a ready task. Honors sticky sessions first when
    /// enabled and `session_id` is given and bound to a still-eligible
    /// worker; otherwise delegates to the active selection strategy.
    pub fn select_worker(&self, session_id: Option<&str>) -> Result<WorkerId> {
        let now = self.clock.epoch_ms();

        if self.config.sticky_sessions {
            if let Some(session_id) = session_id {
                let bound = self.sticky.read().get(session_id).map(|b| b.worker_id);
                if let Some(worker_id) = bound {
                    let eligible = self.selectable();
                    if eligible.iter().any(|w| w.id == worker_id) {
                        self.sticky.write().insert(
                            session_id.to_string(),
                            StickyBinding { worker_id, last_used_ms: now },
                        );
                        return Ok(worker_id);
                    }
                }
            }
        }

        let pool = self.selectable();
        if pool.is_empty() {
            return Err(PoppoError::new(ErrorKind::NoAvailableWorker, "no healthy worker has capacity"));
        }

        let chosen = match *self.strategy.read() {
            SelectionStrategyKind::RoundRobin => self.select_round_robin(&pool),
            SelectionStrategyKind::LeastConnections => self.select_least_connections(&pool),
            SelectionStrategyKind::WeightedRoundRobin => self.select_weighted_round_robin(&pool),
            SelectionStrategyKind::ResponseTime => self.select_response_time(&pool),
            SelectionStrategyKind::Random => self.select_random(&pool),
        };

        if self.config.sticky_sessions {
            if let Some(session_id) = session_id {
                self.sticky
                    .write()
                    .insert(session_id.to_string(), StickyBinding { worker_id: chosen, last_used_ms: now });
            }
        }

        Ok(chosen)
    }

    fn select_round_robin(&self, pool: &[Worker]) -> WorkerId {
        let mut cursor = self.round_robin_cursor.write();
        *cursor %= pool.len();
        let chosen = pool[*cursor].id;
        *cursor = (*cursor + 1) % pool.len();
        chosen
    }

    fn select_least_connections(&self, pool: &[Worker]) -> WorkerId {
        pool.iter().min_by_key(|w| w.current_load).map(|w| w.id).unwrap_or_else(|| pool[0].id)
    }

    fn select_weighted_round_robin(&self, pool: &[Worker]) -> WorkerId {
        let mut credits = self.wrr_credits.write();
        for w in pool {
            *credits.entry(w.id).or_insert(0.0) += w.weight;
        }
        let total_weight: f64 = pool.iter().map(|w| w.weight).sum();
        let chosen = pool
            .iter()
            .max_by(|a, b| {
                credits.get(&a.id).copied().unwrap_or(0.0).partial_cmp(&credits.get(&b.id).copied().unwrap_or(0.0)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|w| w.id)
            .unwrap_or_else(|| pool[0].id);
        if let Some(entry) = credits.get_mut(&chosen) {
            *entry -= total_weight / pool.len() as f64;
        }
        chosen
    }

    fn select_response_time(&self, pool: &[Worker]) -> WorkerId {
        pool.iter()
            .min_by(|a, b| {
                a.mean_response_time_ms.partial_cmp(&b.mean_response_time_ms).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|w| w.id)
            .unwrap_or_else(|| pool[0].id)
    }

    fn select_random(&self, pool: &[Worker]) -> WorkerId {
        let idx = rand::thread_rng().gen_range(0..pool.len());
        pool[idx].id
    }

    /// Drop sticky bindings idle longer than `session_timeout_ms`.
    pub fn sweep_sticky_sessions(&self) {
        let now = self.clock.epoch_ms();
        let timeout = self.config.session_timeout_ms;
        self.sticky.write().retain(|_, binding| now.saturating_sub(binding.last_used_ms) < timeout);
    }
}

#[cfg(test)]
#[path = "balancer_tests.rs"]
mod tests;
