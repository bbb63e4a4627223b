// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler (spec section 4.5): picks which project's next task gets
//! dispatched to a free worker.

use std::collections::VecDeque;

use parking_lot::Mutex;
use poppo_core::{Project, ProjectId};
use serde::{Deserialize, Serialize};

/// Bounded history of scheduling decisions kept for `get-queue-status`/debugging.
const DECISION_LOG_CAP: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStrategyKind {
    RoundRobin,
    WeightedRoundRobin,
    Priority,
    FairShare,
    DeadlineAware,
}

#[derive(Debug, Clone)]
pub struct ScheduleDecision {
    pub project_id: ProjectId,
    pub strategy: SchedulingStrategyKind,
    pub decided_at_ms: u64,
}

/// A candidate project competing for the next dispatch slot.
#[derive(Debug, Clone)]
pub struct ProjectLoad {
    pub project: Project,
    /// Count of queued tasks currently owned by this project.
    pub queued: u64,
    /// Count of tasks currently running for this project.
    pub running: u64,
    /// Earliest deadline among this project's queued tasks, if any.
    pub earliest_deadline_ms: Option<u64>,
    /// Tasks this project completed within the trailing `fair_share_window`,
    /// as counted by the caller from the global queue's task history. Only
    /// `FairShareStrategy` reads this; every other strategy ignores it.
    pub completed_in_window: u64,
}

/// Picks one project to dispatch next, given the current load snapshot of
/// every enabled project. Returns `None` when nothing is eligible to run
/// (e.g. every project is at `max_concurrent` or has an empty queue).
pub trait SchedulingStrategy: Send + Sync {
    fn kind(&self) -> SchedulingStrategyKind;
    fn select(&mut self, candidates: &[ProjectLoad]) -> Option<ProjectId>;
}

fn eligible(candidates: &[ProjectLoad]) -> impl Iterator<Item = &ProjectLoad> {
    candidates.iter().filter(|c| c.project.enabled && c.queued > 0 && c.running < c.project.max_concurrent as u64)
}

/// Cycles through eligible projects in a fixed rotation, ignoring weight
/// and priority entirely.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    cursor: usize,
}

impl SchedulingStrategy for RoundRobinStrategy {
    fn kind(&self) -> SchedulingStrategyKind {
        SchedulingStrategyKind::RoundRobin
    }

    fn select(&mut self, candidates: &[ProjectLoad]) -> Option<ProjectId> {
        let pool: Vec<_> = eligible(candidates).collect();
        if pool.is_empty() {
            return None;
        }
        self.cursor %= pool.len();
        let chosen = pool[self.cursor].project.id;
        self.cursor = (self.cursor + 1) % pool.len();
        Some(chosen)
    }
}

/// Round-robins, but a project's relative turn frequency is proportional
/// to its configured weight (smooth weighted round robin).
#[derive(Debug, Default)]
pub struct WeightedRoundRobinStrategy {
    credits: std::collections::HashMap<ProjectId, f64>,
}

impl SchedulingStrategy for WeightedRoundRobinStrategy {
    fn kind(&self) -> SchedulingStrategyKind {
        SchedulingStrategyKind::WeightedRoundRobin
    }

    fn select(&mut self, candidates: &[ProjectLoad]) -> Option<ProjectId> {
        let pool: Vec<_> = eligible(candidates).collect();
        if pool.is_empty() {
            return None;
        }
        for c in &pool {
            *self.credits.entry(c.project.id).or_insert(0.0) += c.project.weight;
        }
        let (winner_id, _) = self
            .credits
            .iter()
            .filter(|(id, _)| pool.iter().any(|c| &c.project.id == *id))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, credit)| (*id, *credit))?;
        if let Some(entry) = self.credits.get_mut(&winner_id) {
            *entry -= pool.iter().map(|c| c.project.weight).sum::<f64>() / pool.len() as f64;
        }
        Some(winner_id)
    }
}

/// Always dispatches the project whose earliest queued task has the
/// highest raw `priority` field (ignores age bonus and weight — that
/// fairness math lives in the global queue's own ordering, not here).
#[derive(Debug, Default)]
pub struct PriorityStrategy;

impl SchedulingStrategy for PriorityStrategy {
    fn kind(&self) -> SchedulingStrategyKind {
        SchedulingStrategyKind::Priority
    }

    fn select(&mut self, candidates: &[ProjectLoad]) -> Option<ProjectId> {
        eligible(candidates).max_by_key(|c| c.project.priority).map(|c| c.project.id)
    }
}

/// Maximizes Jain's fairness index over completed-task counts within a
/// trailing window: each eligible project has a weight-normalized quota
/// (`weight / total_weight`) and an observed share
/// (`completed_in_window / total_completed`), and this strategy dispatches
/// to whichever project's share falls furthest below its quota — the one
/// most under-served relative to how much of the pie it's entitled to.
#[derive(Debug, Default)]
pub struct FairShareStrategy;

impl SchedulingStrategy for FairShareStrategy {
    fn kind(&self) -> SchedulingStrategyKind {
        SchedulingStrategyKind::FairShare
    }

    fn select(&mut self, candidates: &[ProjectLoad]) -> Option<ProjectId> {
        let pool: Vec<_> = eligible(candidates).collect();
        if pool.is_empty() {
            return None;
        }

        let pool_len = pool.len() as f64;
        let total_weight: f64 = pool.iter().map(|c| c.project.weight.max(0.0)).sum();
        let total_completed: u64 = pool.iter().map(|c| c.completed_in_window).sum();

        let deficit = |c: &ProjectLoad| {
            let quota = if total_weight > 0.0 { c.project.weight.max(0.0) / total_weight } else { 1.0 / pool_len };
            let share = if total_completed > 0 { c.completed_in_window as f64 / total_completed as f64 } else { 0.0 };
            quota - share
        };

        pool.into_iter()
            .max_by(|a, b| deficit(a).partial_cmp(&deficit(b)).unwrap_or(std::cmp::Ordering::Equal))
            .map(|c| c.project.id)
    }
}

/// Dispatches the project with the nearest task deadline; projects with no
/// deadline-bearing queued tasks are only chosen once no deadline-bearing
/// project is eligible.
#[derive(Debug, Default)]
pub struct DeadlineAwareStrategy;

impl SchedulingStrategy for DeadlineAwareStrategy {
    fn kind(&self) -> SchedulingStrategyKind {
        SchedulingStrategyKind::DeadlineAware
    }

    fn select(&mut self, candidates: &[ProjectLoad]) -> Option<ProjectId> {
        let mut pool: Vec<_> = eligible(candidates).collect();
        if pool.is_empty() {
            return None;
        }
        pool.sort_by_key(|c| c.earliest_deadline_ms.unwrap_or(u64::MAX));
        pool.first().map(|c| c.project.id)
    }
}

pub fn strategy_for_kind(kind: SchedulingStrategyKind) -> Box<dyn SchedulingStrategy> {
    match kind {
        SchedulingStrategyKind::RoundRobin => Box::new(RoundRobinStrategy::default()),
        SchedulingStrategyKind::WeightedRoundRobin => Box::new(WeightedRoundRobinStrategy::default()),
        SchedulingStrategyKind::Priority => Box::new(PriorityStrategy),
        SchedulingStrategyKind::FairShare => Box::new(FairShareStrategy),
        SchedulingStrategyKind::DeadlineAware => Box::new(DeadlineAwareStrategy),
    }
}

/// Owns the live strategy (swappable at runtime) and a bounded decision log.
pub struct Scheduler {
    strategy: Mutex<Box<dyn SchedulingStrategy>>,
    log: Mutex<VecDeque<ScheduleDecision>>,
}

impl Scheduler {
    pub fn new(kind: SchedulingStrategyKind) -> Self {
        Self { strategy: Mutex::new(strategy_for_kind(kind)), log: Mutex::new(VecDeque::new()) }
    }

    pub fn set_strategy(&self, kind: SchedulingStrategyKind) {
        *self.strategy.lock() = strategy_for_kind(kind);
    }

    pub fn current_kind(&self) -> SchedulingStrategyKind {
        self.strategy.lock().kind()
    }

    pub fn select(&self, candidates: &[ProjectLoad], now_ms: u64) -> Option<ProjectId> {
        let mut strategy = self.strategy.lock();
        let chosen = strategy.select(candidates)?;
        let mut log = self.log.lock();
        if log.len() == DECISION_LOG_CAP {
            log.pop_front();
        }
        log.push_back(ScheduleDecision { project_id: chosen, strategy: strategy.kind(), decided_at_ms: now_ms });
        Some(chosen)
    }

    pub fn recent_decisions(&self, n: usize) -> Vec<ScheduleDecision> {
        let log = self.log.lock();
        log.iter().rev().take(n).cloned().collect()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
