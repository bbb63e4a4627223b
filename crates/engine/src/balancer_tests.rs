// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use poppo_core::FakeClock;

fn healthy_worker(clock: &FakeClock, max_concurrent: u32, weight: f64) -> Worker {
    let mut w = Worker::new(WorkerId::new(), None, max_concurrent, weight, clock.epoch_ms());
    w.status = WorkerStatus::Running;
    w
}

#[test]
fn select_worker_fails_with_no_available_worker_when_pool_is_empty() {
    let clock = FakeClock::new();
    let pool = WorkerPool::new(clock, BalancerConfig::default(), SelectionStrategyKind::RoundRobin);

    let result = pool.select_worker(None);
    assert!(matches!(result, Err(e) if e.kind == ErrorKind::NoAvailableWorker));
}

#[test]
fn round_robin_distributes_fairly_across_identical_workers() {
    let clock = FakeClock::new();
    let pool = WorkerPool::new(clock.clone(), BalancerConfig::default(), SelectionStrategyKind::RoundRobin);
    let ids: Vec<_> = (0..3)
        .map(|_| {
            let w = healthy_worker(&clock, 10, 1.0);
            let id = w.id;
            pool.register_worker(w);
            id
        })
        .collect();

    let mut counts: HashMap<WorkerId, u32> = HashMap::new();
    for _ in 0..30 {
        let chosen = pool.select_worker(None).unwrap();
        *counts.entry(chosen).or_insert(0) += 1;
    }

    for id in ids {
        assert_eq!(counts[&id], 10);
    }
}

#[test]
fn least_connections_prefers_the_least_loaded_worker() {
    let clock = FakeClock::new();
    let pool = WorkerPool::new(clock.clone(), BalancerConfig::default(), SelectionStrategyKind::LeastConnections);

    let busy = healthy_worker(&clock, 10, 1.0);
    let busy_id = busy.id;
    pool.register_worker(busy);
    pool.increment_load(busy_id).unwrap();
    pool.increment_load(busy_id).unwrap();

    let idle = healthy_worker(&clock, 10, 1.0);
    let idle_id = idle.id;
    pool.register_worker(idle);

    assert_eq!(pool.select_worker(None).unwrap(), idle_id);
}

#[test]
fn unhealthy_workers_are_excluded_from_selection() {
    let clock = FakeClock::new();
    let pool = WorkerPool::new(clock.clone(), BalancerConfig::default(), SelectionStrategyKind::RoundRobin);

    let mut worker = healthy_worker(&clock, 10, 1.0);
    worker.status = WorkerStatus::Unhealthy;
    pool.register_worker(worker);

    let result = pool.select_worker(None);
    assert!(matches!(result, Err(e) if e.kind == ErrorKind::NoAvailableWorker));
}

#[test]
fn record_result_flips_healthy_to_unhealthy_after_threshold_failures() {
    let clock = FakeClock::new();
    let config = BalancerConfig { unhealthy_threshold: 3, ..BalancerConfig::default() };
    let pool = WorkerPool::new(clock.clone(), config, SelectionStrategyKind::RoundRobin);
    let worker = healthy_worker(&clock, 10, 1.0);
    let id = worker.id;
    pool.register_worker(worker);

    pool.record_result(id, false, 10).unwrap();
    pool.record_result(id, false, 10).unwrap();
    assert_eq!(pool.status(Some(id))[0].status, WorkerStatus::Running);
    pool.record_result(id, false, 10).unwrap();
    assert_eq!(pool.status(Some(id))[0].status, WorkerStatus::Unhealthy);
}

#[test]
fn record_result_flips_unhealthy_back_to_healthy_after_threshold_successes() {
    let clock = FakeClock::new();
    let config = BalancerConfig { unhealthy_threshold: 1, healthy_threshold: 2, ..BalancerConfig::default() };
    let pool = WorkerPool::new(clock.clone(), config, SelectionStrategyKind::RoundRobin);
    let worker = healthy_worker(&clock, 10, 1.0);
    let id = worker.id;
    pool.register_worker(worker);

    pool.record_result(id, false, 10).unwrap();
    assert_eq!(pool.status(Some(id))[0].status, WorkerStatus::Unhealthy);

    pool.record_result(id, true, 10).unwrap();
    assert_eq!(pool.status(Some(id))[0].status, WorkerStatus::Unhealthy);
    pool.record_result(id, true, 10).unwrap();
    assert_eq!(pool.status(Some(id))[0].status, WorkerStatus::Running);
}

#[test]
fn sticky_session_rebinds_the_same_worker_until_it_becomes_ineligible() {
    let clock = FakeClock::new();
    let config = BalancerConfig { sticky_sessions: true, ..BalancerConfig::default() };
    let pool = WorkerPool::new(clock.clone(), config, SelectionStrategyKind::RoundRobin);
    pool.register_worker(healthy_worker(&clock, 10, 1.0));
    pool.register_worker(healthy_worker(&clock, 10, 1.0));

    let first = pool.select_worker(Some("session-1")).unwrap();
    for _ in 0..5 {
        assert_eq!(pool.select_worker(Some("session-1")).unwrap(), first);
    }
}

#[test]
fn sweep_sticky_sessions_drops_expired_bindings() {
    let clock = FakeClock::new();
    let config =
        BalancerConfig { sticky_sessions: true, session_timeout_ms: 1_000, ..BalancerConfig::default() };
    let pool = WorkerPool::new(clock.clone(), config, SelectionStrategyKind::RoundRobin);
    pool.register_worker(healthy_worker(&clock, 10, 1.0));
    pool.register_worker(healthy_worker(&clock, 10, 1.0));

    let first = pool.select_worker(Some("session-1")).unwrap();
    clock.advance(std::time::Duration::from_secs(5));
    pool.sweep_sticky_sessions();

    // The binding expired; the next pick may legitimately land on a
    // different worker, but the sweep itself must not error and the
    // binding must be gone from internal state (exercised indirectly: a
    // fresh pick for a new session id works without panicking).
    let _ = first;
    assert!(pool.select_worker(Some("session-1")).is_ok());
}

#[test]
fn unregister_removes_a_worker() {
    let clock = FakeClock::new();
    let pool = WorkerPool::new(clock.clone(), BalancerConfig::default(), SelectionStrategyKind::RoundRobin);
    let worker = healthy_worker(&clock, 10, 1.0);
    let id = worker.id;
    pool.register_worker(worker);

    pool.unregister_worker(id).unwrap();
    assert!(pool.unregister_worker(id).is_err());
}
