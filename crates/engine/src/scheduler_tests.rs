// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

fn project(name: &str, priority: u8, weight: f64, max_concurrent: u32) -> Project {
    let mut p = Project::new(ProjectId::new(), name, PathBuf::from("/tmp").join(name));
    p.priority = priority;
    p.weight = weight;
    p.max_concurrent = max_concurrent;
    p
}

fn load(project: Project, queued: u64, running: u64) -> ProjectLoad {
    ProjectLoad { project, queued, running, earliest_deadline_ms: None, completed_in_window: 0 }
}

fn load_with_completions(project: Project, queued: u64, running: u64, completed_in_window: u64) -> ProjectLoad {
    ProjectLoad { completed_in_window, ..load(project, queued, running) }
}

#[test]
fn round_robin_cycles_through_eligible_projects() {
    let a = project("a", 50, 1.0, 5);
    let b = project("b", 50, 1.0, 5);
    let (a_id, b_id) = (a.id, b.id);
    let candidates = vec![load(a, 1, 0), load(b, 1, 0)];

    let mut strategy = RoundRobinStrategy::default();
    let first = strategy.select(&candidates).unwrap();
    let second = strategy.select(&candidates).unwrap();

    assert_ne!(first, second);
    assert!([a_id, b_id].contains(&first));
    assert!([a_id, b_id].contains(&second));
}

#[test]
fn round_robin_skips_ineligible_projects() {
    let mut disabled = project("a", 50, 1.0, 5);
    disabled.enabled = false;
    let eligible = project("b", 50, 1.0, 5);
    let eligible_id = eligible.id;
    let candidates = vec![load(disabled, 1, 0), load(eligible, 1, 0)];

    let mut strategy = RoundRobinStrategy::default();
    assert_eq!(strategy.select(&candidates), Some(eligible_id));
}

#[test]
fn round_robin_returns_none_when_nothing_eligible() {
    let full = project("a", 50, 1.0, 1);
    let candidates = vec![load(full, 1, 1)];
    let mut strategy = RoundRobinStrategy::default();
    assert_eq!(strategy.select(&candidates), None);
}

#[test]
fn weighted_round_robin_favors_higher_weight_over_many_rounds() {
    let heavy = project("heavy", 50, 3.0, 10);
    let light = project("light", 50, 1.0, 10);
    let (heavy_id, light_id) = (heavy.id, light.id);

    let mut strategy = WeightedRoundRobinStrategy::default();
    let mut heavy_wins = 0;
    let mut light_wins = 0;
    for _ in 0..40 {
        let candidates = vec![load(heavy.clone(), 1, 0), load(light.clone(), 1, 0)];
        match strategy.select(&candidates) {
            Some(id) if id == heavy_id => heavy_wins += 1,
            Some(id) if id == light_id => light_wins += 1,
            _ => {}
        }
    }
    assert!(heavy_wins > light_wins);
}

#[test]
fn priority_strategy_picks_highest_priority() {
    let low = project("low", 10, 1.0, 5);
    let high = project("high", 90, 1.0, 5);
    let high_id = high.id;
    let candidates = vec![load(low, 1, 0), load(high, 1, 0)];

    let mut strategy = PriorityStrategy;
    assert_eq!(strategy.select(&candidates), Some(high_id));
}

#[test]
fn fair_share_prefers_whichever_equal_weight_project_has_completed_less() {
    let behind = project("behind", 50, 1.0, 4);
    let ahead = project("ahead", 50, 1.0, 4);
    let behind_id = behind.id;
    let candidates = vec![load_with_completions(behind, 1, 0, 10), load_with_completions(ahead, 1, 0, 90)];

    let mut strategy = FairShareStrategy;
    assert_eq!(strategy.select(&candidates), Some(behind_id));
}

#[test]
fn fair_share_prefers_the_heavier_weighted_project_when_completions_are_even() {
    let heavy = project("heavy", 50, 3.0, 10);
    let light = project("light", 50, 1.0, 10);
    let heavy_id = heavy.id;
    let candidates = vec![load_with_completions(heavy, 1, 0, 50), load_with_completions(light, 1, 0, 50)];

    let mut strategy = FairShareStrategy;
    assert_eq!(strategy.select(&candidates), Some(heavy_id));
}

#[test]
fn fair_share_leaves_a_project_already_at_its_weighted_quota_alone() {
    // weight 1 vs weight 3, completions already split 25/75 — exactly on quota.
    // The project furthest below its quota should be a toss-up; either is a
    // defensible pick, but it must not favor the over-served one.
    let light = project("light", 50, 1.0, 10);
    let heavy = project("heavy", 50, 3.0, 10);
    let light_id = light.id;
    let heavy_id = heavy.id;
    let candidates = vec![load_with_completions(light, 1, 0, 25), load_with_completions(heavy, 1, 0, 75)];

    let mut strategy = FairShareStrategy;
    let chosen = strategy.select(&candidates).unwrap();
    assert!(chosen == light_id || chosen == heavy_id);
}

#[test]
fn fair_share_over_many_rounds_splits_completions_by_weight() {
    // Spec scenario: weight=1 vs weight=3 should converge to roughly a 1:3
    // split of completions over a long run, not the ~50/50 occupancy split
    // the old ratio-based implementation produced.
    let light = project("light", 50, 1.0, 100);
    let heavy = project("heavy", 50, 3.0, 100);
    let light_id = light.id;
    let heavy_id = heavy.id;

    let mut strategy = FairShareStrategy;
    let mut completed = std::collections::HashMap::new();
    completed.insert(light_id, 0u64);
    completed.insert(heavy_id, 0u64);

    for _ in 0..400 {
        let candidates = vec![
            load_with_completions(light.clone(), 1, 0, completed[&light_id]),
            load_with_completions(heavy.clone(), 1, 0, completed[&heavy_id]),
        ];
        let chosen = strategy.select(&candidates).unwrap();
        *completed.get_mut(&chosen).unwrap() += 1;
    }

    let light_share = completed[&light_id] as f64 / 400.0;
    let heavy_share = completed[&heavy_id] as f64 / 400.0;
    assert!((light_share - 0.25).abs() < 0.05, "light share was {light_share}");
    assert!((heavy_share - 0.75).abs() < 0.05, "heavy share was {heavy_share}");
}

#[test]
fn deadline_aware_prefers_the_nearest_deadline() {
    let soon = project("soon", 50, 1.0, 5);
    let later = project("later", 50, 1.0, 5);
    let soon_id = soon.id;
    let mut soon_load = load(soon, 1, 0);
    soon_load.earliest_deadline_ms = Some(1_000);
    let mut later_load = load(later, 1, 0);
    later_load.earliest_deadline_ms = Some(50_000);

    let mut strategy = DeadlineAwareStrategy;
    assert_eq!(strategy.select(&[soon_load, later_load]), Some(soon_id));
}

#[test]
fn scheduler_keeps_a_bounded_decision_log() {
    let project = project("a", 50, 1.0, 5);
    let scheduler = Scheduler::new(SchedulingStrategyKind::RoundRobin);
    for i in 0..5 {
        let candidates = vec![load(project.clone(), 1, 0)];
        scheduler.select(&candidates, i);
    }
    assert_eq!(scheduler.recent_decisions(100).len(), 5);
}

#[test]
fn set_strategy_switches_live() {
    let scheduler = Scheduler::new(SchedulingStrategyKind::RoundRobin);
    assert_eq!(scheduler.current_kind(), SchedulingStrategyKind::RoundRobin);
    scheduler.set_strategy(SchedulingStrategyKind::FairShare);
    assert_eq!(scheduler.current_kind(), SchedulingStrategyKind::FairShare);
}
