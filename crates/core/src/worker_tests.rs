// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_worker_starts_in_starting_state_with_no_load() {
    let w = Worker::new(WorkerId::new(), None, 5, 1.0, 1_000);
    assert_eq!(w.status, WorkerStatus::Starting);
    assert_eq!(w.current_load, 0);
    assert!(w.has_capacity());
}

#[test]
fn capacity_check_respects_max_concurrent() {
    let mut w = Worker::new(WorkerId::new(), None, 2, 1.0, 0);
    w.current_load = 2;
    assert!(!w.has_capacity());
    w.current_load = 1;
    assert!(w.has_capacity());
}

#[test]
fn only_running_workers_are_selectable() {
    for status in [
        WorkerStatus::Starting,
        WorkerStatus::Unhealthy,
        WorkerStatus::Stopping,
        WorkerStatus::Stopped,
        WorkerStatus::Zombie,
        WorkerStatus::Failed,
    ] {
        assert!(!status.is_selectable());
    }
    assert!(WorkerStatus::Running.is_selectable());
}
