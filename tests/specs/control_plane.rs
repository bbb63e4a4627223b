// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane round trips over the real Unix socket (spec section 6).

use crate::support::Daemon;

#[test]
fn ping_reaches_a_freshly_started_daemon() {
    let daemon = Daemon::start();
    let response = daemon.client(&["ping"]);
    assert_eq!(response["pong"], true);
}

#[test]
fn status_reports_an_empty_queue_on_a_fresh_daemon() {
    let daemon = Daemon::start();
    let response = daemon.client(&["status"]);
    assert_eq!(response["shutting_down"], false);
    assert_eq!(response["queue"]["size"], 0);
}

#[test]
fn register_queue_next_complete_round_trip() {
    let daemon = Daemon::start();
    let project_dir = daemon.config_dir().join("sample-project");

    let registered = daemon.client(&["register-project", project_dir.to_str().unwrap(), "--name", "sample"]);
    let project_id = registered["project_id"].as_str().expect("project_id string").to_string();

    let queued = daemon.client(&["queue-task", &project_id, "build", "--priority", "70"]);
    let task_id = queued["task_id"].as_str().expect("task_id string").to_string();

    let pulled = daemon.client(&["next-task", &project_id]);
    assert_eq!(pulled["id"], task_id);
    assert_eq!(pulled["status"], "running");

    let completed = daemon.client(&["complete-task", &task_id]);
    assert_eq!(completed["task"]["status"], "completed");

    // The queue has nothing left runnable for this project.
    let (code, _) = daemon.client_raw(&["next-task", &project_id]);
    assert_eq!(code, 0, "pulling from an empty project queue is not an error");
}

#[test]
fn config_update_then_reload_round_trips_a_patched_field() {
    let daemon = Daemon::start();

    let updated = daemon.client(&["config-update", r#"{"logging":{"level":"debug"}}"#]);
    assert_eq!(updated["logging"]["level"], "debug");

    // Reloading from disk must not lose the update we just persisted.
    let reloaded = daemon.client(&["reload-config"]);
    assert_eq!(reloaded["logging"]["level"], "debug");
}
