// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project registration and enable/disable/update/unregister flows
//! (spec section 4.2).

use crate::support::Daemon;

#[test]
fn update_patches_priority_and_tags_without_touching_other_fields() {
    let daemon = Daemon::start();
    let project_dir = daemon.config_dir().join("patched-project");
    let registered = daemon.client(&["register-project", project_dir.to_str().unwrap()]);
    let project_id = registered["project_id"].as_str().unwrap().to_string();

    let patched =
        daemon.client(&["update-project", &project_id, "--priority", "30", "--tags", "frontend,urgent"]);
    assert_eq!(patched["priority"], 30);
    assert_eq!(patched["tags"], serde_json::json!(["frontend", "urgent"]));
    assert_eq!(patched["enabled"], true, "update-project must not touch unrelated fields");
}

#[test]
fn disable_then_enable_round_trips() {
    let daemon = Daemon::start();
    let project_dir = daemon.config_dir().join("togglable-project");
    let registered = daemon.client(&["register-project", project_dir.to_str().unwrap()]);
    let project_id = registered["project_id"].as_str().unwrap().to_string();

    daemon.client(&["disable-project", &project_id]);
    let info = daemon.client(&["project-info", &project_id]);
    assert_eq!(info["enabled"], false);

    daemon.client(&["enable-project", &project_id]);
    let info = daemon.client(&["project-info", &project_id]);
    assert_eq!(info["enabled"], true);
}

#[test]
fn unregister_refuses_a_project_with_a_running_task_unless_forced() {
    let daemon = Daemon::start();
    let project_dir = daemon.config_dir().join("busy-project");
    let registered = daemon.client(&["register-project", project_dir.to_str().unwrap()]);
    let project_id = registered["project_id"].as_str().unwrap().to_string();

    daemon.client(&["queue-task", &project_id, "build"]);
    daemon.client(&["next-task", &project_id]);

    let (code, stderr) = daemon.client_raw(&["unregister-project", &project_id]);
    assert_ne!(code, 0, "unregister without --force must fail while a task is running");
    assert!(stderr.contains("cooldown"), "stderr should name the cooldown error kind: {stderr}");

    let forced = daemon.client(&["unregister-project", &project_id, "--force"]);
    assert_eq!(forced["ok"], true);
}

#[test]
fn list_projects_reflects_every_registration() {
    let daemon = Daemon::start();
    for name in ["alpha", "beta"] {
        let project_dir = daemon.config_dir().join(name);
        daemon.client(&["register-project", project_dir.to_str().unwrap(), "--name", name]);
    }

    let listed = daemon.client(&["list-projects"]);
    let names: Vec<String> =
        listed.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap().to_string()).collect();
    assert!(names.contains(&"alpha".to_string()));
    assert!(names.contains(&"beta".to_string()));
}
