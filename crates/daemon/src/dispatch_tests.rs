// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use poppo_config::{ConfigStore, ProjectRegistry, RegisterProjectOptions};
use poppo_core::{Clock, Worker};
use poppo_wire::{Command, QueueTaskParams, RegisterProjectParams};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::paths::DaemonPaths;
use crate::state::AppState;

use super::dispatch;

fn harness() -> (TempDir, AppState) {
    harness_with_token(CancellationToken::new())
}

fn harness_with_token(shutdown: CancellationToken) -> (TempDir, AppState) {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_path_buf();
    let paths = DaemonPaths {
        config_path: root.join("config.json"),
        projects_dir: root.join("projects"),
        pid_path: root.join("daemon.pid"),
        version_path: root.join("daemon.version"),
        socket_path: root.join("daemon.sock"),
        logs_dir: root.join("logs"),
        state_dir: root.join("state"),
        backup_dir: root.join("backup"),
        root: root.clone(),
    };
    paths.create_dirs().expect("create dirs");
    let config = Arc::new(ConfigStore::open(paths.config_path.clone()).expect("config store"));
    let registry = Arc::new(ProjectRegistry::open(paths.projects_dir.clone()).expect("registry"));
    let state = AppState::new(paths, config, registry, shutdown);
    (dir, state)
}

#[tokio::test]
async fn ping_returns_pong() {
    let (_dir, state) = harness();
    let out = dispatch(&state, Command::Ping).await.expect("ping");
    assert_eq!(out["pong"], json!(true));
}

#[tokio::test]
async fn register_then_queue_then_complete_roundtrip() {
    let (_dir, state) = harness();
    let project_dir = TempDir::new().expect("project dir");

    let registered = dispatch(
        &state,
        Command::RegisterProject(RegisterProjectParams {
            path: project_dir.path().to_path_buf(),
            name: Some("demo".to_string()),
            priority: None,
            weight: None,
            max_concurrent: None,
        }),
    )
    .await
    .expect("register");
    let project_id = registered["project_id"].as_str().expect("project id").to_string();

    let queued = dispatch(
        &state,
        Command::QueueTask(QueueTaskParams {
            project_id: project_id.clone(),
            task_type: "build".to_string(),
            priority: 50,
            payload: json!({}),
            max_attempts: None,
            deadline_ms: None,
            preemptible: false,
        }),
    )
    .await
    .expect("queue task");
    let task_id = queued["task_id"].as_str().expect("task id").to_string();

    let next = dispatch(&state, Command::GetNextTask { project_id: Some(project_id.clone()) })
        .await
        .expect("next task");
    assert_eq!(next["id"], json!(task_id));

    let completed = dispatch(&state, Command::CompleteTask { task_id, result: json!("ok") })
        .await
        .expect("complete task");
    assert_eq!(completed["result"], json!("ok"));
}

#[tokio::test]
async fn get_next_task_without_a_project_lets_the_scheduler_pick_and_binds_a_worker() {
    let (_dir, state) = harness();
    let project_dir = TempDir::new().expect("project dir");

    let registered = dispatch(
        &state,
        Command::RegisterProject(RegisterProjectParams {
            path: project_dir.path().to_path_buf(),
            name: Some("demo".to_string()),
            priority: None,
            weight: None,
            max_concurrent: None,
        }),
    )
    .await
    .expect("register");
    let project_id = registered["project_id"].as_str().expect("project id").to_string();

    dispatch(
        &state,
        Command::QueueTask(QueueTaskParams {
            project_id: project_id.clone(),
            task_type: "build".to_string(),
            priority: 50,
            payload: json!({}),
            max_attempts: None,
            deadline_ms: None,
            preemptible: false,
        }),
    )
    .await
    .expect("queue task");

    let mut worker = Worker::new(poppo_core::WorkerId::new(), None, 5, 1.0, state.clock.epoch_ms());
    worker.status = poppo_core::WorkerStatus::Running;
    let worker_id = worker.id;
    state.balancer.register_worker(worker);

    let next = dispatch(&state, Command::GetNextTask { project_id: None }).await.expect("next task");
    assert_eq!(next["project_id"], json!(project_id));

    let statuses = state.balancer.status(Some(worker_id));
    assert_eq!(statuses[0].current_load, 1, "bind_worker should claim the selected worker's capacity");
}

#[tokio::test]
async fn unregister_refuses_project_with_running_tasks() {
    let (_dir, state) = harness();
    let project_dir = TempDir::new().expect("project dir");
    let id = state
        .registry
        .register(project_dir.path().to_path_buf(), RegisterProjectOptions::default())
        .expect("register");

    let task = poppo_core::Task::new(id, "build", 50, json!({}), state.clock.epoch_ms(), 3);
    state.queue.enqueue(task, 1.0).expect("enqueue");
    let project = state.registry.get(&id).expect("get");
    state.queue.next_for_project(id, project.weight).expect("pull");

    let err = dispatch(&state, Command::UnregisterProject { project_id: id.to_string(), force: false })
        .await
        .expect_err("should refuse unregister with a running task");
    assert_eq!(err.kind, poppo_core::ErrorKind::Cooldown);
}

#[tokio::test]
async fn shutdown_cancels_the_token_main_waits_on() {
    let shutdown = CancellationToken::new();
    let (_dir, state) = harness_with_token(shutdown.clone());

    dispatch(&state, Command::Shutdown).await.expect("shutdown");

    assert!(state.is_shutting_down());
    assert!(shutdown.is_cancelled(), "Command::Shutdown must cancel the daemon's shutdown token");
}
