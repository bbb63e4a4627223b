// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translates control-plane commands (spec section 4.9) into calls on
//! C2-C8, mirroring the composition diagram's `client -> C9 -> {C2, C4}`
//! edge. Each arm returns a `serde_json::Value` that becomes `Response::data`.

use poppo_core::{PoppoError, ProjectId, Result, Task, TaskId, TaskStatus, WorkerId};
use poppo_engine::{ProjectLoad, WorkerSpawnConfig};
use poppo_wire::Command;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn dispatch(state: &AppState, command: Command) -> Result<Value> {
    match command {
        Command::Ping => Ok(json!({ "pong": true })),

        Command::Status => Ok(json!({
            "uptime_ms": state.uptime_ms(),
            "shutting_down": state.is_shutting_down(),
            "queue": state.queue.stats(),
            "worker_count": state.lifecycle.len(),
            "scheduling_strategy": state.scheduler.current_kind(),
        })),

        Command::GetQueueStatus => Ok(serde_json::to_value(state.queue.stats()).map_err(internal)?),

        Command::QueueTask(params) => {
            let project_id = ProjectId::from_string(&params.project_id);
            let project = state.registry.get(&project_id)?;
            let now = state.clock.epoch_ms();
            let mut task = Task::new(
                project_id,
                params.task_type,
                params.priority,
                params.payload,
                now,
                params.max_attempts.unwrap_or(state.config.load().defaults.retry_attempts),
            );
            task.deadline_ms = params.deadline_ms;
            task.preemptible = params.preemptible;
            let task_id = state.queue.enqueue(task, project.weight)?;
            Ok(json!({ "task_id": task_id }))
        }

        Command::GetNextTask { project_id } => {
            let project_id = match project_id {
                Some(id) => ProjectId::from_string(&id),
                // No project pinned: this is a free worker slot, so C5 picks
                // which project's turn it is before C4 is asked to pop one.
                None => match pick_project(state) {
                    Some(id) => id,
                    None => return Ok(Value::Null),
                },
            };
            let project = state.registry.get(&project_id)?;
            match state.queue.next_for_project(project_id, project.weight) {
                Some(task) => {
                    bind_worker(state, &task);
                    Ok(serde_json::to_value(task).map_err(internal)?)
                }
                None => Ok(Value::Null),
            }
        }

        Command::CompleteTask { task_id, result } => {
            let task_id = TaskId::from_string(&task_id);
            let task = state.queue.complete(task_id)?;
            release_worker(state, task_id, true);
            Ok(json!({ "task": task, "result": result }))
        }

        Command::FailTask { task_id, error } => {
            let task_id = TaskId::from_string(&task_id);
            let task = state.queue.fail(task_id, error)?;
            release_worker(state, task_id, false);
            Ok(serde_json::to_value(task).map_err(internal)?)
        }

        Command::CancelTask { task_id } => {
            let task = state.queue.cancel(TaskId::from_string(&task_id))?;
            Ok(serde_json::to_value(task).map_err(internal)?)
        }

        Command::RegisterProject(params) => {
            let id = state.registry.register(
                params.path,
                poppo_config::RegisterProjectOptions {
                    id: None,
                    name: params.name,
                    priority: params.priority,
                    weight: params.weight,
                    max_concurrent: params.max_concurrent,
                },
            )?;
            Ok(json!({ "project_id": id }))
        }

        Command::UnregisterProject { project_id, force } => {
            let project_id = ProjectId::from_string(&project_id);
            let has_running = state.project_has_running_tasks(project_id);
            state.registry.unregister(&project_id, force, has_running)?;
            Ok(json!({ "ok": true }))
        }

        Command::GetProjectInfo { project_id } => {
            Ok(serde_json::to_value(state.registry.get(&ProjectId::from_string(&project_id))?).map_err(internal)?)
        }

        Command::UpdateProject { project_id, patch } => {
            let project_id = ProjectId::from_string(&project_id);
            let patch = poppo_config::ProjectPatch { priority: patch.priority, weight: patch.weight, max_concurrent: patch.max_concurrent, tags: patch.tags };
            Ok(serde_json::to_value(state.registry.update(&project_id, patch)?).map_err(internal)?)
        }

        Command::EnableProject { project_id } => {
            state.registry.enable(&ProjectId::from_string(&project_id))?;
            Ok(json!({ "ok": true }))
        }

        Command::DisableProject { project_id } => {
            state.registry.disable(&ProjectId::from_string(&project_id))?;
            Ok(json!({ "ok": true }))
        }

        Command::ListProjects => Ok(serde_json::to_value(state.registry.list()).map_err(internal)?),

        Command::ScaleWorkers { target, forced: _ } => {
            let event = state.autoscaler.force_scale(target);
            commit_scaling(state, event.before_count, event.after_count).await;
            Ok(serde_json::to_value(event).map_err(internal)?)
        }

        Command::GetWorkerStatus { worker_id } => {
            let id = worker_id.map(|id| WorkerId::from_string(&id));
            Ok(serde_json::to_value(state.lifecycle.status(id)).map_err(internal)?)
        }

        Command::ConfigUpdate { patch } => {
            state.config.update(&patch)?;
            Ok(serde_json::to_value(state.config.export()?).map_err(internal)?)
        }

        Command::ReloadConfig => {
            state.config.reload()?;
            Ok(serde_json::to_value(state.config.export()?).map_err(internal)?)
        }

        Command::Shutdown => {
            state.begin_shutdown();
            Ok(json!({ "accepted": true }))
        }
    }
}

fn internal(e: serde_json::Error) -> PoppoError {
    PoppoError::internal(e.to_string())
}

/// Release the worker bound to `task_id` (if any) back to the pool, feeding
/// the outcome into the balancer's health-tracking EWMA.
fn release_worker(state: &AppState, task_id: TaskId, success: bool) {
    if let Some(worker_id) = state.take_assignment(task_id) {
        let _ = state.balancer.decrement_load(worker_id);
        let _ = state.balancer.record_result(worker_id, success, 0);
    }
}

/// C5: snapshot every enabled project's load and ask the active scheduling
/// strategy which one gets the next free slot.
fn pick_project(state: &AppState) -> Option<ProjectId> {
    let now = state.clock.epoch_ms();
    let window_ms = state.config.load().daemon.fair_share_window_ms;

    let candidates: Vec<ProjectLoad> = state
        .registry
        .list()
        .into_iter()
        .map(|project| {
            let tasks = state.queue.tasks_by_project(project.id);
            let queued = tasks.iter().filter(|t| t.status == TaskStatus::Queued).count() as u64;
            let running = tasks.iter().filter(|t| t.status == TaskStatus::Running).count() as u64;
            let earliest_deadline_ms =
                tasks.iter().filter(|t| t.status == TaskStatus::Queued).filter_map(|t| t.deadline_ms).min();
            let completed_in_window = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .filter(|t| t.finished_at_ms.is_some_and(|at| now.saturating_sub(at) <= window_ms))
                .count() as u64;
            ProjectLoad { project, queued, running, earliest_deadline_ms, completed_in_window }
        })
        .collect();

    state.scheduler.select(&candidates, now)
}

/// C6: once a task has been popped for dispatch, claim a healthy worker for
/// it so `release_worker` has something to give back on completion/failure.
/// Best-effort — a free slot with no healthy worker yet (e.g. the pool is
/// still scaling up) still lets the task run; it just isn't load-tracked.
fn bind_worker(state: &AppState, task: &Task) {
    if let Ok(worker_id) = state.balancer.select_worker(None) {
        let _ = state.balancer.increment_load(worker_id);
        state.bind_assignment(task.id, worker_id);
    }
}

/// Enact a scaling decision against C7/C6, per spec section 4.8's "Commit":
/// spawn `after - before` workers, or terminate the oldest-started,
/// least-loaded healthy ones.
pub async fn commit_scaling(state: &AppState, before: u32, after: u32) {
    if after > before {
        for _ in 0..(after - before) {
            if let Ok(worker) = state.lifecycle.spawn_worker(default_spawn_config()).await {
                let _ = state.balancer.register_worker(worker);
            }
        }
    } else if after < before {
        let mut candidates: Vec<_> = state.balancer.status(None).into_iter().filter(|w| w.status.is_selectable()).collect();
        candidates.sort_by(|a, b| a.start_time_ms.cmp(&b.start_time_ms).then(a.current_load.cmp(&b.current_load)));
        for worker in candidates.into_iter().take((before - after) as usize) {
            let _ = state.lifecycle.terminate_worker(worker.id, false).await;
            let _ = state.balancer.unregister_worker(worker.id);
        }
    }
}

fn default_spawn_config() -> WorkerSpawnConfig {
    WorkerSpawnConfig { command: "poppo-worker".to_string(), args: Vec::new(), env: Vec::new(), project_id: None, max_concurrent: 5, weight: 1.0 }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
