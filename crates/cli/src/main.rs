// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! poppo — thin client for the poppod control plane. Frames a command,
//! writes it to the Unix socket, prints the response as JSON. Deliberately
//! carries no colored output, prompts, or localization (spec non-goal).

mod client;
mod exit_error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use poppo_wire::{Command as WireCommand, ProjectPatch, QueueTaskParams, RegisterProjectParams, Response};
use serde_json::Value;

use client::DaemonClient;
use exit_error::ExitError;

#[derive(Parser, Debug)]
#[command(name = "poppo", about = "Control client for the poppod orchestration daemon")]
struct Cli {
    /// Override the daemon's Unix socket path.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the daemon is reachable.
    Ping,
    /// Print daemon status (uptime, queue size, worker count).
    Status,
    /// Print global queue statistics.
    QueueStatus,
    /// Enqueue a task for a project.
    QueueTask {
        project_id: String,
        task_type: String,
        #[arg(long, default_value_t = 50)]
        priority: u8,
        /// JSON payload, defaults to `null`.
        #[arg(long)]
        payload: Option<String>,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        deadline_ms: Option<u64>,
        #[arg(long)]
        preemptible: bool,
    },
    /// Pull the next runnable task. Omit `project_id` to let the daemon's
    /// scheduler pick which project's turn it is for a free worker slot.
    NextTask { project_id: Option<String> },
    /// Mark a task completed.
    CompleteTask {
        task_id: String,
        /// JSON result payload, defaults to `null`.
        result: Option<String>,
    },
    /// Mark a task failed.
    FailTask { task_id: String, error: String },
    /// Cancel a queued or running task.
    CancelTask { task_id: String },
    /// Register a project's root directory.
    RegisterProject {
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        priority: Option<u8>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        max_concurrent: Option<u32>,
    },
    /// Remove a project's registration.
    UnregisterProject {
        project_id: String,
        #[arg(long)]
        force: bool,
    },
    /// Print a project's record.
    ProjectInfo { project_id: String },
    /// Patch a project's priority/weight/concurrency/tags.
    UpdateProject {
        project_id: String,
        #[arg(long)]
        priority: Option<u8>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        max_concurrent: Option<u32>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Resume scheduling tasks for a disabled project.
    EnableProject { project_id: String },
    /// Pause scheduling tasks for a project without removing it.
    DisableProject { project_id: String },
    /// List every registered project.
    ListProjects,
    /// Force the worker pool to a target size.
    ScaleWorkers {
        target: u32,
        #[arg(long)]
        forced: bool,
    },
    /// Print one worker's status, or every worker's if omitted.
    WorkerStatus { worker_id: Option<String> },
    /// Apply a partial config patch.
    ConfigUpdate {
        /// JSON patch object.
        patch: String,
    },
    /// Reload the config document from disk.
    ReloadConfig,
    /// Ask the daemon to shut down gracefully.
    Shutdown,
}

fn parse_json(raw: Option<String>) -> Result<Value, ExitError> {
    match raw {
        None => Ok(Value::Null),
        Some(s) => serde_json::from_str(&s).map_err(|e| ExitError::new(1, format!("invalid JSON: {e}"))),
    }
}

fn into_wire_command(command: Commands) -> Result<WireCommand, ExitError> {
    Ok(match command {
        Commands::Ping => WireCommand::Ping,
        Commands::Status => WireCommand::Status,
        Commands::QueueStatus => WireCommand::GetQueueStatus,
        Commands::QueueTask { project_id, task_type, priority, payload, max_attempts, deadline_ms, preemptible } => {
            WireCommand::QueueTask(QueueTaskParams {
                project_id,
                task_type,
                priority,
                payload: parse_json(payload)?,
                max_attempts,
                deadline_ms,
                preemptible,
            })
        }
        Commands::NextTask { project_id } => WireCommand::GetNextTask { project_id },
        Commands::CompleteTask { task_id, result } => WireCommand::CompleteTask { task_id, result: parse_json(result)? },
        Commands::FailTask { task_id, error } => WireCommand::FailTask { task_id, error },
        Commands::CancelTask { task_id } => WireCommand::CancelTask { task_id },
        Commands::RegisterProject { path, name, priority, weight, max_concurrent } => {
            WireCommand::RegisterProject(RegisterProjectParams { path, name, priority, weight, max_concurrent })
        }
        Commands::UnregisterProject { project_id, force } => WireCommand::UnregisterProject { project_id, force },
        Commands::ProjectInfo { project_id } => WireCommand::GetProjectInfo { project_id },
        Commands::UpdateProject { project_id, priority, weight, max_concurrent, tags } => {
            WireCommand::UpdateProject { project_id, patch: ProjectPatch { priority, weight, max_concurrent, tags } }
        }
        Commands::EnableProject { project_id } => WireCommand::EnableProject { project_id },
        Commands::DisableProject { project_id } => WireCommand::DisableProject { project_id },
        Commands::ListProjects => WireCommand::ListProjects,
        Commands::ScaleWorkers { target, forced } => WireCommand::ScaleWorkers { target, forced },
        Commands::WorkerStatus { worker_id } => WireCommand::GetWorkerStatus { worker_id },
        Commands::ConfigUpdate { patch } => {
            WireCommand::ConfigUpdate { patch: serde_json::from_str(&patch).map_err(|e| ExitError::new(1, format!("invalid JSON: {e}")))? }
        }
        Commands::ReloadConfig => WireCommand::ReloadConfig,
        Commands::Shutdown => WireCommand::Shutdown,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("poppo: {}", err.message);
            ExitCode::from(err.code.clamp(0, 255) as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let client = match cli.socket {
        Some(path) => DaemonClient::new(path),
        None => DaemonClient::discover()?,
    };

    let wire_command = into_wire_command(cli.command)?;
    let response = client.send(wire_command).await?;
    print_response(&response)
}

fn print_response(response: &Response) -> Result<(), ExitError> {
    if let Err(malformed) = response.check() {
        return Err(ExitError::new(3, malformed.to_string()));
    }
    if response.ok {
        let out = serde_json::to_string_pretty(&response.data).unwrap_or_else(|_| "null".to_string());
        println!("{out}");
        Ok(())
    } else {
        let (kind, message) = response
            .error
            .as_ref()
            .map(|e| (e.kind, e.message.clone()))
            .unwrap_or_else(|| (poppo_core::ErrorKind::Internal, "malformed response".to_string()));
        Err(ExitError::new(2, format!("{kind}: {message}")))
    }
}
