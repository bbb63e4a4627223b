// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! poppod — the orchestration daemon binary. Startup order follows the
//! teacher's `oj-daemon/src/lifecycle/startup.rs`: acquire the single-instance
//! lock before touching anything else, validate config, bind the socket last.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use poppo_config::{ConfigStore, ProjectRegistry};
use poppo_core::ErrorKind;
use poppo_daemon::{listener::Listener, logging, paths::DaemonPaths, state::AppState, PidLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "poppod", about = "Multi-project task orchestration daemon")]
struct Args {
    /// Override the resolved config/state directory (else `POPPO_CONFIG_DIR`
    /// or the platform state directory).
    #[arg(long)]
    config_dir: Option<std::path::PathBuf>,

    /// Skip the HTTP control surface; only the Unix socket is served.
    #[arg(long)]
    no_http: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(dir) = &args.config_dir {
        std::env::set_var("POPPO_CONFIG_DIR", dir);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.kind == ErrorKind::Internal && err.message.contains("already running") => {
            eprintln!("poppod: {}", err.message);
            ExitCode::from(1)
        }
        Err(err) => {
            error!(%err, "fatal startup error");
            eprintln!("poppod: {}", err.message);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> poppo_core::Result<()> {
    let paths = DaemonPaths::resolve()?;
    paths.create_dirs()?;

    // Lock first, so a second invocation fails fast instead of racing the
    // first over the socket or config file.
    let config_probe = ConfigStore::open(paths.config_path.clone())?;
    let doc = config_probe.load();
    let lock = PidLock::acquire(&paths.pid_path, Some(doc.daemon.port))?;

    let _log_guard = match logging::init(&paths.logs_dir, &doc.logging.level) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("poppod: failed to initialize logging: {}", err.message);
            None
        }
    };

    info!("starting poppod");

    let shutdown = CancellationToken::new();

    let config = Arc::new(config_probe);
    let registry = Arc::new(ProjectRegistry::open(paths.projects_dir.clone())?);
    let state = Arc::new(AppState::new(paths.clone(), Arc::clone(&config), registry, shutdown.clone()));

    let listener = Listener::bind(&paths.socket_path, Arc::clone(&state))?;
    let listener_task = tokio::spawn(listener.run(shutdown.clone()));

    let http_task = if !args.no_http {
        let host = doc.daemon.host.clone();
        let port = doc.daemon.port;
        let http_state = Arc::clone(&state);
        let http_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = poppo_daemon::http::serve(&host, port, http_state, http_shutdown).await {
                error!(%err, "http control surface stopped");
            }
        }))
    } else {
        None
    };

    poppo_daemon::timers::spawn_all(Arc::clone(&state), shutdown.clone());

    // A `Command::Shutdown` over the control socket cancels `shutdown`
    // itself (`AppState::begin_shutdown`), so this also resolves the moment
    // a remote client asks us to stop, not just on a real OS signal.
    tokio::select! {
        _ = wait_for_signal() => info!("shutdown signal received"),
        _ = shutdown.cancelled() => info!("shutdown requested over control socket"),
    }
    state.begin_shutdown();
    graceful_shutdown(&state, shutdown.clone()).await;

    listener_task.abort();
    if let Some(task) = http_task {
        task.abort();
    }

    drop(lock);
    let _ = std::fs::remove_file(&state.paths.socket_path);
    let _ = std::fs::remove_file(&state.paths.pid_path);
    let _ = std::fs::remove_file(&state.paths.version_path);

    info!("poppod stopped cleanly");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Refuse new enqueues (already done via `AppState::begin_shutdown`), then
/// give every worker `graceful_shutdown_timeout` to stop before force-killing.
async fn graceful_shutdown(state: &Arc<AppState>, shutdown: CancellationToken) {
    shutdown.cancel();
    state.lifecycle.terminate_all(false).await;
}
