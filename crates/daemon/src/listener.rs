// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket control plane (spec section 4.9 / component C9): accepts one
//! connection per request, reads a length-prefixed `Request` frame, dispatches
//! it, and writes back a `Response` frame. Grounded on the teacher's
//! `oj-daemon/src/listener/mod.rs` accept-loop-per-connection shape, minus
//! the TCP/auth/attach paths this daemon has no counterpart for.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use poppo_core::{ErrorKind, PoppoError};
use poppo_wire::{read_message, write_message, Request, Response};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::dispatch::dispatch;
use crate::state::AppState;

/// Per-command deadline (spec section 5): a handler that runs longer than
/// this is abandoned and the client is told `Timeout`.
const COMMAND_DEADLINE: Duration = Duration::from_secs(30);

pub struct Listener {
    socket: UnixListener,
    state: Arc<AppState>,
}

impl Listener {
    pub fn bind(socket_path: &Path, state: Arc<AppState>) -> poppo_core::Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        }
        let socket = UnixListener::bind(socket_path).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        Ok(Self { socket, state })
    }

    /// Accept connections until `shutdown` fires, then stop taking new ones.
    pub async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        loop {
            tokio::select! {
                accepted = self.socket.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, &state).await {
                                    warn!(%err, "connection handling failed");
                                }
                            });
                        }
                        Err(err) => error!(%err, "accept failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("listener shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, state: &Arc<AppState>) -> poppo_core::Result<()> {
    let (mut reader, mut writer) = stream.split();
    let request: Request = read_message(&mut reader)
        .await
        .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;

    debug!(id = %request.id, command = ?request.command, "received request");

    let response = if state.is_shutting_down() && !matches!(request.command, poppo_wire::Command::Status | poppo_wire::Command::Ping) {
        Response::err(request.id, PoppoError::new(ErrorKind::Cancelled, "daemon is shutting down"))
    } else {
        match tokio::time::timeout(COMMAND_DEADLINE, dispatch(state, request.command)).await {
            Ok(Ok(data)) => Response::ok(request.id, data),
            Ok(Err(err)) => Response::err(request.id, err),
            Err(_) => Response::err(request.id, PoppoError::new(ErrorKind::Timeout, "command exceeded its deadline")),
        }
    };

    write_message(&mut writer, &response)
        .await
        .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
    Ok(())
}
