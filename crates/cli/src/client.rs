// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client over the daemon's Unix-socket control plane (spec section 6):
//! one connection per request, length-prefixed JSON frame in, frame out.

use std::path::{Path, PathBuf};

use poppo_wire::{read_message, write_message, Command, Request, Response};
use tokio::net::UnixStream;

use crate::exit_error::ExitError;

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    /// Resolve the socket path the same way `poppod` does: `POPPO_CONFIG_DIR`
    /// override, else the platform state directory, then `daemon.sock`.
    pub fn discover() -> Result<Self, ExitError> {
        let root = if let Ok(dir) = std::env::var("POPPO_CONFIG_DIR") {
            PathBuf::from(dir)
        } else if let Some(state_dir) = dirs::state_dir() {
            state_dir.join("poppo")
        } else {
            dirs::home_dir()
                .map(|home| home.join(".local/state/poppo"))
                .ok_or_else(|| ExitError::new(1, "could not determine a home directory"))?
        };
        Ok(Self::new(root.join("daemon.sock")))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn send(&self, command: Command) -> Result<Response, ExitError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            ExitError::new(3, format!("could not connect to {}: {e}", self.socket_path.display()))
        })?;

        let request = Request::new(nanoid::nanoid!(10), command);
        write_message(&mut stream, &request).await.map_err(|e| ExitError::new(3, e.to_string()))?;

        let response: Response = read_message(&mut stream).await.map_err(|e| ExitError::new(3, e.to_string()))?;
        Ok(response)
    }
}
