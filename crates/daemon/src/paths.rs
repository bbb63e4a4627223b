// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized filesystem layout for the daemon (spec section 6's persisted
//! state layout). Every path the daemon touches is resolved here, once.

use std::path::PathBuf;

use poppo_core::{ErrorKind, PoppoError, Result};

/// Resolve the root config/state directory: `POPPO_CONFIG_DIR` env override,
/// else `$XDG_STATE_HOME/poppo`, else `~/.local/state/poppo`.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("POPPO_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(state_dir) = dirs::state_dir() {
        return Ok(state_dir.join("poppo"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/poppo"))
        .ok_or_else(|| PoppoError::new(ErrorKind::Io, "could not determine a home directory"))
}

/// Every path the daemon reads, writes, or binds, all rooted under one
/// config directory so a single override env var relocates the whole thing.
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub projects_dir: PathBuf,
    pub pid_path: PathBuf,
    pub version_path: PathBuf,
    pub socket_path: PathBuf,
    pub logs_dir: PathBuf,
    pub state_dir: PathBuf,
    pub backup_dir: PathBuf,
}

impl DaemonPaths {
    pub fn resolve() -> Result<Self> {
        let root = config_dir()?;
        Ok(Self {
            config_path: root.join("config.json"),
            projects_dir: root.join("projects"),
            pid_path: root.join("daemon.pid"),
            version_path: root.join("daemon.version"),
            socket_path: root.join("daemon.sock"),
            logs_dir: root.join("logs"),
            state_dir: root.join("state"),
            backup_dir: root.join("backup"),
            root,
        })
    }

    pub fn create_dirs(&self) -> Result<()> {
        for dir in [&self.root, &self.projects_dir, &self.logs_dir, &self.state_dir, &self.backup_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        }
        Ok(())
    }
}
