// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance guarantee via an exclusive lock on `daemon.pid`, in the
//! same spirit as the daemon's own `daemon.pid` text-file layout: `pid\n[port]\n`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use poppo_core::{ErrorKind, PoppoError, Result};

/// Holds the advisory lock on `daemon.pid` for the life of the process.
/// Dropping it releases the lock; the lock file itself is removed by the
/// graceful shutdown sequence, not by `Drop`, since a crash should leave the
/// (now-unlocked) file behind for the next startup to overwrite.
pub struct PidLock {
    file: File,
}

impl PidLock {
    /// Acquire the lock *before* touching anything else, so a second daemon
    /// invocation fails fast instead of racing the first over the socket or
    /// config file.
    pub fn acquire(pid_path: &Path, port: Option<u16>) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(pid_path)
            .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;

        file.try_lock_exclusive().map_err(|_| {
            PoppoError::new(ErrorKind::Internal, "another poppo daemon instance is already running")
        })?;

        let mut file = file;
        file.set_len(0).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        if let Some(port) = port {
            writeln!(file, "{port}").map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        }

        Ok(Self { file })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
