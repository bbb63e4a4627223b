// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tracing` setup: a rolling daily file under `logs/` plus an `EnvFilter`
//! defaulting to the configured level. Grounded on the teacher's
//! `setup_logging` in `oj-daemon/src/main.rs`.

use std::path::Path;

use poppo_core::{ErrorKind, PoppoError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Must be held for the process lifetime — dropping it stops the background
/// flush thread and silently truncates buffered log lines.
pub fn init(logs_dir: &Path, level: &str) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "poppod.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
