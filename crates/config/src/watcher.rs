// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that polls the config file's mtime and triggers a
//! reload-and-notify cycle on the owning [`ConfigStore`] when it changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::store::ConfigStore;

/// Default poll interval, per spec section 4.1.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the watcher loop. Dropping the returned handle does not stop it;
/// call `.abort()` explicitly during daemon shutdown.
pub fn spawn_watcher(store: Arc<ConfigStore>, poll_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            store.check_external_change();
        }
    })
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
