// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The configuration store (spec section 4.1): load, validate, mutate, and
//! atomically persist a single [`ConfigDocument`], with debounced writes and
//! a background watcher for externally edited files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use parking_lot::RwLock;
use poppo_core::{ConfigDiagnostic, ConfigDocument, ErrorKind, PoppoError, Result};
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::json_path::{get_path, set_path};

/// Top-level config sections a client may change without restarting the
/// daemon. Everything else is accepted but flagged `requires_restart`.
const HOT_PATHS: &[&str] = &[
    "daemon.max_processes",
    "daemon.scheduling_strategy",
    "logging.level",
    "defaults.polling_interval_ms",
    "defaults.timeout_ms",
    "defaults.retry_attempts",
    "defaults.retry_delay_ms",
    "defaults.language",
    "worker_pool.strategy",
    "task_queue.priority_management.enabled",
    "task_queue.priority_management.preemption.enabled",
];

/// Returns whether a mutation to `path` can apply live, or requires a daemon
/// restart to take effect.
pub fn is_hot_path(path: &str) -> bool {
    HOT_PATHS.contains(&path)
}

/// Emitted on the store's broadcast channel when the backing file changes on
/// disk outside of this process.
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// The file changed and the new content validated cleanly; the in-memory
    /// document has already been replaced.
    ExternalChange,
    /// The file changed but failed to parse or validate; the in-memory
    /// document was left untouched.
    ExternalChangeRejected { message: String },
}

struct Inner {
    doc: Arc<ConfigDocument>,
    last_known_mtime: Option<SystemTime>,
}

/// Owns the configuration document, its on-disk persistence, and the
/// external-change watcher.
pub struct ConfigStore {
    path: PathBuf,
    backup_dir: PathBuf,
    state: Arc<RwLock<Inner>>,
    events_tx: broadcast::Sender<ConfigEvent>,
    save_requested: Arc<Notify>,
    debounce_task: JoinHandle<()>,
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        self.debounce_task.abort();
    }
}

impl ConfigStore {
    /// Open the config file at `path`, creating it with defaults if it
    /// doesn't exist. An existing-but-invalid file is a hard startup failure
    /// per the spec: "invalid file at startup -> refuse to start."
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let backup_dir = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("backup");

        let doc = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
            load_and_validate(&raw)?
        } else {
            let doc = ConfigDocument::default();
            persist(&path, &doc)?;
            doc
        };

        let last_known_mtime = std::fs::metadata(&path).ok().and_then(|m| m.modified().ok());
        let (events_tx, _) = broadcast::channel(32);
        let save_requested = Arc::new(Notify::new());
        let debounce = Duration::from_secs(1);
        let state = Arc::new(RwLock::new(Inner { doc: Arc::new(doc), last_known_mtime }));

        let debounce_task = spawn_debounce_task(path.clone(), state.clone(), save_requested.clone(), debounce);

        Ok(Self {
            path,
            backup_dir,
            state,
            events_tx,
            save_requested,
            debounce_task,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events_tx.subscribe()
    }

    /// A deep-cloned snapshot of the whole document.
    pub fn load(&self) -> Arc<ConfigDocument> {
        self.state.read().doc.clone()
    }

    /// Read a single field by dot path, e.g. `"daemon.max_processes"`.
    pub fn get(&self, path: &str) -> Result<Value> {
        let doc = self.state.read().doc.clone();
        let value = serde_json::to_value(doc.as_ref())
            .map_err(|e| PoppoError::internal(e.to_string()))?;
        get_path(&value, path)
            .cloned()
            .ok_or_else(|| PoppoError::not_found(format!("config path `{path}`")))
    }

    /// Set a single field by dot path. Returns `true` if the change requires
    /// a daemon restart to take effect.
    pub fn set(&self, path: &str, value: Value) -> Result<bool> {
        let current = self.state.read().doc.clone();
        let mut tree = serde_json::to_value(current.as_ref())
            .map_err(|e| PoppoError::internal(e.to_string()))?;
        set_path(&mut tree, path, value)
            .map_err(|message| PoppoError::new(ErrorKind::InvalidConfig, message))?;
        self.apply_tree(tree)?;
        Ok(!is_hot_path(path))
    }

    /// Deep-merge `partial` onto the current document and validate the
    /// result. Rolls back (no visible mutation) if validation fails.
    pub fn update(&self, partial: &Value) -> Result<()> {
        let current = self.state.read().doc.clone();
        let mut tree = serde_json::to_value(current.as_ref())
            .map_err(|e| PoppoError::internal(e.to_string()))?;
        deep_merge(&mut tree, partial);
        self.apply_tree(tree)
    }

    /// Replace the document wholesale, validating first.
    pub fn import(&self, document: Value) -> Result<()> {
        self.apply_tree(document)
    }

    /// The whole document as a JSON value.
    pub fn export(&self) -> Result<Value> {
        let doc = self.state.read().doc.clone();
        serde_json::to_value(doc.as_ref()).map_err(|e| PoppoError::internal(e.to_string()))
    }

    /// Back up the current file, then replace the in-memory document and the
    /// on-disk file with defaults.
    pub fn reset(&self) -> Result<()> {
        self.backup_current_file()?;
        let doc = ConfigDocument::default();
        persist(&self.path, &doc).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        self.state.write().doc = Arc::new(doc);
        info!(path = %self.path.display(), "config reset to defaults");
        Ok(())
    }

    /// Re-read the file from disk. On success, replaces the in-memory
    /// document. On failure, the in-memory copy is untouched and the error is
    /// returned to the caller (the watcher instead emits `ExternalChangeRejected`).
    pub fn reload(&self) -> Result<()> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        let doc = load_and_validate(&raw)?;
        let mtime = std::fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        let mut state = self.state.write();
        state.doc = Arc::new(doc);
        state.last_known_mtime = mtime;
        Ok(())
    }

    /// Poll the file's mtime once; if it advanced since the last observation,
    /// reload and emit the appropriate event. Called by the watcher loop on
    /// a 1s cadence.
    pub fn check_external_change(&self) {
        let mtime = match std::fs::metadata(&self.path).ok().and_then(|m| m.modified().ok()) {
            Some(mtime) => mtime,
            None => return,
        };
        let changed = {
            let state = self.state.read();
            state.last_known_mtime != Some(mtime)
        };
        if !changed {
            return;
        }
        match self.reload() {
            Ok(()) => {
                debug!(path = %self.path.display(), "external config change reloaded");
                let _ = self.events_tx.send(ConfigEvent::ExternalChange);
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "external config change rejected, keeping in-memory copy");
                let _ = self.events_tx.send(ConfigEvent::ExternalChangeRejected { message: err.to_string() });
            }
        }
    }

    fn apply_tree(&self, tree: Value) -> Result<()> {
        let doc = load_and_validate_value(tree)?;
        self.state.write().doc = Arc::new(doc);
        self.request_save();
        Ok(())
    }

    fn request_save(&self) {
        self.save_requested.notify_one();
    }

    fn backup_current_file(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let raw = std::fs::read(&self.path).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let name = format!(
            "{}.{}.bak",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("config.json"),
            stamp
        );
        write_atomic(&self.backup_dir.join(name), &raw, Some(0o600))
            .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))
    }
}

fn load_and_validate(raw: &str) -> Result<ConfigDocument> {
    let doc: ConfigDocument = serde_json::from_str(raw).map_err(|e| {
        PoppoError::new(ErrorKind::InvalidConfig, format!("malformed config document: {e}"))
    })?;
    validate_or_err(doc)
}

fn load_and_validate_value(value: Value) -> Result<ConfigDocument> {
    let doc: ConfigDocument = serde_json::from_value(value).map_err(|e| {
        PoppoError::new(ErrorKind::InvalidConfig, format!("malformed config document: {e}"))
    })?;
    validate_or_err(doc)
}

fn validate_or_err(doc: ConfigDocument) -> Result<ConfigDocument> {
    let diagnostics = doc.validate();
    if diagnostics.is_empty() {
        Ok(doc)
    } else {
        Err(PoppoError::new(ErrorKind::InvalidConfig, "config document failed validation")
            .with_details(diagnostics.into_iter().map(|d: ConfigDiagnostic| (d.path, d.message)).collect()))
    }
}

fn persist(path: &Path, doc: &ConfigDocument) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(doc).map_err(|e| PoppoError::internal(e.to_string()))?;
    write_atomic(path, &bytes, None).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))
}

/// Recursively overlay `patch` onto `base`, replacing scalars/arrays and
/// merging objects key-by-key.
fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                deep_merge(base_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

/// Coalesces bursts of `request_save` calls into a single write: each
/// notification restarts a `debounce`-long wait, and only the document
/// present once the wait elapses without a fresh notification gets written.
fn spawn_debounce_task(
    path: PathBuf,
    state: Arc<RwLock<Inner>>,
    notify: Arc<Notify>,
    debounce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            notify.notified().await;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => break,
                    _ = notify.notified() => continue,
                }
            }
            let doc = state.read().doc.clone();
            if let Err(err) = persist(&path, &doc) {
                warn!(path = %path.display(), error = %err, "debounced config save failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
