// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: spawns a real `poppod` against a scratch config
//! directory and drives it with the real `poppo` client binary.

use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand};
use std::time::{Duration, Instant};

use assert_cmd::Command as AssertCommand;
use serde_json::Value;
use tempfile::TempDir;

pub const WAIT_MAX: Duration = Duration::from_secs(5);

pub struct Daemon {
    _root: TempDir,
    config_dir: PathBuf,
    socket_path: PathBuf,
    child: Child,
}

impl Daemon {
    /// Start `poppod` against a fresh scratch directory (HTTP surface
    /// disabled, since these specs only exercise the control socket) and
    /// block until its socket file exists.
    pub fn start() -> Self {
        let root = TempDir::new().expect("create scratch config dir");
        let config_dir = root.path().to_path_buf();
        let socket_path = config_dir.join("daemon.sock");

        let bin = assert_cmd::cargo::cargo_bin("poppod");
        let child = StdCommand::new(bin)
            .arg("--config-dir")
            .arg(&config_dir)
            .arg("--no-http")
            .spawn()
            .expect("spawn poppod");

        let daemon = Self { _root: root, config_dir, socket_path, child };
        assert!(wait_for(WAIT_MAX, || daemon.socket_path.exists()), "daemon never bound its control socket");
        daemon
    }

    /// Run one `poppo` invocation, asserting success, and parse stdout as
    /// JSON (`Response::data`, printed pretty by the client).
    pub fn client(&self, args: &[&str]) -> Value {
        let output = AssertCommand::cargo_bin("poppo")
            .expect("locate poppo binary")
            .arg("--socket")
            .arg(&self.socket_path)
            .args(args)
            .output()
            .expect("run poppo client");
        assert!(output.status.success(), "poppo {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap_or(Value::Null)
    }

    /// Like `client`, but for negative-path scenarios: returns the exit code
    /// and stderr instead of asserting success.
    pub fn client_raw(&self, args: &[&str]) -> (i32, String) {
        let output = AssertCommand::cargo_bin("poppo")
            .expect("locate poppo binary")
            .arg("--socket")
            .arg(&self.socket_path)
            .args(args)
            .output()
            .expect("run poppo client");
        (output.status.code().unwrap_or(-1), String::from_utf8_lossy(&output.stderr).into_owned())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn wait_for(max: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        if predicate() {
            return true;
        }
        if start.elapsed() > max {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
