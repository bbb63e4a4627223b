// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn writes_contents_and_replaces_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    write_atomic(&path, b"{\"a\":1}", None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");

    write_atomic(&path, b"{\"a\":2}", None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"{\"a\":2}");
}

#[test]
fn creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("config.json");

    write_atomic(&path, b"hello", None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"hello");
}

#[test]
fn leaves_no_temp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    write_atomic(&path, b"data", None).unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("config.json")]);
}

#[cfg(unix)]
#[test]
fn applies_requested_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("backup.json");

    write_atomic(&path, b"secret", Some(0o600)).unwrap();

    let perms = fs::metadata(&path).unwrap().permissions();
    assert_eq!(perms.mode() & 0o777, 0o600);
}
