// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn reads_nested_field() {
    let doc = json!({"daemon": {"max_processes": 4}});
    assert_eq!(get_path(&doc, "daemon.max_processes"), Some(&json!(4)));
}

#[test]
fn missing_segment_returns_none() {
    let doc = json!({"daemon": {"max_processes": 4}});
    assert_eq!(get_path(&doc, "daemon.nope"), None);
    assert_eq!(get_path(&doc, "nope.max_processes"), None);
}

#[test]
fn sets_existing_nested_field() {
    let mut doc = json!({"daemon": {"max_processes": 4}});
    set_path(&mut doc, "daemon.max_processes", json!(8)).unwrap();
    assert_eq!(get_path(&doc, "daemon.max_processes"), Some(&json!(8)));
}

#[test]
fn rejects_unknown_intermediate_segment() {
    let mut doc = json!({"daemon": {"max_processes": 4}});
    let result = set_path(&mut doc, "nope.max_processes", json!(8));
    assert!(result.is_err());
}
