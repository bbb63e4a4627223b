// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{ProjectId, TaskId, WorkerId};

#[test]
fn generated_ids_carry_their_prefix() {
    assert!(ProjectId::new().as_str().starts_with("prj-"));
    assert!(TaskId::new().as_str().starts_with("tsk-"));
    assert!(WorkerId::new().as_str().starts_with("wkr-"));
}

#[test]
fn generated_ids_are_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = TaskId::from_string("tsk-abc123");
    assert_eq!(id.as_str(), "tsk-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn short_truncates_to_n_chars() {
    assert_eq!(short("abcdefgh", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}

#[test]
fn ids_serialize_as_plain_strings() {
    let id = TaskId::from_string("tsk-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tsk-xyz\"");
}
