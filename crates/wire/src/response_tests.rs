// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use poppo_core::ErrorKind;
use serde_json::json;

#[test]
fn ok_response_serializes_without_error_field() {
    let resp = Response::ok("req-1", json!({"queued": true}));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["ok"], true);
    assert!(json.get("error").is_none());
    assert!(resp.check().is_ok());
}

#[test]
fn err_response_serializes_without_data_field() {
    let resp = Response::err("req-2", PoppoError::not_found("task tsk-xyz"));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["ok"], false);
    assert!(json.get("data").is_none());
    assert_eq!(json["error"]["kind"], "not-found");
    assert!(resp.check().is_ok());
}

#[test]
fn ok_true_with_no_data_fails_check() {
    let resp = Response { id: "req-3".to_string(), ok: true, data: None, error: None };
    assert!(matches!(resp.check(), Err(ResponseError::MissingData)));
}

#[test]
fn ok_false_with_no_error_fails_check() {
    let resp = Response { id: "req-4".to_string(), ok: false, data: None, error: None };
    assert!(matches!(resp.check(), Err(ResponseError::MissingError)));
}

#[test]
fn error_kind_round_trips_through_json() {
    let resp = Response::err("req-5", PoppoError::new(ErrorKind::QueueFull, "queue full"));
    let json = serde_json::to_string(&resp).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back.error.unwrap().kind, ErrorKind::QueueFull);
}
