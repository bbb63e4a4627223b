// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ping_round_trips_with_no_params() {
    let json = serde_json::to_string(&Command::Ping).unwrap();
    assert_eq!(json, r#"{"command":"ping"}"#);
    let back: Command = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Command::Ping);
}

#[test]
fn queue_task_defaults_priority_and_payload() {
    let json = r#"{"command":"queue-task","params":{"project_id":"prj-abc","task_type":"build"}}"#;
    let cmd: Command = serde_json::from_str(json).unwrap();
    match cmd {
        Command::QueueTask(params) => {
            assert_eq!(params.priority, 50);
            assert_eq!(params.payload, Value::Null);
            assert!(!params.preemptible);
        }
        other => panic!("expected QueueTask, got {other:?}"),
    }
}

#[test]
fn unknown_command_tag_fails_to_parse() {
    let json = r#"{"command":"reticulate-splines"}"#;
    let result: Result<Command, _> = serde_json::from_str(json);
    assert!(result.is_err());
}

#[test]
fn update_project_patch_leaves_absent_fields_none() {
    let json = r#"{"command":"update-project","params":{"project_id":"prj-abc","patch":{"priority":80}}}"#;
    let cmd: Command = serde_json::from_str(json).unwrap();
    match cmd {
        Command::UpdateProject { project_id, patch } => {
            assert_eq!(project_id, "prj-abc");
            assert_eq!(patch.priority, Some(80));
            assert_eq!(patch.weight, None);
        }
        other => panic!("expected UpdateProject, got {other:?}"),
    }
}
