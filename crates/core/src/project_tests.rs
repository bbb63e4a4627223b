// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_project_carries_spec_defaults() {
    let p = Project::new(ProjectId::new(), "demo", "/tmp/demo".into());
    assert!(p.enabled);
    assert_eq!(p.priority, DEFAULT_PRIORITY);
    assert_eq!(p.weight, DEFAULT_WEIGHT);
    assert_eq!(p.max_concurrent, DEFAULT_MAX_CONCURRENT);
    assert!(p.tags.is_empty());
}

#[test]
fn project_round_trips_through_json() {
    let mut p = Project::new(ProjectId::new(), "demo", "/tmp/demo".into());
    p.tags.insert("backend".to_string());
    p.metadata.insert("owner".to_string(), "team-a".to_string());

    let json = serde_json::to_string(&p).unwrap();
    let back: Project = serde_json::from_str(&json).unwrap();
    assert_eq!(p, back);
}
