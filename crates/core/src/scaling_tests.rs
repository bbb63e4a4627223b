// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn scaling_event_round_trips_through_json() {
    let ev = ScalingEvent {
        timestamp_ms: 1_000,
        action: ScaleAction::ScaleUp,
        before_count: 2,
        after_count: 4,
        increment: 2,
        reason: "load factor exceeded threshold".to_string(),
        metrics_snapshot: serde_json::json!({"cpu": 0.9}),
        forced: false,
    };
    let json = serde_json::to_string(&ev).unwrap();
    let back: ScalingEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(ev, back);
}
