// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-scaler audit record (spec section 3.4 / component C8).

use serde::{Deserialize, Serialize};

/// Default size of the scaling-event ring buffer.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleAction {
    ScaleUp,
    ScaleDown,
    None,
}

/// One evaluation of the auto-scaler's control loop, retained for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingEvent {
    pub timestamp_ms: u64,
    pub action: ScaleAction,
    pub before_count: u32,
    pub after_count: u32,
    pub increment: i32,
    pub reason: String,
    pub metrics_snapshot: serde_json::Value,
    pub forced: bool,
}

#[cfg(test)]
#[path = "scaling_tests.rs"]
mod tests;
