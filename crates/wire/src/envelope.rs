// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The request envelope carried over the control socket: a correlation id
//! plus the command itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::Command;

/// One request frame. `id` is chosen by the client and echoed back on the
/// matching `Response` so pipelined requests on the same connection can be
/// matched to their replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    pub fn new(id: impl Into<String>, command: Command) -> Self {
        Self { id: id.into(), command }
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("request id must not be empty")]
    EmptyId,
    #[error("malformed request envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
