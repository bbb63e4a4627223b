// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The response envelope carried back over the control socket (spec
//! section 6): `{ok, data}` on success, `{ok, error}` on failure.

use poppo_core::PoppoError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One reply frame, echoing the request `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PoppoError>,
}

impl Response {
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), ok: true, data: Some(data), error: None }
    }

    pub fn err(id: impl Into<String>, error: PoppoError) -> Self {
        Self { id: id.into(), ok: false, data: None, error: Some(error) }
    }
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response marked ok=true but carries no data")]
    MissingData,
    #[error("response marked ok=false but carries no error")]
    MissingError,
}

impl Response {
    /// Validate the `ok` flag agrees with which of `data`/`error` is set.
    pub fn check(&self) -> Result<(), ResponseError> {
        if self.ok && self.data.is_none() {
            return Err(ResponseError::MissingData);
        }
        if !self.ok && self.error.is_none() {
            return Err(ResponseError::MissingError);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
