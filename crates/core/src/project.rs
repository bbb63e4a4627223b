// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project registry record (spec section 3.1 / component C2).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::id::ProjectId;

/// Default values mirrored from spec section 3.1.
pub const DEFAULT_PRIORITY: u8 = 50;
pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const DEFAULT_MAX_CONCURRENT: u32 = 5;

/// A registered project: the unit of fairness and ownership for tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub filesystem_path: std::path::PathBuf,
    pub enabled: bool,
    pub priority: u8,
    pub weight: f64,
    pub max_concurrent: u32,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Project {
    /// Build a project with spec-default priority/weight/max_concurrent.
    pub fn new(id: ProjectId, name: impl Into<String>, filesystem_path: std::path::PathBuf) -> Self {
        Self {
            id,
            name: name.into(),
            filesystem_path,
            enabled: true,
            priority: DEFAULT_PRIORITY,
            weight: DEFAULT_WEIGHT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            tags: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
