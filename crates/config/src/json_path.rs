// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dot-separated path access into a `serde_json::Value` tree, used by
//! `ConfigStore::get`/`set` to address individual config fields without
//! requiring callers to round-trip the whole document.

use serde_json::Value;

/// Read the value at `path` (e.g. `"daemon.max_processes"`). Returns `None`
/// if any segment is missing or the tree isn't an object at that point.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, segment| node.get(segment))
}

/// Set the value at `path`, failing if any but the last segment doesn't
/// already resolve to an object. The schema is a closed set of fields, so
/// this never invents new intermediate objects.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let mut segments = path.split('.').peekable();
    let mut node = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            let obj = node.as_object_mut().ok_or_else(|| format!("{path} does not address an object field"))?;
            obj.insert(segment.to_string(), value);
            return Ok(());
        }
        node = node
            .get_mut(segment)
            .ok_or_else(|| format!("unknown config path segment `{segment}` in `{path}`"))?;
    }
    Err("empty config path".to_string())
}

#[cfg(test)]
#[path = "json_path_tests.rs"]
mod tests;
