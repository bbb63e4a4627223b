// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The project registry (spec section 4.2): tracks known projects, persists
//! one JSON file per project plus a manifest, under the same atomicity rules
//! as the config store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use poppo_core::{short, ErrorKind, PoppoError, Project, ProjectId, Result};
use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic;

/// Optional overrides for `register`; absent fields take `Project`'s
/// documented defaults.
#[derive(Debug, Clone, Default)]
pub struct RegisterProjectOptions {
    pub id: Option<ProjectId>,
    pub name: Option<String>,
    pub priority: Option<u8>,
    pub weight: Option<f64>,
    pub max_concurrent: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    project_ids: Vec<ProjectId>,
}

/// Persists projects at `<dir>/projects/<id>.json` plus `<dir>/projects/manifest.json`.
pub struct ProjectRegistry {
    dir: PathBuf,
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl ProjectRegistry {
    /// Load every project file listed in the manifest. A manifest entry
    /// whose file is missing or unreadable is skipped with a warning rather
    /// than failing the whole registry open.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;

        let manifest_path = dir.join("manifest.json");
        let manifest: Manifest = if manifest_path.exists() {
            let raw = std::fs::read_to_string(&manifest_path)
                .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))?;
            serde_json::from_str(&raw)
                .map_err(|e| PoppoError::new(ErrorKind::InvalidConfig, e.to_string()))?
        } else {
            Manifest::default()
        };

        let mut projects = HashMap::new();
        for id in &manifest.project_ids {
            let path = project_file(&dir, id);
            if let Ok(raw) = std::fs::read_to_string(&path) {
                if let Ok(project) = serde_json::from_str::<Project>(&raw) {
                    projects.insert(*id, project);
                } else {
                    tracing::warn!(id = %id, "dropping unreadable project record");
                }
            } else {
                tracing::warn!(id = %id, "manifest references missing project file");
            }
        }

        Ok(Self { dir, projects: RwLock::new(projects) })
    }

    /// Register a project rooted at `path`. The id is derived deterministically
    /// from the path's basename plus a short hash when not supplied, so
    /// re-registering the same path is detectable as a collision rather than
    /// silently creating a duplicate.
    pub fn register(&self, path: PathBuf, opts: RegisterProjectOptions) -> Result<ProjectId> {
        let id = opts.id.unwrap_or_else(|| derive_project_id(&path));

        {
            let projects = self.projects.read();
            if projects.contains_key(&id) {
                return Err(PoppoError::already_exists(format!("project `{id}`")));
            }
        }

        let name = opts
            .name
            .unwrap_or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        let mut project = Project::new(id, name, path);
        if let Some(priority) = opts.priority {
            project.priority = priority.min(100);
        }
        if let Some(weight) = opts.weight {
            project.weight = weight;
        }
        if let Some(max_concurrent) = opts.max_concurrent {
            project.max_concurrent = max_concurrent;
        }

        self.persist_project(&project)?;
        self.projects.write().insert(id, project);
        self.persist_manifest()?;
        Ok(id)
    }

    /// Remove a project. `has_running_tasks` is supplied by the caller (the
    /// daemon composition root, which owns the task queue) since the registry
    /// itself has no visibility into running tasks.
    pub fn unregister(&self, id: &ProjectId, force: bool, has_running_tasks: bool) -> Result<()> {
        if has_running_tasks && !force {
            return Err(PoppoError::new(
                ErrorKind::Cooldown,
                format!("project `{id}` has running tasks; retry with force or wait for them to finish"),
            ));
        }
        {
            let mut projects = self.projects.write();
            if projects.remove(id).is_none() {
                return Err(PoppoError::not_found(format!("project `{id}`")));
            }
        }
        let _ = std::fs::remove_file(project_file(&self.dir, id));
        self.persist_manifest()
    }

    pub fn enable(&self, id: &ProjectId) -> Result<()> {
        self.mutate(id, |p| p.enabled = true)
    }

    pub fn disable(&self, id: &ProjectId) -> Result<()> {
        self.mutate(id, |p| p.enabled = false)
    }

    /// Apply a partial update to an existing project.
    pub fn update(&self, id: &ProjectId, patch: ProjectPatch) -> Result<Project> {
        self.mutate(id, |p| {
            if let Some(priority) = patch.priority {
                p.priority = priority.min(100);
            }
            if let Some(weight) = patch.weight {
                p.weight = weight;
            }
            if let Some(max_concurrent) = patch.max_concurrent {
                p.max_concurrent = max_concurrent;
            }
            if let Some(tags) = patch.tags.clone() {
                p.tags = tags.into_iter().collect();
            }
        })?;
        self.get(id)
    }

    pub fn get(&self, id: &ProjectId) -> Result<Project> {
        self.projects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PoppoError::not_found(format!("project `{id}`")))
    }

    pub fn get_by_path(&self, path: &Path) -> Result<Project> {
        self.projects
            .read()
            .values()
            .find(|p| p.filesystem_path == path)
            .cloned()
            .ok_or_else(|| PoppoError::not_found(format!("project at `{}`", path.display())))
    }

    pub fn list(&self) -> Vec<Project> {
        let mut projects: Vec<_> = self.projects.read().values().cloned().collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        projects
    }

    fn mutate(&self, id: &ProjectId, f: impl FnOnce(&mut Project)) -> Result<()> {
        let updated = {
            let mut projects = self.projects.write();
            let project = projects.get_mut(id).ok_or_else(|| PoppoError::not_found(format!("project `{id}`")))?;
            f(project);
            project.clone()
        };
        self.persist_project(&updated)
    }

    fn persist_project(&self, project: &Project) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(project).map_err(|e| PoppoError::internal(e.to_string()))?;
        write_atomic(&project_file(&self.dir, &project.id), &bytes, None)
            .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))
    }

    fn persist_manifest(&self) -> Result<()> {
        let mut ids: Vec<_> = self.projects.read().keys().copied().collect();
        ids.sort();
        let manifest = Manifest { project_ids: ids };
        let bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| PoppoError::internal(e.to_string()))?;
        write_atomic(&self.dir.join("manifest.json"), &bytes, None)
            .map_err(|e| PoppoError::new(ErrorKind::Io, e.to_string()))
    }
}

/// Subset of project fields `update-project` may change.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub priority: Option<u8>,
    pub weight: Option<f64>,
    pub max_concurrent: Option<u32>,
    pub tags: Option<Vec<String>>,
}

fn project_file(dir: &Path, id: &ProjectId) -> PathBuf {
    dir.join(format!("{id}.json"))
}

/// `prj-<slugified-basename>-<8 hex hash chars>`, truncated to fit the
/// fixed-size id buffer. Deterministic in the path, so re-registering the
/// same directory always derives the same id and collides rather than
/// creating a duplicate entry.
fn derive_project_id(path: &Path) -> ProjectId {
    let basename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "project".to_string());
    let slug = slugify(&basename);
    let hash = short_hash(&path.to_string_lossy());
    let suffix = format!("{slug}-{hash}");
    ProjectId::from_string(format!("prj-{}", short(&suffix, 19)))
}

fn slugify(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
}

fn short_hash(input: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
