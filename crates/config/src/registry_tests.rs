// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn register_persists_project_file_and_manifest() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();

    let id = registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();

    assert!(dir.path().join(format!("{id}.json")).exists());
    assert!(dir.path().join("manifest.json").exists());
    assert_eq!(registry.get(&id).unwrap().name, "widgets");
}

#[test]
fn registering_the_same_path_twice_collides() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();

    registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();
    let result = registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default());

    assert!(matches!(result, Err(e) if e.kind == ErrorKind::AlreadyExists));
}

#[test]
fn register_honors_explicit_overrides() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();

    let opts = RegisterProjectOptions {
        name: Some("custom-name".to_string()),
        priority: Some(90),
        weight: Some(2.5),
        max_concurrent: Some(10),
        ..Default::default()
    };
    let id = registry.register(PathBuf::from("/srv/widgets"), opts).unwrap();
    let project = registry.get(&id).unwrap();

    assert_eq!(project.name, "custom-name");
    assert_eq!(project.priority, 90);
    assert_eq!(project.weight, 2.5);
    assert_eq!(project.max_concurrent, 10);
}

#[test]
fn unregister_with_running_tasks_and_no_force_is_rejected() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    let id = registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();

    let result = registry.unregister(&id, false, true);

    assert!(result.is_err());
    assert!(registry.get(&id).is_ok());
}

#[test]
fn unregister_forced_removes_despite_running_tasks() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    let id = registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();

    registry.unregister(&id, true, true).unwrap();

    assert!(registry.get(&id).is_err());
    assert!(!dir.path().join(format!("{id}.json")).exists());
}

#[test]
fn enable_and_disable_toggle_the_flag() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    let id = registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();

    registry.disable(&id).unwrap();
    assert!(!registry.get(&id).unwrap().enabled);

    registry.enable(&id).unwrap();
    assert!(registry.get(&id).unwrap().enabled);
}

#[test]
fn update_applies_a_partial_patch() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    let id = registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();

    let patch = ProjectPatch { priority: Some(77), ..Default::default() };
    let project = registry.update(&id, patch).unwrap();

    assert_eq!(project.priority, 77);
    assert_eq!(project.weight, poppo_core::project::DEFAULT_WEIGHT);
}

#[test]
fn get_by_path_finds_a_registered_project() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap();

    let project = registry.get_by_path(Path::new("/srv/widgets")).unwrap();
    assert_eq!(project.name, "widgets");
}

#[test]
fn list_is_sorted_by_id() {
    let dir = tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    registry.register(PathBuf::from("/srv/a"), RegisterProjectOptions::default()).unwrap();
    registry.register(PathBuf::from("/srv/b"), RegisterProjectOptions::default()).unwrap();

    let projects = registry.list();
    assert_eq!(projects.len(), 2);
    assert!(projects[0].id < projects[1].id);
}

#[test]
fn reopening_the_registry_recovers_persisted_projects() {
    let dir = tempdir().unwrap();
    let id = {
        let registry = ProjectRegistry::open(dir.path()).unwrap();
        registry.register(PathBuf::from("/srv/widgets"), RegisterProjectOptions::default()).unwrap()
    };

    let reopened = ProjectRegistry::open(dir.path()).unwrap();
    assert_eq!(reopened.get(&id).unwrap().name, "widgets");
}
