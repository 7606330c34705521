//! Integration tests for the session, alias and package-manager stores.

use homunculus_core::aliases::AliasStore;
use homunculus_core::package_manager::{resolve_package_manager, set_project};
use homunculus_core::sessions::parse_session_filename;
use homunculus_core::{
    DetectionSource, HookEnv, PackageManager, ResolveOptions, SessionListOptions, SessionStore,
    StorageConfig,
};
use tempfile::TempDir;

fn storage() -> (TempDir, StorageConfig) {
    let temp = TempDir::new().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    (temp, storage)
}

#[test]
fn test_alias_set_then_resolve() {
    let (_temp, storage) = storage();
    let store = AliasStore::new(storage.aliases_file());

    store
        .set("auth-work", "/tmp/sessions/2026-01-15-a1b2c3d4-session.tmp", Some("Auth refactor"))
        .unwrap();

    let resolved = store.resolve("auth-work").unwrap();
    assert_eq!(resolved.session_path, "/tmp/sessions/2026-01-15-a1b2c3d4-session.tmp");
    assert_eq!(resolved.title.as_deref(), Some("Auth refactor"));
}

#[test]
fn test_metadata_count_tracks_every_save() {
    let (_temp, storage) = storage();
    let store = AliasStore::new(storage.aliases_file());

    let mut last_updated = None;
    for name in ["one", "two", "three"] {
        store.set(name, "/s", None).unwrap();
        let doc = store.load();
        assert_eq!(doc.metadata.total_count, doc.aliases.len());
        if let Some(previous) = last_updated {
            assert!(doc.metadata.last_updated >= previous);
        }
        last_updated = Some(doc.metadata.last_updated);
    }

    store.delete("two").unwrap();
    let doc = store.load();
    assert_eq!(doc.metadata.total_count, 2);
    assert!(doc.metadata.last_updated >= last_updated.unwrap());
}

#[test]
fn test_cleanup_removes_dead_sessions_once() {
    let (temp, storage) = storage();
    let store = AliasStore::new(storage.aliases_file());
    let live = temp.path().join("live-session.tmp");
    std::fs::write(&live, "# live\n").unwrap();
    let live = live.to_string_lossy().to_string();

    store.set("keep", &live, None).unwrap();
    store.set("gone", "/nowhere/dead-session.tmp", None).unwrap();

    let exists = |path: &str| std::path::Path::new(path).exists();
    let first = store.cleanup(exists).unwrap();
    assert_eq!(first.total_checked, 2);
    assert_eq!(first.removed, 1);
    assert_eq!(first.removed_aliases[0].name, "gone");

    let before = std::fs::read(store.path()).unwrap();
    let second = store.cleanup(exists).unwrap();
    assert_eq!(second.removed, 0);
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
    assert!(store.resolve("keep").is_some());
}

#[test]
fn test_session_filename_examples() {
    let with_id = parse_session_filename("2026-02-01-a1b2c3d4-session.tmp").unwrap();
    assert_eq!(with_id.short_id, "a1b2c3d4");
    assert_eq!(with_id.date, "2026-02-01");

    let without_id = parse_session_filename("2026-02-01-session.tmp").unwrap();
    assert_eq!(without_id.short_id, "no-id");

    assert!(parse_session_filename("2026-02-01-abc-session.tmp").is_none());
    assert!(parse_session_filename("notes.md").is_none());
}

#[test]
fn test_sessions_listed_and_found_by_id() {
    let (_temp, storage) = storage();
    let dir = storage.sessions_dir();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("2026-02-01-a1b2c3d4-session.tmp"),
        "# Parser work\n\n### Completed\n- [x] tokenizer\n",
    )
    .unwrap();
    std::fs::write(dir.join("2026-02-02-session.tmp"), "").unwrap();
    std::fs::write(dir.join("README.md"), "ignored").unwrap();

    let store = SessionStore::new(dir);
    let listed = store.list(&SessionListOptions::default());
    assert_eq!(listed.total, 2);

    let detail = store.get_by_id("a1b2", true).unwrap();
    assert_eq!(detail.metadata.unwrap().title.as_deref(), Some("Parser work"));
    assert_eq!(detail.stats.unwrap().completed_items, 1);
}

#[test]
fn test_env_override_beats_lock_file() {
    let (_temp, storage) = storage();
    std::fs::create_dir_all(storage.project_root()).unwrap();
    std::fs::write(storage.project_root().join("yarn.lock"), "").unwrap();
    std::fs::write(storage.project_root().join("package-lock.json"), "{}").unwrap();

    let env = HookEnv {
        package_manager_override: Some("pnpm".to_string()),
        ..HookEnv::default()
    };
    let resolved = resolve_package_manager(&ResolveOptions::new(&storage, &env), |_| false);

    assert_eq!(resolved.manager, PackageManager::Pnpm);
    assert_eq!(resolved.source, DetectionSource::Environment);
}

#[test]
fn test_project_preference_beats_lock_file() {
    let (_temp, storage) = storage();
    std::fs::create_dir_all(storage.project_root()).unwrap();
    std::fs::write(storage.project_root().join("yarn.lock"), "").unwrap();
    set_project(storage.project_root(), PackageManager::Bun).unwrap();

    let resolved =
        resolve_package_manager(&ResolveOptions::new(&storage, &HookEnv::default()), |_| false);

    assert_eq!(resolved.manager, PackageManager::Bun);
    assert_eq!(resolved.source, DetectionSource::ProjectConfig);
}
