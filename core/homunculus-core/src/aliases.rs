//! Session alias store.
//!
//! Aliases are short names bound to session file paths, kept in a single JSON
//! document (`~/.claude/session-aliases.json`):
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "aliases": {
//!     "auth": { "sessionPath": "...", "createdAt": "...", "updatedAt": "...", "title": null }
//!   },
//!   "metadata": { "totalCount": 1, "lastUpdated": "..." }
//! }
//! ```
//!
//! `metadata` is recomputed from the map on every save and never trusted on
//! load. Saves go through a backup/temp/rename sequence so an interrupted
//! write leaves the previous document in place.
//!
//! There is no cross-process lock: two concurrent writers race and the last
//! rename wins.

use crate::error::HomunculusError;
use crate::patterns::RE_ALIAS_NAME;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

pub const ALIAS_VERSION: &str = "1.0";

/// Names that collide with CLI verbs, compared case-insensitively.
pub const RESERVED_NAMES: [&str; 6] = ["list", "help", "remove", "delete", "create", "set"];

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    #[error("Alias name cannot be empty")]
    EmptyName,

    #[error("Alias name must contain only letters, numbers, dashes, and underscores")]
    InvalidName(String),

    #[error("'{0}' is a reserved alias name")]
    Reserved(String),

    #[error("Alias '{0}' not found")]
    NotFound(String),

    #[error("Alias '{0}' already exists")]
    AlreadyExists(String),

    #[error("Failed to save aliases: {0}")]
    Persist(#[source] HomunculusError),
}

pub type AliasResult<T> = std::result::Result<T, AliasError>;

/// Checks emptiness, charset and reserved names, in that order.
pub fn validate_alias_name(name: &str) -> AliasResult<()> {
    if name.is_empty() {
        return Err(AliasError::EmptyName);
    }
    if !RE_ALIAS_NAME.is_match(name) {
        return Err(AliasError::InvalidName(name.to_string()));
    }
    let lower = name.to_lowercase();
    if RESERVED_NAMES.contains(&lower.as_str()) {
        return Err(AliasError::Reserved(name.to_string()));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Document
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRecord {
    pub session_path: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: Option<String>,
}

impl AliasRecord {
    fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasMetadata {
    pub total_count: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasDocument {
    #[serde(default = "default_version")]
    pub version: String,
    pub aliases: BTreeMap<String, AliasRecord>,
    #[serde(default)]
    pub metadata: AliasMetadata,
}

fn default_version() -> String {
    ALIAS_VERSION.to_string()
}

impl Default for AliasDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            aliases: BTreeMap::new(),
            metadata: AliasMetadata {
                total_count: 0,
                last_updated: Utc::now(),
            },
        }
    }
}

/// One alias entry, repaired when only its timestamps or title are malformed.
/// Entries without a string `sessionPath` are dropped.
fn load_record(name: &str, entry: &serde_json::Value) -> Option<AliasRecord> {
    let err = match serde_json::from_value::<AliasRecord>(entry.clone()) {
        Ok(record) => return Some(record),
        Err(e) => e,
    };
    let Some(session_path) = entry.get("sessionPath").and_then(|p| p.as_str()) else {
        tracing::warn!(alias = name, error = %err, "Skipping alias without a session path");
        return None;
    };
    tracing::warn!(alias = name, error = %err, "Repairing malformed alias entry");
    Some(AliasRecord {
        session_path: session_path.to_string(),
        created_at: timestamp_field(entry, "createdAt").unwrap_or_else(Utc::now),
        updated_at: timestamp_field(entry, "updatedAt"),
        title: entry
            .get("title")
            .and_then(|t| t.as_str())
            .map(str::to_string),
    })
}

fn timestamp_field(entry: &serde_json::Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = entry.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Operation Results
// ═══════════════════════════════════════════════════════════════════════════════

/// An alias as shown by `list` and `aliases_for_session`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    pub name: String,
    pub session_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
}

impl AliasEntry {
    fn from_record(name: &str, record: &AliasRecord) -> Self {
        Self {
            name: name.to_string(),
            session_path: record.session_path.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            title: record.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAlias {
    pub alias: String,
    pub session_path: String,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    pub is_new: bool,
    pub alias: String,
    pub session_path: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameOutcome {
    pub old_alias: String,
    pub new_alias: String,
    pub session_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedAlias {
    pub name: String,
    pub session_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub total_checked: usize,
    pub removed: usize,
    pub removed_aliases: Vec<RemovedAlias>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct AliasStore {
    path: PathBuf,
}

impl AliasStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, ".tmp")
    }

    fn backup_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, ".bak")
    }

    /// Loads the document, falling back to an empty one.
    ///
    /// A missing, empty or unparseable file, or one without an `aliases`
    /// object, yields the default document. Bad entries are handled one at a
    /// time so the valid ones survive.
    pub fn load(&self) -> AliasDocument {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(error = %e, "Failed to read aliases file");
                }
                return AliasDocument::default();
            }
        };
        if content.trim().is_empty() {
            return AliasDocument::default();
        }

        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Error parsing aliases file, starting fresh"
                );
                return AliasDocument::default();
            }
        };
        let Some(entries) = value.get("aliases").and_then(|a| a.as_object()) else {
            tracing::warn!(path = %self.path.display(), "Aliases file has no alias map");
            return AliasDocument::default();
        };

        let aliases = entries
            .iter()
            .filter_map(|(name, entry)| load_record(name, entry).map(|r| (name.clone(), r)))
            .collect();
        AliasDocument {
            version: value
                .get("version")
                .and_then(|v| v.as_str())
                .map_or_else(default_version, str::to_string),
            aliases,
            metadata: value
                .get("metadata")
                .and_then(|m| serde_json::from_value(m.clone()).ok())
                .unwrap_or_default(),
        }
    }

    fn save(&self, doc: &mut AliasDocument) -> AliasResult<()> {
        self.save_with(doc, |tmp, primary| fs::rename(tmp, primary))
    }

    /// Persists `doc` with a backup/temp/rename sequence.
    ///
    /// `commit` performs the final temp-to-primary rename. On any failure the
    /// backup is restored over the primary and the temp file is removed.
    fn save_with<F>(&self, doc: &mut AliasDocument, commit: F) -> AliasResult<()>
    where
        F: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        let now = Utc::now();
        doc.metadata = AliasMetadata {
            total_count: doc.aliases.len(),
            last_updated: now.max(doc.metadata.last_updated),
        };

        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| AliasError::Persist(HomunculusError::json("serializing aliases", e)))?;

        let tmp = self.temp_path();
        let bak = self.backup_path();

        let attempt = (|| -> io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            if self.path.exists() {
                fs::copy(&self.path, &bak)?;
            }
            fs::write(&tmp, &content)?;
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            commit(&tmp, &self.path)
        })();

        match attempt {
            Ok(()) => {
                if bak.exists() {
                    if let Err(e) = fs::remove_file(&bak) {
                        tracing::debug!(error = %e, "Failed to remove alias backup");
                    }
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "Error saving aliases");
                self.restore_backup(&bak, &tmp);
                Err(AliasError::Persist(HomunculusError::io(
                    format!("saving {}", self.path.display()),
                    e,
                )))
            }
        }
    }

    fn restore_backup(&self, bak: &Path, tmp: &Path) {
        if bak.exists() {
            match fs::copy(bak, &self.path) {
                Ok(_) => {
                    let _ = fs::remove_file(bak);
                }
                Err(e) => tracing::warn!(error = %e, "Failed to restore alias backup"),
            }
        }
        if tmp.exists() {
            let _ = fs::remove_file(tmp);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn resolve(&self, name: &str) -> Option<ResolvedAlias> {
        if !RE_ALIAS_NAME.is_match(name) {
            return None;
        }
        let doc = self.load();
        let record = doc.aliases.get(name)?;
        Some(ResolvedAlias {
            alias: name.to_string(),
            session_path: record.session_path.clone(),
            created_at: record.created_at,
            title: record.title.clone(),
        })
    }

    /// The alias's session path, or the input unchanged when it is not an alias.
    pub fn resolve_session(&self, alias_or_id: &str) -> String {
        self.resolve(alias_or_id)
            .map(|resolved| resolved.session_path)
            .unwrap_or_else(|| alias_or_id.to_string())
    }

    /// Aliases sorted by last update, newest first.
    ///
    /// `search` matches name or title case-insensitively.
    pub fn list(&self, search: Option<&str>, limit: Option<usize>) -> Vec<AliasEntry> {
        let doc = self.load();
        let mut records: Vec<(&String, &AliasRecord)> = doc.aliases.iter().collect();
        records.sort_by(|a, b| b.1.last_touched().cmp(&a.1.last_touched()));

        let needle = search.map(str::to_lowercase).filter(|s| !s.is_empty());
        let mut entries: Vec<AliasEntry> = records
            .into_iter()
            .filter(|(name, record)| match &needle {
                Some(needle) => {
                    name.to_lowercase().contains(needle)
                        || record
                            .title
                            .as_deref()
                            .is_some_and(|t| t.to_lowercase().contains(needle))
                }
                None => true,
            })
            .map(|(name, record)| AliasEntry::from_record(name, record))
            .collect();

        if let Some(limit) = limit.filter(|l| *l > 0) {
            entries.truncate(limit);
        }
        entries
    }

    pub fn aliases_for_session(&self, session_path: &str) -> Vec<AliasEntry> {
        self.load()
            .aliases
            .iter()
            .filter(|(_, record)| record.session_path == session_path)
            .map(|(name, record)| AliasEntry::from_record(name, record))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates or rebinds an alias. `created_at` survives a rebind.
    pub fn set(
        &self,
        name: &str,
        session_path: &str,
        title: Option<&str>,
    ) -> AliasResult<SetOutcome> {
        validate_alias_name(name)?;

        let mut doc = self.load();
        let now = Utc::now();
        let existing = doc.aliases.get(name);
        let is_new = existing.is_none();
        let created_at = existing.map(|r| r.created_at).unwrap_or(now);
        let title = title.filter(|t| !t.is_empty()).map(str::to_string);

        doc.aliases.insert(
            name.to_string(),
            AliasRecord {
                session_path: session_path.to_string(),
                created_at,
                updated_at: Some(now),
                title: title.clone(),
            },
        );
        self.save(&mut doc)?;

        Ok(SetOutcome {
            is_new,
            alias: name.to_string(),
            session_path: session_path.to_string(),
            title,
        })
    }

    /// Removes an alias, returning what it pointed to.
    pub fn delete(&self, name: &str) -> AliasResult<AliasEntry> {
        let mut doc = self.load();
        let record = doc
            .aliases
            .remove(name)
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;
        self.save(&mut doc)?;
        Ok(AliasEntry::from_record(name, &record))
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> AliasResult<RenameOutcome> {
        let mut doc = self.load();
        if !doc.aliases.contains_key(old_name) {
            return Err(AliasError::NotFound(old_name.to_string()));
        }
        if doc.aliases.contains_key(new_name) {
            return Err(AliasError::AlreadyExists(new_name.to_string()));
        }
        validate_alias_name(new_name)?;

        let Some(mut record) = doc.aliases.remove(old_name) else {
            return Err(AliasError::NotFound(old_name.to_string()));
        };
        record.updated_at = Some(Utc::now());
        let session_path = record.session_path.clone();
        doc.aliases.insert(new_name.to_string(), record);
        self.save(&mut doc)?;

        Ok(RenameOutcome {
            old_alias: old_name.to_string(),
            new_alias: new_name.to_string(),
            session_path,
        })
    }

    /// Sets or clears (`None`) an alias's title.
    pub fn update_title(&self, name: &str, title: Option<&str>) -> AliasResult<()> {
        let mut doc = self.load();
        let record = doc
            .aliases
            .get_mut(name)
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;
        record.title = title.filter(|t| !t.is_empty()).map(str::to_string);
        record.updated_at = Some(Utc::now());
        self.save(&mut doc)
    }

    /// Drops aliases whose session path fails `session_exists`.
    ///
    /// Saves once for all removals, and not at all when nothing was removed.
    pub fn cleanup<F>(&self, session_exists: F) -> AliasResult<CleanupReport>
    where
        F: Fn(&str) -> bool,
    {
        let mut doc = self.load();
        let total_checked = doc.aliases.len();

        let removed_aliases: Vec<RemovedAlias> = doc
            .aliases
            .iter()
            .filter(|(_, record)| !session_exists(&record.session_path))
            .map(|(name, record)| RemovedAlias {
                name: name.clone(),
                session_path: record.session_path.clone(),
            })
            .collect();

        if !removed_aliases.is_empty() {
            for removed in &removed_aliases {
                doc.aliases.remove(&removed.name);
            }
            self.save(&mut doc)?;
        }

        Ok(CleanupReport {
            total_checked,
            removed: removed_aliases.len(),
            removed_aliases,
        })
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AliasStore) {
        let temp = TempDir::new().unwrap();
        let store = AliasStore::new(temp.path().join(".claude/session-aliases.json"));
        (temp, store)
    }

    fn raw_document(store: &AliasStore) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap()
    }

    #[test]
    fn test_set_then_resolve() {
        let (_temp, store) = setup();
        let outcome = store.set("auth", "/s/2025-01-15-session.tmp", Some("Auth work")).unwrap();
        assert!(outcome.is_new);

        let resolved = store.resolve("auth").unwrap();
        assert_eq!(resolved.session_path, "/s/2025-01-15-session.tmp");
        assert_eq!(resolved.title.as_deref(), Some("Auth work"));
    }

    #[test]
    fn test_malformed_entry_does_not_drop_valid_aliases() {
        let (_temp, store) = setup();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{
  "version": "1.0",
  "aliases": {
    "keep": { "sessionPath": "/s/keep.tmp", "createdAt": "2026-01-02T03:04:05Z", "title": "Keep" },
    "bad": { "sessionPath": "/s/bad.tmp", "createdAt": null },
    "broken": { "title": "no path" }
  }
}"#,
        )
        .unwrap();

        store.set("new", "/s/new.tmp", None).unwrap();

        let names: Vec<String> = store.list(None, None).into_iter().map(|e| e.name).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"keep".to_string()));
        assert!(names.contains(&"bad".to_string()));
        assert!(!names.contains(&"broken".to_string()));
        let keep = store.resolve("keep").unwrap();
        assert_eq!(keep.session_path, "/s/keep.tmp");
        assert_eq!(keep.title.as_deref(), Some("Keep"));
        assert_eq!(store.resolve("bad").unwrap().session_path, "/s/bad.tmp");
    }

    #[test]
    fn test_rebind_keeps_created_at() {
        let (_temp, store) = setup();
        store.set("auth", "/a", None).unwrap();
        let created = store.resolve("auth").unwrap().created_at;

        let outcome = store.set("auth", "/b", None).unwrap();
        assert!(!outcome.is_new);
        let resolved = store.resolve("auth").unwrap();
        assert_eq!(resolved.session_path, "/b");
        assert_eq!(resolved.created_at, created);
    }

    #[test]
    fn test_set_validation() {
        let (_temp, store) = setup();
        assert!(matches!(store.set("", "/a", None), Err(AliasError::EmptyName)));
        assert!(matches!(
            store.set("has space", "/a", None),
            Err(AliasError::InvalidName(_))
        ));
        assert!(matches!(
            store.set("LIST", "/a", None),
            Err(AliasError::Reserved(_))
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_resolve_rejects_invalid_names() {
        let (_temp, store) = setup();
        assert!(store.resolve("../etc").is_none());
        assert!(store.resolve("missing").is_none());
    }

    #[test]
    fn test_metadata_recomputed_on_save() {
        let (_temp, store) = setup();
        store.set("one", "/1", None).unwrap();
        store.set("two", "/2", None).unwrap();
        let first = raw_document(&store);
        assert_eq!(first["metadata"]["totalCount"], 2);
        assert_eq!(first["version"], "1.0");

        store.delete("one").unwrap();
        let second = raw_document(&store);
        assert_eq!(second["metadata"]["totalCount"], 1);

        let t1: DateTime<Utc> =
            serde_json::from_value(first["metadata"]["lastUpdated"].clone()).unwrap();
        let t2: DateTime<Utc> =
            serde_json::from_value(second["metadata"]["lastUpdated"].clone()).unwrap();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_last_updated_never_moves_backwards() {
        let (_temp, store) = setup();
        let future = Utc::now() + chrono::Duration::days(365);
        let mut doc = AliasDocument::default();
        doc.metadata.last_updated = future;
        store.save(&mut doc).unwrap();

        store.set("later", "/x", None).unwrap();
        assert_eq!(store.load().metadata.last_updated, future);
    }

    #[test]
    fn test_stale_metadata_on_disk_is_not_trusted() {
        let (_temp, store) = setup();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"version":"1.0","aliases":{"a":{"sessionPath":"/a","createdAt":"2025-01-01T00:00:00Z"}},"metadata":{"totalCount":99,"lastUpdated":"2025-01-01T00:00:00Z"}}"#,
        )
        .unwrap();

        store.set("b", "/b", None).unwrap();
        assert_eq!(raw_document(&store)["metadata"]["totalCount"], 2);
    }

    #[test]
    fn test_interrupted_save_leaves_file_byte_identical() {
        let (_temp, store) = setup();
        store.set("keep", "/keep", Some("Keep me")).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let mut doc = store.load();
        doc.aliases.clear();
        let result = store.save_with(&mut doc, |_tmp, _primary| {
            Err(io::Error::new(io::ErrorKind::Other, "simulated crash"))
        });

        assert!(matches!(result, Err(AliasError::Persist(_))));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert!(!store.temp_path().exists());
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn test_successful_save_leaves_no_side_files() {
        let (_temp, store) = setup();
        store.set("a", "/a", None).unwrap();
        store.set("b", "/b", None).unwrap();
        assert!(!store.temp_path().exists());
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn test_load_degrades_to_default() {
        let (_temp, store) = setup();
        assert!(store.load().aliases.is_empty());

        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        for content in ["", "{broken", r#"{"version":"1.0"}"#, r#"{"aliases":[]}"#] {
            std::fs::write(store.path(), content).unwrap();
            assert!(store.load().aliases.is_empty(), "content: {content}");
        }
    }

    #[test]
    fn test_list_sorted_and_searchable() {
        let (_temp, store) = setup();
        store.set("alpha", "/a", Some("Database migration")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.set("beta", "/b", None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.set("gamma", "/c", None).unwrap();

        let names: Vec<_> = store.list(None, None).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["gamma", "beta", "alpha"]);

        let by_title: Vec<_> = store
            .list(Some("DATABASE"), None)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(by_title, vec!["alpha"]);

        assert_eq!(store.list(None, Some(2)).len(), 2);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_temp, store) = setup();
        assert!(matches!(store.delete("nope"), Err(AliasError::NotFound(_))));
    }

    #[test]
    fn test_rename() {
        let (_temp, store) = setup();
        store.set("old", "/s", Some("T")).unwrap();
        store.set("taken", "/t", None).unwrap();

        assert!(matches!(
            store.rename("missing", "x"),
            Err(AliasError::NotFound(_))
        ));
        assert!(matches!(
            store.rename("old", "taken"),
            Err(AliasError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.rename("old", "bad name"),
            Err(AliasError::InvalidName(_))
        ));

        let outcome = store.rename("old", "new").unwrap();
        assert_eq!(outcome.session_path, "/s");
        assert!(store.resolve("old").is_none());
        assert_eq!(store.resolve("new").unwrap().title.as_deref(), Some("T"));
    }

    #[test]
    fn test_update_title() {
        let (_temp, store) = setup();
        store.set("a", "/a", Some("First")).unwrap();

        store.update_title("a", Some("Second")).unwrap();
        assert_eq!(store.resolve("a").unwrap().title.as_deref(), Some("Second"));

        store.update_title("a", None).unwrap();
        assert_eq!(store.resolve("a").unwrap().title, None);

        assert!(matches!(
            store.update_title("missing", Some("x")),
            Err(AliasError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_session_and_reverse_lookup() {
        let (_temp, store) = setup();
        store.set("a", "/shared", None).unwrap();
        store.set("b", "/shared", None).unwrap();
        store.set("c", "/other", None).unwrap();

        assert_eq!(store.resolve_session("a"), "/shared");
        assert_eq!(store.resolve_session("abcd1234"), "abcd1234");

        let names: Vec<_> = store
            .aliases_for_session("/shared")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_cleanup_removes_only_missing_and_is_idempotent() {
        let (_temp, store) = setup();
        store.set("live", "/live", None).unwrap();
        store.set("dead1", "/dead1", None).unwrap();
        store.set("dead2", "/dead2", None).unwrap();

        let exists = |path: &str| path == "/live";
        let report = store.cleanup(exists).unwrap();
        assert_eq!(report.total_checked, 3);
        assert_eq!(report.removed, 2);
        let mut removed: Vec<_> = report.removed_aliases.iter().map(|r| r.name.as_str()).collect();
        removed.sort();
        assert_eq!(removed, vec!["dead1", "dead2"]);

        let before = std::fs::read(store.path()).unwrap();
        let again = store.cleanup(exists).unwrap();
        assert_eq!(again.total_checked, 1);
        assert_eq!(again.removed, 0);
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }
}
