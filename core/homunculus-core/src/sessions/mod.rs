//! Session record store.
//!
//! Session records are Markdown files in `~/.claude/sessions/` named
//! `YYYY-MM-DD[-shortid]-session.tmp`. The directory listing is the index:
//! nothing is cached, every query re-reads and re-parses the files.
//!
//! Mutations (`write`, `append`, `delete`) report success as `bool` and log
//! failures instead of returning them.

pub mod parser;
pub mod summary;

pub use parser::{
    parse_session_filename, parse_session_metadata, SessionFileName, SessionMetadata,
    SessionStats, NO_ID,
};

use crate::fsutil;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LIST_LIMIT: usize = 50;

const UNTITLED: &str = "Untitled Session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListOptions {
    pub limit: usize,
    pub offset: usize,
    /// Exact `YYYY-MM-DD` match.
    pub date: Option<String>,
    /// Substring of the short id.
    pub search: Option<String>,
}

impl Default for SessionListOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            date: None,
            search: None,
        }
    }
}

/// One listed session file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub name: SessionFileName,
    pub session_path: PathBuf,
    pub has_content: bool,
    pub size: u64,
    pub modified_time: DateTime<Utc>,
    /// Not every filesystem reports a birth time.
    pub created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Lists session files, newest first, filtered and paginated.
    pub fn list(&self, options: &SessionListOptions) -> SessionList {
        let mut sessions: Vec<SessionSummary> = self
            .scan(None)
            .into_iter()
            .filter(|s| options.date.as_deref().map_or(true, |d| s.name.date == d))
            .filter(|s| {
                options
                    .search
                    .as_deref()
                    .map_or(true, |q| s.name.short_id.contains(q))
            })
            .collect();

        sessions.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));

        let total = sessions.len();
        let page = sessions
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect();

        SessionList {
            sessions: page,
            total,
            offset: options.offset,
            limit: options.limit,
            has_more: options.offset.saturating_add(options.limit) < total,
        }
    }

    /// Sessions modified within `max_age`, newest first.
    pub fn recent(&self, max_age: Duration) -> Vec<SessionSummary> {
        self.scan(Some(max_age))
    }

    /// Finds a session by short-id prefix, file name, or `<date>` for id-less files.
    pub fn get_by_id(&self, id: &str, include_content: bool) -> Option<SessionDetail> {
        if id.is_empty() {
            return None;
        }

        let summary = self.scan(None).into_iter().find(|s| {
            let name = &s.name;
            let short_id_match = name.has_short_id() && name.short_id.starts_with(id);
            let filename_match = name.filename == id || name.filename == format!("{}.tmp", id);
            let no_id_match =
                !name.has_short_id() && name.filename == format!("{}-session.tmp", id);
            short_id_match || filename_match || no_id_match
        })?;

        if !include_content {
            return Some(SessionDetail {
                summary,
                content: None,
                metadata: None,
                stats: None,
            });
        }

        let content = self.content(&summary.session_path);
        let metadata = content.as_deref().map(parse_session_metadata);
        let stats = SessionStats::from_content(content.as_deref());
        Some(SessionDetail {
            summary,
            content,
            metadata,
            stats: Some(stats),
        })
    }

    /// Parsed entries for every session file, newest first. Files that do
    /// not follow the naming convention are skipped.
    fn scan(&self, max_age: Option<Duration>) -> Vec<SessionSummary> {
        fsutil::find_files(&self.dir, "*.tmp", max_age)
            .into_iter()
            .filter_map(|found| {
                let filename = found.path.file_name()?.to_str()?.to_string();
                let name = parse_session_filename(&filename)?;
                let meta = fs::metadata(&found.path).ok()?;
                Some(SessionSummary {
                    name,
                    has_content: meta.len() > 0,
                    size: meta.len(),
                    modified_time: found.modified.into(),
                    created_time: meta.created().ok().map(Into::into),
                    session_path: found.path,
                })
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // File Operations
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn content(&self, path: &Path) -> Option<String> {
        fsutil::read_file(path)
    }

    pub fn write(&self, path: &Path, content: &str) -> bool {
        match fs::write(path, content) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to write session");
                false
            }
        }
    }

    pub fn append(&self, path: &Path, content: &str) -> bool {
        match fsutil::append_file(path, content) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to append to session");
                false
            }
        }
    }

    /// Returns `false` when the file does not exist or cannot be removed.
    pub fn delete(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to delete session");
                false
            }
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    pub fn title(&self, path: &Path) -> String {
        self.content(path)
            .and_then(|content| parse_session_metadata(&content).title)
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    pub fn size_display(&self, path: &Path) -> String {
        format_size(fsutil::file_size(path).unwrap_or(0))
    }
}

/// `B` below 1 KiB, then `KB` / `MB` with one decimal.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SessionStore) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sessions");
        std::fs::create_dir_all(&dir).unwrap();
        (temp, SessionStore::new(dir))
    }

    /// Writes a session file and backdates its mtime by `age_secs`.
    fn write_session(store: &SessionStore, name: &str, content: &str, age_secs: u64) -> PathBuf {
        let path = store.path_for(name);
        std::fs::write(&path, content).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
        path
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("nope"));
        let list = store.list(&SessionListOptions::default());
        assert!(list.sessions.is_empty());
        assert_eq!(list.total, 0);
        assert!(!list.has_more);
    }

    #[test]
    fn test_list_sorts_newest_first_and_skips_other_files() {
        let (_temp, store) = setup();
        write_session(&store, "2025-01-01-aaaaaaaa-session.tmp", "# A", 300);
        write_session(&store, "2025-01-02-bbbbbbbb-session.tmp", "# B", 100);
        write_session(&store, "2025-01-03-session.tmp", "", 200);
        write_session(&store, "random.tmp", "x", 0);
        std::fs::write(store.path_for("notes.md"), "x").unwrap();

        let list = store.list(&SessionListOptions::default());
        let ids: Vec<_> = list.sessions.iter().map(|s| s.name.short_id.as_str()).collect();
        assert_eq!(ids, vec!["bbbbbbbb", NO_ID, "aaaaaaaa"]);
        assert!(!list.sessions[1].has_content);
    }

    #[test]
    fn test_list_filters_and_paginates() {
        let (_temp, store) = setup();
        write_session(&store, "2025-01-01-aaaaaaaa-session.tmp", "a", 30);
        write_session(&store, "2025-01-01-aaaabbbb-session.tmp", "b", 20);
        write_session(&store, "2025-01-02-cccccccc-session.tmp", "c", 10);

        let by_date = store.list(&SessionListOptions {
            date: Some("2025-01-01".to_string()),
            ..Default::default()
        });
        assert_eq!(by_date.total, 2);

        let by_search = store.list(&SessionListOptions {
            search: Some("aaaa".to_string()),
            ..Default::default()
        });
        assert_eq!(by_search.total, 2);

        let page = store.list(&SessionListOptions {
            limit: 1,
            offset: 1,
            ..Default::default()
        });
        assert_eq!(page.sessions.len(), 1);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        assert_eq!(page.sessions[0].name.short_id, "aaaabbbb");
    }

    #[test]
    fn test_get_by_id_matching_rules() {
        let (_temp, store) = setup();
        write_session(&store, "2025-01-01-abcd1234-session.tmp", "# With id", 0);
        write_session(&store, "2025-01-02-session.tmp", "# No id", 0);

        let by_prefix = store.get_by_id("abcd", false).unwrap();
        assert_eq!(by_prefix.summary.name.short_id, "abcd1234");

        let by_name = store.get_by_id("2025-01-01-abcd1234-session", false).unwrap();
        assert_eq!(by_name.summary.name.short_id, "abcd1234");

        let no_id = store.get_by_id("2025-01-02", false).unwrap();
        assert_eq!(no_id.summary.name.short_id, NO_ID);

        assert!(store.get_by_id("no-id", false).is_none());
        assert!(store.get_by_id("zzzz", false).is_none());
    }

    #[test]
    fn test_get_by_id_with_content() {
        let (_temp, store) = setup();
        let content = "# Title\n\n### Completed\n- [x] one\n";
        write_session(&store, "2025-01-01-abcd1234-session.tmp", content, 0);

        let detail = store.get_by_id("abcd1234", true).unwrap();
        assert_eq!(detail.content.as_deref(), Some(content));
        assert_eq!(
            detail.metadata.unwrap().title.as_deref(),
            Some("Title")
        );
        let stats = detail.stats.unwrap();
        assert_eq!(stats.completed_items, 1);
        assert_eq!(stats.total_items, 1);
    }

    #[test]
    fn test_write_append_delete() {
        let (_temp, store) = setup();
        let path = store.path_for("2025-01-01-session.tmp");

        assert!(store.write(&path, "# T\n"));
        assert!(store.append(&path, "more\n"));
        assert_eq!(store.content(&path).as_deref(), Some("# T\nmore\n"));
        assert!(store.exists(&path));

        assert!(store.delete(&path));
        assert!(!store.delete(&path));
        assert!(!store.exists(&path));
    }

    #[test]
    fn test_write_into_missing_dir_fails_softly() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("nope"));
        assert!(!store.write(&temp.path().join("nope/x-session.tmp"), "x"));
    }

    #[test]
    fn test_title_defaults_to_untitled() {
        let (_temp, store) = setup();
        let path = write_session(&store, "2025-01-01-session.tmp", "no heading", 0);
        assert_eq!(store.title(&path), "Untitled Session");
        assert_eq!(store.title(&store.path_for("missing.tmp")), "Untitled Session");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_recent_excludes_old_sessions() {
        let (_temp, store) = setup();
        write_session(&store, "2025-01-01-aaaaaaaa-session.tmp", "a", 10 * 24 * 3600);
        write_session(&store, "2025-01-02-bbbbbbbb-session.tmp", "b", 60);

        let recent = store.recent(Duration::from_secs(7 * 24 * 3600));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name.short_id, "bbbbbbbb");
    }
}
