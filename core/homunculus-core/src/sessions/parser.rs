//! Pure parsers for session file names and session Markdown.
//!
//! Sections are line-oriented: a section starts after its `###` heading
//! (leading blank lines skipped) and ends at the next blank line, the next
//! line starting with `###`, or the end of the text. A missing section
//! yields an empty default.

use crate::patterns::{
    RE_CHECKED_ITEM, RE_SESSION_DATE, RE_SESSION_FILENAME, RE_SESSION_STARTED, RE_SESSION_TITLE,
    RE_SESSION_UPDATED, RE_UNCHECKED_ITEM,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

/// Short id assigned to session files named without one.
pub const NO_ID: &str = "no-id";

const HEADING_COMPLETED: &str = "### Completed";
const HEADING_IN_PROGRESS: &str = "### In Progress";
const HEADING_NOTES: &str = "### Notes for Next Session";
const HEADING_CONTEXT: &str = "### Context to Load";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFileName {
    pub filename: String,
    pub short_id: String,
    /// `YYYY-MM-DD` as written in the name.
    pub date: String,
    /// Parsed date; `None` when the digits do not form a calendar date.
    pub datetime: Option<NaiveDate>,
}

impl SessionFileName {
    pub fn has_short_id(&self) -> bool {
        self.short_id != NO_ID
    }
}

/// Parses `YYYY-MM-DD[-shortid]-session.tmp`.
pub fn parse_session_filename(filename: &str) -> Option<SessionFileName> {
    let caps = RE_SESSION_FILENAME.captures(filename)?;
    let date = caps.get(1)?.as_str().to_string();
    let short_id = caps
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_ID.to_string());
    let datetime = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok();

    Some(SessionFileName {
        filename: filename.to_string(),
        short_id,
        date,
        datetime,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionMetadata {
    pub title: Option<String>,
    pub date: Option<String>,
    pub started: Option<String>,
    pub last_updated: Option<String>,
    pub completed: Vec<String>,
    pub in_progress: Vec<String>,
    pub notes: String,
    pub context: String,
}

pub fn parse_session_metadata(content: &str) -> SessionMetadata {
    let mut metadata = SessionMetadata::default();
    if content.is_empty() {
        return metadata;
    }

    metadata.title = first_capture(&RE_SESSION_TITLE, content).map(|t| t.trim().to_string());
    metadata.date = first_capture(&RE_SESSION_DATE, content);
    metadata.started = first_capture(&RE_SESSION_STARTED, content);
    metadata.last_updated = first_capture(&RE_SESSION_UPDATED, content);

    if let Some(body) = section_body(content, HEADING_COMPLETED) {
        metadata.completed = list_items(&body, &RE_CHECKED_ITEM);
    }
    if let Some(body) = section_body(content, HEADING_IN_PROGRESS) {
        metadata.in_progress = list_items(&body, &RE_UNCHECKED_ITEM);
    }
    if let Some(body) = section_body(content, HEADING_NOTES) {
        metadata.notes = body.join("\n").trim().to_string();
    }
    metadata.context = fenced_block_after(content, HEADING_CONTEXT).unwrap_or_default();

    metadata
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_items: usize,
    pub completed_items: usize,
    pub in_progress_items: usize,
    pub line_count: usize,
    pub has_notes: bool,
    pub has_context: bool,
}

impl SessionStats {
    /// Stats for a session's content; `None` (unreadable file) counts as empty.
    pub fn from_content(content: Option<&str>) -> Self {
        let metadata = content.map(parse_session_metadata).unwrap_or_default();
        Self {
            total_items: metadata.completed.len() + metadata.in_progress.len(),
            completed_items: metadata.completed.len(),
            in_progress_items: metadata.in_progress.len(),
            line_count: content.map(|c| c.split('\n').count()).unwrap_or(0),
            has_notes: !metadata.notes.is_empty(),
            has_context: !metadata.context.is_empty(),
        }
    }
}

fn first_capture(re: &Regex, content: &str) -> Option<String> {
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Lines after the first line starting with `heading`, up to the section end.
fn section_body<'a>(content: &'a str, heading: &str) -> Option<Vec<&'a str>> {
    let mut lines = content.lines();
    lines.by_ref().find(|line| line.starts_with(heading))?;

    let body = lines
        .skip_while(|line| line.trim().is_empty())
        .take_while(|line| !line.trim().is_empty() && !line.contains("###"))
        .collect();
    Some(body)
}

fn list_items(body: &[&str], item: &Regex) -> Vec<String> {
    body.iter()
        .filter_map(|line| item.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Contents of the fenced code block directly following `heading`.
fn fenced_block_after(content: &str, heading: &str) -> Option<String> {
    let mut lines = content.lines();
    lines.by_ref().find(|line| line.starts_with(heading))?;

    let mut lines = lines.skip_while(|line| line.trim().is_empty());
    if !lines.next()?.starts_with("```") {
        return None;
    }

    let mut block = Vec::new();
    for line in lines {
        if line.starts_with("```") {
            return Some(block.join("\n").trim().to_string());
        }
        block.push(line);
    }
    // Unterminated fence
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Refactor auth module

**Date:** 2025-01-15
**Started:** 09:30
**Last Updated:** 14:05

---

### Completed
- [x] Extract token service
- [x] Add refresh tests

### In Progress
- [ ] Migrate session cookies
- [ ] Update docs

### Notes for Next Session
Cookie domain differs in staging.
Check the proxy config.

### Context to Load
```
src/auth/token.rs
src/auth/session.rs
```
";

    #[test]
    fn test_parse_filename_with_short_id() {
        let parsed = parse_session_filename("2025-01-15-abcd1234-session.tmp").unwrap();
        assert_eq!(parsed.date, "2025-01-15");
        assert_eq!(parsed.short_id, "abcd1234");
        assert_eq!(parsed.datetime, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert!(parsed.has_short_id());
    }

    #[test]
    fn test_parse_filename_without_short_id() {
        let parsed = parse_session_filename("2025-01-15-session.tmp").unwrap();
        assert_eq!(parsed.short_id, NO_ID);
        assert!(!parsed.has_short_id());
    }

    #[test]
    fn test_parse_filename_rejects_other_names() {
        assert!(parse_session_filename("notes.tmp").is_none());
        assert!(parse_session_filename("2025-01-15-ABCD1234-session.tmp").is_none());
        assert!(parse_session_filename("2025-01-15-abc-session.tmp").is_none());
        assert!(parse_session_filename("2025-01-15-session.md").is_none());
    }

    #[test]
    fn test_parse_filename_keeps_invalid_calendar_date_as_text() {
        let parsed = parse_session_filename("2025-13-45-session.tmp").unwrap();
        assert_eq!(parsed.date, "2025-13-45");
        assert_eq!(parsed.datetime, None);
    }

    #[test]
    fn test_parse_full_metadata() {
        let meta = parse_session_metadata(SAMPLE);
        assert_eq!(meta.title.as_deref(), Some("Refactor auth module"));
        assert_eq!(meta.date.as_deref(), Some("2025-01-15"));
        assert_eq!(meta.started.as_deref(), Some("09:30"));
        assert_eq!(meta.last_updated.as_deref(), Some("14:05"));
        assert_eq!(
            meta.completed,
            vec!["Extract token service", "Add refresh tests"]
        );
        assert_eq!(meta.in_progress, vec!["Migrate session cookies", "Update docs"]);
        assert_eq!(
            meta.notes,
            "Cookie domain differs in staging.\nCheck the proxy config."
        );
        assert_eq!(meta.context, "src/auth/token.rs\nsrc/auth/session.rs");
    }

    #[test]
    fn test_missing_sections_yield_defaults() {
        let meta = parse_session_metadata("# Only a title\n");
        assert_eq!(meta.title.as_deref(), Some("Only a title"));
        assert!(meta.completed.is_empty());
        assert!(meta.in_progress.is_empty());
        assert!(meta.notes.is_empty());
        assert!(meta.context.is_empty());
        assert_eq!(meta.date, None);
    }

    #[test]
    fn test_empty_content_yields_defaults() {
        assert_eq!(parse_session_metadata(""), SessionMetadata::default());
    }

    #[test]
    fn test_section_stops_at_next_heading_without_blank_line() {
        let content = "### Completed\n- [x] one\n### In Progress\n- [ ] two\n";
        let meta = parse_session_metadata(content);
        assert_eq!(meta.completed, vec!["one"]);
        assert_eq!(meta.in_progress, vec!["two"]);
    }

    #[test]
    fn test_items_after_blank_line_are_not_in_section() {
        let content = "### Completed\n- [x] one\n\n- [x] stray\n";
        let meta = parse_session_metadata(content);
        assert_eq!(meta.completed, vec!["one"]);
    }

    #[test]
    fn test_unterminated_context_fence_is_empty() {
        let content = "### Context to Load\n```\nsrc/lib.rs\n";
        assert!(parse_session_metadata(content).context.is_empty());
    }

    #[test]
    fn test_stats_from_content() {
        let stats = SessionStats::from_content(Some(SAMPLE));
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.completed_items, 2);
        assert_eq!(stats.in_progress_items, 2);
        assert!(stats.has_notes);
        assert!(stats.has_context);
        assert_eq!(stats.line_count, SAMPLE.split('\n').count());

        assert_eq!(SessionStats::from_content(None), SessionStats::default());
    }
}
