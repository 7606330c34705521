//! Compiled regex patterns for parsing session files, aliases and instincts.
//!
//! These patterns are compiled once on first use and reused throughout
//! the library. Update these when the session template or the instinct
//! file format changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Session File Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// `YYYY-MM-DD[-shortid]-session.tmp`, shortid is 8+ lowercase alphanumerics.
pub static RE_SESSION_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:-([a-z0-9]{8,}))?-session\.tmp$").unwrap()
});
pub static RE_SESSION_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
pub static RE_SESSION_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Date:\*\*\s*(\d{4}-\d{2}-\d{2})").unwrap());
pub static RE_SESSION_STARTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Started:\*\*\s*([\d:]+)").unwrap());
pub static RE_SESSION_UPDATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Last Updated:\*\*\s*([\d:]+)").unwrap());
pub static RE_CHECKED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"- \[x\]\s*(.+)").unwrap());
pub static RE_UNCHECKED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"- \[ \]\s*(.+)").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Alias Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_ALIAS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Transcript Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_USER_MESSAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""type":"user""#).unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Command Name Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// Binaries probed with `which` must be plain names (no shell metacharacters).
pub static RE_COMMAND_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap());

/// Source files worth scanning for leftover `console.log` calls.
pub static RE_JS_SOURCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(ts|tsx|js|jsx|vue)$").unwrap());
pub static RE_CONSOLE_LOG: Lazy<Regex> = Lazy::new(|| Regex::new(r"console\.log").unwrap());
