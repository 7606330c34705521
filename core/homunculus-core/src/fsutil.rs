//! Filesystem helpers shared by the stores and hooks.
//!
//! Reads degrade to `None`/zero on any failure. Writes return
//! [`HomunculusError::Io`] with the path in the context.

use crate::error::{HomunculusError, Result};
use fs_err as fs;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// A file found by [`find_files`], newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

pub fn read_file(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Writes `content`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, content)
        .map_err(|e| HomunculusError::io(format!("writing {}", path.display()), e))
}

/// Appends `content`, creating the file and its parent directories as needed.
pub fn append_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HomunculusError::io(format!("opening {}", path.display()), e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| HomunculusError::io(format!("appending to {}", path.display()), e))
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| HomunculusError::io(format!("creating {}", path.display()), e))
}

/// Writes content to a file atomically using temp file + rename.
///
/// The temp file lives in the destination directory so the rename never
/// crosses filesystems.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        HomunculusError::io(format!("creating temp file in {}", dir.display()), e)
    })?;

    tmp.write_all(contents.as_bytes()).map_err(|e| {
        HomunculusError::io(format!("writing temp file for {}", path.display()), e)
    })?;

    tmp.flush().map_err(|e| {
        HomunculusError::io(format!("flushing temp file for {}", path.display()), e)
    })?;

    tmp.persist(path).map_err(|e| {
        HomunculusError::io(format!("persisting temp file to {}", path.display()), e.error)
    })?;

    Ok(())
}

/// Lists regular files in `dir` whose names match a simple `*` glob.
///
/// `max_age` drops files last modified longer ago than the given duration.
/// Results are sorted by modification time, newest first.
pub fn find_files(
    dir: &Path,
    pattern: &str,
    max_age: Option<Duration>,
) -> Vec<FoundFile> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let now = SystemTime::now();

    let mut found: Vec<FoundFile> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| glob_match(pattern, name))
        })
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            if let Some(limit) = max_age {
                let age = now.duration_since(modified).unwrap_or_default();
                if age > limit {
                    return None;
                }
            }
            Some(FoundFile {
                path: entry.into_path(),
                modified,
            })
        })
        .collect();

    found.sort_by(|a, b| b.modified.cmp(&a.modified));
    found
}

/// Matches `name` against a glob where `*` spans any run of characters.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if name.len() < first.len() + last.len() || !name.starts_with(first) || !name.ends_with(last)
    {
        return false;
    }

    let mut rest = &name[first.len()..name.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }
    true
}

/// Number of regex matches in a file; 0 when unreadable.
pub fn count_in_file(path: &Path, pattern: &Regex) -> usize {
    read_file(path)
        .map(|content| pattern.find_iter(&content).count())
        .unwrap_or(0)
}

/// Number of non-blank lines in a file; 0 when unreadable.
pub fn count_lines(path: &Path) -> usize {
    read_file(path)
        .map(|content| content.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}

/// Lines matching `pattern` as `(line_number, line)`, 1-based.
pub fn grep_file(path: &Path, pattern: &Regex) -> Vec<(usize, String)> {
    let Some(content) = read_file(path) else {
        return Vec::new();
    };
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| pattern.is_match(line))
        .map(|(idx, line)| (idx + 1, line.to_string()))
        .collect()
}

pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}
