//! Leftover `console.log` detection in uncommitted JS/TS files.

use crate::fsutil;
use crate::patterns::{RE_CONSOLE_LOG, RE_JS_SOURCE};
use crate::process;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLogHit {
    /// Path relative to the repository root, as git reports it.
    pub file: String,
    pub lines: Vec<(usize, String)>,
}

/// Scans files modified relative to `HEAD` in the repository containing `dir`.
///
/// Outside a git repository, or when git is unavailable, nothing is found.
pub fn scan(dir: &Path) -> Vec<ConsoleLogHit> {
    if !process::is_git_repo(dir) {
        return Vec::new();
    }
    let root = process::run_command("git", &["rev-parse", "--show-toplevel"], Some(dir))
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| dir.to_path_buf());
    scan_files(&root, &process::git_modified_files(dir))
}

/// Checks `files` (relative to `root`) with a JS/TS/Vue extension.
pub fn scan_files(root: &Path, files: &[String]) -> Vec<ConsoleLogHit> {
    files
        .iter()
        .filter(|file| RE_JS_SOURCE.is_match(file))
        .filter_map(|file| {
            let path = root.join(file);
            if !path.is_file() {
                return None;
            }
            let lines = fsutil::grep_file(&path, &RE_CONSOLE_LOG);
            (!lines.is_empty()).then(|| ConsoleLogHit {
                file: file.clone(),
                lines,
            })
        })
        .collect()
}

/// Warning lines for stderr; empty when there are no hits.
pub fn warnings(hits: &[ConsoleLogHit]) -> Vec<String> {
    if hits.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<String> = hits
        .iter()
        .map(|hit| format!("[Hook] WARNING: console.log found in {}", hit.file))
        .collect();
    out.push("[Hook] Remove console.log statements before committing".to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_files_filters_extensions() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/app.ts"), "const a = 1;\nconsole.log(a);\n").unwrap();
        std::fs::write(temp.path().join("notes.md"), "console.log in prose\n").unwrap();
        std::fs::write(temp.path().join("clean.js"), "export default 1;\n").unwrap();

        let files = vec![
            "src/app.ts".to_string(),
            "notes.md".to_string(),
            "clean.js".to_string(),
            "deleted.jsx".to_string(),
        ];
        let hits = scan_files(temp.path(), &files);

        assert_eq!(
            hits,
            vec![ConsoleLogHit {
                file: "src/app.ts".to_string(),
                lines: vec![(2, "console.log(a);".to_string())],
            }]
        );
    }

    #[test]
    fn test_warnings_format() {
        let hits = vec![ConsoleLogHit {
            file: "a.vue".to_string(),
            lines: vec![(1, "console.log(1)".to_string())],
        }];
        assert_eq!(
            warnings(&hits),
            vec![
                "[Hook] WARNING: console.log found in a.vue".to_string(),
                "[Hook] Remove console.log statements before committing".to_string(),
            ]
        );
        assert!(warnings(&[]).is_empty());
    }

    #[test]
    fn test_scan_outside_repo_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(scan(temp.path()).is_empty());
    }
}
