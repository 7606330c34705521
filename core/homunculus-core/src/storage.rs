//! Storage configuration and path management for homunculus.
//!
//! `StorageConfig` is the single place that decides where every file lives.
//! It is built once at process start and handed to each store, which keeps
//! the stores free of home-directory lookups and lets tests point everything
//! at a temp directory.
//!
//! ## Layout
//!
//! ```text
//! ~/.claude/
//! ├── sessions/                      # YYYY-MM-DD[-shortid]-session.tmp
//! ├── session-aliases.json           # alias store
//! ├── package-manager.json           # global package manager preference
//! ├── skills/learned/
//! └── homunculus/
//!     ├── observations.jsonl         # live observation log
//!     ├── observations.archive/      # rotated and processed logs
//!     ├── instincts/{personal,inherited}/
//!     ├── config.json                # optional LearningConfig
//!     ├── disabled                   # flag file: stop recording
//!     ├── observer.log
//!     ├── .observer.pid
//!     └── .analysis-prompt.md
//!
//! <project>/.claude/
//! ├── instincts.md                   # derived summary, regenerated on sync
//! └── package-manager.json           # project package manager preference
//! ```

use crate::error::{HomunculusError, Result};
use std::path::{Path, PathBuf};

/// Central configuration for all homunculus storage paths.
///
/// Production code uses [`StorageConfig::discover`] which points at `~/.claude/`
/// and the current working directory. Tests use [`StorageConfig::with_root`].
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for Claude Code data (default: ~/.claude)
    claude_root: PathBuf,
    /// Project the current process works on (default: current directory)
    project_root: PathBuf,
    /// Scratch directory for per-session counters (default: system temp dir)
    temp_dir: PathBuf,
}

impl StorageConfig {
    /// Resolves paths from the home directory and the current working directory.
    pub fn discover() -> Result<Self> {
        let home = dirs::home_dir().ok_or(HomunculusError::HomeDirNotFound)?;
        let project_root = std::env::current_dir()
            .map_err(|e| HomunculusError::io("resolving current directory", e))?;
        Ok(Self {
            claude_root: home.join(".claude"),
            project_root,
            temp_dir: std::env::temp_dir(),
        })
    }

    /// Creates a StorageConfig rooted in a single directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            claude_root: root.join(".claude"),
            project_root: root.join("project"),
            temp_dir: root.join("tmp"),
        }
    }

    /// Creates a StorageConfig with explicit Claude and project roots.
    pub fn with_roots(claude_root: PathBuf, project_root: PathBuf) -> Self {
        Self {
            claude_root,
            project_root,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Returns the root directory for Claude Code data.
    pub fn claude_root(&self) -> &Path {
        &self.claude_root
    }

    /// Returns the project directory used for project-level files.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Claude-level Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to sessions/ directory (session records).
    pub fn sessions_dir(&self) -> PathBuf {
        self.claude_root.join("sessions")
    }

    /// Path to session-aliases.json (alias store).
    pub fn aliases_file(&self) -> PathBuf {
        self.claude_root.join("session-aliases.json")
    }

    /// Path to the global package manager preference.
    pub fn global_package_manager_file(&self) -> PathBuf {
        self.claude_root.join("package-manager.json")
    }

    /// Default destination for skills extracted from long sessions.
    pub fn learned_skills_dir(&self) -> PathBuf {
        self.claude_root.join("skills").join("learned")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Homunculus Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to the homunculus data directory.
    pub fn homunculus_dir(&self) -> PathBuf {
        self.claude_root.join("homunculus")
    }

    /// Path to the live observation log.
    pub fn observations_file(&self) -> PathBuf {
        self.homunculus_dir().join("observations.jsonl")
    }

    /// Path to the directory receiving rotated and processed logs.
    pub fn archive_dir(&self) -> PathBuf {
        self.homunculus_dir().join("observations.archive")
    }

    /// Path to the flag file that disables observation recording.
    pub fn disabled_flag_file(&self) -> PathBuf {
        self.homunculus_dir().join("disabled")
    }

    pub fn instincts_dir(&self) -> PathBuf {
        self.homunculus_dir().join("instincts")
    }

    /// Instincts produced by the observer.
    pub fn personal_instincts_dir(&self) -> PathBuf {
        self.instincts_dir().join("personal")
    }

    /// Instincts imported from elsewhere.
    pub fn inherited_instincts_dir(&self) -> PathBuf {
        self.instincts_dir().join("inherited")
    }

    pub fn observer_pid_file(&self) -> PathBuf {
        self.homunculus_dir().join(".observer.pid")
    }

    pub fn observer_log_file(&self) -> PathBuf {
        self.homunculus_dir().join("observer.log")
    }

    /// Instruction document handed to the analysis tool.
    pub fn analysis_prompt_file(&self) -> PathBuf {
        self.homunculus_dir().join(".analysis-prompt.md")
    }

    /// Optional learning configuration (see [`crate::config::LearningConfig`]).
    pub fn learning_config_file(&self) -> PathBuf {
        self.homunculus_dir().join("config.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Project Files
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn project_claude_dir(&self) -> PathBuf {
        self.project_root.join(".claude")
    }

    /// Path to the derived instincts summary.
    pub fn instincts_summary_file(&self) -> PathBuf {
        self.project_claude_dir().join("instincts.md")
    }

    /// Path to the project-level package manager preference.
    pub fn project_package_manager_file(&self) -> PathBuf {
        self.project_claude_dir().join("package-manager.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Scratch Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Per-session tool call counter used by the compact suggester.
    pub fn tool_counter_file(&self, session_key: &str) -> PathBuf {
        self.temp_dir.join(format!("claude-tool-count-{}", session_key))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directory Creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ensures the homunculus directory and its standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(self.homunculus_dir())?;
        fs_err::create_dir_all(self.personal_instincts_dir())?;
        fs_err::create_dir_all(self.inherited_instincts_dir())?;
        Ok(())
    }
}
