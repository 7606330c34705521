//! Runtime settings captured once at process start.
//!
//! - [`HookEnv`]: values the host CLI passes through the environment
//! - [`LearningConfig`]: optional `~/.claude/homunculus/config.json`
//!
//! Both degrade to defaults; a malformed config file is logged and ignored.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_SESSION_ID: &str = "CLAUDE_SESSION_ID";
pub const ENV_PACKAGE_MANAGER: &str = "CLAUDE_PACKAGE_MANAGER";
pub const ENV_COMPACT_THRESHOLD: &str = "COMPACT_THRESHOLD";
pub const ENV_TRANSCRIPT_PATH: &str = "CLAUDE_TRANSCRIPT_PATH";
/// Set on the analysis subprocess so its own tool calls are not recorded.
pub const ENV_ANALYZER_MARKER: &str = "HOMUNCULUS_ANALYZER";

const DEFAULT_COMPACT_THRESHOLD: u64 = 50;

/// Snapshot of the environment variables the hooks care about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookEnv {
    pub session_id: Option<String>,
    pub package_manager_override: Option<String>,
    pub compact_threshold: u64,
    pub transcript_path: Option<PathBuf>,
    pub in_analyzer: bool,
}

impl HookEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the snapshot from an arbitrary lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let compact_threshold = non_empty(ENV_COMPACT_THRESHOLD)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_COMPACT_THRESHOLD);

        Self {
            session_id: non_empty(ENV_SESSION_ID),
            package_manager_override: non_empty(ENV_PACKAGE_MANAGER),
            compact_threshold,
            transcript_path: non_empty(ENV_TRANSCRIPT_PATH).map(PathBuf::from),
            in_analyzer: lookup(ENV_ANALYZER_MARKER).is_some_and(|v| v == "1"),
        }
    }

    /// Last 8 characters of the session id, used to correlate log lines.
    pub fn short_session_id(&self) -> Option<&str> {
        let id = self.session_id.as_deref()?;
        let start = id
            .char_indices()
            .rev()
            .nth(7)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        Some(&id[start..])
    }
}

/// Tunables for the observer loop and the session evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub observer_interval_secs: u64,
    pub warmup_secs: u64,
    pub min_observations: usize,
    pub analysis_timeout_secs: u64,
    pub analyzer_binary: String,
    pub analyzer_model: String,
    pub max_instincts_per_run: usize,
    pub min_session_length: usize,
    pub learned_skills_path: Option<String>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            observer_interval_secs: 5 * 60,
            warmup_secs: 30,
            min_observations: 20,
            analysis_timeout_secs: 180,
            analyzer_binary: "claude".to_string(),
            analyzer_model: "haiku".to_string(),
            max_instincts_per_run: 5,
            min_session_length: 10,
            learned_skills_path: None,
        }
    }
}

impl LearningConfig {
    /// Loads the config, returning defaults if the file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Malformed learning config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Learned skills directory with a leading `~` expanded.
    pub fn learned_skills_dir(&self, default: PathBuf) -> PathBuf {
        match self.learned_skills_path.as_deref() {
            Some(raw) => expand_home(raw),
            None => default,
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(raw)
}
