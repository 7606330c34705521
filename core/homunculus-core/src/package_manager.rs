//! Package manager detection and command templates.
//!
//! Resolution order, first match wins:
//!
//! 1. `CLAUDE_PACKAGE_MANAGER` override
//! 2. `<project>/.claude/package-manager.json`
//! 3. `packageManager` field of `<project>/package.json`
//! 4. lock file present in the project (pnpm, bun, yarn, npm)
//! 5. `~/.claude/package-manager.json`
//! 6. first installed manager in the fallback order
//! 7. npm
//!
//! Unknown names at any step are ignored and resolution falls through.

use crate::config::HookEnv;
use crate::error::{HomunculusError, Result};
use crate::fsutil;
use crate::storage::StorageConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

/// Command templates for one package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandProfile {
    pub install_cmd: &'static str,
    pub run_cmd: &'static str,
    pub exec_cmd: &'static str,
    pub test_cmd: &'static str,
    pub build_cmd: &'static str,
    pub dev_cmd: &'static str,
}

impl PackageManager {
    pub const ALL: [PackageManager; 4] = [
        PackageManager::Npm,
        PackageManager::Pnpm,
        PackageManager::Yarn,
        PackageManager::Bun,
    ];

    /// Lock file precedence when several are present.
    pub const DETECTION_PRIORITY: [PackageManager; 4] = [
        PackageManager::Pnpm,
        PackageManager::Bun,
        PackageManager::Yarn,
        PackageManager::Npm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Bun => "bun",
        }
    }

    pub fn lock_file(self) -> &'static str {
        match self {
            PackageManager::Npm => "package-lock.json",
            PackageManager::Pnpm => "pnpm-lock.yaml",
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Bun => "bun.lockb",
        }
    }

    pub fn profile(self) -> CommandProfile {
        match self {
            PackageManager::Npm => CommandProfile {
                install_cmd: "npm install",
                run_cmd: "npm run",
                exec_cmd: "npx",
                test_cmd: "npm test",
                build_cmd: "npm run build",
                dev_cmd: "npm run dev",
            },
            PackageManager::Pnpm => CommandProfile {
                install_cmd: "pnpm install",
                run_cmd: "pnpm",
                exec_cmd: "pnpm dlx",
                test_cmd: "pnpm test",
                build_cmd: "pnpm build",
                dev_cmd: "pnpm dev",
            },
            PackageManager::Yarn => CommandProfile {
                install_cmd: "yarn",
                run_cmd: "yarn",
                exec_cmd: "yarn dlx",
                test_cmd: "yarn test",
                build_cmd: "yarn build",
                dev_cmd: "yarn dev",
            },
            PackageManager::Bun => CommandProfile {
                install_cmd: "bun install",
                run_cmd: "bun run",
                exec_cmd: "bunx",
                test_cmd: "bun test",
                build_cmd: "bun run build",
                dev_cmd: "bun run dev",
            },
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pm| pm.name() == name)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackageManager {
    type Err = HomunculusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| HomunculusError::UnknownPackageManager(s.to_string()))
    }
}

/// Which resolution step produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionSource {
    #[serde(rename = "environment")]
    Environment,
    #[serde(rename = "project-config")]
    ProjectConfig,
    #[serde(rename = "package.json")]
    PackageJson,
    #[serde(rename = "lock-file")]
    LockFile,
    #[serde(rename = "global-config")]
    GlobalConfig,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "default")]
    Default,
}

impl DetectionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionSource::Environment => "environment",
            DetectionSource::ProjectConfig => "project-config",
            DetectionSource::PackageJson => "package.json",
            DetectionSource::LockFile => "lock-file",
            DetectionSource::GlobalConfig => "global-config",
            DetectionSource::Fallback => "fallback",
            DetectionSource::Default => "default",
        }
    }

    /// Nothing explicit was found; worth showing the selection prompt.
    pub fn is_guess(self) -> bool {
        matches!(self, DetectionSource::Fallback | DetectionSource::Default)
    }
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub project_dir: PathBuf,
    pub global_config: PathBuf,
    pub env_override: Option<String>,
    pub fallback_order: Vec<PackageManager>,
}

impl ResolveOptions {
    pub fn new(storage: &StorageConfig, env: &HookEnv) -> Self {
        Self {
            project_dir: storage.project_root().to_path_buf(),
            global_config: storage.global_package_manager_file(),
            env_override: env.package_manager_override.clone(),
            fallback_order: PackageManager::DETECTION_PRIORITY.to_vec(),
        }
    }

    fn project_config(&self) -> PathBuf {
        self.project_dir.join(".claude").join("package-manager.json")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPackageManager {
    pub manager: PackageManager,
    pub source: DetectionSource,
}

impl ResolvedPackageManager {
    /// `install`, `test`, `build` and `dev` map to their templates; anything
    /// else runs as a script.
    pub fn run_command(&self, script: &str) -> String {
        let profile = self.manager.profile();
        match script {
            "install" => profile.install_cmd.to_string(),
            "test" => profile.test_cmd.to_string(),
            "build" => profile.build_cmd.to_string(),
            "dev" => profile.dev_cmd.to_string(),
            other => format!("{} {}", profile.run_cmd, other),
        }
    }

    pub fn exec_command(&self, binary: &str, args: &[String]) -> String {
        let mut command = format!("{} {}", self.manager.profile().exec_cmd, binary);
        if !args.is_empty() {
            command.push(' ');
            command.push_str(&args.join(" "));
        }
        command
    }
}

/// Runs the resolution chain. `probe` answers "is this binary installed?".
pub fn resolve_package_manager<P>(options: &ResolveOptions, probe: P) -> ResolvedPackageManager
where
    P: Fn(&str) -> bool,
{
    let found = |manager, source| ResolvedPackageManager { manager, source };

    if let Some(pm) = options
        .env_override
        .as_deref()
        .and_then(PackageManager::from_name)
    {
        return found(pm, DetectionSource::Environment);
    }

    if let Some(pm) = read_preference(&options.project_config()) {
        return found(pm, DetectionSource::ProjectConfig);
    }

    if let Some(pm) = detect_from_package_json(&options.project_dir) {
        return found(pm, DetectionSource::PackageJson);
    }

    if let Some(pm) = detect_from_lock_file(&options.project_dir) {
        return found(pm, DetectionSource::LockFile);
    }

    if let Some(pm) = read_preference(&options.global_config) {
        return found(pm, DetectionSource::GlobalConfig);
    }

    if let Some(pm) = options
        .fallback_order
        .iter()
        .copied()
        .find(|pm| probe(pm.name()))
    {
        return found(pm, DetectionSource::Fallback);
    }

    found(PackageManager::Npm, DetectionSource::Default)
}

pub fn detect_from_lock_file(project_dir: &Path) -> Option<PackageManager> {
    PackageManager::DETECTION_PRIORITY
        .into_iter()
        .find(|pm| project_dir.join(pm.lock_file()).exists())
}

/// `packageManager: "pnpm@8.6.0"` yields pnpm.
pub fn detect_from_package_json(project_dir: &Path) -> Option<PackageManager> {
    let value = read_json(&project_dir.join("package.json"))?;
    let field = value.get("packageManager")?.as_str()?;
    let name = field.split('@').next()?;
    PackageManager::from_name(name)
}

fn read_preference(path: &Path) -> Option<PackageManager> {
    let value = read_json(path)?;
    PackageManager::from_name(value.get("packageManager")?.as_str()?)
}

fn read_json(path: &Path) -> Option<Value> {
    let content = fsutil::read_file(path)?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, path = %path.display(), "Ignoring malformed JSON");
            None
        }
    }
}

pub fn available_package_managers<P>(probe: P) -> Vec<PackageManager>
where
    P: Fn(&str) -> bool,
{
    PackageManager::ALL
        .into_iter()
        .filter(|pm| probe(pm.name()))
        .collect()
}

/// Contents of a preference file after a `set`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub package_manager: PackageManager,
    pub set_at: chrono::DateTime<Utc>,
}

/// Records the global preference, keeping any other keys in the file.
pub fn set_preferred(global_config: &Path, manager: PackageManager) -> Result<Preference> {
    let mut doc = match read_json(global_config) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let preference = Preference {
        package_manager: manager,
        set_at: Utc::now(),
    };
    doc.insert("packageManager".into(), Value::from(manager.name()));
    doc.insert(
        "setAt".into(),
        serde_json::to_value(preference.set_at)
            .map_err(|e| HomunculusError::json("encoding timestamp", e))?,
    );
    write_json(global_config, &Value::Object(doc))?;
    Ok(preference)
}

/// Writes `<project>/.claude/package-manager.json`, replacing it entirely.
pub fn set_project(project_dir: &Path, manager: PackageManager) -> Result<Preference> {
    let preference = Preference {
        package_manager: manager,
        set_at: Utc::now(),
    };
    let value = serde_json::to_value(&preference)
        .map_err(|e| HomunculusError::json("encoding preference", e))?;
    write_json(
        &project_dir.join(".claude").join("package-manager.json"),
        &value,
    )?;
    Ok(preference)
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| HomunculusError::json(format!("encoding {}", path.display()), e))?;
    fsutil::atomic_write(path, &content)
}

/// Message listing installed managers and how to pick one.
pub fn selection_prompt(available: &[PackageManager], current: PackageManager) -> String {
    let mut message = String::from("[PackageManager] Available package managers:\n");
    for pm in available {
        let indicator = if *pm == current { " (current)" } else { "" };
        message.push_str(&format!("  - {}{}\n", pm, indicator));
    }
    message.push_str("\nTo set your preferred package manager:\n");
    message.push_str("  - Global: Set CLAUDE_PACKAGE_MANAGER environment variable\n");
    message.push_str(
        "  - Or add to ~/.claude/package-manager.json: {\"packageManager\": \"pnpm\"}\n",
    );
    message.push_str("  - Or add to package.json: {\"packageManager\": \"pnpm@8\"}\n");
    message
}

/// Regex alternation matching the action as any manager would spell it.
pub fn command_pattern(action: &str) -> String {
    let patterns: Vec<String> = match action {
        "dev" => vec![
            "npm run dev".into(),
            "pnpm( run)? dev".into(),
            "yarn dev".into(),
            "bun run dev".into(),
        ],
        "install" => vec![
            "npm install".into(),
            "pnpm install".into(),
            "yarn( install)?".into(),
            "bun install".into(),
        ],
        "test" => vec![
            "npm test".into(),
            "pnpm test".into(),
            "yarn test".into(),
            "bun test".into(),
        ],
        "build" => vec![
            "npm run build".into(),
            "pnpm( run)? build".into(),
            "yarn build".into(),
            "bun run build".into(),
        ],
        other => {
            let other = regex::escape(other);
            vec![
                format!("npm run {}", other),
                format!("pnpm( run)? {}", other),
                format!("yarn {}", other),
                format!("bun run {}", other),
            ]
        }
    };
    format!("({})", patterns.join("|"))
}
