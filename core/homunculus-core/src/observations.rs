//! Append-only observation log fed by the tool-use hooks.
//!
//! Each line of `observations.jsonl` is one [`Observation`]. The log rotates
//! into `observations.archive/` once it reaches [`MAX_LOG_BYTES`]; the observer
//! later consumes it and archives it as `processed-<ts>.jsonl`.
//!
//! Recording never fails loudly. Every problem is logged and the call
//! returns `false`, because the host CLI must never be blocked by a hook.

use crate::config::HookEnv;
use crate::error::{HomunculusError, Result};
use crate::fsutil;
use crate::storage::StorageConfig;
use chrono::{DateTime, SecondsFormat, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Rotation threshold for the live log.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum characters kept from a tool input or output.
pub const MAX_FIELD_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before the tool runs (`tool_start`).
    Pre,
    /// After the tool returns (`tool_complete`).
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationEvent {
    ToolStart,
    ToolComplete,
}

impl From<HookPhase> for ObservationEvent {
    fn from(phase: HookPhase) -> Self {
        match phase {
            HookPhase::Pre => ObservationEvent::ToolStart,
            HookPhase::Post => ObservationEvent::ToolComplete,
        }
    }
}

/// One line of the observation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub event: ObservationEvent,
    pub tool: String,
    pub session: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Observation {
    /// Builds an observation from a hook payload object.
    ///
    /// Returns `None` when the payload is not a JSON object.
    pub fn from_payload(
        phase: HookPhase,
        payload: &Value,
        env_session: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let obj = payload.as_object()?;

        let tool = first_truthy(obj, &["tool_name", "tool"])
            .map(stringify)
            .unwrap_or_else(|| "unknown".to_string());
        let session = first_truthy(obj, &["session_id"])
            .map(stringify)
            .or_else(|| env_session.map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        let event = ObservationEvent::from(phase);
        let (input, output) = match event {
            ObservationEvent::ToolStart => {
                let value = first_truthy(obj, &["tool_input", "input"])
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                (Some(truncate_value(&value)), None)
            }
            ObservationEvent::ToolComplete => {
                let value = first_truthy(obj, &["tool_output", "tool_response", "output"])
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new()));
                (None, Some(truncate_value(&value)))
            }
        };

        Some(Self {
            timestamp: now,
            event,
            tool,
            session,
            input,
            output,
        })
    }
}

/// First key whose value is present and not falsy (null, false, 0, "").
fn first_truthy<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| is_truthy(v))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strings are kept as-is, everything else is JSON-encoded, then cut to
/// [`MAX_FIELD_CHARS`] characters.
pub fn truncate_value(value: &Value) -> String {
    let text = stringify(value);
    match text.char_indices().nth(MAX_FIELD_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

/// Filesystem-safe timestamp: RFC 3339 millis with `:` and `.` replaced by `-`.
pub fn file_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Writes observations for the tool-use hooks.
#[derive(Debug, Clone)]
pub struct ObservationRecorder {
    log_file: PathBuf,
    archive_dir: PathBuf,
    disabled_flag: PathBuf,
    max_bytes: u64,
}

impl ObservationRecorder {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            log_file: storage.observations_file(),
            archive_dir: storage.archive_dir(),
            disabled_flag: storage.disabled_flag_file(),
            max_bytes: MAX_LOG_BYTES,
        }
    }

    /// Overrides the rotation threshold.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_flag.exists()
    }

    /// Records one hook payload. Returns whether a line was appended.
    pub fn record(&self, phase: HookPhase, raw_payload: &str, env: &HookEnv) -> bool {
        if env.in_analyzer {
            tracing::debug!("Skipping observation from analyzer subprocess");
            return false;
        }
        if self.is_disabled() {
            tracing::debug!("Observation recording disabled by flag file");
            return false;
        }
        if raw_payload.trim().is_empty() {
            return false;
        }

        let payload: Value = match serde_json::from_str(raw_payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Hook payload is not valid JSON");
                return false;
            }
        };

        let now = Utc::now();
        let Some(observation) =
            Observation::from_payload(phase, &payload, env.session_id.as_deref(), now)
        else {
            tracing::debug!("Hook payload is not a JSON object");
            return false;
        };

        if let Err(e) = self.rotate_if_needed(now) {
            tracing::warn!(error = %e, "Failed to rotate observation log");
        }

        match self.append(&observation) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to append observation");
                false
            }
        }
    }

    fn append(&self, observation: &Observation) -> Result<()> {
        let line = serde_json::to_string(observation)
            .map_err(|e| HomunculusError::json("serializing observation", e))?;
        fsutil::append_file(&self.log_file, &format!("{}\n", line))
    }

    /// Moves the live log aside once it reaches the size limit.
    ///
    /// Returns the archive path when a rotation happened.
    pub fn rotate_if_needed(&self, now: DateTime<Utc>) -> Result<Option<PathBuf>> {
        let Some(size) = fsutil::file_size(&self.log_file) else {
            return Ok(None);
        };
        if size < self.max_bytes {
            return Ok(None);
        }

        fsutil::ensure_dir(&self.archive_dir)?;
        let target = self
            .archive_dir
            .join(format!("observations-{}.jsonl", file_timestamp(now)));
        fs::rename(&self.log_file, &target)
            .map_err(|e| HomunculusError::io("rotating observation log", e))?;
        tracing::info!(archive = %target.display(), size, "Rotated observation log");
        Ok(Some(target))
    }

    /// Number of pending observations (non-blank lines).
    pub fn pending_count(&self) -> usize {
        fsutil::count_lines(&self.log_file)
    }
}
