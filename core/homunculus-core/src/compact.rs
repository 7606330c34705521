//! Tool-call counter that nudges toward a manual `/compact`.
//!
//! One counter file per session in the temp dir. The suggestion fires once
//! when the count reaches the threshold and again every
//! [`REMINDER_INTERVAL`] calls past it.

use crate::config::HookEnv;
use crate::error::Result;
use crate::fsutil;
use crate::storage::StorageConfig;

pub const REMINDER_INTERVAL: u64 = 25;

/// Key naming the counter file: session id, else the parent pid.
pub fn session_key(env: &HookEnv) -> String {
    if let Some(id) = env.session_id.as_deref() {
        return id.to_string();
    }
    #[cfg(unix)]
    {
        std::os::unix::process::parent_id().to_string()
    }
    #[cfg(not(unix))]
    {
        "default".to_string()
    }
}

/// Increments the counter for `session_key` and returns the new count.
///
/// A missing or unreadable counter starts over at 1.
pub fn increment(storage: &StorageConfig, session_key: &str) -> Result<u64> {
    let path = storage.tool_counter_file(session_key);
    let previous = fsutil::read_file(&path)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let count = previous + 1;
    fsutil::write_file(&path, &count.to_string())?;
    Ok(count)
}

/// Message to show for `count`, if any.
pub fn suggestion(count: u64, threshold: u64) -> Option<String> {
    if count == threshold {
        return Some(format!(
            "[StrategicCompact] {} tool calls reached - consider /compact if transitioning phases",
            threshold
        ));
    }
    if count > threshold && count % REMINDER_INTERVAL == 0 {
        return Some(format!(
            "[StrategicCompact] {} tool calls - good checkpoint for /compact if context is stale",
            count
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_increment_starts_at_one() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());

        assert_eq!(increment(&storage, "abc").unwrap(), 1);
        assert_eq!(increment(&storage, "abc").unwrap(), 2);
        assert_eq!(increment(&storage, "other").unwrap(), 1);
    }

    #[test]
    fn test_garbage_counter_restarts() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        fsutil::write_file(&storage.tool_counter_file("s"), "NaN").unwrap();

        assert_eq!(increment(&storage, "s").unwrap(), 1);
    }

    #[test]
    fn test_suggestion_schedule() {
        assert!(suggestion(49, 50).is_none());
        assert!(suggestion(50, 50).unwrap().contains("50 tool calls reached"));
        assert!(suggestion(51, 50).is_none());
        assert!(suggestion(75, 50).unwrap().contains("75 tool calls - good checkpoint"));
        assert!(suggestion(100, 50).is_some());
        // multiples of 25 below the threshold stay quiet
        assert!(suggestion(25, 50).is_none());
    }

    #[test]
    fn test_session_key_prefers_session_id() {
        let env = HookEnv::from_lookup(|key| {
            (key == crate::config::ENV_SESSION_ID).then(|| "sess-1".to_string())
        });
        assert_eq!(session_key(&env), "sess-1");
    }
}
