//! Error types for homunculus-core operations.
//!
//! Most read paths never surface these: a missing or malformed file degrades
//! to an empty default. Errors are reserved for writes, subprocesses and
//! configuration that the caller has to report.

/// All errors that can occur in homunculus-core operations.
#[derive(Debug, thiserror::Error)]
pub enum HomunculusError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Unknown package manager: {0}")]
    UnknownPackageManager(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Subprocess Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Command execution failed: {command}: {details}")]
    CommandFailed { command: String, details: String },

    #[error("Command timed out after {secs}s: {command}")]
    CommandTimedOut { command: String, secs: u64 },

    #[error("Platform not supported for this operation: {0}")]
    UnsupportedPlatform(String),
}

/// Convenience type alias for Results using HomunculusError.
pub type Result<T> = std::result::Result<T, HomunculusError>;

impl HomunculusError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HomunculusError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        HomunculusError::Json {
            context: context.into(),
            source,
        }
    }
}

// Conversion for string error compatibility at the CLI edge
impl From<HomunculusError> for String {
    fn from(err: HomunculusError) -> String {
        err.to_string()
    }
}
