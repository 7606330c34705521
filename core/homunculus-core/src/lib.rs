//! # homunculus-core
//!
//! Core library for homunculus, the session bookkeeping and continuous
//! learning companion for Claude Code hooks.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Every hook is a short-lived process.
//! - **Graceful degradation**: Missing files return empty/default values, not errors.
//! - **Explicit configuration**: Paths and environment are captured once in
//!   [`StorageConfig`] and [`HookEnv`] and passed into each component.
//! - **Never block the host**: Hook-facing entry points swallow their own failures.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use homunculus_core::{AliasStore, SessionStore, StorageConfig};
//!
//! let storage = StorageConfig::discover()?;
//! let sessions = SessionStore::new(storage.sessions_dir());
//! let aliases = AliasStore::new(storage.aliases_file());
//! let recent = sessions.list(&Default::default());
//! ```

pub mod aliases;
pub mod analyzer;
pub mod compact;
pub mod config;
pub mod console_log;
pub mod error;
pub mod fsutil;
pub mod instincts;
pub mod observations;
pub mod observer;
pub mod package_manager;
pub mod patterns;
pub mod process;
pub mod sessions;
pub mod storage;

pub use aliases::{AliasEntry, AliasError, AliasStore, CleanupReport, ResolvedAlias};
pub use analyzer::{AnalysisTool, ClaudeCli, Invocation, ToolOutput};
pub use config::{HookEnv, LearningConfig};
pub use error::{HomunculusError, Result};
pub use instincts::Instinct;
pub use observations::{HookPhase, Observation, ObservationRecorder};
pub use observer::{Observer, TickOutcome};
pub use package_manager::{DetectionSource, PackageManager, ResolveOptions, ResolvedPackageManager};
pub use sessions::{SessionDetail, SessionList, SessionListOptions, SessionStore, SessionSummary};
pub use storage::StorageConfig;
