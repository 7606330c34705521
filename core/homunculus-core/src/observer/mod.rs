//! Background observer: turns the observation log into instinct files.
//!
//! The observer runs in two roles. A short-lived controller (`start`, `stop`,
//! `status`, `analyze`, `sync`) and one detached loop that calls
//! [`Observer::analyze`] on a fixed interval. The loop owns the pid file; the
//! controller only reads it.
//!
//! An analysis tick is all-or-nothing with respect to the log: it is archived
//! only after the tool exited successfully *and* at least one instinct file
//! was created or modified during the call.

pub mod pid_file;

use crate::analyzer::{excerpt, AnalysisTool, Invocation};
use crate::config::LearningConfig;
use crate::error::{HomunculusError, Result};
use crate::fsutil;
use crate::instincts;
use crate::observations::file_timestamp;
use crate::process;
use crate::storage::StorageConfig;
use chrono::{Local, Utc};
use fs_err as fs;
use pid_file::{ObserverPidFile, PidInfo, ProcessStatus};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const ANALYSIS_MAX_TURNS: u32 = 5;
const ANALYSIS_TOOLS: [&str; 4] = ["Read", "Write", "Glob", "Grep"];
const STDOUT_EXCERPT_CHARS: usize = 500;
const STDERR_EXCERPT_CHARS: usize = 300;
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Result of one analysis tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Too few observations; the tool was not called.
    Skipped { count: usize, min: usize },
    /// The tool failed or timed out. Nothing was archived.
    Failed {
        status: Option<i32>,
        reason: String,
    },
    /// The tool succeeded but produced no instinct changes; the log is kept.
    NoNewInstincts,
    /// The log was archived and the summary regenerated.
    Archived {
        archive_path: PathBuf,
        instincts: Vec<String>,
    },
}

/// What `status` reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverStatus {
    pub running: Option<PidInfo>,
    /// A pid file for a dead or recycled process was found and removed.
    pub cleaned_stale: bool,
    pub observations: usize,
    pub min_observations: usize,
    pub log_file: PathBuf,
    pub instincts_dir: PathBuf,
    pub instinct_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    /// The pid file named a process that is gone or not ours.
    Stale(u32),
    Stopped(u32),
}

pub struct Observer<T: AnalysisTool> {
    storage: StorageConfig,
    config: LearningConfig,
    tool: T,
}

impl<T: AnalysisTool> Observer<T> {
    pub fn new(storage: StorageConfig, config: LearningConfig, tool: T) -> Self {
        Self {
            storage,
            config,
            tool,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn pid_file(&self) -> ObserverPidFile {
        ObserverPidFile::new(self.storage.observer_pid_file())
    }

    pub fn observation_count(&self) -> usize {
        fsutil::count_lines(&self.storage.observations_file())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Analysis
    // ─────────────────────────────────────────────────────────────────────────────

    /// Runs one analysis pass.
    ///
    /// Errors are reserved for local I/O failures (writing the instruction
    /// document, archiving). Tool failures come back as [`TickOutcome::Failed`].
    pub fn analyze(&self) -> Result<TickOutcome> {
        let count = self.observation_count();
        let min = self.config.min_observations;
        if count < min {
            tracing::info!(count, min, "Not enough observations, skipping analysis");
            return Ok(TickOutcome::Skipped { count, min });
        }

        tracing::info!(count, "Analyzing observations");
        let personal_dir = self.storage.personal_instincts_dir();
        fsutil::ensure_dir(&personal_dir)?;

        let prompt_file = self.write_prompt_file()?;
        let invocation = Invocation::new(format!(
            "Read {} for your full instructions, then execute them.",
            prompt_file.display()
        ))
        .model(self.config.analyzer_model.clone())
        .max_turns(ANALYSIS_MAX_TURNS)
        .allowed_tools(&ANALYSIS_TOOLS)
        .timeout(Duration::from_secs(self.config.analysis_timeout_secs));

        let before = instincts::snapshot(&personal_dir);
        let output = match self.tool.invoke(&invocation) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Analysis error");
                return Ok(TickOutcome::Failed {
                    status: None,
                    reason: e.to_string(),
                });
            }
        };

        if !output.success() {
            let stderr = excerpt(&output.stderr, STDERR_EXCERPT_CHARS);
            tracing::warn!(status = ?output.status, stderr, "Analysis failed");
            return Ok(TickOutcome::Failed {
                status: output.status,
                reason: stderr.to_string(),
            });
        }

        tracing::info!(
            stdout = excerpt(&output.stdout, STDOUT_EXCERPT_CHARS),
            "Analysis completed successfully"
        );

        let changed = instincts::changed_since(&before, &instincts::snapshot(&personal_dir));
        if changed.is_empty() {
            tracing::info!("No instincts created, keeping observations for next run");
            return Ok(TickOutcome::NoNewInstincts);
        }

        let archived = self.archive_observations();
        if let Err(e) = &archived {
            tracing::warn!(error = %e, "Failed to archive observations");
        }
        if let Err(e) = self.sync() {
            tracing::warn!(error = %e, "Failed to regenerate instincts summary");
        }
        let archive_path = archived?;
        tracing::info!(count = changed.len(), "Instinct(s) created or updated");

        Ok(TickOutcome::Archived {
            archive_path,
            instincts: changed,
        })
    }

    /// Regenerates the project summary from the personal instincts.
    pub fn sync(&self) -> Result<usize> {
        instincts::sync_summary(
            &self.storage.personal_instincts_dir(),
            &self.storage.instincts_summary_file(),
            Local::now().date_naive(),
        )
    }

    /// Moves the live log to `processed-<timestamp>.jsonl` in the archive dir.
    fn archive_observations(&self) -> Result<PathBuf> {
        let archive_dir = self.storage.archive_dir();
        fsutil::ensure_dir(&archive_dir)?;
        let dest = archive_dir.join(format!("processed-{}.jsonl", file_timestamp(Utc::now())));
        fs::rename(self.storage.observations_file(), &dest)
            .map_err(|e| HomunculusError::io("archiving observations", e))?;
        tracing::info!(archive = %dest.display(), "Archived observations");
        Ok(dest)
    }

    fn write_prompt_file(&self) -> Result<PathBuf> {
        let path = self.storage.analysis_prompt_file();
        fsutil::write_file(&path, &self.instruction_document())?;
        Ok(path)
    }

    /// The full instructions the analysis tool reads from disk.
    pub fn instruction_document(&self) -> String {
        format!(
            r#"# Instinct Extraction Task

You are an instinct extractor for a Continuous Learning system.

## Step 1: Read Observations

Read the observations file: {observations}

## Step 2: Analyze Patterns

Look for these patterns (need 3+ occurrences each):
1. **Repeated workflows** - same tool sequences used multiple times
2. **Tool preferences** - consistently chosen tools for certain tasks
3. **Error resolutions** - errors followed by fixes
4. **User corrections** - when the user corrects a previous action

## Step 3: Create Instinct Files

For each clear pattern, create a .yaml file in {instincts}/

Filename: `<kebab-case-id>.yaml`

Content format:
```
---
id: <kebab-case-id>
trigger: "<when this pattern applies>"
confidence: <0.3-0.85 based on frequency>
domain: "<code-style|workflow|testing|git|debugging>"
source: session-observation
observed_count: <number>
last_observed: <date>
---

# <Title>

## Action
<What to do when trigger fires>

## Evidence
- <Summary of observations>
```

## Rules
- Only create instincts for patterns with 3+ occurrences
- Be specific: narrow triggers > broad ones
- Never include actual code content, only patterns
- If an instinct already exists, update its confidence instead of duplicating
- Maximum {max} new instincts per run
- If no clear patterns found, say so and do not force instincts
"#,
            observations = self.storage.observations_file().display(),
            instincts = self.storage.personal_instincts_dir().display(),
            max = self.config.max_instincts_per_run,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Controller
    // ─────────────────────────────────────────────────────────────────────────────

    /// The live observer, if any. A stale pid file is removed.
    pub fn running_instance(&self) -> Option<PidInfo> {
        self.check_pid_file().0
    }

    fn check_pid_file(&self) -> (Option<PidInfo>, bool) {
        let pid_file = self.pid_file();
        match pid_file.check_running() {
            Ok(Some((ProcessStatus::Running, info))) => (Some(info), false),
            Ok(Some((_, info))) => {
                tracing::info!(pid = info.pid, "Removing stale observer pid file");
                let _ = pid_file.delete();
                (None, true)
            }
            Ok(None) => (None, false),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable observer pid file, removing");
                let _ = pid_file.delete();
                (None, true)
            }
        }
    }

    pub fn status(&self) -> ObserverStatus {
        let (running, cleaned_stale) = self.check_pid_file();
        let instincts_dir = self.storage.personal_instincts_dir();
        ObserverStatus {
            running,
            cleaned_stale,
            observations: self.observation_count(),
            min_observations: self.config.min_observations,
            log_file: self.storage.observer_log_file(),
            instinct_count: instincts::count_files(&instincts_dir),
            instincts_dir,
        }
    }

    /// Sends SIGTERM to a live observer and removes the pid file.
    ///
    /// An unreadable pid file is removed and reported as not running.
    pub fn stop(&self) -> Result<StopOutcome> {
        let pid_file = self.pid_file();
        let checked = match pid_file.check_running() {
            Ok(checked) => checked,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable observer pid file, removing");
                pid_file
                    .delete()
                    .map_err(|e| HomunculusError::io("removing observer pid file", e))?;
                return Ok(StopOutcome::NotRunning);
            }
        };

        let outcome = match checked {
            None => return Ok(StopOutcome::NotRunning),
            Some((ProcessStatus::Running, info)) => {
                if process::send_sigterm(info.pid)? {
                    StopOutcome::Stopped(info.pid)
                } else {
                    StopOutcome::Stale(info.pid)
                }
            }
            Some((_, info)) => StopOutcome::Stale(info.pid),
        };

        pid_file
            .delete()
            .map_err(|e| HomunculusError::io("removing observer pid file", e))?;
        Ok(outcome)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Loop
    // ─────────────────────────────────────────────────────────────────────────────

    /// Body of the detached observer process.
    ///
    /// Writes the pid file, waits out the warm-up, then ticks every interval
    /// until `shutdown` is set. The pid file is removed on the way out.
    pub fn run_loop(&self, shutdown: &AtomicBool) -> Result<()> {
        let pid_file = self.pid_file();
        let me = PidInfo::current();
        pid_file
            .write(&me)
            .map_err(|e| HomunculusError::io("writing observer pid file", e))?;
        tracing::info!(pid = me.pid, "Observer loop started");

        let warmup = Duration::from_secs(self.config.warmup_secs);
        let interval = Duration::from_secs(self.config.observer_interval_secs.max(1));

        if sleep_until_shutdown(warmup, shutdown) {
            loop {
                match self.analyze() {
                    Ok(outcome) => tracing::debug!(?outcome, "Observer tick finished"),
                    Err(e) => tracing::warn!(error = %e, "Observer tick failed"),
                }
                if !sleep_until_shutdown(interval, shutdown) {
                    break;
                }
            }
        }

        tracing::info!("Observer shutting down");
        if let Err(e) = pid_file.delete() {
            tracing::warn!(error = %e, "Failed to remove observer pid file");
        }
        Ok(())
    }
}

/// Sleeps for `total` in short slices. Returns false once shutdown is requested.
fn sleep_until_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
