//! Hook entry points invoked by the host CLI.
//!
//! Hooks never fail the host: every function here logs its own errors and
//! returns normally. Messages meant for the user go to the `out` writer
//! (stderr in production).

use crate::Context;
use homunculus_core::analyzer::{excerpt, AnalysisTool, Invocation};
use homunculus_core::sessions::summary::{self, MIN_SUMMARY_CHARS, MIN_USER_MESSAGES};
use homunculus_core::{compact, console_log, fsutil, package_manager, process};
use homunculus_core::{AliasStore, HookPhase, ObservationRecorder, ResolveOptions, SessionStore};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

const RECENT_SESSION_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const SESSION_START_ALIASES: usize = 5;
const SUMMARY_PLACEHOLDER: &str = "[Session context goes here]";
const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(120);
const SUMMARIZE_STDERR_CHARS: usize = 200;

/// Appends one observation for a tool-use event.
pub fn observe(ctx: &Context, phase: HookPhase, payload: &str) {
    let recorder = ObservationRecorder::new(&ctx.storage);
    if recorder.record(phase, payload, &ctx.env) {
        tracing::debug!(phase = ?phase, session = ?ctx.env.short_session_id(), "Recorded observation");
    }
}

pub fn suggest_compact(ctx: &Context, out: &mut impl Write) {
    let key = compact::session_key(&ctx.env);
    let count = match compact::increment(&ctx.storage, &key) {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update tool counter");
            return;
        }
    };
    if let Some(message) = compact::suggestion(count, ctx.env.compact_threshold) {
        let _ = writeln!(out, "{}", message);
    }
}

pub fn check_console_log(ctx: &Context, out: &mut impl Write) {
    let hits = console_log::scan(ctx.storage.project_root());
    for line in console_log::warnings(&hits) {
        let _ = writeln!(out, "{}", line);
    }
}

/// Recent sessions, available aliases and the package manager in use.
pub fn session_start(ctx: &Context, out: &mut impl Write) {
    let sessions = SessionStore::new(ctx.storage.sessions_dir());
    if let Err(e) = fsutil::ensure_dir(sessions.dir()) {
        tracing::warn!(error = %e, "Failed to create sessions directory");
    }

    let recent = sessions.recent(RECENT_SESSION_AGE);
    if let Some(latest) = recent.first() {
        let _ = writeln!(out, "[SessionStart] Found {} recent session(s)", recent.len());
        let _ = writeln!(out, "[SessionStart] Latest: {}", latest.session_path.display());

        if let Some(previous) = sessions
            .content(&latest.session_path)
            .as_deref()
            .and_then(previous_summary)
        {
            let _ = writeln!(out, "[SessionStart] === Previous Session Summary ===");
            let _ = writeln!(out, "{}", previous);
            let _ = writeln!(out, "[SessionStart] === End Previous Session ===");
        }
    }

    let aliases = AliasStore::new(ctx.storage.aliases_file()).list(None, Some(SESSION_START_ALIASES));
    if !aliases.is_empty() {
        let names: Vec<&str> = aliases.iter().map(|a| a.name.as_str()).collect();
        let _ = writeln!(
            out,
            "[SessionStart] {} session alias(es) available: {}",
            aliases.len(),
            names.join(", ")
        );
        let _ = writeln!(
            out,
            "[SessionStart] Use /sessions load <alias> to continue a previous session"
        );
    }

    let resolved = package_manager::resolve_package_manager(
        &ResolveOptions::new(&ctx.storage, &ctx.env),
        process::command_exists,
    );
    let _ = writeln!(
        out,
        "[SessionStart] Package manager: {} ({})",
        resolved.manager, resolved.source
    );
    if resolved.source.is_guess() {
        let _ = writeln!(out, "[SessionStart] No package manager preference found.");
        let available = package_manager::available_package_managers(process::command_exists);
        let _ = write!(
            out,
            "{}",
            package_manager::selection_prompt(&available, resolved.manager)
        );
    }
}

/// The part of a session file after its `---` separator, when it holds a
/// generated summary rather than the empty template.
fn previous_summary(content: &str) -> Option<String> {
    if !content.contains("## Current State") || content.contains(SUMMARY_PLACEHOLDER) {
        return None;
    }
    let parts: Vec<&str> = split_on_separator(content);
    if parts.len() >= 2 {
        Some(parts[1..].join("---").trim().to_string())
    } else {
        Some(content.to_string())
    }
}

/// Splits on lines consisting of exactly `---`.
fn split_on_separator(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == "---" {
            parts.push(&content[start..offset]);
            start = offset + 3;
        }
        offset += line.len();
    }
    parts.push(&content[start..]);
    parts
}

/// Summarizes the transcript into the most recent session file.
pub fn summarize_session(ctx: &Context, tool: &impl AnalysisTool) {
    let Some(transcript) = ctx.env.transcript_path.as_deref().filter(|p| p.exists()) else {
        tracing::info!("[Summarize] No transcript found, skipping");
        return;
    };

    let count = summary::count_user_messages_in(transcript);
    if count < MIN_USER_MESSAGES {
        tracing::info!(count, "[Summarize] Session too short, skipping");
        return;
    }

    let Some(session_file) = summary::latest_session_file(&ctx.storage.sessions_dir()) else {
        tracing::info!("[Summarize] No session file found, skipping");
        return;
    };

    tracing::info!(count, "[Summarize] Summarizing session");
    let invocation = Invocation::new(summary::summarize_prompt(transcript))
        .model(ctx.learning.analyzer_model.clone())
        .max_turns(3)
        .allowed_tools(&["Read"])
        .timeout(SUMMARIZE_TIMEOUT);

    let output = match tool.invoke(&invocation) {
        Ok(output) if output.success() => output,
        Ok(output) => {
            tracing::warn!(
                status = ?output.status,
                stderr = excerpt(&output.stderr, SUMMARIZE_STDERR_CHARS),
                "[Summarize] Summarizer failed"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "[Summarize] Summarizer failed");
            return;
        }
    };

    let raw = output.stdout.trim();
    if raw.chars().count() < MIN_SUMMARY_CHARS {
        tracing::info!("[Summarize] Empty or too short summary, skipping");
        return;
    }

    write_summary(&session_file, summary::extract_summary(raw));
}

fn write_summary(session_file: &Path, cleaned: &str) {
    let Some(existing) = fsutil::read_file(session_file) else {
        tracing::warn!(path = %session_file.display(), "[Summarize] Session file unreadable");
        return;
    };
    let merged = summary::merge_summary(&existing, cleaned);
    match fsutil::write_file(session_file, &merged) {
        Ok(()) => tracing::info!(path = %session_file.display(), "[Summarize] Written summary"),
        Err(e) => tracing::warn!(error = %e, "[Summarize] Write error"),
    }
}

/// Flags long sessions as candidates for skill extraction.
pub fn evaluate_session(ctx: &Context, out: &mut impl Write) {
    let skills_dir = ctx
        .learning
        .learned_skills_dir(ctx.storage.learned_skills_dir());
    if let Err(e) = fsutil::ensure_dir(&skills_dir) {
        tracing::warn!(error = %e, "Failed to create learned skills directory");
    }

    let Some(transcript) = ctx.env.transcript_path.as_deref().filter(|p| p.exists()) else {
        return;
    };

    let count = summary::count_user_messages_in(transcript);
    let min = ctx.learning.min_session_length;
    if count < min {
        let _ = writeln!(
            out,
            "[ContinuousLearning] Session too short ({} messages), skipping",
            count
        );
        return;
    }

    let _ = writeln!(
        out,
        "[ContinuousLearning] Session has {} messages - evaluate for extractable patterns",
        count
    );
    let _ = writeln!(
        out,
        "[ContinuousLearning] Save learned skills to: {}",
        skills_dir.display()
    );
}
