//! Helpers for writing a model-generated summary into the latest session file.

use crate::fsutil;
use crate::patterns::RE_USER_MESSAGE;
use std::path::{Path, PathBuf};

/// Transcripts with fewer user messages than this are not summarized.
pub const MIN_USER_MESSAGES: usize = 5;

/// Summaries shorter than this are treated as a failed generation.
pub const MIN_SUMMARY_CHARS: usize = 20;

const CURRENT_STATE_HEADING: &str = "## Current State";

/// Occurrences of `"type":"user"` in a JSONL transcript.
pub fn count_user_messages(transcript: &str) -> usize {
    RE_USER_MESSAGE.find_iter(transcript).count()
}

/// Same as [`count_user_messages`] but reads the file; 0 when unreadable.
pub fn count_user_messages_in(path: &Path) -> usize {
    fsutil::count_in_file(path, &RE_USER_MESSAGE)
}

/// Everything from `## Current State` on, or the whole output trimmed.
pub fn extract_summary(output: &str) -> &str {
    match output.find(CURRENT_STATE_HEADING) {
        Some(idx) => output[idx..].trim(),
        None => output.trim(),
    }
}

/// Replaces everything after the first `---` line with `summary`.
///
/// Without a separator line the summary is appended.
pub fn merge_summary(existing: &str, summary: &str) -> String {
    let mut offset = 0;
    for line in existing.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "---" {
            return format!("{}---\n\n{}\n", &existing[..offset], summary);
        }
        offset += line.len();
    }
    format!("{}\n{}\n", existing, summary)
}

/// Most recently modified `*-session.tmp` file in `sessions_dir`.
pub fn latest_session_file(sessions_dir: &Path) -> Option<PathBuf> {
    fsutil::find_files(sessions_dir, "*-session.tmp", None)
        .into_iter()
        .next()
        .map(|found| found.path)
}

/// Instructions handed to the summarizer along with the transcript path.
pub fn summarize_prompt(transcript_path: &Path) -> String {
    format!(
        "You are a session summarizer. Read the transcript file and produce a concise summary.

Transcript file: {}

Read the transcript, then output ONLY a markdown summary in this exact format (no extra text):

## Current State
<1-2 sentence overview of what was being worked on>

### Completed
- <item 1>
- <item 2>

### In Progress
- <item if any, or \"None\">

### Notes for Next Session
- <key context or unresolved issues>

### Key Files
- <file paths that were important in this session>

Rules:
- Be concise, each bullet should be one line
- Maximum 5 items per section
- Use actual file paths from the transcript
- Do not include code snippets, only describe what was done",
        transcript_path.display()
    )
}
