//! Seam to the external language-model CLI.
//!
//! The observer and the session summarizer only see [`AnalysisTool`]; the
//! production implementation [`ClaudeCli`] runs
//! `claude --print --model <m> --max-turns <n> --allowedTools <list>` with the
//! prompt on stdin and a hard wall-clock timeout. Tests substitute a fake.

use crate::config::ENV_ANALYZER_MARKER;
use crate::error::{HomunculusError, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// One request to the analysis tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub prompt: String,
    pub model: String,
    pub max_turns: u32,
    pub allowed_tools: Vec<String>,
    pub timeout: Duration,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: "haiku".to_string(),
            max_turns: 1,
            allowed_tools: Vec::new(),
            timeout: Duration::from_secs(120),
            working_dir: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn allowed_tools(mut self, tools: &[&str]) -> Self {
        self.allowed_tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait AnalysisTool {
    /// Runs one invocation. Spawn failures and timeouts are errors; a
    /// non-zero exit is a successful call with a failing [`ToolOutput`].
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// The `claude` binary in print mode.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    binary: String,
}

impl ClaudeCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn args(invocation: &Invocation) -> Vec<String> {
        vec![
            "--print".to_string(),
            "--model".to_string(),
            invocation.model.clone(),
            "--max-turns".to_string(),
            invocation.max_turns.to_string(),
            "--allowedTools".to_string(),
            invocation.allowed_tools.join(","),
        ]
    }
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self::new("claude")
    }
}

impl AnalysisTool for ClaudeCli {
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let mut command = Command::new(&self.binary);
        command
            .args(Self::args(invocation))
            .env(ENV_ANALYZER_MARKER, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| HomunculusError::CommandFailed {
            command: self.binary.clone(),
            details: e.to_string(),
        })?;

        // Drain both pipes off-thread so a chatty child never blocks on write.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(invocation.prompt.as_bytes()) {
                tracing::debug!(error = %e, "Analyzer closed stdin early");
            }
        }

        let status = match child
            .wait_timeout(invocation.timeout)
            .map_err(|e| HomunculusError::io(format!("waiting for {}", self.binary), e))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(HomunculusError::CommandTimedOut {
                    command: self.binary.clone(),
                    secs: invocation.timeout.as_secs(),
                });
            }
        };

        Ok(ToolOutput {
            status: status.code(),
            stdout: join_reader(stdout_reader),
            stderr: join_reader(stderr_reader),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// First `max_chars` characters of `text`, for log lines.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
