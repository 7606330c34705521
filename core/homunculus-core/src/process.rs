//! Process and external-command helpers.
//!
//! Liveness uses `kill(pid, 0)`; identity uses the start time reported by
//! `sysinfo` so a recycled PID is not mistaken for the original process.

use crate::error::{HomunculusError, Result};
use crate::patterns::RE_COMMAND_NAME;
use std::path::Path;
use std::process::{Command, Stdio};

/// Allowed drift between a recorded start time and the one sysinfo reports.
const START_TIME_TOLERANCE_SECS: u64 = 2;

pub fn is_pid_alive(pid: u32) -> bool {
    // 0 and values past i32::MAX would address process groups
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Start time of a process as a Unix timestamp, if it exists.
pub fn process_start_time(pid: u32) -> Option<u64> {
    use sysinfo::{Pid, ProcessRefreshKind, System};

    let mut sys = System::new();
    let sysinfo_pid = Pid::from(pid as usize);
    sys.refresh_process_specifics(sysinfo_pid, ProcessRefreshKind::new());
    sys.process(sysinfo_pid).map(|process| process.start_time())
}

/// True when `pid` is alive and, if `expected_start` is known, started then.
pub fn is_pid_alive_verified(pid: u32, expected_start: Option<u64>) -> bool {
    if !is_pid_alive(pid) {
        return false;
    }
    let Some(expected) = expected_start else {
        return true;
    };
    match process_start_time(pid) {
        Some(actual) => actual.abs_diff(expected) <= START_TIME_TOLERANCE_SECS,
        None => false,
    }
}

/// Sends SIGTERM. Returns `Ok(false)` if the process was already gone.
pub fn send_sigterm(pid: u32) -> Result<bool> {
    if pid == 0 || pid > i32::MAX as u32 {
        return Ok(false);
    }
    #[cfg(unix)]
    {
        // SAFETY: kill(2) with SIGTERM has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if rc == 0 {
            return Ok(true);
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(false);
        }
        Err(HomunculusError::io(format!("sending SIGTERM to {}", pid), err))
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(HomunculusError::UnsupportedPlatform(
            "signal delivery".to_string(),
        ))
    }
}

/// Whether `name` resolves to an executable on PATH.
///
/// Names containing anything other than `[a-zA-Z0-9_.-]` are rejected
/// without running a probe.
pub fn command_exists(name: &str) -> bool {
    if !RE_COMMAND_NAME.is_match(name) {
        return false;
    }
    let probe = if cfg!(windows) { "where" } else { "which" };
    Command::new(probe)
        .arg(name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Runs a command and returns trimmed stdout when it exits successfully.
pub fn run_command(program: &str, args: &[&str], cwd: Option<&Path>) -> Option<String> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stderr(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    match command.output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => {
            tracing::debug!(program, status = ?output.status, "Command exited unsuccessfully");
            None
        }
        Err(e) => {
            tracing::debug!(program, error = %e, "Command could not be started");
            None
        }
    }
}

pub fn is_git_repo(dir: &Path) -> bool {
    run_command("git", &["rev-parse", "--git-dir"], Some(dir)).is_some()
}

/// Files changed relative to `HEAD`, relative to the repository root.
pub fn git_modified_files(dir: &Path) -> Vec<String> {
    run_command("git", &["diff", "--name-only", "HEAD"], Some(dir))
        .map(|out| {
            out.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
