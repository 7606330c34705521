//! PID file for the background observer loop.
//!
//! Stored as `<homunculus>/.observer.pid`:
//!
//! ```text
//! PID=12345
//! STARTED=1736930000
//! ```
//!
//! `STARTED` is the process start time (unix seconds) and lets a reader tell
//! the observer apart from an unrelated process that later received the same
//! PID. A file holding only a bare number is read as a PID without start time.

use crate::process;
use fs_err as fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidInfo {
    pub pid: u32,
    pub started: Option<u64>,
}

impl PidInfo {
    /// Info for the calling process.
    pub fn current() -> Self {
        let pid = std::process::id();
        Self {
            pid,
            started: process::process_start_time(pid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// No process with that PID.
    NotRunning,
    /// The PID is alive but belongs to a different process.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ObserverPidFile {
    path: PathBuf,
}

impl ObserverPidFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn write(&self, info: &PidInfo) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut contents = format!("PID={}\n", info.pid);
        if let Some(started) = info.started {
            contents.push_str(&format!("STARTED={}\n", started));
        }

        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// `Ok(None)` when the file does not exist.
    pub fn read(&self) -> io::Result<Option<PidInfo>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Self::parse_contents(&contents).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Removes the file; a missing file is not an error.
    pub fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Reads the file and classifies the recorded process.
    pub fn check_running(&self) -> io::Result<Option<(ProcessStatus, PidInfo)>> {
        let Some(info) = self.read()? else {
            return Ok(None);
        };
        Ok(Some((verify_process(&info), info)))
    }

    fn parse_contents(contents: &str) -> io::Result<PidInfo> {
        let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_string());

        let mut pid: Option<u32> = None;
        let mut started: Option<u64> = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some(("PID", value)) => {
                    pid = Some(value.trim().parse().map_err(|_| invalid("Invalid PID value"))?);
                }
                Some(("STARTED", value)) => {
                    started = value.trim().parse().ok();
                }
                Some(_) => {}
                None if pid.is_none() => {
                    pid = Some(line.parse().map_err(|_| invalid("Invalid PID value"))?);
                }
                None => {}
            }
        }

        let pid = pid.ok_or_else(|| invalid("Missing PID field"))?;
        Ok(PidInfo { pid, started })
    }
}

pub fn verify_process(info: &PidInfo) -> ProcessStatus {
    if !process::is_pid_alive(info.pid) {
        return ProcessStatus::NotRunning;
    }
    if process::is_pid_alive_verified(info.pid, info.started) {
        ProcessStatus::Running
    } else {
        ProcessStatus::Stale
    }
}
