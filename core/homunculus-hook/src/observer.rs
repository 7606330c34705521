//! `homunculus observer …`: controller commands and the detached loop.

use crate::Context;
use homunculus_core::observer::{StopOutcome, TickOutcome};
use homunculus_core::{ClaudeCli, Observer};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Hidden subcommand name the controller spawns.
pub const LOOP_SUBCOMMAND: &str = "__loop";

const STARTUP_WAIT: Duration = Duration::from_secs(1);

fn observer(ctx: &Context) -> Observer<ClaudeCli> {
    Observer::new(
        ctx.storage.clone(),
        ctx.learning.clone(),
        ClaudeCli::new(ctx.learning.analyzer_binary.clone()),
    )
}

pub fn start(ctx: &Context) -> Result<(), String> {
    let observer = observer(ctx);
    if let Some(existing) = observer.running_instance() {
        println!("Observer already running (PID: {})", existing.pid);
        return Ok(());
    }

    let exe = std::env::current_exe().map_err(|e| format!("Cannot locate own binary: {}", e))?;
    let mut command = Command::new(exe);
    command
        .args(["observer", LOOP_SUBCOMMAND])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let child = command
        .spawn()
        .map_err(|e| format!("Failed to spawn observer loop: {}", e))?;
    tracing::info!(pid = child.id(), "Spawned observer loop");

    thread::sleep(STARTUP_WAIT);

    let log_file = ctx.storage.observer_log_file();
    match observer.pid_file().read() {
        Ok(Some(info)) => println!("Observer started (PID: {})", info.pid),
        _ => println!("Observer may have started, check log for details"),
    }
    println!("Log: {}", log_file.display());
    Ok(())
}

pub fn stop(ctx: &Context) -> Result<(), String> {
    match observer(ctx).stop().map_err(String::from)? {
        StopOutcome::NotRunning => println!("Observer not running"),
        StopOutcome::Stale(_) => println!("Observer not running (stale PID file)"),
        StopOutcome::Stopped(pid) => println!("Stopped observer (PID: {})", pid),
    }
    Ok(())
}

pub fn status(ctx: &Context) {
    let status = observer(ctx).status();
    match status.running {
        Some(info) => println!("Observer is running (PID: {})", info.pid),
        None => println!("Observer is NOT running"),
    }
    println!("Observations: {} events", status.observations);
    println!("Min for analysis: {}", status.min_observations);
    println!("Log: {}", status.log_file.display());
    println!("Instincts dir: {}", status.instincts_dir.display());
    println!("Instincts: {} learned", status.instinct_count);
}

pub fn analyze(ctx: &Context) -> Result<(), String> {
    println!("Running analysis in foreground...");
    let outcome = observer(ctx).analyze().map_err(String::from)?;
    match outcome {
        TickOutcome::Skipped { count, min } => {
            println!("Not enough observations ({}/{}), analysis skipped.", count, min)
        }
        TickOutcome::Failed { status, reason } => match status {
            Some(code) => println!("Analysis failed (exit {}): {}", code, reason),
            None => println!("Analysis failed: {}", reason),
        },
        TickOutcome::NoNewInstincts => {
            println!("Analysis completed. No instincts created, observations kept.")
        }
        TickOutcome::Archived {
            archive_path,
            instincts,
        } => {
            println!(
                "Analysis completed. {} instinct(s) created or updated.",
                instincts.len()
            );
            println!("Archived observations to {}", archive_path.display());
        }
    }
    Ok(())
}

pub fn sync(ctx: &Context) -> Result<(), String> {
    let count = observer(ctx).sync().map_err(String::from)?;
    if count == 0 {
        println!("No instincts to sync");
    } else {
        println!(
            "Instincts synced to {} ({} instinct(s))",
            ctx.storage.instincts_summary_file().display(),
            count
        );
    }
    Ok(())
}

/// Body of the detached process. Returns once SIGTERM/SIGINT arrives.
pub fn run_loop(ctx: &Context) -> Result<(), String> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| format!("Failed to install signal handler: {}", e))?;

    observer(ctx).run_loop(&shutdown).map_err(String::from)
}
