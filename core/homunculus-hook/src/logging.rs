//! Tracing setup.
//!
//! Everything goes to stderr so hook stdout stays a clean pass-through of the
//! host's payload. Observer commands additionally append to `observer.log`.

use std::env;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEBUG_ENV: &str = "HOMUNCULUS_DEBUG_LOG";

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn filter(default_level: &str) -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }
}

/// Installs the global subscriber.
///
/// With `observer_log`, an extra non-ANSI layer writes to that file and the
/// default level rises to `info`. The returned guard must live until exit.
pub fn init(observer_log: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let Some(log_path) = observer_log else {
        let _ = tracing_subscriber::registry()
            .with(filter("warn"))
            .with(stderr_layer)
            .try_init();
        return None;
    };

    let file_writer = log_path
        .parent()
        .zip(log_path.file_name())
        .and_then(|(dir, name)| {
            let _ = fs_err::create_dir_all(dir);
            RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name.to_string_lossy().into_owned())
                .build(dir)
                .ok()
        });

    match file_writer {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::registry()
                .with(filter("info"))
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter("info"))
                .with(stderr_layer)
                .try_init();
            tracing::warn!(path = %log_path.display(), "Observer log file unavailable");
            None
        }
    }
}
