//! Tracing setup for the CLI.
//!
//! Logs go to a daily-rolling file under `~/.vitalscope/logs/`. When that
//! directory cannot be created the subscriber writes to stderr instead.

use fs_err as fs;
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use vitalscope_core::StorageConfig;

const DEBUG_ENV: &str = "VITALSCOPE_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "vitalscope.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// process lifetime or buffered lines are lost on exit.
pub fn init() -> Option<WorkerGuard> {
    let filter = env_filter();

    let logs_dir = StorageConfig::from_home()
        .ok()
        .map(|storage| storage.logs_dir())
        .filter(|dir| fs::create_dir_all(dir).is_ok());

    match logs_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn env_filter() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}
