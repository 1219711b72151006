//! Logging bootstrap.
//!
//! Installs a `tracing` subscriber with an env-filter (`RUST_LOG`,
//! default `info`) writing to stderr, and optionally to a daily-rolling
//! log file. The returned guard must be held for the life of the process
//! or buffered file output is lost.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging.
///
/// * `default_filter` — filter used when `RUST_LOG` is unset, e.g. `"info"`.
/// * `log_dir` — when set, also write a daily-rolling `geotimesheet.log`.
pub fn init_logging(default_filter: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "geotimesheet.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            fmt()
                .with_env_filter(filter)
                .with_timer(LocalTime::rfc_3339())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_timer(LocalTime::rfc_3339())
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
