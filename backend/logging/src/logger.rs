//! Structured Logger
//!
//! Wraps `tracing` to provide a console layer, a rolling NDJSON file, and
//! environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "qchat.log";

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn file_appender<P: AsRef<Path>>(log_dir: P) -> RollingFileAppender {
    // `<log_dir>/qchat.log.YYYY-MM-DD`
    RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX)
}

/// Initialize the global structured logger.
/// Console output goes to stderr so stdout stays free for command output.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) {
    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender(log_dir))
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Initialize file-only logging, for interactive sessions that own the terminal.
pub fn init_file_logger<P: AsRef<Path>>(log_dir: P, level: &str) {
    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender(log_dir))
        .with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .try_init();
}
