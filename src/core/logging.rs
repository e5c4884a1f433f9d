//! Logging setup.
//!
//! Two sinks share one filter:
//! - a daily rolling JSON file in the data directory, for later inspection
//! - compact human-readable lines on stderr, so stdout stays clean for
//!   command output
//!
//! `log` macros are bridged into `tracing` by the subscriber's `tracing-log`
//! feature, and miette renders top-level errors.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// File name prefix of the rolling log.
pub const LOG_FILE_PREFIX: &str = "jobtrack.log";

// ============================================================================
// Logging Initialization
// ============================================================================

/// Initialize the logging system.
///
/// `RUST_LOG` wins over the configured level. Returns a `WorkerGuard` which
/// must be kept alive so buffered file output is flushed on shutdown.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> WorkerGuard {
    let log_dir = ensure_log_dir(log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = build_filter(&config.level);

    // File Layer: JSON format for easy parsing
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(env_filter.clone());

    // Stderr Layer: compact, colored only on a terminal
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .with_filter(env_filter);

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Failed to initialize tracing subscriber: {e}");
    }

    init_miette();

    log::debug!(
        "Logging initialized. Writing to: {:?} (daily rolling)",
        log_dir.join(LOG_FILE_PREFIX)
    );

    guard
}

/// Filter from `RUST_LOG`, or `default_level` when unset or invalid.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn ensure_log_dir(log_dir: &Path) -> PathBuf {
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("Failed to create logs directory {}: {e}", log_dir.display());
            return std::env::temp_dir();
        }
    }
    log_dir.to_path_buf()
}

fn init_miette() {
    let colorize = io::stderr().is_terminal();

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .color(colorize)
                .build(),
        )
    }))
    .ok(); // Ignore if already set
}
