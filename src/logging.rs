//! Logging configuration using the tracing ecosystem.
//!
//! This module configures structured logging with:
//! - File-based output (stdout carries command results)
//! - Daily log rotation
//! - Environment-based log level configuration
//!
//! It also provides [`log_message`] and [`log_error`], which record a
//! reportable event and hand back an identifier a user can quote.

use std::fmt::Write as _;
use std::path::PathBuf;

use rand::RngCore;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "sentry_access=info,warn";

/// Initialize the logging system.
///
/// Sets up tracing with:
/// - Daily rotating file appender in the user's local data directory
/// - Log level configuration via `RUST_LOG` environment variable
/// - Structured output with file/line numbers and thread IDs
///
/// # Log Directory
///
/// Logs are stored in the platform-specific local data directory:
/// - Linux: `~/.local/share/sentry-access/logs/`
/// - macOS: `~/Library/Application Support/sentry-access/logs/`
/// - Windows: `C:\Users\<User>\AppData\Local\sentry-access\logs\`
///
/// # Log Levels
///
/// Configure via `RUST_LOG` environment variable:
/// - `RUST_LOG=debug` - Verbose output for debugging
/// - `RUST_LOG=sentry_access=debug` - Debug only for this crate, including
///   request URLs and failed response bodies
///
/// # Errors
///
/// Returns an error if:
/// - The log directory cannot be determined or created
/// - The tracing subscriber cannot be set
pub fn init() -> anyhow::Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "sentry-access.log");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sentry-access starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

/// Get the log directory path.
fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("sentry-access").join("logs"))
}

/// Get the path where logs are stored.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

/// Log application shutdown.
pub fn shutdown() {
    tracing::info!("sentry-access shutting down");
}

/// A fresh 32-hex-digit event identifier.
fn new_event_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(32), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

fn format_contexts(contexts: &[(&str, &str)]) -> String {
    contexts
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Record a reportable message with context pairs.
///
/// Returns the event identifier attached to the log line.
pub fn log_message(message: &str, contexts: &[(&str, &str)]) -> String {
    let event_id = new_event_id();
    tracing::error!(
        event_id = %event_id,
        contexts = %format_contexts(contexts),
        "{}",
        message
    );
    event_id
}

/// Record an error, including its source chain, with context pairs.
///
/// Returns the event identifier attached to the log line.
pub fn log_error(error: &dyn std::error::Error, contexts: &[(&str, &str)]) -> String {
    let event_id = new_event_id();

    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(chain, ": {}", cause);
        source = cause.source();
    }

    tracing::error!(
        event_id = %event_id,
        contexts = %format_contexts(contexts),
        error = %chain,
        "Error reported"
    );
    event_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_has_expected_structure() {
        let dir = get_log_directory().unwrap();
        assert!(dir.ends_with("sentry-access/logs"));
    }

    #[test]
    fn test_log_directory_public_function() {
        let dir = log_directory();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("sentry-access/logs"));
    }

    #[test]
    fn test_event_ids_are_32_hex_and_unique() {
        let a = log_message("something happened", &[("organization.slug", "acme")]);
        let b = log_message("something happened", &[]);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_log_error_returns_id() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let id = log_error(&err, &[("project.slug", "web")]);
        assert_eq!(id.len(), 32);
    }

    #[test]
    fn test_format_contexts() {
        assert_eq!(
            format_contexts(&[("a", "1"), ("b", "2")]),
            "a=1 b=2"
        );
        assert_eq!(format_contexts(&[]), "");
    }
}
