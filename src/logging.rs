//! Tracing configuration and log routing.
//!
//! The server logs to stdout using a compact formatter and mirrors everything into a file.
//! `COMPANION_LOG_FILE` selects the file path; otherwise logs are written to
//! `logs/companion.log`. The file layer sits behind a non-blocking writer so request handlers
//! never wait on disk.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "COMPANION_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "companion.log";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where the file layer writes.
#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    /// Append to the file named by `COMPANION_LOG_FILE`.
    Explicit(PathBuf),
    /// `logs/companion.log` relative to the working directory.
    Default,
}

impl LogTarget {
    fn from_env_value(value: Option<String>) -> Self {
        match value {
            Some(path) if !path.trim().is_empty() => Self::Explicit(PathBuf::from(path.trim())),
            _ => Self::Default,
        }
    }
}

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when the file can be opened, a file layer.
/// - Keeps the non-blocking writer guard alive for the process lifetime.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let target = LogTarget::from_env_value(std::env::var(LOG_FILE_ENV).ok());
    let file_layer = open_log_writer(&target).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();
}

/// Open the file writer for `target`; `None` disables file logging.
fn open_log_writer(target: &LogTarget) -> Option<NonBlocking> {
    match target {
        LogTarget::Explicit(path) => {
            match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(install_writer(file)),
                Err(err) => {
                    eprintln!("Failed to open log file {}: {err}", path.display());
                    None
                }
            }
        }
        LogTarget::Default => {
            if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let appender = tracing_appender::rolling::never(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE);
            Some(install_writer(appender))
        }
    }
}

fn install_writer<W>(writer: W) -> NonBlocking
where
    W: std::io::Write + Send + 'static,
{
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);
    let _ = LOG_GUARD.set(guard);
    non_blocking
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_missing_path_uses_default_file() {
        assert_eq!(LogTarget::from_env_value(None), LogTarget::Default);
        assert_eq!(LogTarget::from_env_value(Some("   ".into())), LogTarget::Default);
    }

    #[test]
    fn explicit_path_is_trimmed() {
        assert_eq!(
            LogTarget::from_env_value(Some(" /tmp/companion-test.log ".into())),
            LogTarget::Explicit(PathBuf::from("/tmp/companion-test.log"))
        );
    }
}
