//! Logging initialization.
//!
//! Command output goes to stdout, so logs always go to stderr:
//! - **Default**: compact, `info` and above unless overridden
//! - **`--json`**: additionally JSON logs to daily rolling files under the
//!   data directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the non-blocking file writer alive for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "MEDIBOOK_LOG_LEVEL";

/// Level used when neither `RUST_LOG` nor [`LOG_LEVEL_ENV`] is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Initialize logging.
///
/// `RUST_LOG` takes precedence over [`LOG_LEVEL_ENV`], which defaults to
/// [`DEFAULT_LOG_LEVEL`].
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed or the log directory
/// cannot be created.
pub fn init(json_dir: Option<&Path>) -> anyhow::Result<()> {
    let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    match json_dir {
        Some(data_dir) => {
            let log_dir = log_directory(data_dir);
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "medibook");
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stderr_layer())
                .init();

            let _ = FILE_GUARD.set(file_guard);
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer())
                .init();
        }
    }

    Ok(())
}

/// Compact stderr layer, generic over the subscriber it is stacked on.
fn stderr_layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
}

/// Directory holding rolling log files.
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_is_info() {
        assert_eq!(DEFAULT_LOG_LEVEL, "info");
        assert!(EnvFilter::try_new(DEFAULT_LOG_LEVEL).is_ok());
    }

    #[test]
    fn test_logs_live_under_data_dir() {
        let dir = log_directory(Path::new("/tmp/medibook"));
        assert_eq!(dir, PathBuf::from("/tmp/medibook/logs"));
    }
}
