//! Logging setup
//!
//! Library code logs through the `log` facade. `init_logger` installs a
//! `tracing` subscriber that also receives those records: stderr always, plus
//! a daily rolling file when a log directory is given.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{DomainError, DomainResult};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Keep the returned guard alive for
/// as long as file logging is wanted; dropping it flushes and stops the
/// writer. Fails with `Internal` if a global subscriber already exists.
pub fn init_logger(log_dir: Option<&Path>, app_name: &str, level: &str) -> DomainResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| DomainError::Config(format!("invalid log level '{}': {}", level, e)))?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|e| DomainError::Config(format!("failed to create {}: {}", dir.display(), e)))?;
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", app_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| DomainError::Internal(format!("logger already initialized: {}", e)))?;

    tracing::info!(app = app_name, "logging initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_once() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");

        let guard = init_logger(Some(&logs), "todo-live-test", "debug").unwrap();
        assert!(guard.is_some());
        assert!(logs.is_dir());
        log::info!("bridged from the log facade");

        let again = init_logger(None, "todo-live-test", "info");
        assert!(matches!(again, Err(DomainError::Internal(_))));
    }
}
