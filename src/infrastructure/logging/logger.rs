use std::io;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::services::config::LoggingConfig;

/// Owns the non-blocking writer guard for the lifetime of the process.
/// Dropping it flushes any buffered file-appender output, so callers must
/// keep the returned `LoggerImpl` alive for as long as logging is needed.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Initialize the global `tracing` subscriber from a `LoggingConfig`.
    /// Human-readable ANSI output to stderr is the default; `json_logs`
    /// switches to a JSON layer. When `log_dir` is set, a second JSON
    /// layer writes daily-rotated files there regardless of `json_logs`.
    pub fn init(config: &LoggingConfig) -> Result<Self, LoggerError> {
        let level = to_tracing_level(config.log_level.as_str())?;
        let env_filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let stderr_layer = if config.json_logs {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(true)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true)
                .with_target(false)
                .boxed()
        };

        let guard = if let Some(ref log_dir) = config.log_dir {
            let file_appender = rolling::daily(log_dir, "gepa-forge.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            None
        };

        tracing::info!(
            level = config.log_level.as_str(),
            json = config.json_logs,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { _guard: guard })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
}

fn to_tracing_level(level: &str) -> Result<Level, LoggerError> {
    match level {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(LoggerError::InvalidLevel(other.to_string())),
    }
}
