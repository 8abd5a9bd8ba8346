//! Logging bootstrap for the tidsync crates.
//!
//! Built on the tracing ecosystem: an `EnvFilter` driven by environment
//! variables or the `[logging]` config section, a formatted stderr layer,
//! and an optional daily-rolling file layer.
//!
//! # Environment Variables
//!
//! - `TIDSYNC_LOG`: filter directive (like `RUST_LOG`), e.g. `tidsync=debug`
//! - `TIDSYNC_LOG_FORMAT`: stderr format: `pretty`, `json`, `compact`
//! - `TIDSYNC_LOG_DIR`: override the log directory for the file layer

use crate::Error;
use crate::config::LoggingConfig as ConfigLoggingConfig;
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    /// All available log formats.
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    /// Parse a log format from a string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    /// Get the string representation of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// Resolved logging settings used by [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Default log level for stderr output.
    pub level: String,
    /// Output format for stderr.
    pub format: LogFormat,
    /// Level for the optional file layer, `None` when file logging is off.
    pub file_level: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: LogFormat::default(), file_level: None }
    }
}

impl From<ConfigLoggingConfig> for LoggingSettings {
    fn from(config: ConfigLoggingConfig) -> Self {
        Self {
            level: config.level,
            format: LogFormat::parse_str(&config.format).unwrap_or_default(),
            file_level: config.file.enabled.then_some(config.file.level),
        }
    }
}

impl LoggingSettings {
    /// Build an EnvFilter from these settings and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("TIDSYNC_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    }

    /// Detect if stderr is a TTY for pretty formatting.
    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Determine the appropriate format for stderr output.
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("TIDSYNC_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        if Self::is_tty() { self.format } else { LogFormat::Compact }
    }

    /// Get the log directory path.
    fn log_dir() -> Result<PathBuf, Error> {
        if let Ok(custom_dir) = env::var("TIDSYNC_LOG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| Error::config("could not determine home directory"))?;

        Ok(PathBuf::from(home).join(".tidsync").join("logs"))
    }
}

/// Initialize the global tracing subscriber.
///
/// Sets up an environment-driven filter, a formatted stderr layer, and, when
/// file logging is enabled, a JSON daily-rolling file layer.
pub fn init_logging(settings: Option<LoggingSettings>) -> Result<(), Error> {
    let settings = settings.unwrap_or_default();
    let env_filter = settings.build_env_filter();
    let format = settings.detect_format();

    let registry = Registry::default().with(env_filter);

    if settings.file_level.is_some() {
        let log_dir = LoggingSettings::log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| Error::config(format!("failed to create log directory: {e}")))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "tidsync.log");
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

        match format {
            LogFormat::Pretty => {
                registry
                    .with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true))
                    .with(fmt::layer().json().with_writer(non_blocking))
                    .init();
            }
            LogFormat::Json => {
                registry
                    .with(fmt::layer().json().with_writer(io::stderr))
                    .with(fmt::layer().json().with_writer(non_blocking))
                    .init();
            }
            LogFormat::Compact => {
                registry
                    .with(fmt::layer().compact().with_writer(io::stderr))
                    .with(fmt::layer().json().with_writer(non_blocking))
                    .init();
            }
        }
    } else {
        match format {
            LogFormat::Pretty => {
                registry
                    .with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true))
                    .init();
            }
            LogFormat::Json => {
                registry.with(fmt::layer().json().with_writer(io::stderr)).init();
            }
            LogFormat::Compact => {
                registry.with(fmt::layer().compact().with_writer(io::stderr)).init();
            }
        }
    }

    Ok(())
}
