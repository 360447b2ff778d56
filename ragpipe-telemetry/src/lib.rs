//! Logging setup shared by the ragpipe CLI and server.
//!
//! Logs go to stderr so command output on stdout stays clean. The filter is
//! taken from `RUST_LOG` when set, otherwise from the level passed to
//! [`init_logging`].

use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors from [`init_logging`].
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log format '{0}' (expected 'text' or 'json')")]
    UnknownFormat(String),

    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("a global subscriber is already installed")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Parse a level name (`error`, `warn`, `info`, `debug`, `trace`, `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    level.trim().parse::<LevelFilter>().map_err(|_| LoggingError::InvalidLevel(level.to_string()))
}

/// Build the filter: `RUST_LOG` if set and valid, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let level = parse_level(default_level)?;
    Ok(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if `default_level` is not a level name or a subscriber is already
/// installed (tests calling this twice, for instance).
pub fn init_logging(format: LogFormat, default_level: &str) -> Result<(), LoggingError> {
    let filter = env_filter(default_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).with_target(true))
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!(matches!("xml".parse::<LogFormat>(), Err(LoggingError::UnknownFormat(_))));
    }

    #[test]
    fn format_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
    }

    #[test]
    fn levels_parse() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::WARN);
        assert!(matches!(parse_level("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn second_init_is_an_error() {
        // Only this test installs a subscriber in this binary.
        init_logging(LogFormat::Json, "info").unwrap();
        assert!(matches!(
            init_logging(LogFormat::Text, "info"),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }
}
