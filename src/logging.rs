//! Structured logging setup for the `routedoc` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the host. The CLI calls [`init_logging`] once at startup.
//!
//! ## Environment Variables
//!
//! - `ROUTEDOC_LOG`: filter directives (`debug`, `routedoc::resolver=trace`).
//!   Falls back to `RUST_LOG`, then to the level passed on the command line.
//! - `ROUTEDOC_LOG_FORMAT`: `pretty` (default) or `json`.
//! - `ROUTEDOC_LOG_LOCATION`: `true` to include file and line numbers.
//!
//! Logs go to stderr so that a document printed on stdout stays clean.

use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const LOG_ENV: &str = "ROUTEDOC_LOG";
pub const LOG_FORMAT_ENV: &str = "ROUTEDOC_LOG_FORMAT";
pub const LOG_LOCATION_ENV: &str = "ROUTEDOC_LOG_LOCATION";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directives, e.g. `info` or `routedoc=debug,warn`
    pub filter: String,
    pub format: LogFormat,
    pub include_location: bool,
}

impl LogConfig {
    /// Read the configuration from the environment, using `default_level`
    /// when no filter is set.
    pub fn from_env(default_level: &str) -> Self {
        let filter = env::var(LOG_ENV)
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| default_level.to_string());
        Self {
            filter,
            format: LogFormat::parse(&env::var(LOG_FORMAT_ENV).unwrap_or_default()),
            include_location: env::var(LOG_LOCATION_ENV)
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Install the global subscriber described by the environment.
pub fn init_logging(default_level: &str) -> Result<()> {
    init_logging_with_config(&LogConfig::from_env(default_level))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter '{}'", config.filter))?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = LogConfig {
            filter: "routedoc=notalevel".into(),
            format: LogFormat::Pretty,
            include_location: false,
        };
        assert!(init_logging_with_config(&config).is_err());
    }
}
