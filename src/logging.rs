//! Structured logging setup.
//!
//! The dispatcher emits `tracing` events with structured fields at every
//! state transition; this module installs the subscriber that prints them.
//! Configuration comes from the environment:
//!
//! - `METIME_LOG_LEVEL` - trace/debug/info/warn/error (default `info`)
//! - `METIME_LOG_FORMAT` - `json` or `pretty` (default `json`)
//! - `METIME_LOG_TARGET_FILTER` - extra comma-separated `EnvFilter` directives
//! - `METIME_LOG_INCLUDE_LOCATION` - include file and line (default `false`)
//! - `METIME_LOG_ASYNC` - write through a non-blocking buffer (default `true`)
//!
//! `RUST_LOG`, when set, takes precedence over `METIME_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through `tracing_appender::non_blocking`
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl LogConfig {
    /// Read `METIME_LOG_*` variables, falling back to production defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default_prod();
        Self {
            log_level: env::var("METIME_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("METIME_LOG_FORMAT")
                .map(|raw| LogFormat::parse(&raw))
                .unwrap_or(defaults.format),
            async_logging: env::var("METIME_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: env::var("METIME_LOG_TARGET_FILTER").ok(),
            include_location: env::var("METIME_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, human-readable, synchronous.
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Build the `EnvFilter` for this configuration.
    ///
    /// # Errors
    ///
    /// Fails if a directive in `target_filter` does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // The accept loop logs every connection at debug.
        filter = filter.add_directive(
            "may_minihttp=warn"
                .parse()
                .context("invalid built-in log directive")?,
        );

        if let Some(target_filter) = &self.target_filter {
            for directive in target_filter.split(',').map(str::trim) {
                if directive.is_empty() {
                    continue;
                }
                filter = filter.add_directive(
                    directive
                        .parse()
                        .with_context(|| format!("invalid log filter directive '{directive}'"))?,
                );
            }
        }
        Ok(filter)
    }
}

/// Keeps the background writer alive. Drop it on shutdown to flush.
#[must_use = "dropping the guard stops asynchronous log output"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an invalid filter directive or when a global subscriber is
/// already installed.
///
/// ```no_run
/// use metime::logging::{init_logging_with_config, LogConfig};
///
/// let _guard = init_logging_with_config(&LogConfig::from_env())
///     .expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let env_filter = config.env_filter()?;

    let (writer, worker) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking),
            Some(guard),
        )
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}
