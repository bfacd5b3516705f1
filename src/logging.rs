//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a JSON
//! or pretty `fmt` layer, optionally written through a non-blocking
//! `tracing-appender` worker.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `EXPRESS_LOG_LEVEL` | `info` | base level when `RUST_LOG` is unset |
//! | `EXPRESS_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `EXPRESS_LOG_ASYNC` | `true` | buffer output on a background thread |
//! | `EXPRESS_LOG_TARGET_FILTER` | unset | extra comma separated directives |
//! | `EXPRESS_LOG_INCLUDE_LOCATION` | `false` | file and line in each event |

use std::env;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::parse_bool;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` selects JSON
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read the `EXPRESS_LOG_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("EXPRESS_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("EXPRESS_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
            async_logging: lookup("EXPRESS_LOG_ASYNC")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("EXPRESS_LOG_TARGET_FILTER").filter(|v| !v.trim().is_empty()),
            include_location: lookup("EXPRESS_LOG_INCLUDE_LOCATION")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.include_location),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.to_ascii_lowercase()));

        // Client disconnects are reported by the transport at info level.
        if let Ok(directive) = "may_minihttp=warn".parse() {
            filter = filter.add_directive(directive);
        }

        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Keeps the background log writer alive; pending lines are flushed when
/// it is dropped.
#[must_use = "dropping the guard stops the background log writer"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let (writer, worker) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
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
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    registry
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}
