//! Logging.
//!
//! Structured logging on the `tracing` crate with configurable level,
//! format, and destination. Environment variables take priority over the
//! configuration file: `PLINTH_LOG` (filter directives),
//! `PLINTH_LOG_FORMAT` (json|text), `PLINTH_LOG_OUTPUT` (stdout|file).

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: json or text.
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout or file.
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (when output is "file").
    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Colored output (text format, stdout only).
    #[serde(default = "default_color")]
    pub color: bool,

    /// Module-specific level overrides.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}

fn default_file() -> PathBuf {
    PathBuf::from(".plinth/plinth.log")
}

fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: default_file(),
            color: default_color(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at process start; a second call returns an error from the
/// subscriber registry.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let filter = build_env_filter(config)?;
    let format = std::env::var("PLINTH_LOG_FORMAT")
        .ok()
        .filter(|f| f == "json" || f == "text")
        .unwrap_or_else(|| config.map(|c| c.format.clone()).unwrap_or_else(default_format));
    let output = std::env::var("PLINTH_LOG_OUTPUT")
        .ok()
        .unwrap_or_else(|| config.map(|c| c.output.clone()).unwrap_or_else(default_output));

    if format != "json" && format != "text" {
        return Err(ConfigError::Invalid(format!(
            "invalid log format: {format} (must be 'json' or 'text')"
        )));
    }

    let base = Registry::default().with(filter);
    let use_color = config.map(|c| c.color).unwrap_or(true);

    match output.as_str() {
        "file" => {
            let path = config.map(|c| c.file.clone()).unwrap_or_else(default_file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::Invalid(format!("failed to create log directory: {e}"))
                })?;
            }
            let writer = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    ConfigError::Invalid(format!("failed to open log file {path:?}: {e}"))
                })?;
            if format == "json" {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(writer),
                )
                .init();
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            }
        }
        "stdout" => {
            if format == "json" {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stdout),
                )
                .init();
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(use_color)
                        .with_writer(std::io::stdout),
                )
                .init();
            }
        }
        other => {
            return Err(ConfigError::Invalid(format!(
                "invalid log output: {other} (must be 'stdout' or 'file')"
            )));
        }
    }

    Ok(())
}

/// Filter priority: `PLINTH_LOG` env var, then config level plus
/// per-module overrides.
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("PLINTH_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);
    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{module}={module_level}");
            filter = filter.add_directive(directive.parse().map_err(|e| {
                ConfigError::Invalid(format!("invalid log directive '{directive}': {e}"))
            })?);
        }
    }
    Ok(filter)
}
