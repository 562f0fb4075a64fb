//! Structured logging.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted first for the log filter.
pub const LOG_ENV_VAR: &str = "LINKWISE_LOG";

/// Environment variable overriding the configured log format.
pub const LOG_FORMAT_ENV_VAR: &str = "LINKWISE_LOG_FORMAT";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to pretty output.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive used when neither `LINKWISE_LOG` nor `RUST_LOG` is set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Raises the fallback filter to `debug` when verbose output is requested.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.filter = "debug".to_string();
        }
        self
    }

    /// Builds the effective filter: `LINKWISE_LOG`, then `RUST_LOG`, then
    /// the configured directive.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        self.env_filter_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn env_filter_from<F>(&self, lookup: F) -> EnvFilter
    where
        F: Fn(&str) -> Option<String>,
    {
        [LOG_ENV_VAR, "RUST_LOG"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .filter(|value| !value.trim().is_empty())
            .find_map(|value| EnvFilter::try_new(value).ok())
            .or_else(|| EnvFilter::try_new(&self.filter).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}
