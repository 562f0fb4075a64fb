//! Observability: logging initialisation and metric names.
//!
//! The library only emits through the `tracing` and `metrics` facades. No
//! exporter is installed here; embedding applications choose their own
//! recorder.

mod logging;

pub use logging::{LOG_ENV_VAR, LOG_FORMAT_ENV_VAR, LogFormat, LoggingConfig};

use crate::{Error, Result};
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Metric names emitted by the engine and storage layers.
pub mod metric_names {
    /// Counter: suggestions returned, across all calls.
    pub const SUGGESTIONS_TOTAL: &str = "linkwise_suggestions_total";
    /// Histogram: wall time of one `suggest_connections` call.
    pub const SUGGEST_DURATION_MS: &str = "linkwise_suggest_duration_ms";
    /// Counter: raw candidates produced, labelled by `heuristic`.
    pub const HEURISTIC_CANDIDATES_TOTAL: &str = "linkwise_heuristic_candidates_total";
    /// Counter: heuristic query failures, labelled by `heuristic`.
    pub const HEURISTIC_FAILURES_TOTAL: &str = "linkwise_heuristic_failures_total";
    /// Histogram: distinct node ids per batch call.
    pub const BATCH_SIZE: &str = "linkwise_batch_size";
    /// Counter: poisoned `SQLite` mutexes recovered.
    pub const SQLITE_MUTEX_POISON_RECOVERY_TOTAL: &str =
        "linkwise_sqlite_mutex_poison_recovery_total";
}

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber.
///
/// Log lines go to stderr so stdout stays free for command output. Calling
/// this more than once is a no-op.
///
/// # Errors
///
/// Returns an error if another global subscriber was installed by someone
/// else first.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Ok(());
    }

    let filter = config.env_filter();
    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error)?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error)?,
    }

    // A concurrent caller may have won the race; either way we are initialised.
    let _ = LOGGING_INIT.set(());
    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        let first = init_logging(&config);
        // Another test binary component may own the global subscriber; only
        // a successful first call guarantees the second is a no-op.
        if first.is_ok() {
            assert!(init_logging(&config).is_ok());
        }
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            metric_names::SUGGESTIONS_TOTAL,
            metric_names::SUGGEST_DURATION_MS,
            metric_names::HEURISTIC_CANDIDATES_TOTAL,
            metric_names::HEURISTIC_FAILURES_TOTAL,
            metric_names::BATCH_SIZE,
            metric_names::SQLITE_MUTEX_POISON_RECOVERY_TOTAL,
        ] {
            assert!(name.starts_with("linkwise_"));
        }
    }
}
