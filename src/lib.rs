//! # Linkwise
//!
//! Connection suggestions for personal knowledge graphs.
//!
//! Linkwise inspects a node/edge graph held in a relational store and proposes
//! likely-related nodes for a given node. Five independent heuristics (shared
//! tags, same community, mutual connections, temporal proximity and similar
//! content) each produce scored candidates; the engine merges them, keeps the
//! strongest signal per candidate, and returns a ranked, deduplicated list.
//!
//! ## Features
//!
//! - Stateless engine: every call reads fresh from the store
//! - Pluggable storage through the read-only [`GraphReader`] trait
//!   (`SQLite` and in-memory backends included)
//! - Explainable results: every suggestion carries a human-readable reason
//! - Tunable scoring constants via [`config::ScoringConfig`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use linkwise::{NodeId, SuggestionEngine, SuggestionOptions};
//! use linkwise::storage::graph::SqliteGraphStore;
//!
//! let store = SqliteGraphStore::new("graph.db")?;
//! let engine = SuggestionEngine::new(store);
//! let suggestions = engine.suggest_connections(
//!     &NodeId::new("note-42"),
//!     &SuggestionOptions::default(),
//! )?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{EngineConfig, LinkwiseConfig, ScoringConfig};
pub use models::{
    ConnectionSuggestion, Edge, Node, NodeId, SuggestionMetrics, SuggestionOptions,
    SuggestionType,
};
pub use services::SuggestionEngine;
pub use storage::GraphReader;

/// Error type for linkwise operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Suggestion options or scoring config fail validation |
/// | `QueryFailed` | A read query against the graph store fails |
/// | `DeadlineExceeded` | A caller-supplied deadline passes mid-pipeline |
/// | `OperationFailed` | Opening the store, reading config, joining workers |
///
/// Empty results (unknown node, isolated node, empty graph) are never errors.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - `max_suggestions` is zero
    /// - `min_confidence` is outside `[0, 1]` or not finite
    /// - `include_types` is empty or names an unknown type
    /// - A scoring constant would push confidence out of `[0, 1)`
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A storage query failed.
    ///
    /// The engine never retries; retry policy belongs to the caller.
    #[error("query '{operation}' failed: {cause}")]
    QueryFailed {
        /// The query (and heuristic, where applicable) that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The caller's deadline passed before suggestions were ready.
    #[error("deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded {
        /// Milliseconds spent before the deadline check tripped.
        elapsed_ms: u64,
    },

    /// A non-query operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::QueryFailed`] from any displayable cause.
    pub fn query(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::QueryFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for linkwise operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("max_suggestions must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid input: max_suggestions must be positive"
        );

        let err = Error::query("shared_tag_candidates", "no such table: node_tags");
        assert_eq!(
            err.to_string(),
            "query 'shared_tag_candidates' failed: no such table: node_tags"
        );

        let err = Error::DeadlineExceeded { elapsed_ms: 12 };
        assert_eq!(err.to_string(), "deadline exceeded after 12ms");
    }
}
