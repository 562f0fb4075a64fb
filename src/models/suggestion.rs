//! Suggestion types: the engine's inputs and outputs.
//!
//! A [`ConnectionSuggestion`] serializes to the flat record
//! `{nodeId, reason, confidence, type}` so it can cross a process or
//! language boundary as plain JSON.

use crate::models::NodeId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The heuristic that produced a suggestion.
///
/// Declaration order is the tie-break priority: when two suggestions for the
/// same node (or two ranked suggestions) have equal confidence, the earlier
/// variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionType {
    /// Candidate shares one or more tags with the target.
    SharedTags,
    /// Candidate is adjacent to at least two of the target's neighbours.
    SameCommunity,
    /// Candidate is adjacent to at least one of the target's neighbours.
    MutualConnections,
    /// Candidate was created or modified close in time to the target.
    TemporalProximity,
    /// Candidate has a similar shape (name length, folder, content length).
    SimilarContent,
    /// Reserved for embedding similarity; produces no candidates.
    SemanticSimilarity,
}

impl SuggestionType {
    /// Returns all suggestion types, in priority order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::SharedTags,
            Self::SameCommunity,
            Self::MutualConnections,
            Self::TemporalProximity,
            Self::SimilarContent,
            Self::SemanticSimilarity,
        ]
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SharedTags => "sharedTags",
            Self::SameCommunity => "sameCommunity",
            Self::MutualConnections => "mutualConnections",
            Self::TemporalProximity => "temporalProximity",
            Self::SimilarContent => "similarContent",
            Self::SemanticSimilarity => "semanticSimilarity",
        }
    }

    /// Parses a suggestion type, accepting camelCase, snake_case or kebab-case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "sharedtags" | "tags" => Some(Self::SharedTags),
            "samecommunity" | "community" => Some(Self::SameCommunity),
            "mutualconnections" | "mutual" => Some(Self::MutualConnections),
            "temporalproximity" | "temporal" => Some(Self::TemporalProximity),
            "similarcontent" | "content" => Some(Self::SimilarContent),
            "semanticsimilarity" | "semantic" => Some(Self::SemanticSimilarity),
            _ => None,
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SuggestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown suggestion type: {s}")))
    }
}

/// A proposed connection from the query target to `node_id`.
///
/// Recomputed on every call and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSuggestion {
    /// Candidate node; never the query target.
    pub node_id: NodeId,
    /// Human-readable explanation, including the evidence used.
    pub reason: String,
    /// Strength of the suggestion, in `[0, 1)`.
    pub confidence: f64,
    /// Heuristic that produced the suggestion.
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
}

impl ConnectionSuggestion {
    /// Creates a suggestion.
    #[must_use]
    pub fn new(
        node_id: NodeId,
        suggestion_type: SuggestionType,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            node_id,
            reason: reason.into(),
            confidence,
            suggestion_type,
        }
    }
}

/// Per-call options.
///
/// Fields missing from a deserialized document take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionOptions {
    /// Maximum number of suggestions returned. Must be positive.
    pub max_suggestions: usize,
    /// Suggestions below this confidence are dropped. Must lie in `[0, 1]`.
    pub min_confidence: f64,
    /// Heuristics to run. Must be non-empty.
    pub include_types: Vec<SuggestionType>,
    /// Drop candidates already adjacent to the target.
    pub exclude_existing_connections: bool,
}

impl Default for SuggestionOptions {
    fn default() -> Self {
        Self {
            max_suggestions: 10,
            min_confidence: 0.3,
            include_types: SuggestionType::all().to_vec(),
            exclude_existing_connections: true,
        }
    }
}

impl SuggestionOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result cap.
    #[must_use]
    pub const fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    /// Sets the confidence threshold.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Restricts the heuristics that run.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = SuggestionType>) -> Self {
        self.include_types = types.into_iter().collect();
        self
    }

    /// Sets whether existing neighbours are excluded.
    #[must_use]
    pub const fn with_exclude_existing(mut self, exclude: bool) -> Self {
        self.exclude_existing_connections = exclude;
        self
    }

    /// Returns `true` if the given heuristic is enabled.
    #[must_use]
    pub fn includes(&self, suggestion_type: SuggestionType) -> bool {
        self.include_types.contains(&suggestion_type)
    }

    /// Rejects out-of-range options instead of clamping them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `max_suggestions` is zero,
    /// `min_confidence` is not a finite value in `[0, 1]`, or
    /// `include_types` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.max_suggestions == 0 {
            return Err(Error::InvalidInput(
                "maxSuggestions must be a positive integer".to_string(),
            ));
        }
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidInput(format!(
                "minConfidence must lie in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.include_types.is_empty() {
            return Err(Error::InvalidInput(
                "includeTypes must name at least one suggestion type".to_string(),
            ));
        }
        Ok(())
    }
}

/// Graph-wide statistics over live nodes and edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionMetrics {
    /// Live node count.
    pub total_nodes: usize,
    /// Live connections between live nodes; reciprocal and parallel edges count once.
    pub total_edges: usize,
    /// Mean number of tags per live node.
    pub average_tags_per_node: f64,
    /// `total_edges / (n * (n - 1) / 2)`, or 0 when `n <= 1`.
    pub graph_density: f64,
}
