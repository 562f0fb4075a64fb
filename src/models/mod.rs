//! Data models for linkwise.

pub mod graph;
mod suggestion;

pub use graph::{
    ContentCandidate, Edge, GraphFixture, MutualCandidate, Node, NodeId, SharedTagCandidate,
    TemporalCandidate,
};
pub use suggestion::{ConnectionSuggestion, SuggestionMetrics, SuggestionOptions, SuggestionType};
