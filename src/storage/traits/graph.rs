//! Read-only graph accessor consumed by the suggestion engine.
//!
//! Each heuristic maps onto exactly one aggregate query here, so the scoring
//! code never sees SQL and backends can be swapped without touching it.
//!
//! # Liveness
//!
//! Every method sees only live data: nodes with `deleted_at IS NULL`, and
//! edges that are themselves live and whose endpoints are both live nodes.
//! Edges are undirected for all adjacency questions.
//!
//! # Ordering
//!
//! Methods that take a `limit` return candidates ordered by their primary
//! signal (descending) then by node ID ascending, so the top-N cut is
//! deterministic across backends.
//!
//! # Available Implementations
//!
//! | Backend | Use Case |
//! |---------|----------|
//! | `SqliteGraphStore` | Default; embedded relational store |
//! | `InMemoryGraphStore` | Testing, fixtures |

use crate::Result;
use crate::models::{
    ContentCandidate, Edge, GraphFixture, MutualCandidate, Node, NodeId, SharedTagCandidate,
    TemporalCandidate,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};

/// Trait for graph stores the engine can read from.
///
/// # Implementor Notes
///
/// - Methods use `&self` so stores can be shared via `Arc`
/// - Queries for an unknown or deleted target return empty results, not errors
/// - Failures surface as [`crate::Error::QueryFailed`]
pub trait GraphReader: Send + Sync {
    /// Returns the live node with this ID, tags included.
    fn node(&self, id: &NodeId) -> Result<Option<Node>>;

    /// Returns the live nodes among `ids`, in ID order. Unknown IDs are skipped.
    fn nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>>;

    /// Returns the live node's tag set.
    fn tags_of(&self, id: &NodeId) -> Result<BTreeSet<String>>;

    /// Returns the live first-degree neighbours of a node.
    fn adjacency_of(&self, id: &NodeId) -> Result<HashSet<NodeId>>;

    /// Returns live nodes sharing at least one tag with `id`, most overlap first.
    fn shared_tag_candidates(&self, id: &NodeId, limit: usize)
    -> Result<Vec<SharedTagCandidate>>;

    /// Returns nodes adjacent to at least `min_mutual` of the target's live
    /// neighbours, most mutual neighbours first.
    ///
    /// The target and its neighbours are never returned.
    fn second_degree_candidates(
        &self,
        id: &NodeId,
        min_mutual: usize,
        limit: usize,
    ) -> Result<Vec<MutualCandidate>>;

    /// Returns nodes created within `created_window_ms` or modified within
    /// `modified_window_ms` of the target.
    fn temporal_candidates(
        &self,
        id: &NodeId,
        created_window_ms: i64,
        modified_window_ms: i64,
    ) -> Result<Vec<TemporalCandidate>>;

    /// Returns nodes whose name length is within `name_ratio` of the target's,
    /// that share its folder, or whose content length is within
    /// `content_ratio` of the target's (both must have content).
    fn content_candidates(
        &self,
        id: &NodeId,
        name_ratio: f64,
        content_ratio: f64,
    ) -> Result<Vec<ContentCandidate>>;

    /// Returns live node and edge counts.
    fn counts(&self) -> Result<GraphCounts>;

    /// Returns the mean number of tags per live node (0 for an empty graph).
    fn average_tag_count(&self) -> Result<f64>;
}

/// Write surface used to seed a store from fixtures, tests and the CLI.
///
/// The suggestion engine never writes; production stores are populated by
/// whatever owns the data.
pub trait GraphWriter: Send + Sync {
    /// Inserts a node or replaces the stored copy, tags included.
    fn upsert_node(&self, node: &Node) -> Result<()>;

    /// Appends an edge. Parallel edges between the same pair are allowed.
    fn insert_edge(&self, edge: &Edge) -> Result<()>;

    /// Marks a node deleted. Returns `false` if no live node matched.
    fn soft_delete_node(&self, id: &NodeId, at: DateTime<Utc>) -> Result<bool>;

    /// Marks every live edge `source -> target` deleted, returning how many.
    fn soft_delete_edges(&self, source: &NodeId, target: &NodeId, at: DateTime<Utc>)
    -> Result<usize>;

    /// Loads every node, then every edge, of a fixture.
    fn load_fixture(&self, fixture: &GraphFixture) -> Result<()> {
        for node in &fixture.nodes {
            self.upsert_node(node)?;
        }
        for edge in &fixture.edges {
            self.insert_edge(edge)?;
        }
        Ok(())
    }
}

/// Live node and edge totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    /// Live nodes.
    pub total_nodes: usize,
    /// Distinct unordered pairs of live nodes joined by a live edge.
    ///
    /// Reciprocal and parallel edges count once; self-loops never count.
    pub total_edges: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_counts_default() {
        let counts = GraphCounts::default();
        assert_eq!(counts.total_nodes, 0);
        assert_eq!(counts.total_edges, 0);
    }
}
