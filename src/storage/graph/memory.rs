//! In-memory graph store for testing.
//!
//! Mirrors the `SQLite` store's semantics exactly (liveness, undirected
//! adjacency, candidate ordering) without persistence.

#![allow(clippy::cast_precision_loss)]

use crate::models::{
    ContentCandidate, Edge, MutualCandidate, Node, NodeId, SharedTagCandidate, TemporalCandidate,
};
use crate::storage::traits::{GraphCounts, GraphReader, GraphWriter};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard};

/// In-memory graph store.
///
/// Uses `RwLock` so concurrent readers never block each other.
///
/// # Example
///
/// ```rust
/// use linkwise::models::{Edge, Node, NodeId};
/// use linkwise::storage::graph::InMemoryGraphStore;
/// use linkwise::storage::{GraphReader, GraphWriter};
///
/// let store = InMemoryGraphStore::new();
/// store.upsert_node(&Node::new("a", "A")).unwrap();
/// store.upsert_node(&Node::new("b", "B")).unwrap();
/// store.insert_edge(&Edge::new("a", "b", "link")).unwrap();
///
/// assert!(store.adjacency_of(&NodeId::new("b")).unwrap().contains(&NodeId::new("a")));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    nodes: RwLock<HashMap<NodeId, Node>>,
    edges: RwLock<Vec<Edge>>,
}

impl InMemoryGraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_nodes(&self, operation: &str) -> Result<RwLockReadGuard<'_, HashMap<NodeId, Node>>> {
        self.nodes.read().map_err(|e| Error::query(operation, e))
    }

    fn read_edges(&self, operation: &str) -> Result<RwLockReadGuard<'_, Vec<Edge>>> {
        self.edges.read().map_err(|e| Error::query(operation, e))
    }

    fn live_node<'a>(nodes: &'a HashMap<NodeId, Node>, id: &NodeId) -> Option<&'a Node> {
        nodes.get(id).filter(|n| n.is_live())
    }

    /// Undirected adjacency over live edges between live nodes, self-loops dropped.
    fn undirected(nodes: &HashMap<NodeId, Node>, edges: &[Edge]) -> HashMap<NodeId, HashSet<NodeId>> {
        let mut adjacency: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        for edge in edges.iter().filter(|e| e.deleted_at.is_none()) {
            if edge.source_id == edge.target_id
                || Self::live_node(nodes, &edge.source_id).is_none()
                || Self::live_node(nodes, &edge.target_id).is_none()
            {
                continue;
            }
            adjacency
                .entry(edge.source_id.clone())
                .or_default()
                .insert(edge.target_id.clone());
            adjacency
                .entry(edge.target_id.clone())
                .or_default()
                .insert(edge.source_id.clone());
        }
        adjacency
    }

    fn same_folder(a: &Node, b: &Node) -> bool {
        matches!((&a.folder, &b.folder), (Some(x), Some(y)) if x == y)
    }

    /// Candidate iteration in ID order, matching `ORDER BY n.id`.
    fn others<'a>(
        nodes: &'a HashMap<NodeId, Node>,
        target: &'a Node,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        let ordered: BTreeMap<&NodeId, &Node> = nodes
            .iter()
            .filter(|(id, n)| n.is_live() && **id != target.id)
            .collect();
        ordered.into_values()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn within(gap: usize, reference: usize, ratio: f64) -> bool {
    gap as f64 <= reference as f64 * ratio
}

impl GraphReader for InMemoryGraphStore {
    fn node(&self, id: &NodeId) -> Result<Option<Node>> {
        let nodes = self.read_nodes("node")?;
        Ok(Self::live_node(&nodes, id).cloned())
    }

    fn nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        let nodes = self.read_nodes("nodes")?;
        let wanted: BTreeSet<&NodeId> = ids.iter().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| Self::live_node(&nodes, id).cloned())
            .collect())
    }

    fn tags_of(&self, id: &NodeId) -> Result<BTreeSet<String>> {
        let nodes = self.read_nodes("tags_of")?;
        Ok(Self::live_node(&nodes, id)
            .map(|n| n.tags.clone())
            .unwrap_or_default())
    }

    fn adjacency_of(&self, id: &NodeId) -> Result<HashSet<NodeId>> {
        let nodes = self.read_nodes("adjacency_of")?;
        let edges = self.read_edges("adjacency_of")?;
        Ok(Self::undirected(&nodes, &edges)
            .remove(id)
            .unwrap_or_default())
    }

    fn shared_tag_candidates(
        &self,
        id: &NodeId,
        limit: usize,
    ) -> Result<Vec<SharedTagCandidate>> {
        let nodes = self.read_nodes("shared_tag_candidates")?;
        let Some(target) = Self::live_node(&nodes, id) else {
            return Ok(Vec::new());
        };

        let mut candidates: Vec<SharedTagCandidate> = Self::others(&nodes, target)
            .filter_map(|n| {
                let shared_tags: Vec<String> = n.tags.intersection(&target.tags).cloned().collect();
                (!shared_tags.is_empty()).then(|| SharedTagCandidate {
                    node_id: n.id.clone(),
                    shared_tags,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.shared_tags
                .len()
                .cmp(&a.shared_tags.len())
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    fn second_degree_candidates(
        &self,
        id: &NodeId,
        min_mutual: usize,
        limit: usize,
    ) -> Result<Vec<MutualCandidate>> {
        let nodes = self.read_nodes("second_degree_candidates")?;
        let edges = self.read_edges("second_degree_candidates")?;
        let adjacency = Self::undirected(&nodes, &edges);
        let Some(neighbours) = adjacency.get(id) else {
            return Ok(Vec::new());
        };

        let mut mutual: BTreeMap<&NodeId, usize> = BTreeMap::new();
        for neighbour in neighbours {
            for candidate in adjacency.get(neighbour).into_iter().flatten() {
                if candidate != id && !neighbours.contains(candidate) {
                    *mutual.entry(candidate).or_default() += 1;
                }
            }
        }

        let mut candidates: Vec<MutualCandidate> = mutual
            .into_iter()
            .filter(|(_, count)| *count >= min_mutual)
            .map(|(node_id, mutual_count)| MutualCandidate {
                node_id: node_id.clone(),
                mutual_count,
            })
            .collect();
        // Stable sort keeps the BTreeMap's ID order among equal counts.
        candidates.sort_by(|a, b| b.mutual_count.cmp(&a.mutual_count));
        candidates.truncate(limit);
        Ok(candidates)
    }

    fn temporal_candidates(
        &self,
        id: &NodeId,
        created_window_ms: i64,
        modified_window_ms: i64,
    ) -> Result<Vec<TemporalCandidate>> {
        let nodes = self.read_nodes("temporal_candidates")?;
        let Some(target) = Self::live_node(&nodes, id) else {
            return Ok(Vec::new());
        };
        let created = target.created_at.timestamp_millis();
        let modified = target.modified_at.timestamp_millis();

        Ok(Self::others(&nodes, target)
            .filter_map(|n| {
                let created_gap_ms = (n.created_at.timestamp_millis() - created).abs();
                let modified_gap_ms = (n.modified_at.timestamp_millis() - modified).abs();
                (created_gap_ms <= created_window_ms || modified_gap_ms <= modified_window_ms)
                    .then(|| TemporalCandidate {
                        node_id: n.id.clone(),
                        created_gap_ms,
                        modified_gap_ms,
                        same_folder: Self::same_folder(n, target),
                    })
            })
            .collect())
    }

    fn content_candidates(
        &self,
        id: &NodeId,
        name_ratio: f64,
        content_ratio: f64,
    ) -> Result<Vec<ContentCandidate>> {
        let nodes = self.read_nodes("content_candidates")?;
        let Some(target) = Self::live_node(&nodes, id) else {
            return Ok(Vec::new());
        };
        let name_len = char_len(&target.name);
        let content_len = target.content.as_deref().map(char_len);

        Ok(Self::others(&nodes, target)
            .filter_map(|n| {
                let name_length_gap = char_len(&n.name).abs_diff(name_len);
                let same_folder = Self::same_folder(n, target);
                let similar_body = match (content_len, n.content.as_deref()) {
                    (Some(reference), Some(body)) => {
                        within(char_len(body).abs_diff(reference), reference, content_ratio)
                    },
                    _ => false,
                };
                (within(name_length_gap, name_len, name_ratio) || same_folder || similar_body)
                    .then(|| ContentCandidate {
                        node_id: n.id.clone(),
                        name_length_gap,
                        same_folder,
                    })
            })
            .collect())
    }

    fn counts(&self) -> Result<GraphCounts> {
        let nodes = self.read_nodes("counts")?;
        let edges = self.read_edges("counts")?;
        // Each unordered pair appears once from either endpoint.
        let total_edges = Self::undirected(&nodes, &edges)
            .values()
            .map(HashSet::len)
            .sum::<usize>()
            / 2;

        Ok(GraphCounts {
            total_nodes: nodes.values().filter(|n| n.is_live()).count(),
            total_edges,
        })
    }

    fn average_tag_count(&self) -> Result<f64> {
        let nodes = self.read_nodes("average_tag_count")?;
        let (count, tags) = nodes
            .values()
            .filter(|n| n.is_live())
            .fold((0usize, 0usize), |(c, t), n| (c + 1, t + n.tags.len()));
        if count == 0 {
            return Ok(0.0);
        }
        Ok(tags as f64 / count as f64)
    }
}

impl GraphWriter for InMemoryGraphStore {
    fn upsert_node(&self, node: &Node) -> Result<()> {
        self.nodes
            .write()
            .map_err(|e| Error::OperationFailed {
                operation: "upsert_node".to_string(),
                cause: e.to_string(),
            })?
            .insert(node.id.clone(), node.clone());
        Ok(())
    }

    fn insert_edge(&self, edge: &Edge) -> Result<()> {
        self.edges
            .write()
            .map_err(|e| Error::OperationFailed {
                operation: "insert_edge".to_string(),
                cause: e.to_string(),
            })?
            .push(edge.clone());
        Ok(())
    }

    fn soft_delete_node(&self, id: &NodeId, at: DateTime<Utc>) -> Result<bool> {
        let mut nodes = self.nodes.write().map_err(|e| Error::OperationFailed {
            operation: "soft_delete_node".to_string(),
            cause: e.to_string(),
        })?;
        match nodes.get_mut(id) {
            Some(node) if node.is_live() => {
                node.deleted_at = Some(at);
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    fn soft_delete_edges(
        &self,
        source: &NodeId,
        target: &NodeId,
        at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut edges = self.edges.write().map_err(|e| Error::OperationFailed {
            operation: "soft_delete_edges".to_string(),
            cause: e.to_string(),
        })?;
        let mut deleted = 0;
        for edge in edges.iter_mut().filter(|e| {
            e.deleted_at.is_none() && e.source_id == *source && e.target_id == *target
        }) {
            edge.deleted_at = Some(at);
            deleted += 1;
        }
        Ok(deleted)
    }
}
