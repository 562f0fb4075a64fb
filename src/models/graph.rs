//! Graph records read by the suggestion engine.
//!
//! Nodes and edges are owned by the storage layer; the engine only reads them.
//! Edges keep their direction in storage but every heuristic treats them as
//! undirected adjacency.
//!
//! # Example
//!
//! ```rust
//! use linkwise::models::{Edge, Node, NodeId};
//!
//! let api = Node::new("api-notes", "API notes")
//!     .with_folder("work")
//!     .with_tags(["backend", "documentation"]);
//! let link = Edge::new("api-notes", "roadmap", "references");
//!
//! assert!(api.is_live());
//! assert_eq!(link.source_id, NodeId::new("api-notes"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque, immutable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the node ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A node in the knowledge graph (a note, document, or similar record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Body text, if any.
    #[serde(default)]
    pub content: Option<String>,
    /// Folder the node lives in, if any.
    #[serde(default)]
    pub folder: Option<String>,
    /// Tags; duplicates collapse.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Soft-delete marker. A deleted node is invisible to the engine.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Creates a live node stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            content: None,
            folder: None,
            tags: BTreeSet::new(),
            created_at: now,
            modified_at: now,
            deleted_at: None,
        }
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the folder.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Adds tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets both creation and modification time.
    #[must_use]
    pub const fn with_timestamps(
        mut self,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        self.created_at = created_at;
        self.modified_at = modified_at;
        self
    }

    /// Returns `true` unless the node is soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A stored relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Source node.
    pub source_id: NodeId,
    /// Target node.
    pub target_id: NodeId,
    /// Free-form relationship label; heuristics never interpret it.
    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn default_edge_type() -> String {
    "link".to_string()
}

impl Edge {
    /// Creates a live edge stamped with the current time.
    #[must_use]
    pub fn new(
        source_id: impl Into<NodeId>,
        target_id: impl Into<NodeId>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type: edge_type.into(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Returns `true` if `id` is either endpoint.
    #[must_use]
    pub fn touches(&self, id: &NodeId) -> bool {
        self.source_id == *id || self.target_id == *id
    }

    /// Returns the endpoint opposite `id`, if `id` is an endpoint.
    #[must_use]
    pub fn peer_of(&self, id: &NodeId) -> Option<&NodeId> {
        if self.source_id == *id {
            Some(&self.target_id)
        } else if self.target_id == *id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// A batch of nodes and edges, as loaded from a JSON fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFixture {
    /// Nodes to upsert.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges to insert.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Candidate surfaced by the shared-tags query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedTagCandidate {
    /// Candidate node.
    pub node_id: NodeId,
    /// Tags shared with the target, sorted.
    pub shared_tags: Vec<String>,
}

/// Candidate surfaced by the second-degree adjacency query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutualCandidate {
    /// Candidate node.
    pub node_id: NodeId,
    /// Number of the target's direct neighbours also adjacent to the candidate.
    pub mutual_count: usize,
}

/// Candidate surfaced by the temporal query, with absolute gaps to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalCandidate {
    /// Candidate node.
    pub node_id: NodeId,
    /// |created - target.created| in milliseconds.
    pub created_gap_ms: i64,
    /// |modified - target.modified| in milliseconds.
    pub modified_gap_ms: i64,
    /// Both nodes carry the same non-null folder.
    pub same_folder: bool,
}

/// Candidate surfaced by the content-shape query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCandidate {
    /// Candidate node.
    pub node_id: NodeId,
    /// Absolute difference in name length (characters).
    pub name_length_gap: usize,
    /// Both nodes carry the same non-null folder.
    pub same_folder: bool,
}
