//! `SQLite` graph store.
//!
//! Every [`GraphReader`] method is a single SQL statement; the heuristic
//! queries are GROUP BY / HAVING aggregates or self-joins over `nodes`.

// SQLite hands back i64 for counts and lengths, which are non-negative and small.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]

use crate::models::{
    ContentCandidate, Edge, MutualCandidate, Node, NodeId, SharedTagCandidate, TemporalCandidate,
};
use crate::storage::sqlite::{acquire_lock, configure_connection, open_configured};
use crate::storage::traits::{GraphCounts, GraphReader, GraphWriter};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

/// Undirected view over live edges whose endpoints are both live nodes.
///
/// `UNION` (not `UNION ALL`) collapses parallel edges so mutual counts are
/// per neighbour, not per edge. Self-loops are ignored.
const UNDIRECTED_CTE: &str = "
    live_edges(a, b) AS (
        SELECT e.source_id, e.target_id
        FROM edges e
        JOIN nodes s ON s.id = e.source_id AND s.deleted_at IS NULL
        JOIN nodes t ON t.id = e.target_id AND t.deleted_at IS NULL
        WHERE e.deleted_at IS NULL AND e.source_id <> e.target_id
    ),
    undirected(a, b) AS (
        SELECT a, b FROM live_edges
        UNION
        SELECT b, a FROM live_edges
    )";

const NODE_COLUMNS: &str = "
    n.id, n.name, n.content, n.folder, n.created_at, n.modified_at, n.deleted_at,
    (SELECT json_group_array(tag) FROM node_tags WHERE node_id = n.id) AS tags";

/// `SQLite`-backed graph store.
///
/// # Concurrency Model
///
/// A `Mutex<Connection>` serializes access; WAL mode keeps readers from
/// blocking on the (external) writer.
///
/// # Schema
///
/// - `nodes`: one row per node, timestamps in Unix milliseconds
/// - `node_tags`: one row per (node, tag); the primary key collapses duplicates
/// - `edges`: directed rows; adjacency queries read them both ways
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteGraphStore {
    /// Opens (or creates) a file-backed store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_configured(&db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_graph_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;
        configure_connection(&conn);
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (`None` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                content TEXT,
                folder TEXT,
                created_at INTEGER NOT NULL,
                modified_at INTEGER NOT NULL,
                deleted_at INTEGER
            );
            CREATE TABLE IF NOT EXISTS node_tags (
                node_id TEXT NOT NULL,
                tag TEXT NOT NULL,
                PRIMARY KEY (node_id, tag),
                FOREIGN KEY (node_id) REFERENCES nodes(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                edge_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                deleted_at INTEGER
            );",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_graph_tables".to_string(),
            cause: e.to_string(),
        })?;

        Self::create_indexes(&conn);
        Ok(())
    }

    fn create_indexes(conn: &Connection) {
        // Index creation failures only cost speed.
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_node_tags_tag ON node_tags(tag)",
            [],
        );
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id)",
            [],
        );
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id)",
            [],
        );
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_folder ON nodes(folder)",
            [],
        );
    }

    fn parse_node_row(row: &Row<'_>) -> rusqlite::Result<Node> {
        let id: String = row.get("id")?;
        let tags_json: Option<String> = row.get("tags")?;
        let tags: BTreeSet<String> = tags_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(Node {
            id: NodeId::new(id),
            name: row.get("name")?,
            content: row.get("content")?,
            folder: row.get("folder")?,
            tags,
            created_at: from_millis(row.get("created_at")?),
            modified_at: from_millis(row.get("modified_at")?),
            deleted_at: row.get::<_, Option<i64>>("deleted_at")?.map(from_millis),
        })
    }

    /// Removes every node, tag and edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute_batch("DELETE FROM edges; DELETE FROM node_tags; DELETE FROM nodes;")
            .map_err(|e| Error::OperationFailed {
                operation: "clear_graph".to_string(),
                cause: e.to_string(),
            })
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Builds `?{start}, ?{start+1}, ...` for `count` parameters.
fn numbered_placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl GraphReader for SqliteGraphStore {
    #[instrument(skip(self), fields(node_id = %id))]
    fn node(&self, id: &NodeId) -> Result<Option<Node>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            &format!("SELECT {NODE_COLUMNS} FROM nodes n WHERE n.id = ?1 AND n.deleted_at IS NULL"),
            params![id.as_str()],
            Self::parse_node_row,
        )
        .optional()
        .map_err(|e| Error::query("node", e))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = acquire_lock(&self.conn);
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes n
             WHERE n.deleted_at IS NULL AND n.id IN ({})
             ORDER BY n.id",
            numbered_placeholders(1, ids.len())
        );
        let id_strs: Vec<&str> = ids.iter().map(NodeId::as_str).collect();

        let mut stmt = conn.prepare(&sql).map_err(|e| Error::query("nodes", e))?;
        let rows = stmt
            .query_map(params_from_iter(id_strs.iter()), Self::parse_node_row)
            .map_err(|e| Error::query("nodes", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::query("nodes", e))
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn tags_of(&self, id: &NodeId) -> Result<BTreeSet<String>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT t.tag FROM node_tags t
                 JOIN nodes n ON n.id = t.node_id AND n.deleted_at IS NULL
                 WHERE t.node_id = ?1",
            )
            .map_err(|e| Error::query("tags_of", e))?;
        let rows = stmt
            .query_map(params![id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| Error::query("tags_of", e))?;
        rows.collect::<rusqlite::Result<BTreeSet<_>>>()
            .map_err(|e| Error::query("tags_of", e))
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn adjacency_of(&self, id: &NodeId) -> Result<HashSet<NodeId>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(&format!(
                "WITH {UNDIRECTED_CTE} SELECT b FROM undirected WHERE a = ?1"
            ))
            .map_err(|e| Error::query("adjacency_of", e))?;
        let rows = stmt
            .query_map(params![id.as_str()], |row| {
                row.get::<_, String>(0).map(NodeId::new)
            })
            .map_err(|e| Error::query("adjacency_of", e))?;
        rows.collect::<rusqlite::Result<HashSet<_>>>()
            .map_err(|e| Error::query("adjacency_of", e))
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn shared_tag_candidates(
        &self,
        id: &NodeId,
        limit: usize,
    ) -> Result<Vec<SharedTagCandidate>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT o.node_id, COUNT(*) AS shared, json_group_array(o.tag) AS tags
                 FROM node_tags t
                 JOIN nodes tn ON tn.id = t.node_id AND tn.deleted_at IS NULL
                 JOIN node_tags o ON o.tag = t.tag AND o.node_id <> t.node_id
                 JOIN nodes n ON n.id = o.node_id AND n.deleted_at IS NULL
                 WHERE t.node_id = ?1
                 GROUP BY o.node_id
                 ORDER BY shared DESC, o.node_id ASC
                 LIMIT ?2",
            )
            .map_err(|e| Error::query("shared_tag_candidates", e))?;

        let rows = stmt
            .query_map(params![id.as_str(), to_sql_limit(limit)], |row| {
                let node_id: String = row.get(0)?;
                let tags_json: String = row.get(2)?;
                Ok((node_id, tags_json))
            })
            .map_err(|e| Error::query("shared_tag_candidates", e))?;

        let mut candidates = Vec::new();
        for row in rows {
            let (node_id, tags_json) = row.map_err(|e| Error::query("shared_tag_candidates", e))?;
            let mut shared_tags: Vec<String> = serde_json::from_str(&tags_json)
                .map_err(|e| Error::query("shared_tag_candidates", e))?;
            shared_tags.sort();
            candidates.push(SharedTagCandidate {
                node_id: NodeId::new(node_id),
                shared_tags,
            });
        }
        Ok(candidates)
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn second_degree_candidates(
        &self,
        id: &NodeId,
        min_mutual: usize,
        limit: usize,
    ) -> Result<Vec<MutualCandidate>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(&format!(
                "WITH {UNDIRECTED_CTE},
                 neighbours(id) AS (SELECT b FROM undirected WHERE a = ?1)
                 SELECT u.b, COUNT(DISTINCT u.a) AS mutual
                 FROM undirected u
                 WHERE u.a IN (SELECT id FROM neighbours)
                   AND u.b <> ?1
                   AND u.b NOT IN (SELECT id FROM neighbours)
                 GROUP BY u.b
                 HAVING COUNT(DISTINCT u.a) >= ?2
                 ORDER BY mutual DESC, u.b ASC
                 LIMIT ?3"
            ))
            .map_err(|e| Error::query("second_degree_candidates", e))?;
        let rows = stmt
            .query_map(
                params![id.as_str(), to_sql_limit(min_mutual), to_sql_limit(limit)],
                |row| {
                    let node_id: String = row.get(0)?;
                    let mutual: i64 = row.get(1)?;
                    Ok(MutualCandidate {
                        node_id: NodeId::new(node_id),
                        mutual_count: mutual as usize,
                    })
                },
            )
            .map_err(|e| Error::query("second_degree_candidates", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::query("second_degree_candidates", e))
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn temporal_candidates(
        &self,
        id: &NodeId,
        created_window_ms: i64,
        modified_window_ms: i64,
    ) -> Result<Vec<TemporalCandidate>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT n.id,
                        ABS(n.created_at - t.created_at) AS created_gap,
                        ABS(n.modified_at - t.modified_at) AS modified_gap,
                        COALESCE(n.folder = t.folder, 0) AS same_folder
                 FROM nodes t
                 JOIN nodes n ON n.id <> t.id AND n.deleted_at IS NULL
                 WHERE t.id = ?1 AND t.deleted_at IS NULL
                   AND (ABS(n.created_at - t.created_at) <= ?2
                        OR ABS(n.modified_at - t.modified_at) <= ?3)
                 ORDER BY n.id",
            )
            .map_err(|e| Error::query("temporal_candidates", e))?;
        let rows = stmt
            .query_map(
                params![id.as_str(), created_window_ms, modified_window_ms],
                |row| {
                    Ok(TemporalCandidate {
                        node_id: NodeId::new(row.get::<_, String>(0)?),
                        created_gap_ms: row.get(1)?,
                        modified_gap_ms: row.get(2)?,
                        same_folder: row.get(3)?,
                    })
                },
            )
            .map_err(|e| Error::query("temporal_candidates", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::query("temporal_candidates", e))
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn content_candidates(
        &self,
        id: &NodeId,
        name_ratio: f64,
        content_ratio: f64,
    ) -> Result<Vec<ContentCandidate>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT n.id,
                        ABS(LENGTH(n.name) - LENGTH(t.name)) AS name_gap,
                        COALESCE(n.folder = t.folder, 0) AS same_folder
                 FROM nodes t
                 JOIN nodes n ON n.id <> t.id AND n.deleted_at IS NULL
                 WHERE t.id = ?1 AND t.deleted_at IS NULL
                   AND (ABS(LENGTH(n.name) - LENGTH(t.name)) <= LENGTH(t.name) * ?2
                        OR COALESCE(n.folder = t.folder, 0)
                        OR (n.content IS NOT NULL AND t.content IS NOT NULL
                            AND ABS(LENGTH(n.content) - LENGTH(t.content))
                                <= LENGTH(t.content) * ?3))
                 ORDER BY n.id",
            )
            .map_err(|e| Error::query("content_candidates", e))?;
        let rows = stmt
            .query_map(params![id.as_str(), name_ratio, content_ratio], |row| {
                let gap: i64 = row.get(1)?;
                Ok(ContentCandidate {
                    node_id: NodeId::new(row.get::<_, String>(0)?),
                    name_length_gap: gap as usize,
                    same_folder: row.get(2)?,
                })
            })
            .map_err(|e| Error::query("content_candidates", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::query("content_candidates", e))
    }

    #[instrument(skip(self))]
    fn counts(&self) -> Result<GraphCounts> {
        let conn = acquire_lock(&self.conn);
        let (total_nodes, total_edges): (i64, i64) = conn
            .query_row(
                &format!(
                    "WITH {UNDIRECTED_CTE}
                     SELECT (SELECT COUNT(*) FROM nodes WHERE deleted_at IS NULL),
                            (SELECT COUNT(*) FROM undirected WHERE a < b)"
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| Error::query("counts", e))?;

        Ok(GraphCounts {
            total_nodes: total_nodes as usize,
            total_edges: total_edges as usize,
        })
    }

    #[instrument(skip(self))]
    fn average_tag_count(&self) -> Result<f64> {
        let conn = acquire_lock(&self.conn);
        let (tags, nodes): (i64, i64) = conn
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM node_tags t
                     JOIN nodes n ON n.id = t.node_id AND n.deleted_at IS NULL),
                    (SELECT COUNT(*) FROM nodes WHERE deleted_at IS NULL)",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| Error::query("average_tag_count", e))?;

        if nodes == 0 {
            return Ok(0.0);
        }
        Ok(tags as f64 / nodes as f64)
    }
}

impl GraphWriter for SqliteGraphStore {
    #[instrument(skip(self, node), fields(node_id = %node.id))]
    fn upsert_node(&self, node: &Node) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction().map_err(|e| Error::OperationFailed {
            operation: "upsert_node_begin".to_string(),
            cause: e.to_string(),
        })?;

        tx.execute(
            "INSERT INTO nodes (id, name, content, folder, created_at, modified_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                content = excluded.content,
                folder = excluded.folder,
                created_at = excluded.created_at,
                modified_at = excluded.modified_at,
                deleted_at = excluded.deleted_at",
            params![
                node.id.as_str(),
                node.name,
                node.content,
                node.folder,
                node.created_at.timestamp_millis(),
                node.modified_at.timestamp_millis(),
                node.deleted_at.map(|d| d.timestamp_millis()),
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "upsert_node".to_string(),
            cause: e.to_string(),
        })?;

        tx.execute(
            "DELETE FROM node_tags WHERE node_id = ?1",
            params![node.id.as_str()],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "upsert_node_clear_tags".to_string(),
            cause: e.to_string(),
        })?;

        for tag in &node.tags {
            tx.execute(
                "INSERT OR IGNORE INTO node_tags (node_id, tag) VALUES (?1, ?2)",
                params![node.id.as_str(), tag],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "upsert_node_tag".to_string(),
                cause: e.to_string(),
            })?;
        }

        tx.commit().map_err(|e| Error::OperationFailed {
            operation: "upsert_node_commit".to_string(),
            cause: e.to_string(),
        })
    }

    #[instrument(skip(self, edge), fields(source = %edge.source_id, target = %edge.target_id))]
    fn insert_edge(&self, edge: &Edge) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO edges (source_id, target_id, edge_type, created_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                edge.source_id.as_str(),
                edge.target_id.as_str(),
                edge.edge_type,
                edge.created_at.timestamp_millis(),
                edge.deleted_at.map(|d| d.timestamp_millis()),
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "insert_edge".to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn soft_delete_node(&self, id: &NodeId, at: DateTime<Utc>) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let updated = conn
            .execute(
                "UPDATE nodes SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
                params![id.as_str(), at.timestamp_millis()],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "soft_delete_node".to_string(),
                cause: e.to_string(),
            })?;
        Ok(updated > 0)
    }

    #[instrument(skip(self), fields(source = %source, target = %target))]
    fn soft_delete_edges(
        &self,
        source: &NodeId,
        target: &NodeId,
        at: DateTime<Utc>,
    ) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "UPDATE edges SET deleted_at = ?3
             WHERE source_id = ?1 AND target_id = ?2 AND deleted_at IS NULL",
            params![source.as_str(), target.as_str(), at.timestamp_millis()],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "soft_delete_edges".to_string(),
            cause: e.to_string(),
        })
    }
}
