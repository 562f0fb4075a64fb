//! Connection suggestion engine.
//!
//! Wraps a [`GraphReader`] and runs the suggestion pipeline:
//!
//! 1. Validate options and load the live target node
//! 2. Fetch the target's adjacency once (when exclusion or an
//!    adjacency-driven heuristic needs it)
//! 3. Run each enabled heuristic against the store
//! 4. Merge per candidate, keeping the strongest signal
//! 5. Threshold, sort and truncate
//!
//! # Example
//!
//! ```rust
//! use linkwise::storage::GraphWriter;
//! use linkwise::storage::graph::InMemoryGraphStore;
//! use linkwise::{Node, NodeId, SuggestionEngine, SuggestionOptions, SuggestionType};
//!
//! let store = InMemoryGraphStore::new();
//! store.upsert_node(&Node::new("plan", "Plan").with_tags(["backend", "urgent"]))?;
//! store.upsert_node(&Node::new("api", "API").with_tags(["backend"]))?;
//!
//! let engine = SuggestionEngine::new(store);
//! let options = SuggestionOptions::default().with_types([SuggestionType::SharedTags]);
//! let suggestions = engine.suggest_connections(&NodeId::new("plan"), &options)?;
//!
//! assert_eq!(suggestions[0].node_id.as_str(), "api");
//! assert!(suggestions[0].reason.contains("backend"));
//! # Ok::<(), linkwise::Error>(())
//! ```

mod aggregate;
mod heuristics;
mod metrics;
mod ranking;

pub use heuristics::HeuristicContext;
pub use metrics::graph_density;

use crate::config::{EngineConfig, LinkwiseConfig, ScoringConfig};
use crate::models::{ConnectionSuggestion, NodeId, SuggestionMetrics, SuggestionOptions, SuggestionType};
use crate::observability::metric_names;
use crate::storage::GraphReader;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

/// Stateless suggestion engine over a graph store.
///
/// # Thread Safety
///
/// The engine holds no mutable state. Cloning shares the store, so clones
/// can serve concurrent callers as long as the store supports concurrent
/// reads (both bundled stores do).
pub struct SuggestionEngine<B: GraphReader> {
    backend: Arc<B>,
    scoring: ScoringConfig,
    config: EngineConfig,
}

impl<B: GraphReader> Clone for SuggestionEngine<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            scoring: self.scoring,
            config: self.config,
        }
    }
}

impl<B: GraphReader> SuggestionEngine<B> {
    /// Creates an engine with default scoring over the given store.
    pub fn new(backend: B) -> Self {
        Self::with_shared_backend(Arc::new(backend))
    }

    /// Creates an engine over a shared store.
    #[must_use]
    pub fn with_shared_backend(backend: Arc<B>) -> Self {
        Self {
            backend,
            scoring: ScoringConfig::default(),
            config: EngineConfig::default(),
        }
    }

    /// Creates an engine using the scoring and engine sections of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the scoring constants are invalid.
    pub fn from_config(backend: B, config: &LinkwiseConfig) -> Result<Self> {
        Ok(Self::new(backend)
            .with_scoring(config.scoring)?
            .with_engine_config(config.engine))
    }

    /// Replaces the scoring constants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any formula could leave `[0, 1)`.
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Result<Self> {
        scoring.validate()?;
        self.scoring = scoring;
        Ok(self)
    }

    /// Replaces the engine runtime settings.
    #[must_use]
    pub const fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a reference to the underlying store.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the active scoring constants.
    #[must_use]
    pub const fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Suggests connections for one node.
    ///
    /// An unknown, deleted or isolated node yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `options` fail validation
    /// - [`Error::QueryFailed`] if any store query fails
    pub fn suggest_connections(
        &self,
        node_id: &NodeId,
        options: &SuggestionOptions,
    ) -> Result<Vec<ConnectionSuggestion>> {
        self.run_pipeline(node_id, options, None)
    }

    /// Suggests connections, giving up once `deadline` passes.
    ///
    /// The deadline is checked before each heuristic query and before ranking.
    /// A query already in flight is not interrupted.
    ///
    /// # Errors
    ///
    /// As [`Self::suggest_connections`], plus [`Error::DeadlineExceeded`].
    pub fn suggest_connections_with_deadline(
        &self,
        node_id: &NodeId,
        options: &SuggestionOptions,
        deadline: Instant,
    ) -> Result<Vec<ConnectionSuggestion>> {
        self.run_pipeline(node_id, options, Some(deadline))
    }

    /// Suggests connections for several nodes, one at a time.
    ///
    /// Each entry equals what [`Self::suggest_connections`] returns for that
    /// id. Duplicate ids collapse into one entry.
    ///
    /// # Errors
    ///
    /// Returns the first error hit; no partial map is returned.
    #[instrument(skip(self, node_ids, options), fields(batch_size = node_ids.len()))]
    pub fn batch_suggest_connections(
        &self,
        node_ids: &[NodeId],
        options: &SuggestionOptions,
    ) -> Result<HashMap<NodeId, Vec<ConnectionSuggestion>>> {
        options.validate()?;
        let unique: BTreeSet<&NodeId> = node_ids.iter().collect();
        record_batch_size(unique.len());

        unique
            .into_iter()
            .map(|id| Ok((id.clone(), self.suggest_connections(id, options)?)))
            .collect()
    }

    /// Convenience wrapper running only the shared-tags heuristic.
    ///
    /// # Errors
    ///
    /// As [`Self::suggest_connections`]; `limit == 0` is invalid.
    pub fn suggest_by_shared_tags(
        &self,
        node_id: &NodeId,
        limit: usize,
    ) -> Result<Vec<ConnectionSuggestion>> {
        let options = SuggestionOptions::default()
            .with_max_suggestions(limit)
            .with_types([SuggestionType::SharedTags]);
        self.suggest_connections(node_id, &options)
    }

    /// Convenience wrapper running the two adjacency-driven heuristics
    /// (same community and mutual connections).
    ///
    /// # Errors
    ///
    /// As [`Self::suggest_connections`]; `limit == 0` is invalid.
    pub fn suggest_by_community(
        &self,
        node_id: &NodeId,
        limit: usize,
    ) -> Result<Vec<ConnectionSuggestion>> {
        let options = SuggestionOptions::default()
            .with_max_suggestions(limit)
            .with_types([
                SuggestionType::SameCommunity,
                SuggestionType::MutualConnections,
            ]);
        self.suggest_connections(node_id, &options)
    }

    /// Returns graph-wide statistics over live nodes and edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryFailed`] if a count query fails.
    #[instrument(skip(self))]
    pub fn get_suggestion_metrics(&self) -> Result<SuggestionMetrics> {
        metrics::collect(self.backend.as_ref())
    }

    #[instrument(
        skip(self, options, deadline),
        fields(node_id = %node_id, types = options.include_types.len())
    )]
    fn run_pipeline(
        &self,
        node_id: &NodeId,
        options: &SuggestionOptions,
        deadline: Option<Instant>,
    ) -> Result<Vec<ConnectionSuggestion>> {
        let start = Instant::now();
        options.validate()?;

        let Some(target) = self.backend.node(node_id)? else {
            debug!("Target node missing or deleted");
            return Ok(Vec::new());
        };

        let enabled: BTreeSet<SuggestionType> = options.include_types.iter().copied().collect();
        let needs_adjacency = options.exclude_existing_connections
            || enabled.iter().copied().any(heuristics::needs_adjacency);
        let neighbours = if needs_adjacency {
            self.backend.adjacency_of(node_id)?
        } else {
            HashSet::new()
        };

        let ctx = HeuristicContext {
            reader: self.backend.as_ref(),
            target: &target,
            neighbours: &neighbours,
            scoring: &self.scoring,
        };

        let mut candidates = Vec::new();
        for suggestion_type in enabled {
            check_deadline(deadline, start)?;
            let found = heuristics::run(suggestion_type, &ctx)
                .map_err(|e| heuristic_failure(suggestion_type, e))?;
            ::metrics::counter!(
                metric_names::HEURISTIC_CANDIDATES_TOTAL,
                "heuristic" => suggestion_type.as_str()
            )
            .increment(found.len() as u64);
            candidates.extend(found);
        }

        check_deadline(deadline, start)?;
        let exclude = options.exclude_existing_connections.then_some(&neighbours);
        let merged = aggregate::merge(node_id, candidates, exclude);
        let ranked = ranking::rank(merged, options.min_confidence, options.max_suggestions);

        ::metrics::counter!(metric_names::SUGGESTIONS_TOTAL).increment(ranked.len() as u64);
        ::metrics::histogram!(metric_names::SUGGEST_DURATION_MS)
            .record(start.elapsed().as_secs_f64() * 1000.0);
        debug!(returned = ranked.len(), "Suggestions ranked");

        Ok(ranked)
    }
}

impl<B: GraphReader + 'static> SuggestionEngine<B> {
    /// Suggests connections for several nodes on blocking worker threads.
    ///
    /// At most [`EngineConfig::max_concurrent`] ids are processed at once.
    /// The result equals [`Self::batch_suggest_connections`].
    ///
    /// # Errors
    ///
    /// Returns the first per-id error, or [`Error::OperationFailed`] if a
    /// worker task panics or is cancelled.
    #[instrument(skip(self, node_ids, options), fields(batch_size = node_ids.len()))]
    pub async fn batch_suggest_connections_concurrent(
        &self,
        node_ids: &[NodeId],
        options: &SuggestionOptions,
    ) -> Result<HashMap<NodeId, Vec<ConnectionSuggestion>>> {
        options.validate()?;
        let unique: BTreeSet<NodeId> = node_ids.iter().cloned().collect();
        record_batch_size(unique.len());

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut workers = JoinSet::new();

        for id in unique {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "batch_acquire_permit".to_string(),
                    cause: e.to_string(),
                })?;
            let engine = self.clone();
            let options = options.clone();
            workers.spawn_blocking(move || {
                let _permit = permit;
                let result = engine.suggest_connections(&id, &options);
                (id, result)
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = workers.join_next().await {
            let (id, result) = joined.map_err(|e| Error::OperationFailed {
                operation: "batch_join_worker".to_string(),
                cause: e.to_string(),
            })?;
            results.insert(id, result?);
        }
        Ok(results)
    }
}

fn check_deadline(deadline: Option<Instant>, start: Instant) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded {
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        }),
        _ => Ok(()),
    }
}

fn heuristic_failure(suggestion_type: SuggestionType, err: Error) -> Error {
    warn!(heuristic = suggestion_type.as_str(), error = %err, "Heuristic query failed");
    ::metrics::counter!(
        metric_names::HEURISTIC_FAILURES_TOTAL,
        "heuristic" => suggestion_type.as_str()
    )
    .increment(1);

    match err {
        Error::QueryFailed { operation, cause } => Error::QueryFailed {
            operation: format!("{suggestion_type}/{operation}"),
            cause,
        },
        other => other,
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_batch_size(size: usize) {
    ::metrics::histogram!(metric_names::BATCH_SIZE).record(size as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, Node};
    use crate::storage::graph::InMemoryGraphStore;
    use crate::storage::{GraphCounts, GraphWriter};
    use std::time::Duration;

    fn engine() -> SuggestionEngine<InMemoryGraphStore> {
        let store = InMemoryGraphStore::new();
        store
            .upsert_node(&Node::new("target", "Target").with_tags(["project", "urgent", "backend"]))
            .unwrap();
        store
            .upsert_node(&Node::new("api", "API").with_tags(["documentation", "api", "backend"]))
            .unwrap();
        store.upsert_node(&Node::new("a", "A").with_tags(["backend"])).unwrap();
        store.upsert_node(&Node::new("b", "B")).unwrap();
        store.upsert_node(&Node::new("c", "C")).unwrap();
        for (s, t) in [("target", "a"), ("target", "b"), ("c", "a"), ("c", "b")] {
            store.insert_edge(&Edge::new(s, t, "link")).unwrap();
        }
        SuggestionEngine::new(store)
    }

    fn ids(suggestions: &[ConnectionSuggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.node_id.as_str()).collect()
    }

    #[test]
    fn test_missing_node_is_empty() {
        let result = engine()
            .suggest_connections(&NodeId::new("does-not-exist"), &SuggestionOptions::default())
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let engine = engine();
        let target = NodeId::new("target");
        for options in [
            SuggestionOptions::default().with_max_suggestions(0),
            SuggestionOptions::default().with_min_confidence(1.5),
            SuggestionOptions::default().with_types(Vec::new()),
        ] {
            assert!(matches!(
                engine.suggest_connections(&target, &options),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_existing_neighbours_excluded_by_default() {
        let engine = engine();
        let target = NodeId::new("target");
        let result = engine
            .suggest_connections(&target, &SuggestionOptions::default())
            .unwrap();
        assert!(!ids(&result).contains(&"a"));
        assert!(ids(&result).contains(&"api"));
        assert!(ids(&result).contains(&"c"));

        let included = engine
            .suggest_connections(
                &target,
                &SuggestionOptions::default().with_exclude_existing(false),
            )
            .unwrap();
        assert!(ids(&included).contains(&"a"));
    }

    #[test]
    fn test_community_beats_mutual_for_same_node() {
        let result = engine()
            .suggest_by_community(&NodeId::new("target"), 10)
            .unwrap();
        assert_eq!(ids(&result), vec!["c"]);
        assert_eq!(result[0].suggestion_type, SuggestionType::SameCommunity);
        assert!(result[0].reason.contains("community"));
    }

    #[test]
    fn test_suggest_by_shared_tags_respects_limit() {
        let engine = engine();
        let target = NodeId::new("target");
        let all = engine
            .suggest_connections(
                &target,
                &SuggestionOptions::default()
                    .with_types([SuggestionType::SharedTags])
                    .with_exclude_existing(false),
            )
            .unwrap();
        assert_eq!(ids(&all), vec!["a", "api"]);

        let limited = engine.suggest_by_shared_tags(&target, 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert!(limited.iter().all(|s| s.suggestion_type == SuggestionType::SharedTags));
    }

    #[test]
    fn test_batch_matches_single_and_collapses_duplicates() {
        let engine = engine();
        let options = SuggestionOptions::default();
        let requested = [
            NodeId::new("target"),
            NodeId::new("c"),
            NodeId::new("target"),
            NodeId::new("ghost"),
        ];

        let batch = engine.batch_suggest_connections(&requested, &options).unwrap();
        assert_eq!(batch.len(), 3);
        for id in &requested {
            assert_eq!(batch[id], engine.suggest_connections(id, &options).unwrap());
        }
    }

    #[test]
    fn test_expired_deadline() {
        let engine = engine();
        let expired = Instant::now().checked_sub(Duration::from_millis(1)).unwrap_or_else(Instant::now);
        let result = engine.suggest_connections_with_deadline(
            &NodeId::new("target"),
            &SuggestionOptions::default(),
            expired,
        );
        assert!(matches!(result, Err(Error::DeadlineExceeded { .. })));

        let generous = Instant::now() + Duration::from_secs(60);
        assert!(engine
            .suggest_connections_with_deadline(
                &NodeId::new("target"),
                &SuggestionOptions::default(),
                generous,
            )
            .is_ok());
    }

    #[test]
    fn test_metrics() {
        let metrics = engine().get_suggestion_metrics().unwrap();
        assert_eq!(metrics.total_nodes, 5);
        assert_eq!(metrics.total_edges, 4);
        assert!((metrics.average_tags_per_node - 7.0 / 5.0).abs() < 1e-9);
        assert!((metrics.graph_density - 0.4).abs() < 1e-9);
    }

    struct FailingReader;

    impl GraphReader for FailingReader {
        fn node(&self, id: &NodeId) -> Result<Option<Node>> {
            Ok(Some(Node::new(id.clone(), "Target")))
        }
        fn nodes(&self, _ids: &[NodeId]) -> Result<Vec<Node>> {
            Ok(Vec::new())
        }
        fn tags_of(&self, _id: &NodeId) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }
        fn adjacency_of(&self, _id: &NodeId) -> Result<HashSet<NodeId>> {
            Ok(HashSet::new())
        }
        fn shared_tag_candidates(
            &self,
            _id: &NodeId,
            _limit: usize,
        ) -> Result<Vec<crate::models::SharedTagCandidate>> {
            Err(Error::query("shared_tag_candidates", "disk I/O error"))
        }
        fn second_degree_candidates(
            &self,
            _id: &NodeId,
            _min_mutual: usize,
            _limit: usize,
        ) -> Result<Vec<crate::models::MutualCandidate>> {
            Ok(Vec::new())
        }
        fn temporal_candidates(
            &self,
            _id: &NodeId,
            _created_window_ms: i64,
            _modified_window_ms: i64,
        ) -> Result<Vec<crate::models::TemporalCandidate>> {
            Ok(Vec::new())
        }
        fn content_candidates(
            &self,
            _id: &NodeId,
            _name_ratio: f64,
            _content_ratio: f64,
        ) -> Result<Vec<crate::models::ContentCandidate>> {
            Ok(Vec::new())
        }
        fn counts(&self) -> Result<GraphCounts> {
            Ok(GraphCounts::default())
        }
        fn average_tag_count(&self) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_heuristic_failure_is_surfaced() {
        let engine = SuggestionEngine::new(FailingReader);
        let result = engine.suggest_connections(&NodeId::new("x"), &SuggestionOptions::default());
        assert!(matches!(
            result,
            Err(Error::QueryFailed { ref operation, .. }) if operation == "sharedTags/shared_tag_candidates"
        ));

        let without_tags = SuggestionOptions::default().with_types([SuggestionType::TemporalProximity]);
        assert!(engine.suggest_connections(&NodeId::new("x"), &without_tags).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_scoring_rejected() {
        let mut scoring = ScoringConfig::default();
        scoring.mutual_connections.cap = 1.2;
        assert!(engine().with_scoring(scoring).is_err());
    }

    #[tokio::test]
    async fn test_concurrent_batch_matches_sequential() {
        let engine = engine().with_engine_config(EngineConfig { max_concurrent: 2 });
        let requested: Vec<NodeId> = ["target", "a", "b", "c", "api", "ghost"]
            .into_iter()
            .map(NodeId::new)
            .collect();
        let options = SuggestionOptions::default().with_min_confidence(0.0);

        let concurrent = engine
            .batch_suggest_connections_concurrent(&requested, &options)
            .await
            .unwrap();
        let sequential = engine.batch_suggest_connections(&requested, &options).unwrap();
        assert_eq!(concurrent, sequential);
    }
}
