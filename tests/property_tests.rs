//! Property-based tests for the suggestion pipeline.
//!
//! Uses proptest to verify invariants across random graphs:
//! - Confidence stays within `[0, 1)`
//! - A node is never suggested to itself
//! - Each candidate appears at most once
//! - Results are sorted, capped and thresholded
//! - Existing neighbours are excluded when requested
//! - Batch results equal single-node results
//! - `SQLite` and in-memory stores produce identical suggestions

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use linkwise::storage::graph::{InMemoryGraphStore, SqliteGraphStore};
use linkwise::storage::{GraphReader, GraphWriter};
use linkwise::{Edge, Node, NodeId, SuggestionEngine, SuggestionOptions, SuggestionType};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

const TAGS: &[&str] = &["rust", "notes", "backend", "ideas", "urgent"];
const FOLDERS: &[&str] = &["work", "home"];
const NAMES: &[&str] = &["A", "Plan", "Inbox", "Meeting notes", "Reading list", "Q3 roadmap draft"];

#[derive(Debug, Clone)]
struct NodeShape {
    name: usize,
    tags: BTreeSet<usize>,
    folder: Option<usize>,
    content_len: Option<usize>,
    day: i64,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct GraphShape {
    nodes: Vec<NodeShape>,
    edges: Vec<(usize, usize)>,
}

fn node_shape() -> impl Strategy<Value = NodeShape> {
    (
        0..NAMES.len(),
        prop::collection::vec(0..TAGS.len(), 0..4),
        prop::option::of(0..FOLDERS.len()),
        prop::option::of(1_usize..200),
        0_i64..20,
        prop::bool::weighted(0.1),
    )
        .prop_map(|(name, tags, folder, content_len, day, deleted)| NodeShape {
            name,
            tags: tags.into_iter().collect(),
            folder,
            content_len,
            day,
            deleted,
        })
}

fn graph_shape() -> impl Strategy<Value = GraphShape> {
    prop::collection::vec(node_shape(), 1..14).prop_flat_map(|nodes| {
        let n = nodes.len();
        // Reciprocal, parallel and self-loop edges are all fair game.
        let edges = prop::collection::vec((0..n, 0..n), 0..(n * 3));
        (Just(nodes), edges).prop_map(|(nodes, edges)| GraphShape { nodes, edges })
    })
}

fn options_strategy() -> impl Strategy<Value = SuggestionOptions> {
    (
        1_usize..12,
        0.0_f64..0.9,
        prop::collection::vec(0..SuggestionType::all().len(), 1..5),
        any::<bool>(),
    )
        .prop_map(|(max, min, types, exclude)| {
            SuggestionOptions::default()
                .with_max_suggestions(max)
                .with_min_confidence(min)
                .with_types(types.into_iter().map(|i| SuggestionType::all()[i]))
                .with_exclude_existing(exclude)
        })
}

fn id(i: usize) -> NodeId {
    NodeId::new(format!("n{i:02}"))
}

fn seed<W: GraphWriter>(store: &W, shape: &GraphShape) {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for (i, n) in shape.nodes.iter().enumerate() {
        let at = base + Duration::days(n.day);
        let mut node = Node::new(id(i), NAMES[n.name])
            .with_tags(n.tags.iter().map(|t| TAGS[*t]))
            .with_timestamps(at, at + Duration::hours(i64::try_from(i).unwrap()));
        if let Some(folder) = n.folder {
            node = node.with_folder(FOLDERS[folder]);
        }
        if let Some(len) = n.content_len {
            node = node.with_content("x".repeat(len));
        }
        store.upsert_node(&node).unwrap();
    }
    for (s, t) in &shape.edges {
        store.insert_edge(&Edge::new(id(*s), id(*t), "link")).unwrap();
    }
    for (i, n) in shape.nodes.iter().enumerate() {
        if n.deleted {
            store
                .soft_delete_node(&id(i), base + Duration::days(100))
                .unwrap();
        }
    }
}

fn memory_engine(shape: &GraphShape) -> SuggestionEngine<InMemoryGraphStore> {
    let store = InMemoryGraphStore::new();
    seed(&store, shape);
    SuggestionEngine::new(store)
}

fn sqlite_engine(shape: &GraphShape) -> SuggestionEngine<SqliteGraphStore> {
    let store = SqliteGraphStore::in_memory().unwrap();
    seed(&store, shape);
    SuggestionEngine::new(store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every ranked result obeys range, self, uniqueness, order,
    /// cap, threshold and exclusion rules.
    #[test]
    fn prop_result_invariants(shape in graph_shape(), options in options_strategy()) {
        let engine = memory_engine(&shape);
        for i in 0..shape.nodes.len() {
            let target = id(i);
            let results = engine.suggest_connections(&target, &options).unwrap();

            prop_assert!(results.len() <= options.max_suggestions);
            let mut seen = HashSet::new();
            for s in &results {
                prop_assert!(s.confidence >= 0.0 && s.confidence < 1.0);
                prop_assert!(s.confidence >= options.min_confidence);
                prop_assert_ne!(&s.node_id, &target);
                prop_assert!(seen.insert(s.node_id.clone()));
                prop_assert!(options.includes(s.suggestion_type));
            }
            prop_assert!(results.windows(2).all(|w| w[0].confidence >= w[1].confidence));

            if options.exclude_existing_connections {
                let neighbours = engine.backend().adjacency_of(&target).unwrap();
                prop_assert!(results.iter().all(|s| !neighbours.contains(&s.node_id)));
            }
        }
    }

    /// Property: deleted nodes are never targets nor candidates.
    #[test]
    fn prop_deleted_nodes_invisible(shape in graph_shape()) {
        let engine = memory_engine(&shape);
        let options = SuggestionOptions::default().with_min_confidence(0.0);
        let deleted: HashSet<NodeId> = shape
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.deleted)
            .map(|(i, _)| id(i))
            .collect();

        for i in 0..shape.nodes.len() {
            let results = engine.suggest_connections(&id(i), &options).unwrap();
            if deleted.contains(&id(i)) {
                prop_assert!(results.is_empty());
            }
            prop_assert!(results.iter().all(|s| !deleted.contains(&s.node_id)));
        }
    }

    /// Property: batch output equals per-node output.
    #[test]
    fn prop_batch_matches_single(shape in graph_shape(), options in options_strategy()) {
        let engine = memory_engine(&shape);
        let ids: Vec<NodeId> = (0..shape.nodes.len()).map(id).rev().collect();
        let batch = engine.batch_suggest_connections(&ids, &options).unwrap();

        prop_assert_eq!(batch.len(), ids.len());
        for target in &ids {
            prop_assert_eq!(&batch[target], &engine.suggest_connections(target, &options).unwrap());
        }
    }

    /// Property: both stores implement the same query contract.
    #[test]
    fn prop_sqlite_agrees_with_memory(shape in graph_shape(), options in options_strategy()) {
        let memory = memory_engine(&shape);
        let sqlite = sqlite_engine(&shape);

        prop_assert_eq!(
            memory.get_suggestion_metrics().unwrap(),
            sqlite.get_suggestion_metrics().unwrap()
        );
        for i in 0..shape.nodes.len() {
            let target = id(i);
            prop_assert_eq!(
                memory.backend().adjacency_of(&target).unwrap(),
                sqlite.backend().adjacency_of(&target).unwrap()
            );
            prop_assert_eq!(
                memory.suggest_connections(&target, &options).unwrap(),
                sqlite.suggest_connections(&target, &options).unwrap()
            );
        }
    }

    /// Property: graph density is zero for tiny graphs and never negative.
    #[test]
    fn prop_density_bounds(shape in graph_shape()) {
        let metrics = memory_engine(&shape).get_suggestion_metrics().unwrap();
        prop_assert!(metrics.graph_density >= 0.0);
        if metrics.total_nodes <= 1 {
            prop_assert!(metrics.graph_density.abs() < f64::EPSILON);
        } else {
            prop_assert!(metrics.graph_density <= 1.0);
        }
    }
}
