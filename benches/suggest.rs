//! Benchmarks for the suggestion pipeline.
//!
//! Benchmark targets:
//! - 50 nodes, default options: well under 1s (typically low milliseconds)
//! - 500 nodes, default options: <50ms
//!
//! Each iteration runs every heuristic query, the merge and the ranking.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tempfile::TempDir;

use linkwise::storage::GraphWriter;
use linkwise::storage::graph::{InMemoryGraphStore, SqliteGraphStore};
use linkwise::{Edge, GraphReader, Node, NodeId, SuggestionEngine, SuggestionOptions};

// ============================================================================
// Helper Functions
// ============================================================================

const TAGS: &[&str] = &["rust", "notes", "backend", "design", "ideas", "reading", "urgent"];
const FOLDERS: &[&str] = &["work", "home", "archive", "inbox"];

/// Seeds a ring-plus-chords graph of `size` nodes.
fn seed<W: GraphWriter>(store: &W, size: usize) {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for i in 0..size {
        let at = base + Duration::hours(i64::try_from(i * 7).unwrap());
        let node = Node::new(format!("n{i:04}"), format!("Note {i}"))
            .with_folder(FOLDERS[i % FOLDERS.len()])
            .with_content("lorem ".repeat(20 + i % 40))
            .with_tags([TAGS[i % TAGS.len()], TAGS[(i * 3 + 1) % TAGS.len()]])
            .with_timestamps(at, at);
        store.upsert_node(&node).expect("Failed to seed node");
    }
    for i in 0..size {
        for step in [1, 5, 11] {
            let edge = Edge::new(
                format!("n{i:04}"),
                format!("n{:04}", (i + step) % size),
                "link",
            );
            store.insert_edge(&edge).expect("Failed to seed edge");
        }
    }
}

fn run<B: GraphReader>(engine: &SuggestionEngine<B>, target: &NodeId, options: &SuggestionOptions) {
    let results = engine
        .suggest_connections(black_box(target), options)
        .expect("Suggestion failed");
    black_box(results);
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_sqlite(c: &mut Criterion) {
    let mut group = c.benchmark_group("suggest_sqlite");
    let options = SuggestionOptions::default();

    for size in [50_usize, 500] {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteGraphStore::new(temp_dir.path().join("bench_graph.db"))
            .expect("Failed to create graph store");
        seed(&store, size);
        let engine = SuggestionEngine::new(store);
        let target = NodeId::new(format!("n{:04}", size / 2));

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| run(&engine, &target, &options));
        });
    }
    group.finish();
}

fn bench_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("suggest_memory");
    let options = SuggestionOptions::default();

    for size in [50_usize, 500] {
        let store = InMemoryGraphStore::new();
        seed(&store, size);
        let engine = SuggestionEngine::new(store);
        let target = NodeId::new(format!("n{:04}", size / 2));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| run(&engine, &target, &options));
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteGraphStore::new(temp_dir.path().join("bench_batch.db")).unwrap();
    seed(&store, 50);
    let engine = SuggestionEngine::new(store);
    let ids: Vec<NodeId> = (0..50).map(|i| NodeId::new(format!("n{i:04}"))).collect();
    let options = SuggestionOptions::default();

    c.bench_function("batch_50_sequential", |b| {
        b.iter(|| black_box(engine.batch_suggest_connections(&ids, &options).unwrap()));
    });

    let runtime = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("batch_50_concurrent", |b| {
        b.iter(|| {
            black_box(
                runtime
                    .block_on(engine.batch_suggest_connections_concurrent(&ids, &options))
                    .unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_sqlite, bench_memory, bench_batch);
criterion_main!(benches);
