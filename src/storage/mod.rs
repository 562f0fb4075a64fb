//! Storage layer abstraction.
//!
//! The engine depends only on the read-only [`GraphReader`] trait. Two stores
//! implement it: [`graph::SqliteGraphStore`] for real data and
//! [`graph::InMemoryGraphStore`] for tests.

pub mod graph;
pub mod sqlite;
pub mod traits;

pub use traits::{GraphCounts, GraphReader, GraphWriter};
