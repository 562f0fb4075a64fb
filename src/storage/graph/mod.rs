//! Graph stores implementing [`GraphReader`] (and [`GraphWriter`] for seeding).
//!
//! # Available Backends
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | [`SqliteGraphStore`] | Default; embedded | One aggregate SQL query per heuristic |
//! | [`InMemoryGraphStore`] | Testing | Fast, no persistence |
//!
//! # Example
//!
//! ```rust,ignore
//! use linkwise::storage::graph::SqliteGraphStore;
//! use linkwise::storage::GraphWriter;
//!
//! let store = SqliteGraphStore::new("graph.db")?;
//! store.load_fixture(&fixture)?;
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryGraphStore;
pub use sqlite::SqliteGraphStore;

pub use crate::storage::traits::graph::{GraphCounts, GraphReader, GraphWriter};
