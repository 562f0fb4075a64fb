//! Storage backend traits.

pub mod graph;

pub use graph::{GraphCounts, GraphReader, GraphWriter};
