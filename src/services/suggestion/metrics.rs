//! Graph-wide diagnostics.

use crate::Result;
use crate::models::SuggestionMetrics;
use crate::storage::GraphReader;

/// `edges / (n * (n - 1) / 2)` for `n > 1`, else 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn graph_density(total_nodes: usize, total_edges: usize) -> f64 {
    if total_nodes <= 1 {
        return 0.0;
    }
    let n = total_nodes as f64;
    total_edges as f64 / (n * (n - 1.0) / 2.0)
}

/// Computes [`SuggestionMetrics`] over live nodes and edges.
///
/// # Errors
///
/// Returns [`crate::Error::QueryFailed`] if either query fails.
pub fn collect(reader: &dyn GraphReader) -> Result<SuggestionMetrics> {
    let counts = reader.counts()?;
    let average_tags_per_node = reader.average_tag_count()?;

    Ok(SuggestionMetrics {
        total_nodes: counts.total_nodes,
        total_edges: counts.total_edges,
        average_tags_per_node,
        graph_density: graph_density(counts.total_nodes, counts.total_edges),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, 0.0 ; "empty graph")]
    #[test_case(1, 0, 0.0 ; "single node")]
    #[test_case(2, 1, 1.0 ; "complete pair")]
    #[test_case(4, 3, 0.5 ; "path of four")]
    #[test_case(50, 49, 0.04 ; "spanning tree of fifty")]
    fn test_graph_density(nodes: usize, edges: usize, expected: f64) {
        assert!((graph_density(nodes, edges) - expected).abs() < 1e-9);
    }
}
