//! Threshold, order and truncate.

use crate::models::ConnectionSuggestion;

/// Drops suggestions under `min_confidence`, sorts the rest by confidence
/// (descending) and keeps the first `max_suggestions`.
///
/// Equal confidences fall back to heuristic priority, then node id, so the
/// output is fully deterministic.
#[must_use]
pub fn rank(
    suggestions: Vec<ConnectionSuggestion>,
    min_confidence: f64,
    max_suggestions: usize,
) -> Vec<ConnectionSuggestion> {
    let mut kept: Vec<ConnectionSuggestion> = suggestions
        .into_iter()
        .filter(|s| s.confidence.is_finite() && s.confidence >= min_confidence)
        .collect();

    kept.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.suggestion_type.cmp(&b.suggestion_type))
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    kept.truncate(max_suggestions);
    kept
}
