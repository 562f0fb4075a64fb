//! Merges heuristic output into one suggestion per candidate.

use crate::models::{ConnectionSuggestion, NodeId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

/// Keeps the strongest suggestion per candidate node.
///
/// On equal confidence the heuristic declared first in
/// [`SuggestionType`](crate::models::SuggestionType) wins. The target itself
/// and, when `exclude` is given, its existing neighbours are dropped.
#[must_use]
pub fn merge(
    target: &NodeId,
    candidates: impl IntoIterator<Item = ConnectionSuggestion>,
    exclude: Option<&HashSet<NodeId>>,
) -> Vec<ConnectionSuggestion> {
    let mut best: HashMap<NodeId, ConnectionSuggestion> = HashMap::new();

    for suggestion in candidates {
        if &suggestion.node_id == target
            || exclude.is_some_and(|existing| existing.contains(&suggestion.node_id))
        {
            continue;
        }
        match best.entry(suggestion.node_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(suggestion);
            },
            Entry::Occupied(mut slot) => {
                if outranks(&suggestion, slot.get()) {
                    slot.insert(suggestion);
                }
            },
        }
    }

    best.into_values().collect()
}

fn outranks(candidate: &ConnectionSuggestion, incumbent: &ConnectionSuggestion) -> bool {
    match candidate.confidence.total_cmp(&incumbent.confidence) {
        Ordering::Greater => true,
        Ordering::Equal => candidate.suggestion_type < incumbent.suggestion_type,
        Ordering::Less => false,
    }
}
