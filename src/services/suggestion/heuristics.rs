//! The five candidate scorers.
//!
//! Each scorer issues exactly one [`GraphReader`] query and turns the rows
//! into scored suggestions. Scorers never see each other's output.

use crate::config::{MS_PER_DAY, ScoringConfig};
use crate::models::{ConnectionSuggestion, Node, NodeId, SuggestionType};
use crate::Result;
use crate::storage::GraphReader;
use std::collections::HashSet;

/// Everything a scorer needs for one target node.
pub struct HeuristicContext<'a> {
    /// Store to query.
    pub reader: &'a dyn GraphReader,
    /// Live target node.
    pub target: &'a Node,
    /// Target's live first-degree neighbours, fetched once per call.
    pub neighbours: &'a HashSet<NodeId>,
    /// Scoring constants.
    pub scoring: &'a ScoringConfig,
}

/// Runs the scorer for `suggestion_type`.
///
/// # Errors
///
/// Propagates the scorer's query failure.
pub fn run(
    suggestion_type: SuggestionType,
    ctx: &HeuristicContext<'_>,
) -> Result<Vec<ConnectionSuggestion>> {
    match suggestion_type {
        SuggestionType::SharedTags => shared_tags(ctx),
        SuggestionType::SameCommunity => same_community(ctx),
        SuggestionType::MutualConnections => mutual_connections(ctx),
        SuggestionType::TemporalProximity => temporal_proximity(ctx),
        SuggestionType::SimilarContent => similar_content(ctx),
        // Reserved: no embedding source exists yet.
        SuggestionType::SemanticSimilarity => Ok(Vec::new()),
    }
}

/// Returns `true` if the scorer needs the target's adjacency set.
#[must_use]
pub const fn needs_adjacency(suggestion_type: SuggestionType) -> bool {
    matches!(
        suggestion_type,
        SuggestionType::SameCommunity | SuggestionType::MutualConnections
    )
}

fn shared_tags(ctx: &HeuristicContext<'_>) -> Result<Vec<ConnectionSuggestion>> {
    let scoring = &ctx.scoring.shared_tags;
    let rows = ctx
        .reader
        .shared_tag_candidates(&ctx.target.id, scoring.limit)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let count = row.shared_tags.len();
            ConnectionSuggestion::new(
                row.node_id,
                SuggestionType::SharedTags,
                scoring.score(count),
                format!("Shares {count} tag(s): {}", row.shared_tags.join(", ")),
            )
        })
        .collect())
}

fn same_community(ctx: &HeuristicContext<'_>) -> Result<Vec<ConnectionSuggestion>> {
    let scoring = &ctx.scoring.same_community;
    let min_mutual = ctx.scoring.community_min_mutual;
    if ctx.neighbours.len() < min_mutual {
        return Ok(Vec::new());
    }

    let rows = ctx
        .reader
        .second_degree_candidates(&ctx.target.id, min_mutual, scoring.limit)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            ConnectionSuggestion::new(
                row.node_id,
                SuggestionType::SameCommunity,
                scoring.score(row.mutual_count),
                format!("Same community ({} mutual connections)", row.mutual_count),
            )
        })
        .collect())
}

fn mutual_connections(ctx: &HeuristicContext<'_>) -> Result<Vec<ConnectionSuggestion>> {
    let scoring = &ctx.scoring.mutual_connections;
    if ctx.neighbours.is_empty() {
        return Ok(Vec::new());
    }

    let rows = ctx
        .reader
        .second_degree_candidates(&ctx.target.id, 1, scoring.limit)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let noun = if row.mutual_count == 1 {
                "connection"
            } else {
                "connections"
            };
            ConnectionSuggestion::new(
                row.node_id,
                SuggestionType::MutualConnections,
                scoring.score(row.mutual_count),
                format!("{} mutual {noun}", row.mutual_count),
            )
        })
        .collect())
}

fn temporal_proximity(ctx: &HeuristicContext<'_>) -> Result<Vec<ConnectionSuggestion>> {
    let scoring = &ctx.scoring.temporal;
    let mut rows = ctx.reader.temporal_candidates(
        &ctx.target.id,
        scoring.created_window_ms(),
        scoring.modified_window_ms(),
    )?;

    rows.sort_by(|a, b| {
        b.same_folder
            .cmp(&a.same_folder)
            .then_with(|| nearest_gap(a).cmp(&nearest_gap(b)))
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    rows.truncate(scoring.limit);

    Ok(rows
        .into_iter()
        .map(|row| {
            let (field, gap_ms) = if row.created_gap_ms <= row.modified_gap_ms {
                ("created", row.created_gap_ms)
            } else {
                ("modified", row.modified_gap_ms)
            };
            #[allow(clippy::cast_precision_loss)]
            let gap_days = gap_ms as f64 / MS_PER_DAY;
            let mut reason = format!("Temporal proximity ({field} {})", describe_gap(gap_days));
            if row.same_folder {
                reason.push_str(", same folder");
            }
            ConnectionSuggestion::new(
                row.node_id,
                SuggestionType::TemporalProximity,
                scoring.score(gap_days, row.same_folder),
                reason,
            )
        })
        .collect())
}

fn similar_content(ctx: &HeuristicContext<'_>) -> Result<Vec<ConnectionSuggestion>> {
    let scoring = &ctx.scoring.content;
    let mut rows =
        ctx.reader
            .content_candidates(&ctx.target.id, scoring.name_ratio, scoring.content_ratio)?;

    rows.sort_by(|a, b| {
        b.same_folder
            .cmp(&a.same_folder)
            .then_with(|| a.name_length_gap.cmp(&b.name_length_gap))
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    rows.truncate(scoring.limit);

    Ok(rows
        .into_iter()
        .map(|row| {
            let reason = match (row.same_folder, ctx.target.folder.as_deref()) {
                (true, Some(folder)) => format!("Similar content (same folder: {folder})"),
                _ => format!(
                    "Similar content (name length differs by {} character(s))",
                    row.name_length_gap
                ),
            };
            ConnectionSuggestion::new(
                row.node_id,
                SuggestionType::SimilarContent,
                scoring.score(row.same_folder),
                reason,
            )
        })
        .collect())
}

fn nearest_gap(row: &crate::models::TemporalCandidate) -> i64 {
    row.created_gap_ms.min(row.modified_gap_ms)
}

fn describe_gap(days: f64) -> String {
    if days < 1.0 {
        "same day".to_string()
    } else if days < 7.0 {
        format!("within {} days", days.ceil())
    } else {
        "same week".to_string()
    }
}
