//! Community-feedback weight calculation for comments.
//!
//! Reactions are the dominant signal: approving kinds add a full point,
//! disapproval subtracts one, and the softer kinds contribute fractions.
//! Edit count is a weak proxy for refinement, damped logarithmically and
//! halved so that a heavily edited comment can never outvote reactions.

use std::cmp::Ordering;

use futures::future::join_all;
use tracing::warn;

use crate::fetch::IssueFetcher;
use crate::models::{Comment, EditSnapshot, Reaction, ReactionKind, WeightedComment};

/// Fixed per-kind reaction weights.
pub fn reaction_weight(kind: ReactionKind) -> f64 {
    match kind {
        ReactionKind::ThumbsUp | ReactionKind::Heart | ReactionKind::Hooray | ReactionKind::Rocket => 1.0,
        ReactionKind::ThumbsDown => -1.0,
        ReactionKind::Confused => -0.5,
        ReactionKind::Eyes => 0.5,
        ReactionKind::Laugh => 0.25,
        ReactionKind::Other => 0.0,
    }
}

fn reaction_sum(reactions: &[Reaction]) -> f64 {
    reactions.iter().map(|r| reaction_weight(r.content)).sum()
}

fn edit_weight(edit_count: usize) -> f64 {
    if edit_count == 0 {
        0.0
    } else {
        ((edit_count + 1) as f64).log2()
    }
}

/// Scalar weight for one comment: reaction sum plus half the damped edit
/// signal. Zero reactions and zero edits yield exactly 0 (neutral).
pub fn comment_weight(reactions: &[Reaction], edits: &[EditSnapshot]) -> f64 {
    reaction_sum(reactions) + 0.5 * edit_weight(edits.len())
}

/// Annotate comments with their feedback weights, sorted descending.
///
/// Reaction and edit fetches for all comments are issued concurrently and
/// awaited jointly. A failed fetch for either signal degrades to treating
/// that signal as empty; it never fails the comment.
pub async fn weigh_comments(
    fetcher: &dyn IssueFetcher,
    comments: Vec<Comment>,
) -> Vec<WeightedComment> {
    let futures = comments.into_iter().map(|comment| async move {
        let reactions = match fetcher.fetch_reactions(&comment).await {
            Ok(reactions) => reactions,
            Err(err) => {
                warn!(comment = %comment.id, error = %err, "reaction fetch failed, treating as empty");
                Vec::new()
            }
        };
        let edits = match fetcher.fetch_edit_history(&comment).await {
            Ok(edits) => edits,
            Err(err) => {
                warn!(comment = %comment.id, error = %err, "edit-history fetch failed, treating as empty");
                Vec::new()
            }
        };
        let weight = comment_weight(&reactions, &edits);
        WeightedComment {
            comment,
            weight,
            reactions,
            edits,
        }
    });

    let mut weighted = join_all(futures).await;
    weighted.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    weighted
}
