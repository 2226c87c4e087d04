//! Core data models for the context aggregation pipeline.
//!
//! These types represent the comments, reactions, tree nodes, and context
//! blocks that flow from the crawler through weighting and serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::IssueKey;

/// Reaction content kinds the tracker can attach to a comment.
///
/// `Other` absorbs kinds introduced by the tracker after this crate was
/// written; they carry zero weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    #[serde(rename = "+1")]
    ThumbsUp,
    Heart,
    Hooray,
    Rocket,
    #[serde(rename = "-1")]
    ThumbsDown,
    Confused,
    Eyes,
    Laugh,
    #[serde(other)]
    Other,
}

/// A single reaction on a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct Reaction {
    pub content: ReactionKind,
    #[serde(default)]
    pub user: Option<String>,
}

/// One chronological body snapshot from a comment's edit history.
#[derive(Debug, Clone)]
pub struct EditSnapshot {
    pub edited_at: DateTime<Utc>,
    pub body: String,
}

/// A fetched discussion comment. Immutable within a single crawl.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    /// `org/repo` of the issue this comment belongs to.
    pub owner_repo: String,
    pub source_url: String,
}

/// A comment annotated with its community-feedback weight.
///
/// The weight is derived from reactions and edit history; only the weight
/// calculator and the feedback processor path recompute it.
#[derive(Debug, Clone)]
pub struct WeightedComment {
    pub comment: Comment,
    pub weight: f64,
    pub reactions: Vec<Reaction>,
    pub edits: Vec<EditSnapshot>,
}

/// How a node was reached from its parent.
///
/// Closing references ("fixes #12") outrank dependency mentions
/// ("depends on #12"), which outrank incidental links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    Closing,
    Depends,
    Direct,
}

impl ReferenceType {
    /// Expansion priority; lower expands first. Ties break on discovery order.
    pub fn priority(&self) -> u8 {
        match self {
            ReferenceType::Closing => 0,
            ReferenceType::Depends => 1,
            ReferenceType::Direct => 2,
        }
    }
}

/// Lifecycle state of a crawled node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Processed,
    /// Fetch failed; the reason is recorded and the subtree is not expanded.
    Error(String),
}

/// One issue or pull request discovered during a crawl.
#[derive(Debug, Clone)]
pub struct IssueNode {
    pub key: IssueKey,
    /// Issue body or PR description ("spec").
    pub spec_body: String,
    pub is_pull_request: bool,
    /// Unified diff; may be absent even for pull requests when the diff
    /// fetch degrades.
    pub pr_diff: Option<String>,
    /// Child keys in canonical form, priority-then-discovery order.
    pub children: Vec<String>,
    pub depth: usize,
    pub status: NodeStatus,
    pub reference_type: ReferenceType,
}

/// Kind of a serialized context block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Spec,
    Conversation,
    Diff,
}

/// One labeled unit of serialized context destined for a bounded-context
/// consumer.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    /// Canonical key of the node this block was rendered from.
    pub key: String,
    pub kind: BlockKind,
    pub text: String,
    pub tokens: usize,
}

/// A comment selected as secondary context, with its combined score.
#[derive(Debug, Clone)]
pub struct RankedComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub score: f64,
}

/// The two context artifacts handed to the downstream completion consumer,
/// plus the token count of the primary blocks.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// Primary context: ordered blocks from the serialized tree.
    pub blocks: Vec<ContextBlock>,
    /// Secondary context: top-ranked comments for the question.
    pub ranked_comments: Vec<RankedComment>,
    /// Community-validated signal for the question itself.
    pub question_signal: f64,
    /// Token total of the blocks actually included.
    pub token_count: usize,
}
