//! End-to-end context assembly for a question about a tracker item.
//!
//! Crawl the reference graph, rank the fetched comments against the
//! question, serialize the tree, and trim the serialized blocks to the
//! configured token budget. The result is a [`ContextBundle`] ready to
//! hand to a completion consumer.

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::crawler::Crawler;
use crate::fetch::IssueFetcher;
use crate::key::IssueKey;
use crate::models::{ContextBlock, ContextBundle, RankedComment, WeightedComment};
use crate::serialize::serialize_context;
use crate::tokens::Tokenizer;
use crate::trigram::{score_with_table, weight_table, TrigramScorer};

/// Crawl from `root_reference` and assemble the full context bundle for
/// `question`.
pub async fn assemble_context(
    question: &str,
    root_reference: &str,
    fetcher: &dyn IssueFetcher,
    scorer: &TrigramScorer,
    tokenizer: &dyn Tokenizer,
    config: &Config,
) -> Result<ContextBundle> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }

    let root = IssueKey::from_reference(root_reference, None)?;
    let root_key = root.to_string();

    let crawler = Crawler::new(fetcher, config.crawler.max_depth);
    let result = crawler.crawl(root).await;
    info!(
        root = %root_key,
        nodes = result.nodes.len(),
        "crawl complete"
    );

    // Flatten comments in discovery order so ranking ties stay stable.
    let all_comments: Vec<WeightedComment> = result
        .order
        .iter()
        .filter_map(|key| result.comments.get(key))
        .flatten()
        .cloned()
        .collect();

    let ranked_comments = find_relevant_comments(
        question,
        &all_comments,
        config.scoring.relevance_threshold,
        config.scoring.max_relevant_comments,
    );
    let question_signal = scorer.score_text(question, &all_comments);

    let (blocks, total_tokens) = serialize_context(&result, &root_key, tokenizer);
    let (blocks, token_count) = trim_to_budget(blocks, config.context.token_budget);
    if token_count < total_tokens {
        debug!(
            budget = config.context.token_budget,
            serialized = total_tokens,
            kept = token_count,
            "context trimmed to token budget"
        );
    }

    Ok(ContextBundle {
        blocks,
        ranked_comments,
        question_signal,
        token_count,
    })
}

/// Rank comments by combined score: community weight plus the question's
/// trigram score against a table built from that comment alone.
pub fn find_relevant_comments(
    question: &str,
    comments: &[WeightedComment],
    threshold: f64,
    limit: usize,
) -> Vec<RankedComment> {
    let mut ranked: Vec<RankedComment> = comments
        .iter()
        .filter(|c| !c.comment.body.is_empty())
        .map(|c| {
            let table = weight_table(std::slice::from_ref(c));
            RankedComment {
                id: c.comment.id.clone(),
                author: c.comment.author.clone(),
                body: c.comment.body.clone(),
                score: c.weight + score_with_table(question, &table),
            }
        })
        .filter(|r| r.score >= threshold)
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

/// Keep whole blocks, in order, while the running total stays within
/// budget. Never splits a block.
fn trim_to_budget(blocks: Vec<ContextBlock>, budget: usize) -> (Vec<ContextBlock>, usize) {
    let mut kept = Vec::new();
    let mut total = 0;

    for block in blocks {
        if total + block.tokens > budget {
            break;
        }
        total += block.tokens;
        kept.push(block);
    }

    (kept, total)
}
