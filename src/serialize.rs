//! Linearizes a crawled tree into ordered, labeled context blocks.
//!
//! Keys render exactly once, in discovery order, root first. Each node
//! contributes up to three blocks: its specification (issue body or PR
//! description), its conversation (comments that survive deduplication),
//! and for pull requests the diff. Headers distinguish the current item
//! from linked ones so the downstream consumer can anchor its answer.
//!
//! Every block carries a token count from the tokenizer; the running
//! total is returned so the caller can decide what to trim.

use std::collections::HashSet;

use crate::crawler::CrawlResult;
use crate::models::{BlockKind, ContextBlock, WeightedComment};
use crate::tokens::Tokenizer;

const NO_SPEC_FALLBACK: &str = "No specification or body available";

/// Render the crawl result into context blocks plus the total token count.
pub fn serialize_context(
    result: &CrawlResult,
    root_key: &str,
    tokenizer: &dyn Tokenizer,
) -> (Vec<ContextBlock>, usize) {
    let mut blocks: Vec<ContextBlock> = Vec::new();
    let mut rendered: HashSet<&str> = HashSet::new();
    let mut total_tokens = 0;

    for key in &result.order {
        // Set semantics: a key reachable along several paths renders once.
        if !rendered.insert(key.as_str()) {
            continue;
        }
        let node = match result.nodes.get(key) {
            Some(node) => node,
            None => continue,
        };

        let is_current = key == root_key;
        let is_pull = node.is_pull_request;
        let spec_body = if node.spec_body.is_empty() {
            NO_SPEC_FALLBACK
        } else {
            node.spec_body.as_str()
        };

        let spec_label = block_label(is_current, is_pull, "Specification");
        let spec_text = format!(
            "{}{}\n{}",
            block_header(&spec_label, key),
            spec_body,
            block_footer(&spec_label, key)
        );
        total_tokens += push_block(&mut blocks, key, BlockKind::Spec, spec_text, tokenizer);

        let comments = result.comments.get(key).map(Vec::as_slice).unwrap_or(&[]);
        if let Some(conversation) = render_conversation(comments, spec_body) {
            let convo_label = block_label(is_current, is_pull, "Conversation");
            let convo_text = format!(
                "{}{}{}",
                block_header(&convo_label, key),
                conversation,
                block_footer(&convo_label, key)
            );
            total_tokens +=
                push_block(&mut blocks, key, BlockKind::Conversation, convo_text, tokenizer);
        }

        if let Some(diff) = &node.pr_diff {
            let diff_text = format!(
                "{}{}\n{}",
                block_header("Pull Request Diff", key),
                diff,
                block_footer("Pull Request Diff", key)
            );
            total_tokens += push_block(&mut blocks, key, BlockKind::Diff, diff_text, tokenizer);
        }
    }

    (blocks, total_tokens)
}

fn push_block(
    blocks: &mut Vec<ContextBlock>,
    key: &str,
    kind: BlockKind,
    text: String,
    tokenizer: &dyn Tokenizer,
) -> usize {
    let tokens = tokenizer.count_tokens(&text);
    blocks.push(ContextBlock {
        key: key.to_string(),
        kind,
        text,
        tokens,
    });
    tokens
}

fn block_label(is_current: bool, is_pull: bool, category: &str) -> String {
    let status = if is_current { "Current" } else { "Linked" };
    let kind = if is_pull { "Pull Request" } else { "Task" };
    format!("{status} {kind} {category}")
}

fn block_header(label: &str, key: &str) -> String {
    format!("=== {label} === {key} ===\n\n")
}

fn block_footer(label: &str, key: &str) -> String {
    format!("=== End {label} === {key} ===\n\n")
}

/// Format the conversation, deduplicating by comment id and dropping any
/// comment byte-identical to the node's own spec (self-citation).
fn render_conversation(comments: &[WeightedComment], spec_body: &str) -> Option<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut lines = String::new();

    for weighted in comments {
        let comment = &weighted.comment;
        if comment.body == spec_body || !seen.insert(comment.id.as_str()) {
            continue;
        }
        lines.push_str(&format!("{} {}: {}\n", comment.id, comment.author, comment.body));
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}
