//! Bounded, cycle-safe traversal of the issue cross-reference graph.
//!
//! Breadth-first expansion from a root item: each level's fetches are
//! issued concurrently and awaited jointly, then the level's results are
//! fully processed before the next level expands, keeping the visited-set
//! check-and-mark race-free. Nodes live in a map keyed by canonical
//! identity key, never by object reference, so cycles from mutual `#n`
//! mentions are structurally impossible to loop on.
//!
//! A fetch failure marks its node `Error` with the reason and prunes that
//! subtree; sibling branches continue. Partial trees are valid output.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::extract::{extract_references, LinkedReference};
use crate::fetch::IssueFetcher;
use crate::key::IssueKey;
use crate::models::{IssueNode, NodeStatus, ReferenceType, WeightedComment};
use crate::weights::weigh_comments;

/// The populated tree plus all fetched comments, grouped by key.
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// Node arena keyed by canonical key.
    pub nodes: HashMap<String, IssueNode>,
    /// Keys in discovery order; the root is always first.
    pub order: Vec<String>,
    /// Weighted comments grouped by the key they were fetched under.
    pub comments: HashMap<String, Vec<WeightedComment>>,
}

struct QueueEntry {
    key: IssueKey,
    depth: usize,
    priority: u8,
    discovered: usize,
}

pub struct Crawler<'a> {
    fetcher: &'a dyn IssueFetcher,
    max_depth: usize,
}

impl<'a> Crawler<'a> {
    pub fn new(fetcher: &'a dyn IssueFetcher, max_depth: usize) -> Self {
        Self { fetcher, max_depth }
    }

    /// Crawl from a root with a fresh visited set.
    pub async fn crawl(&self, root: IssueKey) -> CrawlResult {
        self.crawl_with_visited(root, HashSet::new()).await
    }

    /// Crawl from a root, honoring keys already visited by an enclosing
    /// traversal. No key is fetched twice.
    pub async fn crawl_with_visited(
        &self,
        root: IssueKey,
        mut visited: HashSet<String>,
    ) -> CrawlResult {
        let mut result = CrawlResult::default();
        let mut discovery: usize = 0;

        let root_key = root.to_string();
        visited.insert(root_key.clone());
        result.nodes.insert(
            root_key.clone(),
            pending_node(root.clone(), 0, ReferenceType::Direct),
        );
        result.order.push(root_key);

        let mut level = vec![QueueEntry {
            key: root,
            depth: 0,
            priority: ReferenceType::Direct.priority(),
            discovered: discovery,
        }];
        discovery += 1;

        while !level.is_empty() {
            // Higher-priority branches expand first when the depth budget
            // would otherwise cut them off.
            level.sort_by_key(|e| (e.priority, e.discovered));

            let fetches = join_all(level.iter().map(|e| self.fetcher.fetch_issue(&e.key))).await;

            let mut next_level: Vec<QueueEntry> = Vec::new();

            for (entry, fetched) in level.iter().zip(fetches) {
                let key = entry.key.to_string();

                let issue = match fetched {
                    Ok(issue) => issue,
                    Err(err) => {
                        warn!(key = %key, error = %err, "node fetch failed, pruning subtree");
                        if let Some(node) = result.nodes.get_mut(&key) {
                            node.status = NodeStatus::Error(err.to_string());
                        }
                        continue;
                    }
                };

                // Candidate edges come from the body and every comment,
                // resolved against this node's own repository.
                let mut candidates: Vec<LinkedReference> =
                    extract_references(&issue.body, &entry.key);
                for comment in &issue.comments {
                    for reference in extract_references(&comment.body, &entry.key) {
                        if !candidates.iter().any(|c| c.key == reference.key) {
                            candidates.push(reference);
                        }
                    }
                }

                let weighted = weigh_comments(self.fetcher, issue.comments).await;

                if let Some(node) = result.nodes.get_mut(&key) {
                    node.status = NodeStatus::Processed;
                    node.spec_body = issue.body;
                    node.is_pull_request = issue.is_pull_request;
                    node.pr_diff = if issue.is_pull_request {
                        issue.diff
                    } else {
                        None
                    };
                }
                result.comments.insert(key.clone(), weighted);

                if entry.depth >= self.max_depth {
                    // Beyond the bound: references are simply not enqueued.
                    continue;
                }

                // Stable sort keeps text order within a priority class.
                candidates.sort_by_key(|c| c.reference_type.priority());

                for candidate in candidates {
                    let child_key = candidate.key.to_string();
                    if candidate.key == entry.key || !visited.insert(child_key.clone()) {
                        continue;
                    }

                    debug!(parent = %key, child = %child_key, depth = entry.depth + 1, "discovered reference");

                    result.nodes.insert(
                        child_key.clone(),
                        pending_node(
                            candidate.key.clone(),
                            entry.depth + 1,
                            candidate.reference_type,
                        ),
                    );
                    result.order.push(child_key.clone());
                    if let Some(parent) = result.nodes.get_mut(&key) {
                        parent.children.push(child_key.clone());
                    }

                    next_level.push(QueueEntry {
                        key: candidate.key,
                        depth: entry.depth + 1,
                        priority: candidate.reference_type.priority(),
                        discovered: discovery,
                    });
                    discovery += 1;
                }
            }

            level = next_level;
        }

        result
    }
}

fn pending_node(key: IssueKey, depth: usize, reference_type: ReferenceType) -> IssueNode {
    IssueNode {
        key,
        spec_body: String::new(),
        is_pull_request: false,
        pr_diff: None,
        children: Vec::new(),
        depth,
        status: NodeStatus::Pending,
        reference_type,
    }
}
