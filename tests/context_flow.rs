//! End-to-end crawl and context-assembly tests over a scripted fetcher.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;

use thread_context::answer::assemble_context;
use thread_context::config::{Config, ContextConfig, DbConfig};
use thread_context::crawler::Crawler;
use thread_context::fetch::{FetchError, FetchedIssue, IssueFetcher};
use thread_context::key::IssueKey;
use thread_context::models::{BlockKind, Comment, EditSnapshot, NodeStatus, Reaction, ReactionKind};
use thread_context::tokens::HeuristicTokenizer;
use thread_context::trigram::TrigramScorer;

/// Fetcher backed by in-memory maps; keys in `failures` always fail.
#[derive(Default)]
struct ScriptedFetcher {
    issues: HashMap<String, FetchedIssue>,
    reactions: HashMap<String, Vec<Reaction>>,
    edits: HashMap<String, Vec<EditSnapshot>>,
    failures: HashSet<String>,
}

impl ScriptedFetcher {
    fn with_issue(mut self, key: &str, issue: FetchedIssue) -> Self {
        self.issues.insert(key.to_string(), issue);
        self
    }

    fn with_failure(mut self, key: &str) -> Self {
        self.failures.insert(key.to_string());
        self
    }

    fn with_reactions(mut self, comment_id: &str, kinds: &[ReactionKind]) -> Self {
        self.reactions.insert(
            comment_id.to_string(),
            kinds
                .iter()
                .map(|&content| Reaction {
                    content,
                    user: None,
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl IssueFetcher for ScriptedFetcher {
    async fn fetch_issue(&self, key: &IssueKey) -> Result<FetchedIssue, FetchError> {
        let key = key.to_string();
        if self.failures.contains(&key) {
            return Err(FetchError::Transient(format!("{key}: scripted failure")));
        }
        self.issues
            .get(&key)
            .cloned()
            .ok_or(FetchError::NotFound(key))
    }

    async fn fetch_reactions(&self, comment: &Comment) -> Result<Vec<Reaction>, FetchError> {
        Ok(self.reactions.get(&comment.id).cloned().unwrap_or_default())
    }

    async fn fetch_edit_history(
        &self,
        comment: &Comment,
    ) -> Result<Vec<EditSnapshot>, FetchError> {
        Ok(self.edits.get(&comment.id).cloned().unwrap_or_default())
    }
}

fn issue(body: &str, comments: Vec<Comment>) -> FetchedIssue {
    FetchedIssue {
        body: body.to_string(),
        comments,
        ..Default::default()
    }
}

fn comment(id: &str, body: &str) -> Comment {
    Comment {
        id: id.to_string(),
        author: "alice".to_string(),
        body: body.to_string(),
        owner_repo: "acme/widgets".to_string(),
        source_url: String::new(),
    }
}

fn test_config() -> Config {
    Config {
        db: DbConfig {
            path: PathBuf::from(":memory:"),
        },
        crawler: Default::default(),
        scoring: Default::default(),
        context: Default::default(),
        github: Default::default(),
    }
}

fn root() -> IssueKey {
    IssueKey::new("acme", "widgets", 1)
}

// ============ Crawler ============

#[tokio::test]
async fn test_cycle_terminates_and_visits_each_once() {
    let fetcher = ScriptedFetcher::default()
        .with_issue(
            "acme/widgets/1",
            issue("see https://github.com/acme/widgets/issues/2", Vec::new()),
        )
        .with_issue("acme/widgets/2", issue("loops back to #1", Vec::new()));

    let result = Crawler::new(&fetcher, 3).crawl(root()).await;

    assert_eq!(result.order, vec!["acme/widgets/1", "acme/widgets/2"]);
    assert_eq!(result.nodes.len(), 2);
    for node in result.nodes.values() {
        assert_eq!(node.status, NodeStatus::Processed);
    }
}

#[tokio::test]
async fn test_max_depth_bounds_the_tree() {
    let fetcher = ScriptedFetcher::default()
        .with_issue("acme/widgets/1", issue("see #2", Vec::new()))
        .with_issue("acme/widgets/2", issue("see #3", Vec::new()))
        .with_issue("acme/widgets/3", issue("see #4", Vec::new()));

    let result = Crawler::new(&fetcher, 1).crawl(root()).await;

    assert!(result.nodes.values().all(|n| n.depth <= 1));
    assert!(result.nodes.contains_key("acme/widgets/2"));
    assert!(!result.nodes.contains_key("acme/widgets/3"));
}

#[tokio::test]
async fn test_failed_sibling_does_not_abort_the_crawl() {
    let fetcher = ScriptedFetcher::default()
        .with_issue("acme/widgets/1", issue("see #2 and #3", Vec::new()))
        .with_failure("acme/widgets/2")
        .with_issue("acme/widgets/3", issue("healthy sibling", Vec::new()));

    let result = Crawler::new(&fetcher, 2).crawl(root()).await;

    assert_eq!(result.order.len(), 3);
    assert!(matches!(
        result.nodes["acme/widgets/2"].status,
        NodeStatus::Error(_)
    ));
    assert_eq!(result.nodes["acme/widgets/3"].status, NodeStatus::Processed);
}

#[tokio::test]
async fn test_root_failure_yields_a_single_error_node() {
    let fetcher = ScriptedFetcher::default().with_failure("acme/widgets/1");

    let result = Crawler::new(&fetcher, 3).crawl(root()).await;

    assert_eq!(result.order, vec!["acme/widgets/1"]);
    assert!(matches!(
        result.nodes["acme/widgets/1"].status,
        NodeStatus::Error(_)
    ));
}

#[tokio::test]
async fn test_references_found_in_comments_are_followed() {
    let fetcher = ScriptedFetcher::default()
        .with_issue(
            "acme/widgets/1",
            issue("no links in the body", vec![comment("c1", "dup of #5")]),
        )
        .with_issue("acme/widgets/5", issue("the duplicate", Vec::new()));

    let result = Crawler::new(&fetcher, 2).crawl(root()).await;

    assert!(result.nodes.contains_key("acme/widgets/5"));
}

#[tokio::test]
async fn test_closing_reference_expands_before_direct() {
    let fetcher = ScriptedFetcher::default()
        .with_issue(
            "acme/widgets/1",
            issue(
                "see https://github.com/acme/widgets/issues/3 \
                 and this fixes https://github.com/acme/widgets/issues/2",
                Vec::new(),
            ),
        )
        .with_issue("acme/widgets/2", issue("closed by the root", Vec::new()))
        .with_issue("acme/widgets/3", issue("merely mentioned", Vec::new()));

    let result = Crawler::new(&fetcher, 2).crawl(root()).await;

    assert_eq!(
        result.nodes["acme/widgets/1"].children,
        vec!["acme/widgets/2", "acme/widgets/3"]
    );
}

// ============ Context assembly ============

fn discussion_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::default()
        .with_issue(
            "acme/widgets/1",
            issue(
                "Retries sometimes hammer the upstream service",
                vec![
                    comment("c1", "use exponential backoff for retries"),
                    // Byte-identical to the spec body
                    comment("c2", "Retries sometimes hammer the upstream service"),
                    comment("c3", "unrelated release chatter"),
                ],
            ),
        )
        .with_reactions("c1", &[ReactionKind::ThumbsUp, ReactionKind::ThumbsUp])
        .with_reactions("c3", &[ReactionKind::ThumbsDown])
}

#[tokio::test]
async fn test_assemble_context_produces_ranked_budgeted_bundle() {
    let fetcher = discussion_fetcher();
    let scorer = TrigramScorer::new();
    let config = test_config();

    let bundle = assemble_context(
        "how should retries behave under load",
        "acme/widgets/1",
        &fetcher,
        &scorer,
        &HeuristicTokenizer,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(bundle.blocks[0].kind, BlockKind::Spec);
    assert_eq!(bundle.blocks[0].key, "acme/widgets/1");

    let conversation = bundle
        .blocks
        .iter()
        .find(|b| b.kind == BlockKind::Conversation)
        .unwrap();
    assert!(conversation.text.contains("exponential backoff"));
    // Self-citation never reaches the conversation block
    assert_eq!(
        conversation
            .text
            .matches("Retries sometimes hammer")
            .count(),
        0
    );

    assert_eq!(bundle.ranked_comments[0].id, "c1");
    assert!(bundle.ranked_comments[0].score >= 2.0);
    assert!(bundle.ranked_comments.iter().all(|r| r.id != "c3"));

    assert!(bundle.question_signal > 0.0);
    assert_eq!(
        bundle.token_count,
        bundle.blocks.iter().map(|b| b.tokens).sum::<usize>()
    );
}

#[tokio::test]
async fn test_token_budget_trims_trailing_blocks() {
    let fetcher = discussion_fetcher();
    let scorer = TrigramScorer::new();

    let full = assemble_context(
        "how should retries behave under load",
        "acme/widgets/1",
        &fetcher,
        &scorer,
        &HeuristicTokenizer,
        &test_config(),
    )
    .await
    .unwrap();
    assert!(full.blocks.len() >= 2);

    let mut tight = test_config();
    tight.context = ContextConfig {
        token_budget: full.blocks[0].tokens,
    };
    let trimmed = assemble_context(
        "how should retries behave under load",
        "acme/widgets/1",
        &fetcher,
        &scorer,
        &HeuristicTokenizer,
        &tight,
    )
    .await
    .unwrap();

    assert_eq!(trimmed.blocks.len(), 1);
    assert_eq!(trimmed.blocks[0].kind, BlockKind::Spec);
    assert!(trimmed.token_count <= tight.context.token_budget);
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let fetcher = ScriptedFetcher::default();
    let scorer = TrigramScorer::new();

    let result = assemble_context(
        "   ",
        "acme/widgets/1",
        &fetcher,
        &scorer,
        &HeuristicTokenizer,
        &test_config(),
    )
    .await;

    assert!(result.is_err());
}
