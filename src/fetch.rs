//! Tracker fetch adapter: the [`IssueFetcher`] seam and its GitHub
//! implementation.
//!
//! The crawler and weight calculator only ever talk to the trait, so tests
//! and other trackers can plug in scripted implementations. The GitHub
//! adapter uses the REST API for issue bodies, comments, and PR diffs, and
//! the GraphQL API for per-comment reactions and edit history (the latter
//! has no REST surface).
//!
//! Errors distinguish "not found" from "transient failure" so the crawler
//! can record a meaningful reason on the node.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::key::IssueKey;
use crate::models::{Comment, EditSnapshot, Reaction, ReactionKind};

/// A per-node fetch failure. Recorded on the node, never fatal to the
/// rest of the crawl.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

/// Everything fetched for one tracker item.
#[derive(Debug, Clone, Default)]
pub struct FetchedIssue {
    pub title: Option<String>,
    pub body: String,
    pub comments: Vec<Comment>,
    pub is_pull_request: bool,
    pub diff: Option<String>,
}

/// Read-only access to the issue tracker. Implementations must not mutate
/// tracker state.
#[async_trait]
pub trait IssueFetcher: Send + Sync {
    /// Fetch an issue or PR: body, comments, and the diff for PRs.
    async fn fetch_issue(&self, key: &IssueKey) -> Result<FetchedIssue, FetchError>;

    /// Fetch the reactions on one comment.
    async fn fetch_reactions(&self, comment: &Comment) -> Result<Vec<Reaction>, FetchError>;

    /// Fetch the chronological edit history of one comment.
    async fn fetch_edit_history(&self, comment: &Comment)
        -> Result<Vec<EditSnapshot>, FetchError>;
}

// ============ GitHub implementation ============

const COMMENTS_PER_PAGE: usize = 100;

/// GitHub adapter over REST + GraphQL.
pub struct GithubFetcher {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    node_id: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<UserResponse>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl GithubFetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.crawler.fetch_timeout_secs))
            .user_agent(concat!("tctx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let token = std::env::var(&config.github.token_env).ok();

        Ok(Self {
            http,
            api_base: config.github.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, FetchError> {
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| FetchError::Transient(format!("{what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(what, status));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Transient(format!("{what}: malformed response: {e}")))
    }

    /// Run a GraphQL node query. Requires an API token.
    async fn graphql(&self, query: &str, node_id: &str) -> Result<serde_json::Value, FetchError> {
        if self.token.is_none() {
            return Err(FetchError::Transient(
                "graphql query requires an API token".to_string(),
            ));
        }

        let url = format!("{}/graphql", self.api_base);
        let payload = serde_json::json!({
            "query": query,
            "variables": { "nodeId": node_id },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.as_deref().unwrap_or_default())
            .json(&payload)
            .send()
            .await
            .map_err(|e| FetchError::Transient(format!("graphql: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("graphql", status));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Transient(format!("graphql: malformed response: {e}")))
    }
}

fn status_error(what: &str, status: StatusCode) -> FetchError {
    if status == StatusCode::NOT_FOUND {
        FetchError::NotFound(what.to_string())
    } else {
        FetchError::Transient(format!("{what}: HTTP {status}"))
    }
}

const REACTIONS_QUERY: &str = r#"
query($nodeId: ID!) {
  node(id: $nodeId) {
    ... on IssueComment {
      reactions(first: 100) {
        nodes { content user { login } }
      }
    }
  }
}
"#;

const EDITS_QUERY: &str = r#"
query($nodeId: ID!) {
  node(id: $nodeId) {
    ... on IssueComment {
      userContentEdits(first: 100) {
        nodes { createdAt diff editedAt }
      }
    }
  }
}
"#;

fn reaction_kind_from_graphql(content: &str) -> ReactionKind {
    match content {
        "THUMBS_UP" => ReactionKind::ThumbsUp,
        "THUMBS_DOWN" => ReactionKind::ThumbsDown,
        "HEART" => ReactionKind::Heart,
        "HOORAY" => ReactionKind::Hooray,
        "ROCKET" => ReactionKind::Rocket,
        "CONFUSED" => ReactionKind::Confused,
        "EYES" => ReactionKind::Eyes,
        "LAUGH" => ReactionKind::Laugh,
        _ => ReactionKind::Other,
    }
}

#[async_trait]
impl IssueFetcher for GithubFetcher {
    async fn fetch_issue(&self, key: &IssueKey) -> Result<FetchedIssue, FetchError> {
        let issue_url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_base, key.org, key.repo, key.number
        );
        let issue: IssueResponse = self.get_json(&issue_url, &key.to_string()).await?;
        let is_pull_request = issue.pull_request.is_some();

        // Pages until a short page; long discussions must arrive whole.
        let mut raw_comments: Vec<CommentResponse> = Vec::new();
        let mut page = 1;
        loop {
            let comments_url =
                format!("{issue_url}/comments?per_page={COMMENTS_PER_PAGE}&page={page}");
            let batch: Vec<CommentResponse> = self
                .get_json(&comments_url, &format!("{key} comments page {page}"))
                .await?;
            let batch_len = batch.len();
            raw_comments.extend(batch);
            if batch_len < COMMENTS_PER_PAGE {
                break;
            }
            page += 1;
        }

        let owner_repo = key.owner_repo();
        let comments = raw_comments
            .into_iter()
            .filter(|c| {
                c.user
                    .as_ref()
                    .and_then(|u| u.kind.as_deref())
                    .map_or(true, |kind| kind != "Bot")
            })
            .filter_map(|c| {
                let body = c.body.unwrap_or_default();
                if body.is_empty() {
                    return None;
                }
                Some(Comment {
                    id: c.node_id,
                    author: c.user.map(|u| u.login).unwrap_or_default(),
                    body,
                    owner_repo: owner_repo.clone(),
                    source_url: c.html_url,
                })
            })
            .collect();

        // The diff comes from the pulls endpoint with the diff media type.
        let diff = if is_pull_request {
            let pull_url = format!(
                "{}/repos/{}/{}/pulls/{}",
                self.api_base, key.org, key.repo, key.number
            );
            let response = self
                .request(&pull_url)
                .header(ACCEPT, "application/vnd.github.v3.diff")
                .send()
                .await
                .map_err(|e| FetchError::Transient(format!("{key} diff: {e}")))?;
            if response.status().is_success() {
                response.text().await.ok()
            } else {
                // A PR body without a retrievable diff is still usable context.
                debug!(key = %key, status = %response.status(), "diff unavailable");
                None
            }
        } else {
            None
        };

        Ok(FetchedIssue {
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            comments,
            is_pull_request,
            diff,
        })
    }

    async fn fetch_reactions(&self, comment: &Comment) -> Result<Vec<Reaction>, FetchError> {
        let data = self.graphql(REACTIONS_QUERY, &comment.id).await?;
        let nodes = data
            .pointer("/data/node/reactions/nodes")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(nodes
            .iter()
            .filter_map(|node| {
                let content = node.get("content")?.as_str()?;
                Some(Reaction {
                    content: reaction_kind_from_graphql(content),
                    user: node
                        .pointer("/user/login")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                })
            })
            .collect())
    }

    async fn fetch_edit_history(
        &self,
        comment: &Comment,
    ) -> Result<Vec<EditSnapshot>, FetchError> {
        let data = self.graphql(EDITS_QUERY, &comment.id).await?;
        let nodes = data
            .pointer("/data/node/userContentEdits/nodes")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut edits: Vec<EditSnapshot> = nodes
            .iter()
            .filter_map(|node| {
                let created = node.get("createdAt")?.as_str()?;
                let edited_at = DateTime::parse_from_rfc3339(created)
                    .ok()?
                    .with_timezone(&Utc);
                Some(EditSnapshot {
                    edited_at,
                    body: node
                        .get("diff")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();

        edits.sort_by_key(|e| e.edited_at);
        Ok(edits)
    }
}
