//! Identity key normalization for tracker items.
//!
//! Every issue or pull request is identified by a canonical
//! `org/repo/number` key, derived deterministically from any of the URL
//! surface forms the tracker produces (issue URLs, PR URLs, PR
//! review-comment URLs) or from a bare `#n` mention plus an ambient
//! issue number. Two references that denote the same item always
//! normalize to the same key.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reference that could not be resolved to a tracker item.
///
/// Always propagated: a malformed reference is a caller bug or corrupted
/// input, never something to silently default.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("invalid issue reference '{0}'")]
    Invalid(String),
}

/// Canonical identity of one issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueKey {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl IssueKey {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            number,
        }
    }

    /// `org/repo` without the number, as carried on comments.
    pub fn owner_repo(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// Parse a canonical `org/repo/number` string, as stored in crawl maps.
    pub fn parse(key: &str) -> Result<Self, ReferenceError> {
        Self::from_reference(key, None)
    }

    /// Normalize any supported reference form into a key.
    ///
    /// Supported shapes, by slash-segment count after stripping a trailing
    /// `#fragment` anchor:
    ///
    /// - 3: a bare `org/repo/number` key
    /// - 5: `https://host/org/repo` (`ambient_number` required)
    /// - 7: `https://host/org/repo/{issues|pull}/N`
    /// - 8 or 9: PR review-comment URLs such as
    ///   `https://host/org/repo/pull/N/comments/M`; the number at the PR
    ///   path depth is used, never the trailing comment id
    ///
    /// `www.` prefixes and comment anchors never change the result.
    pub fn from_reference(
        reference: &str,
        ambient_number: Option<u64>,
    ) -> Result<Self, ReferenceError> {
        let invalid = || ReferenceError::Invalid(reference.to_string());

        // Trailing anchors ("#issuecomment-123", "#discussion_r456") are
        // display artifacts, not identity.
        let stripped = reference.split('#').next().unwrap_or("");
        let parts: Vec<&str> = stripped.split('/').collect();

        // The last tuple field marks the shapes whose number segment may
        // fall back to the ambient number when it does not parse; a direct
        // issue/pull URL with a garbled number is malformed, not ambient.
        let (org, repo, number_part, ambient_fallback) = match parts.len() {
            3 => (parts[0], parts[1], Some(parts[2]), true),
            5 => (parts[3], parts[4], None, true),
            7 => (parts[3], parts[4], Some(parts[6]), false),
            // Review-comment sub-paths: the PR number sits at depth 6; the
            // trailing segment is the comment id and must be ignored.
            8 | 9 => (parts[3], parts[4], Some(parts[6]), true),
            _ => return Err(invalid()),
        };

        if org.is_empty() || repo.is_empty() {
            return Err(invalid());
        }

        let number = match number_part {
            Some(raw) => match raw.parse::<u64>() {
                Ok(number) => Some(number),
                Err(_) if ambient_fallback => ambient_number,
                Err(_) => return Err(invalid()),
            },
            None => ambient_number,
        };

        match number {
            Some(number) => Ok(Self::new(org, repo, number)),
            None => Err(invalid()),
        }
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_url() {
        let key = IssueKey::from_reference("https://github.com/acme/widgets/issues/42", None);
        assert_eq!(key.unwrap().to_string(), "acme/widgets/42");
    }

    #[test]
    fn test_pull_url() {
        let key = IssueKey::from_reference("https://github.com/acme/widgets/pull/7", None);
        assert_eq!(key.unwrap().to_string(), "acme/widgets/7");
    }

    #[test]
    fn test_www_prefix_is_irrelevant() {
        let plain = IssueKey::from_reference("https://github.com/acme/widgets/issues/42", None);
        let www = IssueKey::from_reference("https://www.github.com/acme/widgets/issues/42", None);
        assert_eq!(plain.unwrap(), www.unwrap());
    }

    #[test]
    fn test_comment_anchor_is_stripped() {
        let key = IssueKey::from_reference(
            "https://github.com/acme/widgets/issues/42#issuecomment-1234",
            None,
        );
        assert_eq!(key.unwrap().to_string(), "acme/widgets/42");
    }

    #[test]
    fn test_review_comment_url_uses_pr_number() {
        let key =
            IssueKey::from_reference("https://example.com/org/repo/pull/123/comments/456", None);
        assert_eq!(key.unwrap().to_string(), "org/repo/123");
    }

    #[test]
    fn test_repo_url_requires_ambient_number() {
        let without = IssueKey::from_reference("https://github.com/acme/widgets", None);
        assert!(matches!(without, Err(ReferenceError::Invalid(_))));

        let with = IssueKey::from_reference("https://github.com/acme/widgets", Some(9));
        assert_eq!(with.unwrap().to_string(), "acme/widgets/9");
    }

    #[test]
    fn test_bare_key_round_trips() {
        let key = IssueKey::parse("acme/widgets/42").unwrap();
        assert_eq!(key, IssueKey::new("acme", "widgets", 42));
        assert_eq!(IssueKey::parse(&key.to_string()).unwrap(), key);
    }

    #[test]
    fn test_malformed_reference_is_an_error() {
        assert!(IssueKey::from_reference("not a reference", None).is_err());
        assert!(IssueKey::from_reference("", None).is_err());
        assert!(IssueKey::from_reference("https://github.com", None).is_err());
    }

    #[test]
    fn test_garbled_issue_url_number_never_falls_back_to_ambient() {
        let garbled =
            IssueKey::from_reference("https://github.com/acme/widgets/issues/abc", Some(9));
        assert!(matches!(garbled, Err(ReferenceError::Invalid(_))));
    }

    #[test]
    fn test_same_item_same_key_across_forms() {
        let forms = [
            "https://github.com/acme/widgets/pull/123",
            "https://www.github.com/acme/widgets/pull/123",
            "https://github.com/acme/widgets/pull/123#discussion_r99",
            "https://github.com/acme/widgets/pull/123/comments/456",
        ];
        let keys: Vec<String> = forms
            .iter()
            .map(|f| IssueKey::from_reference(f, None).unwrap().to_string())
            .collect();
        assert!(keys.iter().all(|k| k == "acme/widgets/123"));
    }
}
