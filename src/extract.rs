//! Linked-reference extraction from issue and comment text.
//!
//! A pure text scan that finds cross-references in two shapes: absolute
//! tracker URLs (with or without `www.`) and bare `#N` hash mentions.
//! Hash mentions can only refer to items in the same repository, so they
//! resolve against the ambient key of the text's origin. Each reference
//! is classified by the words immediately preceding it so the crawler
//! can prioritize closing relationships over incidental links.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::key::IssueKey;
use crate::models::ReferenceType;

static URL_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://(?:www\.)?[\w.-]+/([\w.-]+)/([\w.-]+)/(?:pull|issues?)/(\d+)")
        .expect("url reference pattern")
});

static HASH_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").expect("hash pattern"));

/// A candidate graph edge discovered in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedReference {
    pub key: IssueKey,
    /// Byte offset of the match within the scanned text.
    pub span_start: usize,
    pub reference_type: ReferenceType,
}

/// Scan text for cross-references, in order of appearance, deduplicated
/// by canonical key. Returns an empty vec when nothing matches.
pub fn extract_references(text: &str, ambient: &IssueKey) -> Vec<LinkedReference> {
    let mut found: Vec<LinkedReference> = Vec::new();
    let mut url_spans: Vec<(usize, usize)> = Vec::new();

    for caps in URL_REFERENCE.captures_iter(text) {
        let whole = caps.get(0).expect("match 0");
        let number: u64 = match caps[3].parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        url_spans.push((whole.start(), whole.end()));
        push_unique(
            &mut found,
            LinkedReference {
                key: IssueKey::new(&caps[1], &caps[2], number),
                span_start: whole.start(),
                reference_type: classify(text, whole.start()),
            },
        );
    }

    for caps in HASH_REFERENCE.captures_iter(text) {
        let whole = caps.get(0).expect("match 0");
        // A "#N" inside an already-matched URL is its anchor, not a mention.
        if url_spans
            .iter()
            .any(|&(s, e)| whole.start() >= s && whole.start() < e)
        {
            continue;
        }
        let number: u64 = match caps[1].parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        push_unique(
            &mut found,
            LinkedReference {
                key: IssueKey::new(&ambient.org, &ambient.repo, number),
                span_start: whole.start(),
                reference_type: classify(text, whole.start()),
            },
        );
    }

    found.sort_by_key(|r| r.span_start);
    found
}

fn push_unique(found: &mut Vec<LinkedReference>, candidate: LinkedReference) {
    if !found.iter().any(|r| r.key == candidate.key) {
        found.push(candidate);
    }
}

/// Classify a reference from the words immediately before it.
fn classify(text: &str, span_start: usize) -> ReferenceType {
    let preceding = &text[..span_start];
    let mut words = preceding
        .split_whitespace()
        .rev()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_ascii_lowercase());

    let last = words.next().unwrap_or_default();
    let second_last = words.next().unwrap_or_default();

    const CLOSING: [&str; 9] = [
        "close", "closes", "closed", "fix", "fixes", "fixed", "resolve", "resolves", "resolved",
    ];
    if CLOSING.contains(&last.as_str()) {
        return ReferenceType::Closing;
    }

    let is_depends = (second_last == "depends" && last == "on")
        || (second_last == "blocked" && last == "by")
        || last == "requires";
    if is_depends {
        return ReferenceType::Depends;
    }

    ReferenceType::Direct
}
