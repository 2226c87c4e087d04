//! Trigram decomposition and relevance scoring against a weighted corpus.
//!
//! Text is normalized (lowercased, stripped of punctuation) and decomposed
//! into two trigram families: every 3-word window and every 3-character
//! substring of words of length >= 3. A comment's scalar weight is spread
//! evenly across its trigrams; scoring a span of text sums the accumulated
//! weights of its trigrams, answering "how much community-validated signal
//! exists for this text".
//!
//! [`TrigramScorer`] owns the memoized weight table explicitly; there is
//! no process-wide cache. Any caller that mutates comment weights or
//! bodies must call [`TrigramScorer::invalidate`] before the next score.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::models::WeightedComment;

/// Decompose text into its trigram set.
///
/// Deterministic and order-independent; idempotent under re-normalization.
pub fn trigrams_of(text: &str) -> HashSet<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let words: Vec<&str> = normalized.split_whitespace().collect();
    let mut trigrams = HashSet::new();

    for window in words.windows(3) {
        trigrams.insert(window.join(" "));
    }

    for word in &words {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() < 3 {
            continue;
        }
        for i in 0..=chars.len() - 3 {
            trigrams.insert(chars[i..i + 3].iter().collect());
        }
    }

    trigrams
}

/// Normalize a short phrase the same way trigram extraction does, for
/// direct (sub-trigram) weight adjustments.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the trigram weight table for a corpus.
///
/// Each comment's weight is distributed evenly across the trigrams of its
/// body (`weight / trigram_count`); contributions are additive across
/// comments. The table is a pure function of the corpus.
pub fn weight_table(comments: &[WeightedComment]) -> HashMap<String, f64> {
    let mut table: HashMap<String, f64> = HashMap::new();

    for comment in comments {
        if comment.comment.body.is_empty() {
            continue;
        }
        let trigrams = trigrams_of(&comment.comment.body);
        if trigrams.is_empty() {
            continue;
        }
        let per_trigram = comment.weight / trigrams.len() as f64;
        for trigram in trigrams {
            *table.entry(trigram).or_insert(0.0) += per_trigram;
        }
    }

    table
}

/// Score text against a prebuilt weight table. Missing trigrams score 0.
pub fn score_with_table(text: &str, table: &HashMap<String, f64>) -> f64 {
    trigrams_of(text)
        .iter()
        .map(|t| table.get(t).copied().unwrap_or(0.0))
        .sum()
}

/// Relevance scorer with an explicitly owned, explicitly invalidated cache
/// of the corpus weight table.
///
/// The cache has no TTL and no change subscription: whoever mutates the
/// underlying comment set or weights is obligated to call
/// [`invalidate`](Self::invalidate). Scoring with an empty corpus or empty
/// text returns 0, never an error.
pub struct TrigramScorer {
    cache: RwLock<Option<HashMap<String, f64>>>,
}

impl TrigramScorer {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(None),
        }
    }

    /// Score text against the corpus, building and memoizing the weight
    /// table on first use.
    pub fn score_text(&self, text: &str, comments: &[WeightedComment]) -> f64 {
        if text.is_empty() || comments.is_empty() {
            return 0.0;
        }

        {
            let cache = self.cache.read().expect("scorer cache poisoned");
            if let Some(table) = cache.as_ref() {
                return score_with_table(text, table);
            }
        }

        let table = weight_table(comments);
        let score = score_with_table(text, &table);
        *self.cache.write().expect("scorer cache poisoned") = Some(table);
        score
    }

    /// Drop the memoized table. Must be called whenever any comment's
    /// weight or body changes.
    pub fn invalidate(&self) {
        *self.cache.write().expect("scorer cache poisoned") = None;
    }
}

impl Default for TrigramScorer {
    fn default() -> Self {
        Self::new()
    }
}
