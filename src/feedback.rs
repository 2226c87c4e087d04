//! Feedback updates from comment edits.
//!
//! When a community member edits a comment, the changed region is a
//! signal: removed phrasing loses weight, added phrasing gains it. The
//! changed region is found by common-prefix/common-suffix trimming, not a
//! full diff: one contiguous span per side, extended by a couple of
//! surrounding words of context. Short spans (< 4 chars) are adjusted as
//! literal phrases; longer spans contribute through their trigrams.
//!
//! Applying an update mutates the weight store, so the processor finishes
//! by invalidating the scorer cache.

use anyhow::Result;
use tracing::debug;

use crate::store::WeightStore;
use crate::trigram::{normalize_phrase, trigrams_of, TrigramScorer};

/// Number of words of surrounding context appended to each changed span.
const CONTEXT_WORDS: usize = 2;

/// Spans shorter than this are adjusted as literal phrases rather than
/// through trigram decomposition.
const TRIGRAM_SPAN_MIN_CHARS: usize = 4;

/// The minimal changed region between two comment bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditDelta {
    /// Text present only in the old body, with context.
    pub deletion: Option<String>,
    /// Text present only in the new body, with context.
    pub addition: Option<String>,
}

/// Compute the single contiguous changed span on each side.
pub fn edit_delta(old: &str, new: &str) -> EditDelta {
    if old == new {
        return EditDelta::default();
    }

    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut prefix = 0;
    while prefix < old_chars.len()
        && prefix < new_chars.len()
        && old_chars[prefix] == new_chars[prefix]
    {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < old_chars.len() - prefix
        && suffix < new_chars.len() - prefix
        && old_chars[old_chars.len() - 1 - suffix] == new_chars[new_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    EditDelta {
        deletion: span_with_context(&old_chars, prefix, suffix),
        addition: span_with_context(&new_chars, prefix, suffix),
    }
}

/// Slice `chars[prefix .. len - suffix]` extended by [`CONTEXT_WORDS`]
/// whole words on each side. `None` when the raw span is empty.
fn span_with_context(chars: &[char], prefix: usize, suffix: usize) -> Option<String> {
    let end = chars.len() - suffix;
    if prefix >= end {
        return None;
    }

    let start = extend_left(chars, prefix);
    let end = extend_right(chars, end);

    let span: String = chars[start..end].iter().collect();
    let span = span.trim().to_string();
    if span.is_empty() {
        None
    } else {
        Some(span)
    }
}

fn extend_left(chars: &[char], index: usize) -> usize {
    let mut i = index;
    for _ in 0..CONTEXT_WORDS {
        while i > 0 && chars[i - 1].is_whitespace() {
            i -= 1;
        }
        let word_end = i;
        while i > 0 && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
        if i == word_end {
            break;
        }
    }
    i
}

fn extend_right(chars: &[char], index: usize) -> usize {
    let mut i = index;
    for _ in 0..CONTEXT_WORDS {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let word_start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        if i == word_start {
            break;
        }
    }
    i
}

/// Applies edit-driven weight adjustments to the persistent store.
pub struct FeedbackProcessor<'a> {
    store: &'a dyn WeightStore,
    scorer: &'a TrigramScorer,
    multiplier: f64,
}

impl<'a> FeedbackProcessor<'a> {
    pub fn new(store: &'a dyn WeightStore, scorer: &'a TrigramScorer, multiplier: f64) -> Self {
        Self {
            store,
            scorer,
            multiplier,
        }
    }

    /// React to a comment body edit: deletions decrease and additions
    /// increase the affected phrase weights. Identical bodies are a no-op.
    pub async fn apply_edit(
        &self,
        old_body: &str,
        new_body: &str,
        origin_comment_id: &str,
    ) -> Result<()> {
        if old_body == new_body {
            return Ok(());
        }

        let delta = edit_delta(old_body, new_body);
        debug!(
            comment = origin_comment_id,
            deletion = delta.deletion.as_deref().unwrap_or(""),
            addition = delta.addition.as_deref().unwrap_or(""),
            "applying feedback update"
        );

        if let Some(span) = &delta.deletion {
            self.adjust_span(span, -self.multiplier, origin_comment_id)
                .await?;
        }
        if let Some(span) = &delta.addition {
            self.adjust_span(span, self.multiplier, origin_comment_id)
                .await?;
        }

        // The weight table changed under the scorer's feet.
        self.scorer.invalidate();
        Ok(())
    }

    async fn adjust_span(&self, span: &str, delta: f64, origin_comment_id: &str) -> Result<()> {
        for phrase in phrases_for_span(span) {
            let current = self.store.get_weight(&phrase).await?;
            self.store
                .set_weight(&phrase, current + delta, origin_comment_id)
                .await?;
        }
        Ok(())
    }
}

/// Adaptive granularity: sub-trigram spans adjust as a literal phrase,
/// longer spans through their trigram decomposition.
fn phrases_for_span(span: &str) -> Vec<String> {
    let trimmed = span.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.chars().count() < TRIGRAM_SPAN_MIN_CHARS {
        let phrase = normalize_phrase(trimmed);
        if phrase.is_empty() {
            return Vec::new();
        }
        return vec![phrase];
    }
    let mut phrases: Vec<String> = trigrams_of(trimmed).into_iter().collect();
    phrases.sort();
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryWeightStore;

    #[test]
    fn test_identical_bodies_produce_no_spans() {
        assert_eq!(edit_delta("same text", "same text"), EditDelta::default());
    }

    #[test]
    fn test_pure_addition() {
        let delta = edit_delta("The cat sat", "The cat sat on the mat");
        assert!(delta.deletion.is_none());
        let addition = delta.addition.unwrap();
        assert!(addition.contains("on the mat"), "addition was '{addition}'");
        // Context extends left into the unchanged text, at most two words
        assert!(addition.starts_with("cat sat") || addition.starts_with("sat"));
    }

    #[test]
    fn test_pure_deletion() {
        let delta = edit_delta("The cat sat on the mat", "The cat sat");
        assert!(delta.addition.is_none());
        assert!(delta.deletion.unwrap().contains("on the mat"));
    }

    #[test]
    fn test_replacement_yields_both_spans() {
        let delta = edit_delta("use a mutex here", "use a channel here");
        assert!(delta.deletion.unwrap().contains("mutex"));
        assert!(delta.addition.unwrap().contains("channel"));
    }

    #[test]
    fn test_spans_are_single_contiguous_regions() {
        // Two separated edits collapse into one region spanning both
        let delta = edit_delta("alpha beta gamma delta", "alpha BETA gamma DELTA");
        let addition = delta.addition.unwrap();
        assert!(addition.contains("BETA"));
        assert!(addition.contains("DELTA"));
    }

    #[test]
    fn test_short_span_is_a_literal_phrase() {
        assert_eq!(phrases_for_span("ok"), vec!["ok".to_string()]);
    }

    #[test]
    fn test_long_span_decomposes_to_trigrams() {
        let phrases = phrases_for_span("retry the failed request");
        assert!(phrases.contains(&"retry the failed".to_string()));
        assert!(phrases.contains(&"ret".to_string()));
    }

    #[tokio::test]
    async fn test_addition_increases_and_deletion_decreases() {
        let store = MemoryWeightStore::new();
        let scorer = TrigramScorer::new();
        let processor = FeedbackProcessor::new(&store, &scorer, 1.0);

        // The context-extended span is trigram-bearing, so the store holds
        // its trigrams, not arbitrary sub-phrases.
        processor
            .apply_edit("The cat sat", "The cat sat on the mat", "c1")
            .await
            .unwrap();
        assert!(store.get_weight("on the mat").await.unwrap() > 0.0);
        assert!(store.get_weight("mat").await.unwrap() > 0.0);

        processor
            .apply_edit("The cat sat on the mat", "The cat sat", "c1")
            .await
            .unwrap();
        assert!((store.get_weight("on the mat").await.unwrap()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_noop_edit_touches_nothing() {
        let store = MemoryWeightStore::new();
        let scorer = TrigramScorer::new();
        let processor = FeedbackProcessor::new(&store, &scorer, 1.0);

        processor.apply_edit("same", "same", "c1").await.unwrap();
        assert!(store.all_weights().await.unwrap().is_empty());
    }
}
