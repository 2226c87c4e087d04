//! Token counting for context-budget accounting.
//!
//! The serializer only needs a deterministic, monotonic approximation, so
//! the default counter is the chars-per-token heuristic. A real model
//! tokenizer can be plugged in through the trait.

/// Deterministic token counter.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Chars/4 approximation; non-empty text counts as at least one token.
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        let chars = text.chars().count();
        if chars == 0 {
            0
        } else {
            chars.div_ceil(CHARS_PER_TOKEN)
        }
    }
}
