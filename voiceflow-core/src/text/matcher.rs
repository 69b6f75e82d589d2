//! Exact phrase matching over a token stream.

use super::tokenizer::NormalizedToken;

/// Inclusive range of token positions (not word indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

/// Every contiguous occurrence of `phrase` in `tokens`, left to right.
///
/// Phrases are a handful of tokens, so the naive sliding window is fine.
/// Overlapping occurrences are all reported; ranking is the resolver's job.
pub fn find_matches(phrase: &[String], tokens: &[NormalizedToken]) -> Vec<TokenSpan> {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return Vec::new();
    }
    tokens
        .windows(phrase.len())
        .enumerate()
        .filter(|(_, window)| window.iter().zip(phrase).all(|(t, p)| t.token == *p))
        .map(|(start, _)| TokenSpan {
            start,
            end: start + phrase.len() - 1,
        })
        .collect()
}
