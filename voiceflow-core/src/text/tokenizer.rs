//! Word → token normalisation.

use crate::ipc::events::Word;

/// Matchable projection of a word: lower-cased letters and digits only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedToken {
    pub token: String,
    /// Index of the source word in the turn's word array.
    pub word_index: usize,
}

/// Lower-case `text` and strip everything that is not a letter or digit.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Tokenize a word array. Punctuation-only words vanish but the surviving
/// tokens keep their original word index.
pub fn tokenize(words: &[Word]) -> Vec<NormalizedToken> {
    words
        .iter()
        .enumerate()
        .filter_map(|(word_index, word)| {
            let token = normalize(&word.text);
            (!token.is_empty()).then_some(NormalizedToken { token, word_index })
        })
        .collect()
}

/// Tokenize a configured phrase ("Window  Recent, 2" → `["window", "recent", "2"]`).
pub fn phrase_tokens(phrase: &str) -> Vec<String> {
    phrase
        .split_whitespace()
        .map(normalize)
        .filter(|t| !t.is_empty())
        .collect()
}
