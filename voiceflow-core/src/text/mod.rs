//! Leaf text utilities shared by the keyword engine and command matching.

pub mod matcher;
pub mod stability;
pub mod tokenizer;

pub use matcher::{find_matches, TokenSpan};
pub use stability::{gap_acceptable, is_stable, word_gap};
pub use tokenizer::{normalize, phrase_tokens, tokenize, NormalizedToken};
