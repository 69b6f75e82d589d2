//! Spoken punctuation table.
//!
//! Closed on purpose: only names that rarely occur as ordinary dictation are
//! listed. Bare "dot", "star", "plus", "hash" and friends are omitted because
//! they show up in normal sentences far more often than as punctuation.

/// How a punctuation mark joins its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// Sticks to the preceding piece: `word,` `word.`
    Closing,
    /// Space before, none after: `(word`
    Opening,
    /// No space on either side: `well-known`
    Joining,
    /// Spaced like a word: `this & that`
    Spaced,
}

#[derive(Debug, Clone, Copy)]
pub struct SpokenPunctuation {
    pub phrase: &'static [&'static str],
    pub text: &'static str,
    pub attach: Attach,
}

macro_rules! punct {
    ([$($t:literal),+], $text:literal, $attach:ident) => {
        SpokenPunctuation {
            phrase: &[$($t),+],
            text: $text,
            attach: Attach::$attach,
        }
    };
}

pub const PUNCTUATION: &[SpokenPunctuation] = &[
    punct!(["period"], ".", Closing),
    punct!(["full", "stop"], ".", Closing),
    punct!(["comma"], ",", Closing),
    punct!(["question", "mark"], "?", Closing),
    punct!(["exclamation", "point"], "!", Closing),
    punct!(["exclamation", "mark"], "!", Closing),
    punct!(["colon"], ":", Closing),
    punct!(["semicolon"], ";", Closing),
    punct!(["ellipsis"], "...", Closing),
    punct!(["hyphen"], "-", Joining),
    punct!(["dash"], "-", Spaced),
    punct!(["open", "paren"], "(", Opening),
    punct!(["open", "parenthesis"], "(", Opening),
    punct!(["close", "paren"], ")", Closing),
    punct!(["close", "parenthesis"], ")", Closing),
    punct!(["open", "bracket"], "[", Opening),
    punct!(["close", "bracket"], "]", Closing),
    punct!(["open", "brace"], "{", Opening),
    punct!(["close", "brace"], "}", Closing),
    punct!(["open", "quote"], "\"", Opening),
    punct!(["close", "quote"], "\"", Closing),
    punct!(["apostrophe"], "'", Joining),
    punct!(["ampersand"], "&", Spaced),
    punct!(["asterisk"], "*", Spaced),
    punct!(["underscore"], "_", Joining),
    punct!(["forward", "slash"], "/", Joining),
    punct!(["backslash"], "\\", Joining),
    punct!(["percent", "sign"], "%", Closing),
    punct!(["dollar", "sign"], "$", Opening),
    punct!(["equals", "sign"], "=", Spaced),
    punct!(["plus", "sign"], "+", Spaced),
];

/// Look up a one-token name.
pub fn single(token: &str) -> Option<&'static SpokenPunctuation> {
    PUNCTUATION
        .iter()
        .find(|p| p.phrase.len() == 1 && p.phrase[0] == token)
}

/// Look up a two-token name.
pub fn pair(first: &str, second: &str) -> Option<&'static SpokenPunctuation> {
    PUNCTUATION
        .iter()
        .find(|p| p.phrase.len() == 2 && p.phrase[0] == first && p.phrase[1] == second)
}

/// Whether `token` opens a two-token punctuation name.
pub fn begins_pair(token: &str) -> bool {
    PUNCTUATION
        .iter()
        .any(|p| p.phrase.len() == 2 && p.phrase[0] == token)
}

/// Whether `token` is the first token of any punctuation name.
pub fn is_starter(token: &str) -> bool {
    PUNCTUATION.iter().any(|p| p.phrase[0] == token)
}
