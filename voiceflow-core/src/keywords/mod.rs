//! Inline dictation keywords.
//!
//! Keywords are spoken control words embedded in dictation ("new line",
//! "backspace 3", "comma", "say ..."). They are rewritten into text and
//! delete presses in a single left-to-right pass by [`rewrite`]. This module
//! also holds the small token tables the dispatcher needs to decide what to
//! hold back while an utterance is still growing.

pub mod punctuation;
pub mod rewrite;
pub mod vocabulary;

pub use rewrite::{rewrite, RewriteOptions, RewriteOutput};
pub use vocabulary::apply_vocabulary;

/// Trailing words withheld at the end of an utterance because the next
/// utterance may complete them ("new" + "line", "back" + "space").
pub const CARRY_FRAGMENTS: &[&str] = &["new", "back"];

/// Token that switches the rest of the utterance to verbatim text.
pub const LITERAL_ESCAPE: &str = "say";

/// Largest delete count accepted after "backspace".
pub const MAX_BACKSPACE_COUNT: usize = 500;

const KEYWORD_STARTERS: &[&str] = &[
    "no", "nocaps", "letter", "new", "newline", "spacebar", "space", "nospace", "backspace",
    "back", "at", "hashtag", "hash", "say",
];

/// First words of multi-word keywords, plus single keywords that take an
/// argument. A final word in this set is not typed in live mode until the
/// next word arrives.
const ARGUMENT_STARTERS: &[&str] = &[
    "no", "letter", "new", "space", "back", "backspace", "at", "hash", "hashtag",
];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
    "twenty",
];

/// Whether `token` begins any inline keyword or punctuation name.
pub fn is_keyword_starter(token: &str) -> bool {
    KEYWORD_STARTERS.contains(&token) || punctuation::is_starter(token)
}

/// Whether a trailing final `token` might still turn into a keyword once the
/// following word is recognised.
pub fn could_begin_keyword(token: &str) -> bool {
    ARGUMENT_STARTERS.contains(&token) || punctuation::begins_pair(token)
}

/// Tokens that end a tag group: keyword starters, "press" and the wake word.
pub fn is_command_starter(token: &str, wake_tokens: &[String]) -> bool {
    token == "press"
        || is_keyword_starter(token)
        || wake_tokens.first().is_some_and(|w| w == token)
}

/// Parse a delete count: digits or a number word from one to twenty.
pub fn parse_count(token: &str) -> Option<usize> {
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        return token
            .parse::<usize>()
            .ok()
            .map(|n| n.min(MAX_BACKSPACE_COUNT));
    }
    NUMBER_WORDS
        .iter()
        .position(|w| *w == token)
        .map(|i| i + 1)
}
