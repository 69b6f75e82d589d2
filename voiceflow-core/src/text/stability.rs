//! Stability oracle: is a span of words safe to act on?
//!
//! A span touching any interim word is provisional: the next revision of the
//! same turn may drop or shift it. Prefixed command matches bypass this check
//! at the call site.

use std::ops::RangeInclusive;

use crate::ipc::events::Word;

/// False iff any word in `indices` is explicitly interim. Indices past the
/// end of `words` are ignored.
pub fn is_stable(words: &[Word], indices: RangeInclusive<usize>) -> bool {
    indices
        .filter_map(|i| words.get(i))
        .all(|w| !w.is_interim())
}

/// Seconds of silence between the end of `a` and the start of `b`.
/// `None` when either side lacks timing.
pub fn word_gap(a: &Word, b: &Word) -> Option<f64> {
    Some(b.start_time? - a.end_time?)
}

/// Whether two words are close enough in time to form one multi-word
/// keyword. Missing timing never blocks a keyword.
pub fn gap_acceptable(a: &Word, b: &Word, ceiling_secs: f64) -> bool {
    word_gap(a, b).map_or(true, |gap| gap <= ceiling_secs)
}
