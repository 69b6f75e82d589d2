//! Word-level filters applied to every turn before interpretation.
//!
//! The `WordFilter` trait is the extensibility point: speaker isolation and
//! push-to-talk windows are the built-in implementations, and the dispatcher
//! runs whichever are enabled in settings, in order.

pub mod push_to_talk;
pub mod speaker;

pub use push_to_talk::PushToTalkFilter;
pub use speaker::SpeakerIsolation;

use crate::ipc::events::Word;

/// Trait for all word filters.
///
/// Implementors may be stateful (e.g. a locked speaker id). Filtering may drop
/// words, which renumbers the indices seen by later stages; that is consistent
/// within a turn because every stage sees the filtered array.
pub trait WordFilter: Send + 'static {
    /// Keep the words that pass. `turn_speaker` is the turn-level speaker id,
    /// used for words that carry none.
    fn apply(&mut self, words: Vec<Word>, turn_speaker: Option<i32>) -> Vec<Word>;

    /// Forget any learned state.
    fn reset(&mut self);
}
