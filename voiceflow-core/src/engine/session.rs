//! Per-utterance and per-session dispatcher state.

use std::collections::HashMap;
use std::time::Instant;

use super::scheduler::PendingExecutionKey;
use crate::commands::CommandCandidate;
use crate::ipc::events::Word;

/// A command accepted for deferred execution.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub candidate: CommandCandidate,
    pub due: Instant,
}

/// State of one utterance. Replaced wholesale when the utterance closes.
#[derive(Debug, Default)]
pub struct UtteranceSession {
    /// Bumped on every reset; deferred work from an older utterance is void.
    pub generation: u64,
    /// At least one turn has been seen.
    pub started: bool,
    /// Provider turn order of the utterance, when reported.
    pub turn_order: Option<u32>,
    /// Highest end index executed (or accepted for execution) per command key.
    pub last_executed_end: HashMap<String, usize>,
    pub command_fired: bool,
    /// Literal mode inherited from a bare "say" in the previous utterance.
    pub carried_literal: bool,
    /// The utterance opened with "say": its remainder is verbatim.
    pub literal_escape: bool,
    /// End index of the last halting command.
    pub halted_through: Option<usize>,
    /// Last word index typed as dictation or consumed by a command.
    pub consumed_through: Option<usize>,
    pub pending: HashMap<PendingExecutionKey, PendingCommand>,
    /// Latest (filtered) words of the utterance.
    pub words: Vec<Word>,
    /// Keyword fragment carried in from the previous utterance, not yet typed.
    pub carried_fragment: Option<String>,
}

impl UtteranceSession {
    /// Fresh session for the next utterance.
    pub fn next(&self) -> Self {
        Self {
            generation: self.generation + 1,
            ..Self::default()
        }
    }

    /// Literal mode covers the whole of this utterance.
    pub fn is_literal(&self) -> bool {
        self.carried_literal || self.literal_escape
    }

    /// First word index not yet typed or consumed.
    pub fn next_unconsumed(&self) -> usize {
        self.consumed_through.map_or(0, |i| i + 1)
    }

    /// Mark everything through `index` as consumed. Never moves backwards.
    pub fn consume_through(&mut self, index: usize) {
        self.consumed_through = Some(self.consumed_through.map_or(index, |c| c.max(index)));
    }

    /// Start index of the earliest pending command, if any.
    pub fn first_pending_start(&self) -> Option<usize> {
        self.pending
            .values()
            .map(|p| p.candidate.start_word_index)
            .min()
    }

    /// Pending commands starting before `index`, earliest first.
    pub fn take_pending_before(&mut self, index: usize) -> Vec<PendingCommand> {
        let keys: Vec<PendingExecutionKey> = self
            .pending
            .iter()
            .filter(|(_, p)| p.candidate.start_word_index < index)
            .map(|(k, _)| k.clone())
            .collect();
        let mut taken: Vec<PendingCommand> = keys
            .iter()
            .filter_map(|k| self.pending.remove(k))
            .collect();
        taken.sort_by_key(|p| (p.candidate.start_word_index, p.candidate.end_word_index));
        taken
    }
}

/// State carried across utterance boundaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CrossBoundaryState {
    #[default]
    Normal,
    /// The previous utterance was a bare "say".
    Literal,
    /// The previous utterance ended on a bare keyword fragment.
    AwaitingKeywordContinuation { fragment: String, since: Instant },
}

/// App-session state that outlives utterances.
#[derive(Debug, Default)]
pub struct SessionCarryState {
    pub boundary: CrossBoundaryState,
    /// Recently typed text, for spacing the next chunk.
    pub typed_tail: TypedTail,
    /// Characters typed by the most recent dictation chunk.
    pub last_chunk_len: usize,
    /// Newlines withheld from a terminal target until the utterance ends.
    pub pending_newlines: usize,
    /// Set while waiting for the provider to close a force-ended utterance.
    pub force_end_pending: Option<Instant>,
    /// Turn order of the last closed utterance. Late turns carrying it (a
    /// formatted copy after an unformatted close) are ignored.
    pub last_closed_turn_order: Option<u32>,
    /// The last utterance closed on an unformatted end of turn; its formatted
    /// copy may still arrive.
    pub formatted_copy_expected: bool,
}

/// Longest run of typed characters remembered by [`TypedTail`].
const TAIL_CAP: usize = 64;

/// The last few characters typed into the target, kept in step with delete
/// presses so the character before the cursor stays known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedTail {
    text: String,
    /// Older characters precede `text` but were dropped from memory.
    truncated: bool,
}

impl TypedTail {
    pub fn push(&mut self, typed: &str) {
        self.text.push_str(typed);
        let excess = self.text.chars().count().saturating_sub(TAIL_CAP);
        if excess > 0 {
            let cut = self
                .text
                .char_indices()
                .nth(excess)
                .map_or(self.text.len(), |(i, _)| i);
            self.text.drain(..cut);
            self.truncated = true;
        }
    }

    /// Forget the `n` most recent characters.
    pub fn delete(&mut self, n: usize) {
        for _ in 0..n {
            if self.text.pop().is_none() {
                break;
            }
        }
    }

    pub fn last_char(&self) -> Option<char> {
        self.text.chars().last()
    }

    /// Text precedes the cursor but its last character is no longer known.
    pub fn is_unknown(&self) -> bool {
        self.text.is_empty() && self.truncated
    }
}

impl SessionCarryState {
    /// Forget everything except the force-end and closed-turn bookkeeping.
    pub fn clear(&mut self) {
        *self = Self {
            force_end_pending: self.force_end_pending,
            last_closed_turn_order: self.last_closed_turn_order,
            formatted_copy_expected: self.formatted_copy_expected,
            ..Self::default()
        };
    }
}
