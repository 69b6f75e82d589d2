//! Speaker isolation: lock onto the first speaker heard and drop everyone else.

use tracing::debug;

use super::WordFilter;
use crate::ipc::events::Word;

#[derive(Debug, Clone, Default)]
pub struct SpeakerIsolation {
    locked: Option<i32>,
}

impl SpeakerIsolation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speaker currently locked, if any.
    pub fn locked_speaker(&self) -> Option<i32> {
        self.locked
    }
}

impl WordFilter for SpeakerIsolation {
    fn apply(&mut self, words: Vec<Word>, turn_speaker: Option<i32>) -> Vec<Word> {
        if self.locked.is_none() {
            self.locked = words
                .iter()
                .find_map(|w| w.speaker_id)
                .or(turn_speaker);
            if let Some(speaker) = self.locked {
                debug!(speaker, "speaker isolation locked");
            }
        }
        let Some(locked) = self.locked else {
            return words;
        };
        words
            .into_iter()
            // Words without attribution pass through; diarization often lags.
            .filter(|w| w.speaker_id.or(turn_speaker).map_or(true, |s| s == locked))
            .collect()
    }

    fn reset(&mut self) {
        self.locked = None;
    }
}
