//! Push-to-talk window: keep only words spoken while the key was held.
//!
//! Times are in the provider's stream clock (seconds). An open window
//! (`end = None`) means the key is still down.

use serde::{Deserialize, Serialize};

use super::WordFilter;
use crate::ipc::events::Word;

/// Slack applied to both window edges; providers timestamp the acoustic
/// onset which can precede the key press slightly.
const EDGE_TOLERANCE_SECS: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushToTalkFilter {
    pub start: f64,
    pub end: Option<f64>,
}

impl PushToTalkFilter {
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    fn contains(&self, word: &Word) -> bool {
        let Some(t) = word.start_time else {
            return true;
        };
        t >= self.start - EDGE_TOLERANCE_SECS
            && self.end.map_or(true, |end| t <= end + EDGE_TOLERANCE_SECS)
    }
}

impl WordFilter for PushToTalkFilter {
    fn apply(&mut self, words: Vec<Word>, _turn_speaker: Option<i32>) -> Vec<Word> {
        words.into_iter().filter(|w| self.contains(w)).collect()
    }

    fn reset(&mut self) {}
}
