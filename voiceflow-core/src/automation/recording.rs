//! `RecordingAutomation`: in-memory backend that records every call.
//!
//! Used by tests and by hosts that want to inspect output without touching
//! the OS. The op log is shared, so a clone kept by the caller observes what
//! the engine does through its `AutomationHandle`.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::{Automation, KeyChord, KeyCode};
use crate::error::Result;

/// One recorded automation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum AutomationOp {
    Type { text: String },
    Press { chord: KeyChord },
}

#[derive(Clone, Default)]
pub struct RecordingAutomation {
    ops: Arc<Mutex<Vec<AutomationOp>>>,
    terminal: Arc<Mutex<bool>>,
}

impl RecordingAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the foreground target is (or is not) a terminal.
    pub fn set_terminal(&self, terminal: bool) {
        *self.terminal.lock() = terminal;
    }

    pub fn ops(&self) -> Vec<AutomationOp> {
        self.ops.lock().clone()
    }

    /// Replay the log against a plain text buffer: typed text is appended,
    /// Delete removes one character and Return appends a newline. Other
    /// chords leave the buffer untouched.
    pub fn rendered_text(&self) -> String {
        let mut out = String::new();
        for op in self.ops.lock().iter() {
            match op {
                AutomationOp::Type { text } => out.push_str(text),
                AutomationOp::Press { chord } if chord.modifiers.is_empty() => match chord.key {
                    KeyCode::Delete => {
                        out.pop();
                    }
                    KeyCode::Return => out.push('\n'),
                    _ => {}
                },
                AutomationOp::Press { .. } => {}
            }
        }
        out
    }

    /// Number of unmodified presses of `key`.
    pub fn presses_of(&self, key: KeyCode) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| {
                matches!(op, AutomationOp::Press { chord }
                    if chord.key == key && chord.modifiers.is_empty())
            })
            .count()
    }

    /// All chords pressed, in order.
    pub fn chords(&self) -> Vec<KeyChord> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                AutomationOp::Press { chord } => Some(*chord),
                AutomationOp::Type { .. } => None,
            })
            .collect()
    }
}

impl Automation for RecordingAutomation {
    fn type_literal(&mut self, text: &str) -> Result<()> {
        self.ops.lock().push(AutomationOp::Type {
            text: text.to_string(),
        });
        Ok(())
    }

    fn press_chord(&mut self, chord: KeyChord) -> Result<()> {
        self.ops.lock().push(AutomationOp::Press { chord });
        Ok(())
    }

    fn foreground_is_terminal(&self) -> bool {
        *self.terminal.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::Modifiers;

    #[test]
    fn rendered_text_applies_deletes_and_returns() {
        let mut rec = RecordingAutomation::new();
        rec.type_literal("hello").unwrap();
        rec.press_chord(KeyChord::key(KeyCode::Delete)).unwrap();
        rec.press_chord(KeyChord::key(KeyCode::Return)).unwrap();
        rec.press_chord(KeyChord::new(
            KeyCode::Char('Z'),
            Modifiers {
                command: true,
                ..Modifiers::NONE
            },
        ))
        .unwrap();
        assert_eq!(rec.rendered_text(), "hell\n");
        assert_eq!(rec.presses_of(KeyCode::Delete), 1);
        assert_eq!(rec.chords().len(), 3);
    }

    #[test]
    fn clones_share_the_log() {
        let rec = RecordingAutomation::new();
        let mut engine_side = rec.clone();
        engine_side.type_literal("x").unwrap();
        assert_eq!(rec.ops().len(), 1);
    }
}
