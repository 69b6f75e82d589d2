//! Voice commands: what they do, where they matched, and how they are found.
//!
//! ## Pipeline
//!
//! ```text
//! CommandRegistry::from_settings   (system table + user commands, tokenized once)
//!        │
//!        ▼
//! generator::generate              (phrase matches + "press" chords for one turn)
//!        │  Vec<CommandCandidate>
//!        ▼
//! engine::resolver                 (ordering, idempotency, debounce)
//! ```

pub mod generator;
pub mod press;
pub mod registry;
pub mod system;

pub use generator::{generate, GenerateContext};
pub use registry::{CommandClass, CommandRegistry, CommandSpec};

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::automation::KeyChord;
use crate::ipc::events::ListeningMode;

/// Names of `Invoke` actions. The first four are carried out by the engine
/// itself; the rest are forwarded to the UI collaborator.
pub mod invoke {
    pub const SCRATCH: &str = "dictation.scratch";
    pub const SUBMIT: &str = "utterance.submit";
    pub const FORCE_END: &str = "utterance.forceEnd";
    pub const CLEAR_SESSION: &str = "session.clear";
    pub const WINDOW_NEXT: &str = "window.next";
    pub const WINDOW_RECENT: &str = "window.recent";
    pub const PROVIDER_SWITCH: &str = "provider.switch";
    pub const PANEL_SHOW: &str = "panel.show";
    pub const PANEL_HIDE: &str = "panel.hide";
    pub const NOTE_START: &str = "note.start";
    pub const NOTE_END: &str = "note.end";
    pub const RECORDING_START: &str = "recording.start";
    pub const RECORDING_STOP: &str = "recording.stop";
    pub const TRANSCRIBING_START: &str = "transcribing.start";
    pub const TRANSCRIBING_STOP: &str = "transcribing.stop";
}

/// What a command does once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandAction {
    ModeChange {
        mode: ListeningMode,
    },
    Shortcut {
        chord: KeyChord,
    },
    TypeText {
        text: String,
    },
    Invoke {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params: Vec<String>,
    },
}

impl CommandAction {
    pub fn invoke(name: &str) -> Self {
        Self::Invoke {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    pub fn invoke_with(name: &str, param: impl Into<String>) -> Self {
        Self::Invoke {
            name: name.to_string(),
            params: vec![param.into()],
        }
    }
}

/// One match of a command in the current turn's words.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCandidate {
    /// `system.*` or `user.<id>`.
    pub key: String,
    pub start_word_index: usize,
    pub end_word_index: usize,
    /// Spoken after the wake word. The span includes the wake word.
    pub is_prefixed: bool,
    pub is_stable: bool,
    pub requires_pause: bool,
    pub halts_processing: bool,
    /// The utterance is closed and can no longer be revised.
    pub skip_stability_check: bool,
    pub action: CommandAction,
}

impl CommandCandidate {
    pub fn span(&self) -> RangeInclusive<usize> {
        self.start_word_index..=self.end_word_index
    }

    pub fn overlaps(&self, other: &CommandCandidate) -> bool {
        self.start_word_index <= other.end_word_index
            && other.start_word_index <= self.end_word_index
    }

    /// Passes the stability gate.
    pub fn is_actionable(&self) -> bool {
        self.is_stable || self.skip_stability_check
    }
}
