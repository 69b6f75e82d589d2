//! Wire types exchanged with the engine's collaborators.
//!
//! ## Directions
//!
//! | Type | Direction |
//! |------|-----------|
//! | `ProviderEvent` (carrying `TranscriptTurn`) | ASR provider → engine |
//! | `EngineEvent` | engine → UI collaborator |
//! | `EngineStatusEvent` | engine → UI collaborator |
//!
//! Everything is camelCase JSON so recorded provider streams can be replayed
//! verbatim by the host binary.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::commands::CommandAction;

// ---------------------------------------------------------------------------
// Transcript input
// ---------------------------------------------------------------------------

/// One recognised word. Never mutated after receipt; a later turn replaces
/// the whole word array instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Word {
    pub text: String,
    /// `Some(false)` marks an interim word that may still be revised.
    /// Providers that do not report finality leave this `None`.
    pub is_final: Option<bool>,
    /// Seconds from stream start.
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub speaker_id: Option<i32>,
    /// Provider confidence in [0.0, 1.0], if reported.
    pub confidence: Option<f32>,
}

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = Some(is_final);
        self
    }

    pub fn with_timing(mut self, start: f64, end: f64) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// True only when the provider explicitly marked the word as interim.
    pub fn is_interim(&self) -> bool {
        self.is_final == Some(false)
    }
}

/// One incremental ASR update for the current utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptTurn {
    pub transcript: String,
    pub words: Vec<Word>,
    pub end_of_turn: bool,
    pub is_formatted: bool,
    pub turn_order: Option<u32>,
    pub utterance_fallback: Option<String>,
    pub speaker_id: Option<i32>,
}

impl TranscriptTurn {
    /// Words to process for this turn.
    ///
    /// Providers occasionally send a transcript without a word array; the
    /// fallback text (or the transcript) is split on whitespace and every
    /// derived word is final iff the turn closes the utterance.
    pub fn effective_words(&self) -> Cow<'_, [Word]> {
        if !self.words.is_empty() {
            return Cow::Borrowed(&self.words);
        }
        let source = self
            .utterance_fallback
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.transcript);
        Cow::Owned(
            source
                .split_whitespace()
                .map(|text| Word {
                    text: text.to_string(),
                    is_final: Some(self.end_of_turn),
                    speaker_id: self.speaker_id,
                    ..Word::default()
                })
                .collect(),
        )
    }
}

/// Everything a provider collaborator can push into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProviderEvent {
    Turn(TranscriptTurn),
    Connected,
    Disconnected { reason: Option<String> },
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Engine output
// ---------------------------------------------------------------------------

/// Listening mode controlling which outputs the engine produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListeningMode {
    /// Dictation and every command.
    #[default]
    On,
    /// Dictation suppressed; only wake commands are recognised.
    Sleep,
    /// Dictation suppressed; only wake commands preceded by the wake word.
    Off,
}

/// Emitted to the UI collaborator as the engine makes decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// First inline keyword triggered by a dictation chunk (UI feedback).
    KeywordTriggered { label: String },
    /// A command action ran. `Invoke` actions not handled by the engine
    /// itself are meant to be performed by the receiver of this event.
    CommandExecuted { key: String, action: CommandAction },
    ModeChanged { mode: ListeningMode },
    DictationTyped { text: String },
    /// Upstream provider failure, passed through verbatim.
    ProviderError { message: String },
}

/// Emitted when the engine lifecycle state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the engine actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Engine created but `start()` not yet called.
    Idle,
    /// Dispatch task running.
    Running,
    /// Dispatch task stopped; engine may be restarted.
    Stopped,
    /// Provider reported an unrecoverable error.
    Error,
}
