//! Engine settings.
//!
//! Settings are owned by the host (loaded from and saved to disk there) and
//! shared with the engine through a `SettingsHandle`. The dispatcher takes a
//! snapshot at the start of every turn and timer firing, so edits made by the
//! UI apply from the next event on.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::filter::PushToTalkFilter;
use crate::ipc::events::ListeningMode;

pub const DEFAULT_WAKE_WORD: &str = "voiceflow";

/// When dictation is typed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictationMode {
    /// Type each utterance once, when the provider delivers its final
    /// (formatted) turn.
    #[default]
    Turn,
    /// Type words as soon as the provider marks them final.
    Live,
}

/// A canonical spelling and the variants the recogniser tends to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub term: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// What a user-defined command does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UserActionConfig {
    /// Chord in settings syntax, e.g. `"cmd+shift+k"`.
    Shortcut { chord: String },
    /// Literal text typed as-is.
    Snippet { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCommandConfig {
    pub id: String,
    pub phrase: String,
    pub action: UserActionConfig,
    #[serde(default)]
    pub halts_processing: bool,
    #[serde(default)]
    pub requires_pause: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineSettings {
    /// Listening mode the engine starts in.
    pub initial_mode: ListeningMode,
    pub dictation_mode: DictationMode,
    /// In turn mode, wait for the provider's formatted final turn instead of
    /// closing the utterance on the first end-of-turn.
    pub await_formatted: bool,
    /// Debounce applied to non-prefixed, non-halting commands.
    pub command_delay_ms: u64,
    /// Delay for commands flagged `requiresPause`.
    pub pause_delay_ms: u64,
    /// Maximum silence between the halves of a multi-word keyword.
    pub keyword_gap_ceiling_ms: u64,
    /// How long a trailing keyword fragment waits for the next utterance.
    pub continuation_window_ms: u64,
    /// How long a forced end waits for the provider's end-of-turn.
    pub force_end_timeout_ms: u64,
    pub wake_word: String,
    /// Other spellings of the wake word the recogniser produces.
    pub wake_aliases: Vec<String>,
    /// Command matches containing a word below this confidence are ignored.
    pub min_command_confidence: f32,
    pub literal_vocabulary: Vec<VocabularyEntry>,
    pub user_commands: Vec<UserCommandConfig>,
    /// Provider names reachable via "switch provider <name>".
    pub providers: Vec<String>,
    pub isolate_speaker: bool,
    pub push_to_talk: Option<PushToTalkFilter>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            initial_mode: ListeningMode::On,
            dictation_mode: DictationMode::Turn,
            await_formatted: true,
            command_delay_ms: 350,
            pause_delay_ms: 700,
            keyword_gap_ceiling_ms: 1_200,
            continuation_window_ms: 2_000,
            force_end_timeout_ms: 2_000,
            wake_word: DEFAULT_WAKE_WORD.into(),
            wake_aliases: vec!["voice flow".into()],
            min_command_confidence: 0.0,
            literal_vocabulary: Vec::new(),
            user_commands: Vec::new(),
            providers: Vec::new(),
            isolate_speaker: false,
            push_to_talk: None,
        }
    }
}

impl EngineSettings {
    pub fn normalize(&mut self) {
        self.command_delay_ms = self.command_delay_ms.min(5_000);
        self.pause_delay_ms = self.pause_delay_ms.min(5_000);
        self.keyword_gap_ceiling_ms = self.keyword_gap_ceiling_ms.clamp(100, 5_000);
        self.continuation_window_ms = self.continuation_window_ms.clamp(250, 10_000);
        self.force_end_timeout_ms = self.force_end_timeout_ms.clamp(250, 10_000);
        self.min_command_confidence = self.min_command_confidence.clamp(0.0, 1.0);

        let wake = self.wake_word.trim().to_lowercase();
        self.wake_word = if wake.is_empty() {
            DEFAULT_WAKE_WORD.into()
        } else {
            wake
        };

        self.wake_aliases = normalize_names(&self.wake_aliases);
        self.providers = normalize_names(&self.providers);
        self.user_commands
            .retain(|c| !c.id.trim().is_empty() && !c.phrase.trim().is_empty());
        self.literal_vocabulary
            .retain(|e| !e.term.trim().is_empty());
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn pause_delay(&self) -> Duration {
        Duration::from_millis(self.pause_delay_ms)
    }

    pub fn keyword_gap_ceiling_secs(&self) -> f64 {
        self.keyword_gap_ceiling_ms as f64 / 1000.0
    }

    pub fn continuation_window(&self) -> Duration {
        Duration::from_millis(self.continuation_window_ms)
    }

    pub fn force_end_timeout(&self) -> Duration {
        Duration::from_millis(self.force_end_timeout_ms)
    }
}

fn normalize_names(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw {
        let name = name.trim().to_lowercase();
        if name.is_empty() || out.contains(&name) {
            continue;
        }
        out.push(name);
    }
    out
}

fn default_true() -> bool {
    true
}

/// Shared, hot-swappable settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle(Arc<RwLock<EngineSettings>>);

impl SettingsHandle {
    pub fn new(mut settings: EngineSettings) -> Self {
        settings.normalize();
        Self(Arc::new(RwLock::new(settings)))
    }

    pub fn snapshot(&self) -> EngineSettings {
        self.0.read().clone()
    }

    /// Apply an edit and re-normalize.
    pub fn update(&self, edit: impl FnOnce(&mut EngineSettings)) {
        let mut guard = self.0.write();
        edit(&mut guard);
        guard.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"dictationMode":"live","commandDelayMs":0}"#).unwrap();
        assert_eq!(settings.dictation_mode, DictationMode::Live);
        assert_eq!(settings.command_delay_ms, 0);
        assert_eq!(settings.wake_word, DEFAULT_WAKE_WORD);
        assert!(settings.await_formatted);
    }

    #[test]
    fn normalize_clamps_and_cleans() {
        let mut settings = EngineSettings {
            keyword_gap_ceiling_ms: 1,
            wake_word: "  ".into(),
            min_command_confidence: 4.0,
            providers: vec![" Deepgram".into(), "deepgram".into(), "".into()],
            ..EngineSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.keyword_gap_ceiling_ms, 100);
        assert_eq!(settings.wake_word, DEFAULT_WAKE_WORD);
        assert_eq!(settings.min_command_confidence, 1.0);
        assert_eq!(settings.providers, vec!["deepgram"]);
    }

    #[test]
    fn user_commands_deserialize_with_tagged_actions() {
        let raw = r#"{
            "userCommands": [
                {"id": "mail", "phrase": "open mail", "action": {"type": "shortcut", "chord": "cmd+shift+m"}},
                {"id": "sig", "phrase": "insert signature", "action": {"type": "snippet", "text": "Best, Sam"}, "requiresPause": true},
                {"id": "", "phrase": "broken", "action": {"type": "snippet", "text": "x"}}
            ]
        }"#;
        let mut settings: EngineSettings = serde_json::from_str(raw).unwrap();
        settings.normalize();
        assert_eq!(settings.user_commands.len(), 2);
        assert!(settings.user_commands[1].requires_pause);
        assert!(settings.user_commands[0].enabled);
    }

    #[test]
    fn handle_update_renormalizes() {
        let handle = SettingsHandle::new(EngineSettings::default());
        handle.update(|s| s.continuation_window_ms = 60_000);
        assert_eq!(handle.snapshot().continuation_window_ms, 10_000);
    }
}
