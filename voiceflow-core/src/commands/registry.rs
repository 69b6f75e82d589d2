//! Command table built from settings.

use tracing::warn;

use super::{press, system, CommandAction};
use crate::automation::KeyChord;
use crate::config::{EngineSettings, UserActionConfig, UserCommandConfig};
use crate::text::phrase_tokens;

/// How a command interacts with listening modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// Leaves sleep or off. Anchored to the utterance start unless prefixed.
    Wake,
    /// Enters sleep or off. Anchored like `Wake`, only heard while on.
    Mode,
    /// Everything else. Only heard while on.
    Ordinary,
}

impl CommandClass {
    pub fn is_anchored(self) -> bool {
        matches!(self, Self::Wake | Self::Mode)
    }
}

/// One fixed phrase bound to an action.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub key: String,
    pub phrase: Vec<String>,
    pub action: CommandAction,
    pub class: CommandClass,
    pub halts_processing: bool,
    pub requires_pause: bool,
}

impl CommandSpec {
    pub fn new(key: impl Into<String>, phrase: &str, action: CommandAction) -> Self {
        Self {
            key: key.into(),
            phrase: phrase_tokens(phrase),
            action,
            class: CommandClass::Ordinary,
            halts_processing: false,
            requires_pause: false,
        }
    }

    pub fn with_class(mut self, class: CommandClass) -> Self {
        self.class = class;
        self
    }

    pub fn halting(mut self) -> Self {
        self.halts_processing = true;
        self
    }

    pub fn after_pause(mut self) -> Self {
        self.requires_pause = true;
        self
    }
}

/// All phrase commands plus the wake phrase variants.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    /// Token sequences accepted as the wake phrase; the first is canonical.
    wake_variants: Vec<Vec<String>>,
}

impl CommandRegistry {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        let mut specs = system::system_commands(&settings.providers);
        specs.extend(
            settings
                .user_commands
                .iter()
                .filter(|c| c.enabled)
                .filter_map(user_command),
        );
        specs.retain(|s| !s.phrase.is_empty());

        let mut wake_variants: Vec<Vec<String>> = Vec::new();
        for raw in std::iter::once(&settings.wake_word).chain(&settings.wake_aliases) {
            let tokens = phrase_tokens(raw);
            if tokens.is_empty() || wake_variants.contains(&tokens) {
                continue;
            }
            // "voice flow" is also heard as "voiceflow".
            if tokens.len() > 1 {
                let joined = vec![tokens.concat()];
                if !wake_variants.contains(&joined) {
                    wake_variants.push(joined);
                }
            }
            wake_variants.push(tokens);
        }

        Self {
            specs,
            wake_variants,
        }
    }

    pub fn specs(&self) -> &[CommandSpec] {
        &self.specs
    }

    /// Canonical wake phrase tokens.
    pub fn wake_tokens(&self) -> &[String] {
        self.wake_variants.first().map_or(&[], Vec::as_slice)
    }

    /// Number of tokens forming a wake phrase that ends right before token
    /// position `start`, if any. Longest variant wins.
    pub fn wake_prefix_len(&self, tokens: &[&str], start: usize) -> Option<usize> {
        self.wake_variants
            .iter()
            .filter(|v| v.len() <= start)
            .filter(|v| {
                tokens[start - v.len()..start]
                    .iter()
                    .zip(v.iter())
                    .all(|(t, w)| t == w)
            })
            .map(Vec::len)
            .max()
    }

    /// Length of the longest tail of `tokens` that could still grow into a
    /// command: a proper prefix of a phrase, a wake phrase followed by such a
    /// prefix, or an unfinished "press" chord.
    pub fn unfinished_tail_len(&self, tokens: &[&str]) -> usize {
        let longest_phrase = self.specs.iter().map(|s| s.phrase.len()).max().unwrap_or(0);
        let longest_wake = self.wake_variants.iter().map(Vec::len).max().unwrap_or(0);
        let limit = tokens.len().min(longest_phrase + longest_wake + press::MAX_MODIFIERS);

        (1..=limit)
            .rev()
            .find(|&k| self.could_grow(&tokens[tokens.len() - k..]))
            .unwrap_or(0)
    }

    fn could_grow(&self, tail: &[&str]) -> bool {
        if press::is_unfinished(tail) || self.is_phrase_prefix(tail) {
            return true;
        }
        self.wake_variants.iter().any(|wake| {
            tail.len() >= wake.len()
                && tail[..wake.len()].iter().zip(wake).all(|(t, w)| t == w)
                && {
                    let rest = &tail[wake.len()..];
                    rest.is_empty() || self.is_phrase_prefix(rest) || press::is_unfinished(rest)
                }
        })
    }

    fn is_phrase_prefix(&self, tail: &[&str]) -> bool {
        self.specs.iter().any(|s| {
            s.phrase.len() > tail.len() && s.phrase.iter().zip(tail).all(|(p, t)| p == t)
        })
    }
}

fn user_command(config: &UserCommandConfig) -> Option<CommandSpec> {
    let action = match &config.action {
        UserActionConfig::Shortcut { chord } => match KeyChord::parse(chord) {
            Ok(chord) => CommandAction::Shortcut { chord },
            Err(e) => {
                warn!(id = %config.id, "skipping user command: {e}");
                return None;
            }
        },
        UserActionConfig::Snippet { text } => CommandAction::TypeText { text: text.clone() },
    };
    let mut spec = CommandSpec::new(format!("user.{}", config.id.trim()), &config.phrase, action);
    spec.halts_processing = config.halts_processing;
    spec.requires_pause = config.requires_pause;
    Some(spec)
}
