//! Key chords issued to the OS automation collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoiceflowError};

/// A physical key, independent of platform key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCode {
    /// Letter (stored upper-case) or digit.
    Char(char),
    Return,
    Escape,
    Tab,
    Space,
    /// Backward delete.
    Delete,
    ForwardDelete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key F1–F12.
    F(u8),
}

impl KeyCode {
    /// Resolve a single normalized spoken token to a key.
    pub fn from_spoken(token: &str) -> Option<Self> {
        let key = match token {
            "enter" | "return" => Self::Return,
            "escape" | "esc" => Self::Escape,
            "tab" => Self::Tab,
            "space" | "spacebar" => Self::Space,
            "delete" | "backspace" => Self::Delete,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            _ => return Self::single_char(token).or_else(|| Self::function_key(token)),
        };
        Some(key)
    }

    /// Parse a key name as written in settings ("k", "Enter", "F5", "PageUp").
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "forwarddelete" | "fwddelete" => Some(Self::ForwardDelete),
            "arrowup" => Some(Self::Up),
            "arrowdown" => Some(Self::Down),
            "arrowleft" => Some(Self::Left),
            "arrowright" => Some(Self::Right),
            other => Self::from_spoken(other),
        }
    }

    /// Letters and digits, as opposed to named keys.
    pub fn is_character(&self) -> bool {
        matches!(self, Self::Char(_))
    }

    fn single_char(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let c = chars.next()?;
        if chars.next().is_some() || !c.is_ascii_alphanumeric() {
            return None;
        }
        Some(Self::Char(c.to_ascii_uppercase()))
    }

    fn function_key(token: &str) -> Option<Self> {
        let n: u8 = token.strip_prefix('f')?.parse().ok()?;
        (1..=12).contains(&n).then_some(Self::F(n))
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Modifier set held while the key is clicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Modifiers {
    pub command: bool,
    pub control: bool,
    pub option: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        command: false,
        control: false,
        option: false,
        shift: false,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Set the modifier named by a normalized spoken or written token.
    /// Returns false when the token is not a modifier.
    pub fn apply(&mut self, token: &str) -> bool {
        match token {
            "command" | "cmd" | "meta" | "super" => self.command = true,
            "control" | "ctrl" => self.control = true,
            "option" | "alt" => self.option = true,
            "shift" => self.shift = true,
            _ => return false,
        }
        true
    }
}

/// A key plus modifiers, e.g. Command+Option+K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyChord {
    pub key: KeyCode,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A single unmodified key press.
    pub fn key(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Parse a settings-style chord: `"cmd+shift+k"`, `"Control+Tab"`, `"F5"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let Some((key_part, modifier_parts)) = parts.split_last() else {
            return Err(VoiceflowError::InvalidChord(raw.to_string()));
        };

        let mut modifiers = Modifiers::NONE;
        for part in modifier_parts {
            if !modifiers.apply(&part.to_ascii_lowercase()) {
                return Err(VoiceflowError::InvalidChord(raw.to_string()));
            }
        }
        let key =
            KeyCode::parse(key_part).ok_or_else(|| VoiceflowError::InvalidChord(raw.to_string()))?;
        Ok(Self { key, modifiers })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [
            (m.command, "Command"),
            (m.control, "Control"),
            (m.option, "Option"),
            (m.shift, "Shift"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}
