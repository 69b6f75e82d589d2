//! Parametric "press <modifiers…> <key>" commands.

use crate::automation::{KeyChord, KeyCode, Modifiers};

pub const TRIGGER: &str = "press";

/// Upper bound on modifier tokens between "press" and the key.
pub const MAX_MODIFIERS: usize = 4;

/// A parsed press command, in token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressMatch {
    /// Position of the "press" token.
    pub start: usize,
    /// Position of the key token (last token of the key name).
    pub end: usize,
    pub chord: KeyChord,
}

/// Parse a press command whose "press" token sits at `start`.
///
/// Unmodified Enter, Escape, letters and digits are rejected unless
/// `prefixed`: "press enter to continue" and "press a button" are common in
/// ordinary dictation. Unmodified navigation keys are accepted.
pub fn parse_at(tokens: &[&str], start: usize, prefixed: bool) -> Option<PressMatch> {
    if tokens.get(start) != Some(&TRIGGER) {
        return None;
    }
    let mut modifiers = Modifiers::NONE;
    let mut pos = start + 1;
    while pos < tokens.len() && pos - start <= MAX_MODIFIERS && modifiers.apply(tokens[pos]) {
        pos += 1;
    }

    let (key, end) = key_at(tokens, pos)?;
    if modifiers.is_empty() && !prefixed && is_conversational(key) {
        return None;
    }
    Some(PressMatch {
        start,
        end,
        chord: KeyChord::new(key, modifiers),
    })
}

/// Whether `tail` is a press command still waiting for its key.
pub fn is_unfinished(tail: &[&str]) -> bool {
    let Some((first, rest)) = tail.split_first() else {
        return false;
    };
    if *first != TRIGGER || rest.len() > MAX_MODIFIERS + 1 {
        return false;
    }
    let mut scratch = Modifiers::NONE;
    match rest.split_last() {
        None => true,
        Some((last, mods)) => {
            mods.iter().all(|m| scratch.apply(m)) && (scratch.apply(last) || *last == "page")
        }
    }
}

fn key_at(tokens: &[&str], pos: usize) -> Option<(KeyCode, usize)> {
    let token = *tokens.get(pos)?;
    if token == "page" {
        return match tokens.get(pos + 1).copied() {
            Some("up") => Some((KeyCode::PageUp, pos + 1)),
            Some("down") => Some((KeyCode::PageDown, pos + 1)),
            _ => None,
        };
    }
    if matches!(token, "forward" | "forwards") && tokens.get(pos + 1) == Some(&"delete") {
        return Some((KeyCode::ForwardDelete, pos + 1));
    }
    KeyCode::from_spoken(token).map(|key| (key, pos))
}

fn is_conversational(key: KeyCode) -> bool {
    key.is_character() || matches!(key, KeyCode::Return | KeyCode::Escape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord_of(tokens: &[&str]) -> Option<KeyChord> {
        parse_at(tokens, 0, false).map(|m| m.chord)
    }

    #[test]
    fn modifiers_then_key() {
        let m = parse_at(&["press", "command", "option", "k"], 0, false).unwrap();
        assert_eq!(m.end, 3);
        assert_eq!(m.chord.to_string(), "Command+Option+K");
    }

    #[test]
    fn bare_conversational_keys_are_rejected() {
        assert!(chord_of(&["press", "enter"]).is_none());
        assert!(chord_of(&["press", "escape"]).is_none());
        assert!(chord_of(&["press", "a", "button"]).is_none());
        assert!(chord_of(&["press", "5"]).is_none());
        assert!(parse_at(&["press", "enter"], 0, true).is_some());
    }

    #[test]
    fn bare_navigation_keys_are_accepted() {
        assert_eq!(chord_of(&["press", "tab"]), Some(KeyChord::key(KeyCode::Tab)));
        assert_eq!(
            chord_of(&["press", "page", "down"]),
            Some(KeyChord::key(KeyCode::PageDown))
        );
        assert_eq!(chord_of(&["press", "f5"]), Some(KeyChord::key(KeyCode::F(5))));
    }

    #[test]
    fn modified_enter_is_accepted() {
        let chord = chord_of(&["press", "shift", "enter"]).unwrap();
        assert!(chord.modifiers.shift);
        assert_eq!(chord.key, KeyCode::Return);
    }

    #[test]
    fn incomplete_press() {
        assert!(chord_of(&["press", "control"]).is_none());
        assert!(chord_of(&["press", "the", "button"]).is_none());
        assert!(is_unfinished(&["press"]));
        assert!(is_unfinished(&["press", "control", "shift"]));
        assert!(is_unfinished(&["press", "page"]));
        assert!(!is_unfinished(&["press", "the"]));
        assert!(!is_unfinished(&["hello"]));
    }
}
