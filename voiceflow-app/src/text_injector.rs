//! Console automation backend: renders engine output to stdout instead of
//! injecting keystrokes.
//!
//! Typed text and key chords are printed as they happen and also applied to
//! an in-memory document, so a replay can end by showing what the target
//! application would contain.

use std::sync::Arc;

use parking_lot::Mutex;
use voiceflow_core::{Automation, KeyChord, KeyCode};

#[derive(Clone, Default)]
pub struct ConsoleAutomation {
    /// Process name of the simulated foreground application.
    target: Option<String>,
    document: Arc<Mutex<String>>,
}

impl ConsoleAutomation {
    pub fn new(target: Option<String>) -> Self {
        Self {
            target: target.map(|t| t.trim().to_ascii_lowercase()),
            document: Arc::default(),
        }
    }

    /// Text the simulated target holds after every call so far.
    pub fn document(&self) -> String {
        self.document.lock().clone()
    }
}

impl Automation for ConsoleAutomation {
    fn type_literal(&mut self, text: &str) -> voiceflow_core::error::Result<()> {
        println!("type   {text:?}");
        self.document.lock().push_str(text);
        Ok(())
    }

    fn press_chord(&mut self, chord: KeyChord) -> voiceflow_core::error::Result<()> {
        println!("press  {chord}");
        if chord.modifiers.is_empty() {
            let mut doc = self.document.lock();
            match chord.key {
                KeyCode::Delete => {
                    doc.pop();
                }
                KeyCode::Return => doc.push('\n'),
                KeyCode::Tab => doc.push('\t'),
                KeyCode::Space => doc.push(' '),
                _ => {}
            }
        }
        Ok(())
    }

    fn foreground_is_terminal(&self) -> bool {
        self.target.as_deref().is_some_and(is_terminal_process)
    }
}

fn is_terminal_process(process_name: &str) -> bool {
    let name = process_name.strip_suffix(".exe").unwrap_or(process_name);
    matches!(
        name,
        "warp"
            | "windowsterminal"
            | "wezterm-gui"
            | "wezterm"
            | "alacritty"
            | "kitty"
            | "iterm2"
            | "terminal"
            | "gnome-terminal-server"
            | "konsole"
            | "cmd"
            | "conhost"
            | "powershell"
            | "pwsh"
            | "mintty"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_detection_ignores_case_and_exe_suffix() {
        assert!(ConsoleAutomation::new(Some("WezTerm-GUI.exe".into())).foreground_is_terminal());
        assert!(ConsoleAutomation::new(Some("alacritty".into())).foreground_is_terminal());
        assert!(!ConsoleAutomation::new(Some("notepad.exe".into())).foreground_is_terminal());
        assert!(!ConsoleAutomation::new(None).foreground_is_terminal());
    }

    #[test]
    fn document_tracks_typing_and_deletes() {
        let mut console = ConsoleAutomation::new(None);
        console.type_literal("hello").unwrap();
        console.press_chord(KeyChord::key(KeyCode::Delete)).unwrap();
        console.press_chord(KeyChord::key(KeyCode::Return)).unwrap();
        assert_eq!(console.document(), "hell\n");
    }
}
