//! OS automation abstraction.
//!
//! The `Automation` trait decouples the engine from any specific key-injection
//! backend (enigo, Win32 `SendInput`, CGEvent, a console renderer in the host
//! binary, or the in-memory recorder used by tests).
//!
//! Calls are assumed synchronous enough not to need acknowledgement. All
//! access is serialised through `AutomationHandle`'s `parking_lot::Mutex`.

pub mod keys;
pub mod recording;

pub use keys::{KeyChord, KeyCode, Modifiers};
pub use recording::{AutomationOp, RecordingAutomation};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Contract for OS-level output primitives.
pub trait Automation: Send + 'static {
    /// Type `text` into the focused application. May contain `\n`.
    fn type_literal(&mut self, text: &str) -> Result<()>;

    /// Click `chord.key` while holding `chord.modifiers`.
    fn press_chord(&mut self, chord: KeyChord) -> Result<()>;

    /// Whether the foreground target is terminal-like. Enter is deferred to
    /// the end of the utterance for such targets.
    fn foreground_is_terminal(&self) -> bool {
        false
    }
}

/// Thread-safe reference-counted handle to any `Automation` implementor.
#[derive(Clone)]
pub struct AutomationHandle(pub Arc<Mutex<dyn Automation>>);

impl AutomationHandle {
    /// Wrap any `Automation` in an `AutomationHandle`.
    pub fn new<A: Automation>(automation: A) -> Self {
        Self(Arc::new(Mutex::new(automation)))
    }
}

impl std::fmt::Debug for AutomationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationHandle").finish_non_exhaustive()
    }
}
