//! # voiceflow-core
//!
//! Recognition and command-scheduling engine for voice dictation.
//!
//! ## Architecture
//!
//! ```text
//! ASR provider ──ProviderEvent──► VoiceflowEngine (tokio task)
//!                                        │
//!                                  TurnDispatcher
//!                      ┌─────────────────┼──────────────────┐
//!                word filters     command candidates    keyword rewrite
//!                                  → resolver             (dictation)
//!                                  → scheduler               │
//!                                        │                   │
//!                                        └──► Automation ◄───┘
//!                                        │   (type / press chords)
//!                          broadcast::Sender<EngineEvent>
//! ```
//!
//! The engine never touches audio or the OS directly: providers and
//! automation backends plug in through the `TranscriptProvider` and
//! `Automation` traits.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod automation;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ipc;
pub mod keywords;
pub mod provider;
pub mod text;

// Convenience re-exports for downstream crates
pub use automation::{Automation, AutomationHandle, KeyChord, KeyCode, Modifiers};
pub use commands::{CommandAction, CommandCandidate};
pub use config::{DictationMode, EngineSettings, SettingsHandle};
pub use engine::{EngineInput, TurnDispatcher, VoiceflowEngine};
pub use error::VoiceflowError;
pub use ipc::events::{
    EngineEvent, EngineStatus, EngineStatusEvent, ListeningMode, ProviderEvent, TranscriptTurn,
    Word,
};
pub use provider::{ProviderHandle, StubProvider, TranscriptProvider};
