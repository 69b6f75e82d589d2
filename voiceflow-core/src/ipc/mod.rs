//! Serde types crossing the engine boundary.
//!
//! Providers push `ProviderEvent`s in; the engine broadcasts `EngineEvent`s
//! and `EngineStatusEvent`s out.

pub mod events;
