//! ASR provider abstraction.
//!
//! Providers push `ProviderEvent`s into the engine; the engine only calls
//! back to request early finalisation (force-end) and to pass audio through.
//! Connection management, retries and protocol framing stay on the provider
//! side of this trait.

pub mod stub;

pub use stub::StubProvider;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Contract for speech-recognition backends feeding the engine.
pub trait TranscriptProvider: Send + 'static {
    /// Ask the provider to close the current utterance now. The resulting
    /// end-of-turn arrives asynchronously as a normal turn.
    fn request_finalize(&mut self) -> Result<()>;

    /// Forward raw mono audio. Pass-through only.
    fn push_audio(&mut self, _samples: &[f32]) -> Result<()> {
        Ok(())
    }
}

/// Thread-safe reference-counted handle to any `TranscriptProvider`.
#[derive(Clone)]
pub struct ProviderHandle(pub Arc<Mutex<dyn TranscriptProvider>>);

impl ProviderHandle {
    pub fn new<P: TranscriptProvider>(provider: P) -> Self {
        Self(Arc::new(Mutex::new(provider)))
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle").finish_non_exhaustive()
    }
}
