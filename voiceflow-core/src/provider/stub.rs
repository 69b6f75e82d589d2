//! `StubProvider`: placeholder backend with no network connection.
//!
//! Counts finalize requests and forwarded samples so force-end behaviour can
//! be observed in tests and in the replay host, where turns come from a
//! recording instead of a live session.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tracing::debug;

use super::TranscriptProvider;
use crate::error::Result;

#[derive(Clone, Default)]
pub struct StubProvider {
    finalize_requests: Arc<AtomicUsize>,
    samples_forwarded: Arc<AtomicUsize>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finalize_requests(&self) -> usize {
        self.finalize_requests.load(Ordering::Relaxed)
    }

    pub fn samples_forwarded(&self) -> usize {
        self.samples_forwarded.load(Ordering::Relaxed)
    }
}

impl TranscriptProvider for StubProvider {
    fn request_finalize(&mut self) -> Result<()> {
        let n = self.finalize_requests.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(requests = n, "StubProvider::request_finalize");
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> Result<()> {
        self.samples_forwarded
            .fetch_add(samples.len(), Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_shared_between_clones() {
        let stub = StubProvider::new();
        let mut handle_side = stub.clone();
        handle_side.request_finalize().unwrap();
        handle_side.push_audio(&[0.0; 320]).unwrap();
        assert_eq!(stub.finalize_requests(), 1);
        assert_eq!(stub.samples_forwarded(), 320);
    }
}
