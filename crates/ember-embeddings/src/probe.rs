//! Readiness state shared by the remote providers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ember_core::error::{EmberError, EmberResult};

const PROBE_TEXT: &str = "dimension probe";

/// Dimension and availability learned by embedding a probe text.
#[derive(Debug)]
pub(crate) struct ProbeState {
    dimension: AtomicUsize,
    available: AtomicBool,
}

impl ProbeState {
    pub(crate) fn new(configured_dimension: usize) -> Self {
        Self {
            dimension: AtomicUsize::new(configured_dimension),
            available: AtomicBool::new(false),
        }
    }

    pub(crate) fn text() -> &'static str {
        PROBE_TEXT
    }

    /// Record the probe result. An empty vector leaves the provider unavailable.
    pub(crate) fn record(&self, provider: &str, probe: EmberResult<Vec<f32>>) -> EmberResult<()> {
        let vector = probe?;
        if vector.is_empty() {
            self.available.store(false, Ordering::Release);
            return Err(EmberError::provider_unavailable(format!(
                "{} returned an empty probe embedding",
                provider
            )));
        }
        self.dimension.store(vector.len(), Ordering::Release);
        self.available.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Acquire)
    }

    pub(crate) fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}
