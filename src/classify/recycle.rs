//! Periodic model unload to bound backend memory over long runs.

use tracing::{info, warn};

use crate::llm::InferenceBackend;

/// Result of [`ContextRecycler::record_success`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecycleOutcome {
    /// Interval not reached (or recycling disabled).
    NotDue,
    /// Model unloaded.
    Recycled,
    /// Unload attempted and failed; the counter was still reset.
    Failed(String),
}

/// Counts successful classifications and unloads the model every `every_n`.
#[derive(Debug, Clone)]
pub struct ContextRecycler {
    every_n: u32,
    since_last: u32,
}

impl ContextRecycler {
    /// `every_n == 0` disables recycling.
    pub fn new(every_n: u32) -> Self {
        Self {
            every_n,
            since_last: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.every_n > 0
    }

    /// Successful classifications since the last recycle.
    pub fn since_last(&self) -> u32 {
        self.since_last
    }

    /// Count one successful classification and unload the model if the
    /// interval has been reached.
    pub async fn record_success(&mut self, backend: &dyn InferenceBackend) -> RecycleOutcome {
        if !self.is_enabled() {
            return RecycleOutcome::NotDue;
        }

        self.since_last += 1;
        if self.since_last < self.every_n {
            return RecycleOutcome::NotDue;
        }
        self.since_last = 0;

        match backend.unload().await {
            Ok(()) => {
                info!(
                    "Unloaded {} after {} classifications",
                    backend.model(),
                    self.every_n
                );
                RecycleOutcome::Recycled
            }
            Err(e) => {
                warn!("Context recycle failed (continuing): {}", e);
                RecycleOutcome::Failed(e.to_string())
            }
        }
    }
}
