//! Sequence numbers for new entries.

use std::sync::Arc;

use tracing::debug;

use super::PipelineError;
use crate::store::DocumentStore;

/// Hands out `max(existing) + 1`, never the same number twice
pub struct SequenceAllocator {
    store: Arc<dyn DocumentStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn allocate(&self) -> Result<u64, PipelineError> {
        let no = self
            .store
            .next_sequence()
            .await
            .map_err(PipelineError::Sequence)?;
        debug!(no, "Sequence number allocated");
        Ok(no)
    }
}
