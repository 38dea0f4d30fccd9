//! Capacity gate: keeps concurrent engine use within its real capacity.
//!
//! Synchronous requests and task workers draw permits from the same gate, so
//! the engine is never oversubscribed no matter how work arrives.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use voxgate_core::GenerationError;

/// Shared counting gate in front of the synthesis engine.
#[derive(Debug, Clone)]
pub struct CapacityGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl CapacityGate {
    /// Create a gate admitting `capacity` concurrent engine calls.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a permit, giving up if `cancel` fires first.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<OwnedSemaphorePermit, GenerationError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(GenerationError::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|_| GenerationError::Worker("capacity gate closed".into()))
            }
        }
    }
}
