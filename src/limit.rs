use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission gate bounding the number of simultaneously in-flight units.
///
/// A limit of 0 means unbounded: `acquire` returns immediately and no
/// permit is held. Waiters queue in arrival order and admit as soon as a
/// slot frees.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Option<Arc<Semaphore>>,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: (limit > 0).then(|| Arc::new(Semaphore::new(limit))),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.semaphore.is_some()
    }

    /// Wait for a slot. The returned permit, if any, frees the slot on drop.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.semaphore {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("gate semaphore is never closed"),
            ),
            None => None,
        }
    }
}
