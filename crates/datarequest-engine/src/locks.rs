//! Per-request mutation locks.
//!
//! Every status change, provenance write and reviewer transfer of one
//! request happens while holding that request's [`RequestGuard`]. Different
//! requests never contend. An entry lives only while some task holds or
//! waits for its lock.

use std::sync::Arc;

use dashmap::DashMap;
use datarequest_types::RequestId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Registry = DashMap<RequestId, Arc<Mutex<()>>>;

/// Registry of one async mutex per request id.
#[derive(Default)]
pub struct RequestLocks {
    locks: Arc<Registry>,
}

impl RequestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: RequestId) -> RequestGuard {
        // Clone the Arc out so the shard lock is released before awaiting.
        let mutex = self.locks.entry(id).or_default().clone();
        RequestGuard {
            id,
            guard: Some(mutex.lock_owned().await),
            registry: self.locks.clone(),
        }
    }

    /// Number of requests currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Proof of exclusive access to one request.
pub struct RequestGuard {
    id: RequestId,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<Registry>,
}

impl RequestGuard {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone, so a count of one means the
        // registry is the last owner.
        self.registry
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl std::fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGuard").field("id", &self.id).finish()
    }
}
