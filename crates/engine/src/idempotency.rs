use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ticketsmith_kernel::task::IdempotencyKey;
use tracing::info;

// ---------------------------------------------------------------------------
// AdmissionStore trait
// ---------------------------------------------------------------------------

/// Admission control for runs, keyed by (ticket, repository).
///
/// `admit` must be an atomic check-and-set: at most one holder per key at a
/// time, never a read-then-write pair. `release` clears the admission
/// unconditionally and is idempotent on unadmitted keys. The admission wraps
/// the *entire* run, so a still-running task keeps blocking duplicates.
pub trait AdmissionStore: Send + Sync {
    fn admit(&self, key: &IdempotencyKey) -> bool;
    fn release(&self, key: &IdempotencyKey);
}

// ---------------------------------------------------------------------------
// InMemoryAdmissions — single-instance backend
// ---------------------------------------------------------------------------

/// In-process admission store.
///
/// Each admission carries a deadline equal to the maximum plausible run
/// duration, so an admission leaked by a crash mid-run expires instead of
/// blocking the key forever. Multi-instance deployments want a shared keyed
/// store with the same check-and-set + TTL contract instead.
pub struct InMemoryAdmissions {
    ttl: Duration,
    admitted: Mutex<HashMap<IdempotencyKey, Instant>>,
}

impl InMemoryAdmissions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            admitted: Mutex::new(HashMap::new()),
        }
    }
}

impl AdmissionStore for InMemoryAdmissions {
    fn admit(&self, key: &IdempotencyKey) -> bool {
        let now = Instant::now();
        let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
        admitted.retain(|_, deadline| *deadline > now);

        if admitted.contains_key(key) {
            info!(key = %key, "duplicate run rejected, key already admitted");
            return false;
        }
        admitted.insert(key.clone(), now + self.ttl);
        true
    }

    fn release(&self, key: &IdempotencyKey) {
        let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
        admitted.remove(key);
    }
}
