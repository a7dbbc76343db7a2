//! Per-transaction lock registry for serializing notification processing.
//!
//! Gateways deliver notifications concurrently and redeliver on timeout. Two
//! deliveries for the same payment must not interleave their read-decide-write
//! cycles; deliveries for different payments must not block each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-payment-reference locks.
///
/// `acquire` hands out a guard that serializes processing for one payment
/// reference. Locks are created on first use and kept for the lifetime of
/// the registry.
// TODO: evict entries whose lock is no longer held; the map grows with the
// number of distinct payment references seen since startup
#[derive(Default)]
pub struct TransactionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TransactionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the exclusive lock for one payment reference.
    ///
    /// Guards for different references are independent; a second caller with
    /// the same reference waits until the first guard is dropped.
    pub async fn acquire(&self, external_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(external_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
