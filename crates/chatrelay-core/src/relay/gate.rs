//! Per-connection turn serialization.
//!
//! One connection runs one generate turn at a time: a second frame arriving
//! mid-generation waits for the first to finish instead of interleaving
//! chunks on the socket. Different connections never contend.

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use std::sync::Arc;

/// Keyed mutex map, one lock per live connection.
#[derive(Debug, Default)]
pub struct TurnGate {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TurnGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the turn lock for a connection, waiting behind any turn
    /// already in flight. The guard releases on drop.
    pub async fn acquire(&self, connection_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(connection_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop a connection's lock entry after the transport tears it down.
    /// A turn still holding the guard keeps its own Arc alive and finishes
    /// normally.
    pub fn release_connection(&self, connection_id: &str) {
        self.locks.remove(connection_id);
    }
}
