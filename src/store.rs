//! Single-slot store for the latest snapshot.
//!
//! The writer replaces the whole [`Snapshot`] and readers copy the whole
//! value out, so a reader sees either the previous or the new snapshot,
//! never a mix. The lock is only held for a fixed-size copy.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::Snapshot;

/// Read-side contract for presentation layers (HTTP routes, console output).
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Copy of the latest snapshot, `None` before the first successful tick
    async fn read_snapshot(&self) -> Option<Snapshot>;
}

#[derive(Debug, Clone, Default)]
pub struct StatsStore {
    slot: Arc<RwLock<Option<Snapshot>>>,
}

impl StatsStore {
    /// Create an empty store ("no data yet")
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot
    pub async fn write(&self, snapshot: Snapshot) {
        *self.slot.write().await = Some(snapshot);
        trace!("stored snapshot of tick {}", snapshot.tick);
    }

    /// Copy of the current snapshot
    pub async fn read(&self) -> Option<Snapshot> {
        *self.slot.read().await
    }
}

#[async_trait]
impl SnapshotReader for StatsStore {
    async fn read_snapshot(&self) -> Option<Snapshot> {
        self.read().await
    }
}
