//! Per-record serialization
//!
//! Capacity checks and membership edits read a record, decide, then write.
//! Two requests doing that concurrently for the same shelter can both pass the
//! check, and a pet rewritten from a stale read can undo a concurrent
//! assignment. Holding the record's lock across read-check-write closes that
//! gap for everything going through one coordinator. Shelter and pet ids share
//! one table since they never collide. Other processes writing the same
//! databases are not covered.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Prune idle entries once the table grows past this
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct RecordLocks {
    table: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

/// Held locks; released on drop
pub struct RecordGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock one record.
    pub async fn lock(&self, id: Uuid) -> RecordGuard {
        self.lock_all([id]).await
    }

    /// Lock several records. Ids are deduplicated and acquired in sorted
    /// order so two callers locking overlapping sets cannot deadlock. Locks
    /// are not reentrant: take everything an operation needs in one call.
    pub async fn lock_all(&self, ids: impl IntoIterator<Item = Uuid>) -> RecordGuard {
        let ordered: BTreeSet<Uuid> = ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for id in ordered {
            guards.push(self.entry(id).lock_owned().await);
        }
        RecordGuard { _guards: guards }
    }

    fn entry(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if table.len() > PRUNE_THRESHOLD {
            table.retain(|_, m| Arc::strong_count(m) > 1);
        }
        Arc::clone(table.entry(id).or_default())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or(0)
    }
}
