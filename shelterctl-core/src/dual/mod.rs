//! Dual-store coordinator
//!
//! Presents single logical CRUD operations over two physical copies:
//! - reads fan out to both stores concurrently and return a [`DualView`]
//! - writes are queued in a `WriteSet` and committed concurrently
//! - identity and creation time are assigned here, never by a store
//!
//! There is no cross-store transaction. A write that lands in one store and
//! fails in the other surfaces as `CoordinatorError::PartialWrite` and the
//! committed side stays in place.

mod fanout;
mod locks;
mod pets;
mod shelters;
mod view;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Pet, Shelter};
use crate::store::{HasRepository, MemoryStore, Record, StoreHandle, StoreKind};

pub use locks::{RecordGuard, RecordLocks};
pub use shelters::ShelterWithPets;
pub use view::DualView;

/// Coordinator over the document and relational stores
#[derive(Debug, Clone)]
pub struct DualStore {
    stores: DualView<StoreHandle>,
    locks: RecordLocks,
}

impl DualStore {
    pub fn new(document: StoreHandle, relational: StoreHandle) -> Self {
        Self {
            stores: DualView::new(document, relational),
            locks: RecordLocks::new(),
        }
    }

    /// Coordinator over two in-memory stores. The returned stores share state
    /// with the coordinator, for inspection and fault injection.
    pub fn in_memory() -> (Self, DualView<MemoryStore>) {
        let memory = DualView::new(
            MemoryStore::new(StoreKind::Document),
            MemoryStore::new(StoreKind::Relational),
        );
        let store = Self::new(memory.document.handle(), memory.relational.handle());
        (store, memory)
    }

    pub fn stores(&self) -> &DualView<StoreHandle> {
        &self.stores
    }

    /// Fetch one record from both stores concurrently.
    async fn fetch<T>(&self, id: Uuid) -> Result<DualView<Option<T>>>
    where
        T: Record,
        StoreHandle: HasRepository<T>,
    {
        let (document, relational) = futures::join!(
            HasRepository::<T>::repo(&self.stores.document).get(id),
            HasRepository::<T>::repo(&self.stores.relational).get(id),
        );
        Ok(DualView::new(document?, relational?))
    }

    /// Fetch a filtered (or full, for an empty filter) set from both stores.
    async fn fetch_all<T>(&self, filter: &T::Filter, everything: bool) -> Result<DualView<Vec<T>>>
    where
        T: Record,
        StoreHandle: HasRepository<T>,
    {
        let doc = HasRepository::<T>::repo(&self.stores.document);
        let rel = HasRepository::<T>::repo(&self.stores.relational);
        let (document, relational) = if everything {
            futures::join!(doc.get_all(), rel.get_all())
        } else {
            futures::join!(doc.find(filter), rel.find(filter))
        };
        Ok(DualView::new(document?, relational?))
    }

    async fn fetch_pet(&self, id: Uuid) -> Result<DualView<Option<Pet>>> {
        self.fetch::<Pet>(id).await
    }

    async fn fetch_shelter(&self, id: Uuid) -> Result<DualView<Option<Shelter>>> {
        self.fetch::<Shelter>(id).await
    }
}

/// Creation timestamp shared by both copies.
///
/// Truncated to milliseconds: BSON dates carry no finer precision, so both
/// stores round-trip the same value.
pub fn creation_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_millisecond_precision() {
        let ts = creation_timestamp();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
