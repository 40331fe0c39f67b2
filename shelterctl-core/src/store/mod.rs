//! Store ports
//!
//! Each backing store exposes the same CRUD surface per record type through
//! [`Repository`]. A [`StoreHandle`] bundles the pet and shelter repositories
//! of one store; the coordinator holds one handle per store and the stores
//! never see each other.

pub mod fault;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{Pet, PetFilter, Shelter, ShelterFilter};

pub use fault::FaultPlan;
pub use memory::{JoinedShelters, MemoryRepository, MemoryStore};

/// Which of the two stores a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKind {
    /// Document store (MongoDB)
    Document,
    /// Relational store (PostgreSQL)
    Relational,
}

impl StoreKind {
    /// Label used as the key in dual-keyed responses
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document => "MongoDB",
            Self::Relational => "PostgreSQL",
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Document, Self::Relational]
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One physical write issued as part of a logical operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTarget {
    pub store: StoreKind,
    pub resource: &'static str,
    pub id: Uuid,
}

impl WriteTarget {
    pub fn new(store: StoreKind, resource: &'static str, id: Uuid) -> Self {
        Self {
            store,
            resource,
            id,
        }
    }
}

impl fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.store, self.resource, self.id)
    }
}

/// A record type both stores can hold
pub trait Record: Clone + Send + Sync + 'static {
    type Filter: Clone + Default + fmt::Debug + Send + Sync;

    /// Resource name used in errors and logs
    const RESOURCE: &'static str;

    fn id(&self) -> Uuid;

    fn matches(&self, filter: &Self::Filter) -> bool;
}

impl Record for Pet {
    type Filter = PetFilter;
    const RESOURCE: &'static str = "pet";

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, filter: &PetFilter) -> bool {
        filter.matches(self)
    }
}

impl Record for Shelter {
    type Filter = ShelterFilter;
    const RESOURCE: &'static str = "shelter";

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, filter: &ShelterFilter) -> bool {
        filter.matches(self)
    }
}

/// CRUD accessor for one record type in one store.
///
/// Implementations are thin wrappers around a driver; they hold no
/// cross-store logic.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// Get a record by id. Returns None if absent.
    async fn get(&self, id: Uuid) -> StoreResult<Option<T>>;

    async fn get_all(&self) -> StoreResult<Vec<T>>;

    async fn find(&self, filter: &T::Filter) -> StoreResult<Vec<T>>;

    async fn create(&self, record: &T) -> StoreResult<()>;

    /// Insert many records. An empty slice is a no-op.
    async fn create_many(&self, records: &[T]) -> StoreResult<()>;

    /// Replace a record by id. Returns false if nothing matched.
    async fn update(&self, record: &T) -> StoreResult<bool>;

    /// Replace many records. Returns the number matched.
    async fn update_many(&self, records: &[T]) -> StoreResult<u64>;

    /// Delete by id. Returns true if a record was removed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Delete everything. Returns the number removed.
    async fn delete_all(&self) -> StoreResult<u64>;
}

/// The pet and shelter repositories of one store
#[derive(Clone)]
pub struct StoreHandle {
    pets: Arc<dyn Repository<Pet>>,
    shelters: Arc<dyn Repository<Shelter>>,
}

impl StoreHandle {
    pub fn new(pets: Arc<dyn Repository<Pet>>, shelters: Arc<dyn Repository<Shelter>>) -> Self {
        Self { pets, shelters }
    }

    pub fn pets(&self) -> &Arc<dyn Repository<Pet>> {
        &self.pets
    }

    pub fn shelters(&self) -> &Arc<dyn Repository<Shelter>> {
        &self.shelters
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}

/// Access to the repository for `T` inside a handle, so generic code can
/// address pets and shelters uniformly.
pub trait HasRepository<T: Record> {
    fn repo(&self) -> &Arc<dyn Repository<T>>;
}

impl HasRepository<Pet> for StoreHandle {
    fn repo(&self) -> &Arc<dyn Repository<Pet>> {
        &self.pets
    }
}

impl HasRepository<Shelter> for StoreHandle {
    fn repo(&self) -> &Arc<dyn Repository<Shelter>> {
        &self.shelters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_response_keys() {
        assert_eq!(StoreKind::Document.to_string(), "MongoDB");
        assert_eq!(StoreKind::Relational.to_string(), "PostgreSQL");
    }

    #[test]
    fn write_target_display() {
        let target = WriteTarget::new(StoreKind::Relational, "shelter", Uuid::nil());
        assert_eq!(
            target.to_string(),
            "PostgreSQL shelter 00000000-0000-0000-0000-000000000000"
        );
    }
}
