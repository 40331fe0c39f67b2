//! In-memory store for tests and local runs
//!
//! Records are kept in insertion order so listings are deterministic. Every
//! call consults a shared [`FaultPlan`] first and counts writes, so tests can
//! assert that an operation "performs no writes".
//!
//! The relational flavour keeps membership the way the PostgreSQL tables do:
//! a shelter's `pet_ids` is derived from the pet rows on every read and is
//! dropped on write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::fault::{Access, FaultPlan};
use super::{Record, Repository, StoreHandle, StoreKind};
use crate::error::{StoreError, StoreResult};
use crate::model::{Pet, Shelter, ShelterFilter};

/// In-memory repository for one record type
#[derive(Debug, Clone)]
pub struct MemoryRepository<T> {
    kind: StoreKind,
    records: Arc<RwLock<Vec<T>>>,
    faults: FaultPlan,
    writes: Arc<AtomicUsize>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new(kind: StoreKind) -> Self {
        Self::with_faults(kind, FaultPlan::new())
    }

    /// Create a repository sharing an existing fault plan.
    pub fn with_faults(kind: StoreKind, faults: FaultPlan) -> Self {
        Self {
            kind,
            records: Arc::new(RwLock::new(Vec::new())),
            faults,
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Writes that reached the store (successful or not past the fault check).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Record count, bypassing faults.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct read, bypassing faults and latency.
    pub fn peek(&self, id: Uuid) -> Option<T> {
        self.records
            .read()
            .ok()
            .and_then(|r| r.iter().find(|rec| rec.id() == id).cloned())
    }

    /// Direct insert, bypassing faults. Used to stage torn states in tests.
    pub fn seed(&self, record: T) {
        if let Ok(mut records) = self.records.write() {
            records.retain(|r| r.id() != record.id());
            records.push(record);
        }
    }

    /// Direct removal, bypassing faults. Used to stage torn states in tests.
    pub fn evict(&self, id: Uuid) -> Option<T> {
        let mut records = self.records.write().ok()?;
        let index = records.iter().position(|r| r.id() == id)?;
        Some(records.remove(index))
    }

    async fn enter(&self, access: Access, operation: &str) -> StoreResult<()> {
        if let Some(latency) = self.faults.latency() {
            tokio::time::sleep(latency).await;
        }

        if let Some(reason) = self.faults.check(access, operation) {
            tracing::debug!(store = %self.kind, operation, "{}", reason);
            return Err(StoreError::unavailable(self.kind, reason));
        }

        if access == Access::Write {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn read_guard(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Vec<T>>> {
        self.records
            .read()
            .map_err(|_| StoreError::unavailable(self.kind, "poisoned lock"))
    }

    fn write_guard(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Vec<T>>> {
        self.records
            .write()
            .map_err(|_| StoreError::unavailable(self.kind, "poisoned lock"))
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn get(&self, id: Uuid) -> StoreResult<Option<T>> {
        self.enter(Access::Read, "get").await?;
        let records = self.read_guard()?;
        Ok(records.iter().find(|r| r.id() == id).cloned())
    }

    async fn get_all(&self) -> StoreResult<Vec<T>> {
        self.enter(Access::Read, "get_all").await?;
        Ok(self.read_guard()?.clone())
    }

    async fn find(&self, filter: &T::Filter) -> StoreResult<Vec<T>> {
        self.enter(Access::Read, "find").await?;
        let records = self.read_guard()?;
        Ok(records.iter().filter(|r| r.matches(filter)).cloned().collect())
    }

    async fn create(&self, record: &T) -> StoreResult<()> {
        self.enter(Access::Write, "create").await?;
        let mut records = self.write_guard()?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::unavailable(
                self.kind,
                format!("duplicate {} id {}", T::RESOURCE, record.id()),
            ));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn create_many(&self, new: &[T]) -> StoreResult<()> {
        if new.is_empty() {
            return Ok(());
        }
        self.enter(Access::Write, "create_many").await?;
        let mut records = self.write_guard()?;
        records.extend(new.iter().cloned());
        Ok(())
    }

    async fn update(&self, record: &T) -> StoreResult<bool> {
        self.enter(Access::Write, "update").await?;
        let mut records = self.write_guard()?;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_many(&self, updates: &[T]) -> StoreResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        self.enter(Access::Write, "update_many").await?;
        let mut records = self.write_guard()?;
        let mut matched = 0;
        for update in updates {
            if let Some(existing) = records.iter_mut().find(|r| r.id() == update.id()) {
                *existing = update.clone();
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        self.enter(Access::Write, "delete").await?;
        let mut records = self.write_guard()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        Ok(records.len() != before)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        self.enter(Access::Write, "delete_all").await?;
        let mut records = self.write_guard()?;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}

impl MemoryRepository<Pet> {
    /// Ids of pets whose row points at `shelter_id`, in insertion order.
    fn members_of(&self, shelter_id: Uuid) -> Vec<Uuid> {
        self.records
            .read()
            .map(|pets| {
                pets.iter()
                    .filter(|p| p.shelter_id == Some(shelter_id))
                    .map(|p| p.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Membership of every referenced shelter.
    fn membership(&self) -> HashMap<Uuid, Vec<Uuid>> {
        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        if let Ok(pets) = self.records.read() {
            for pet in pets.iter() {
                if let Some(shelter_id) = pet.shelter_id {
                    members.entry(shelter_id).or_default().push(pet.id);
                }
            }
        }
        members
    }

    /// Clear references to deleted shelters (`ON DELETE SET NULL`).
    fn release(&self, deleted: impl Fn(Uuid) -> bool) {
        if let Ok(mut pets) = self.records.write() {
            for pet in pets.iter_mut() {
                if pet.shelter_id.is_some_and(&deleted) {
                    pet.shelter_id = None;
                }
            }
        }
    }
}

/// Shelter table of the relational in-memory store.
///
/// Mirrors `PgShelterRepo`: membership comes from the pet rows, and a
/// shelter's `pet_ids` never reaches storage.
#[derive(Debug, Clone)]
pub struct JoinedShelters {
    shelters: MemoryRepository<Shelter>,
    pets: MemoryRepository<Pet>,
}

impl JoinedShelters {
    pub fn new(shelters: MemoryRepository<Shelter>, pets: MemoryRepository<Pet>) -> Self {
        Self { shelters, pets }
    }

    fn join(&self, mut shelter: Shelter) -> Shelter {
        shelter.pet_ids = self.pets.members_of(shelter.id);
        shelter
    }

    fn join_all(&self, shelters: Vec<Shelter>) -> Vec<Shelter> {
        let mut members = self.pets.membership();
        shelters
            .into_iter()
            .map(|mut s| {
                s.pet_ids = members.remove(&s.id).unwrap_or_default();
                s
            })
            .collect()
    }
}

/// Columns a relational shelter row stores
fn row(shelter: &Shelter) -> Shelter {
    Shelter {
        pet_ids: Vec::new(),
        ..shelter.clone()
    }
}

#[async_trait]
impl Repository<Shelter> for JoinedShelters {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Shelter>> {
        Ok(self.shelters.get(id).await?.map(|s| self.join(s)))
    }

    async fn get_all(&self) -> StoreResult<Vec<Shelter>> {
        Ok(self.join_all(self.shelters.get_all().await?))
    }

    async fn find(&self, filter: &ShelterFilter) -> StoreResult<Vec<Shelter>> {
        Ok(self.join_all(self.shelters.find(filter).await?))
    }

    async fn create(&self, record: &Shelter) -> StoreResult<()> {
        self.shelters.create(&row(record)).await
    }

    async fn create_many(&self, records: &[Shelter]) -> StoreResult<()> {
        let rows: Vec<_> = records.iter().map(row).collect();
        self.shelters.create_many(&rows).await
    }

    async fn update(&self, record: &Shelter) -> StoreResult<bool> {
        self.shelters.update(&row(record)).await
    }

    async fn update_many(&self, records: &[Shelter]) -> StoreResult<u64> {
        let rows: Vec<_> = records.iter().map(row).collect();
        self.shelters.update_many(&rows).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let deleted = self.shelters.delete(id).await?;
        if deleted {
            self.pets.release(|shelter_id| shelter_id == id);
        }
        Ok(deleted)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let removed = self.shelters.delete_all().await?;
        self.pets.release(|_| true);
        Ok(removed)
    }
}

/// Pet and shelter repositories of one in-memory store, sharing a fault plan
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub pets: MemoryRepository<Pet>,
    pub shelters: MemoryRepository<Shelter>,
    kind: StoreKind,
    faults: FaultPlan,
}

impl MemoryStore {
    pub fn new(kind: StoreKind) -> Self {
        let faults = FaultPlan::new();
        Self {
            pets: MemoryRepository::with_faults(kind, faults.clone()),
            shelters: MemoryRepository::with_faults(kind, faults.clone()),
            kind,
            faults,
        }
    }

    /// Direct shelter read as the store would answer it: stored membership
    /// for the document store, joined from pet rows for the relational one.
    pub fn shelter(&self, id: Uuid) -> Option<Shelter> {
        let shelter = self.shelters.peek(id)?;
        Some(match self.kind {
            StoreKind::Document => shelter,
            StoreKind::Relational => self.joined().join(shelter),
        })
    }

    fn joined(&self) -> JoinedShelters {
        JoinedShelters::new(self.shelters.clone(), self.pets.clone())
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Writes across both repositories
    pub fn write_count(&self) -> usize {
        self.pets.write_count() + self.shelters.write_count()
    }

    pub fn handle(&self) -> StoreHandle {
        let shelters: Arc<dyn Repository<Shelter>> = match self.kind {
            StoreKind::Document => Arc::new(self.shelters.clone()),
            StoreKind::Relational => Arc::new(self.joined()),
        };
        StoreHandle::new(Arc::new(self.pets.clone()), shelters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PetFilter, PetInput, ShelterInput};
    use chrono::Utc;

    fn pet(name: &str, species: &str) -> Pet {
        let input = PetInput::new(name, species, "Brown", 2, None).unwrap();
        Pet::new(Uuid::new_v4(), Utc::now(), input)
    }

    #[tokio::test]
    async fn crud_roundtrip() {
        let repo = MemoryRepository::<Pet>::new(StoreKind::Document);
        let mut rex = pet("Rex", "Dog");

        repo.create(&rex).await.unwrap();
        assert_eq!(repo.get(rex.id).await.unwrap(), Some(rex.clone()));

        rex.age = 4;
        assert!(repo.update(&rex).await.unwrap());
        assert_eq!(repo.get(rex.id).await.unwrap().unwrap().age, 4);

        assert!(repo.delete(rex.id).await.unwrap());
        assert!(!repo.delete(rex.id).await.unwrap());
        assert_eq!(repo.get(rex.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_of_missing_record_matches_nothing() {
        let repo = MemoryRepository::<Pet>::new(StoreKind::Relational);
        assert!(!repo.update(&pet("Ghost", "Cat")).await.unwrap());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn find_filters_and_keeps_order() {
        let repo = MemoryRepository::<Pet>::new(StoreKind::Document);
        let pets = vec![pet("A", "Dog"), pet("B", "Cat"), pet("C", "Dog")];
        repo.create_many(&pets).await.unwrap();

        let dogs = repo.find(&PetFilter::species("Dog")).await.unwrap();
        let names: Vec<_> = dogs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);

        assert_eq!(repo.delete_all().await.unwrap(), 3);
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_write_fault_leaves_data_untouched() {
        let store = MemoryStore::new(StoreKind::Relational);
        store.faults().fail_writes();

        let err = store.pets.create(&pet("Rex", "Dog")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { store: StoreKind::Relational, .. }));
        assert!(store.pets.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let repo = MemoryRepository::<Pet>::new(StoreKind::Document);
        let rex = pet("Rex", "Dog");
        repo.create(&rex).await.unwrap();
        assert!(repo.create(&rex).await.is_err());
    }

    fn shelter(capacity: i32) -> Shelter {
        let input = ShelterInput::new("Happy Paws", "Vienna", capacity).unwrap();
        Shelter::new(Uuid::new_v4(), Utc::now(), input)
    }

    #[tokio::test]
    async fn relational_membership_comes_from_pet_rows() {
        let store = MemoryStore::new(StoreKind::Relational);
        let handle = store.handle();

        // a stored member list that no pet row backs is ignored
        let mut paws = shelter(3);
        paws.pet_ids.push(Uuid::new_v4());
        handle.shelters().create(&paws).await.unwrap();
        assert!(store.shelters.peek(paws.id).unwrap().pet_ids.is_empty());
        assert_eq!(handle.shelters().get(paws.id).await.unwrap().unwrap().occupancy(), 0);

        let mut rex = pet("Rex", "Dog");
        rex.shelter_id = Some(paws.id);
        let tom = pet("Tom", "Cat");
        handle.pets().create_many(&[rex.clone(), tom]).await.unwrap();

        let joined = handle.shelters().get(paws.id).await.unwrap().unwrap();
        assert_eq!(joined.pet_ids, [rex.id]);
        assert_eq!(store.shelter(paws.id).unwrap().pet_ids, [rex.id]);

        let listed = handle.shelters().get_all().await.unwrap();
        assert_eq!(listed[0].pet_ids, [rex.id]);
    }

    #[tokio::test]
    async fn relational_shelter_delete_releases_pets() {
        let store = MemoryStore::new(StoreKind::Relational);
        let handle = store.handle();
        let paws = shelter(3);
        handle.shelters().create(&paws).await.unwrap();
        let mut rex = pet("Rex", "Dog");
        rex.shelter_id = Some(paws.id);
        handle.pets().create(&rex).await.unwrap();

        assert!(handle.shelters().delete(paws.id).await.unwrap());
        assert_eq!(store.pets.peek(rex.id).unwrap().shelter_id, None);
    }

    #[tokio::test]
    async fn document_membership_is_stored() {
        let store = MemoryStore::new(StoreKind::Document);
        let mut paws = shelter(3);
        let member = Uuid::new_v4();
        paws.pet_ids.push(member);
        store.handle().shelters().create(&paws).await.unwrap();

        assert_eq!(store.shelter(paws.id).unwrap().pet_ids, [member]);
    }
}
