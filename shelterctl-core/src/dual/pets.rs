//! Pet operations, including shelter assignment

use std::collections::BTreeSet;

use uuid::Uuid;

use super::fanout::WriteSet;
use super::locks::RecordGuard;
use super::{creation_timestamp, DualStore, DualView};
use crate::error::{CoordinatorError, Result};
use crate::model::{Pet, PetFilter, PetInput, Shelter};

impl DualStore {
    /// List pets from both stores side by side. No cross-store reconciliation.
    pub async fn list_pets(&self, filter: &PetFilter) -> Result<DualView<Vec<Pet>>> {
        self.fetch_all::<Pet>(filter, filter.is_empty()).await
    }

    /// Read one pet from both stores. NotFound only if neither has it.
    pub async fn get_pet(&self, id: Uuid) -> Result<DualView<Option<Pet>>> {
        self.fetch_pet(id).await?.require(id)
    }

    /// Create a pet in both stores under one identity and timestamp.
    ///
    /// With a shelter reference the shelter must exist and have room; the pet
    /// joins its membership in the same write set.
    pub async fn create_pet(&self, input: PetInput) -> Result<DualView<Pet>> {
        let pet = Pet::new(Uuid::new_v4(), creation_timestamp(), input);

        let _guard = match pet.shelter_id {
            Some(shelter_id) => Some(self.locks.lock(shelter_id).await),
            None => None,
        };

        let mut writes = WriteSet::new("create pet");
        if let Some(shelter_id) = pet.shelter_id {
            let mut shelters = self.fetch_shelter(shelter_id).await?.require(shelter_id)?;
            ensure_room(&shelters, pet.id, shelter_id)?;
            for (kind, shelter) in shelters.copies_mut() {
                shelter.add_member(pet.id);
                writes.update(kind, self.stores.get(kind).shelters(), shelter.clone());
            }
        }
        for (kind, handle) in self.stores.iter() {
            writes.create(kind, handle.pets(), pet.clone());
        }
        writes.commit().await?;

        tracing::info!(pet_id = %pet.id, shelter_id = ?pet.shelter_id, "pet created");
        Ok(DualView::splat(pet))
    }

    /// Update the descriptive fields of every existing copy.
    ///
    /// A changed shelter reference is applied first, through assignment or
    /// removal, so a rejected move leaves the pet untouched. The whole update
    /// runs under the pet's lock and the locks of every shelter involved, so
    /// a concurrent assignment cannot be overwritten from a stale read.
    pub async fn update_pet(&self, id: Uuid, input: PetInput) -> Result<()> {
        let (_guard, pets) = self.lock_pet(id, input.shelter_id).await?;
        let current = pets.primary().and_then(|p| p.shelter_id);

        let mut pets = if current != input.shelter_id {
            match input.shelter_id {
                Some(target) => self.assign_locked(id, target).await?,
                None => {
                    for old in referenced_shelters(&pets) {
                        self.detach_locked(id, old).await?;
                    }
                    self.fetch_pet(id).await?.require(id)?
                }
            }
        } else {
            pets
        };

        let mut writes = WriteSet::new("update pet");
        for (kind, pet) in pets.copies_mut() {
            pet.apply(&input);
            writes.update(kind, self.stores.get(kind).pets(), pet.clone());
        }
        writes.commit().await?;

        tracing::info!(pet_id = %id, "pet updated");
        Ok(())
    }

    /// Delete a pet from every store holding it.
    ///
    /// Shelter membership is cleared first, so no shelter is left listing a
    /// pet that no longer exists. The shelter locks stay held until the pet
    /// is gone.
    pub async fn delete_pet(&self, id: Uuid) -> Result<()> {
        let (_guard, pets) = self.lock_pet(id, None).await?;

        for shelter_id in referenced_shelters(&pets) {
            match self.detach_locked(id, shelter_id).await {
                Ok(()) => {}
                Err(CoordinatorError::NotFound { .. } | CoordinatorError::NotMember { .. }) => {
                    tracing::warn!(
                        pet_id = %id,
                        %shelter_id,
                        "pet referenced a shelter that does not list it; deleting anyway"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let mut writes = WriteSet::new("delete pet");
        for (kind, _) in pets.copies() {
            writes.delete::<Pet>(kind, self.stores.get(kind).pets(), id);
        }
        writes.commit().await?;

        tracing::info!(pet_id = %id, "pet deleted");
        Ok(())
    }

    /// Put a pet into a shelter, in both stores.
    ///
    /// Rejects with NotFound if the pet or shelter exists in neither store and
    /// with ShelterFull if any shelter copy is at capacity. A pet moving from
    /// another shelter is detached from it in the same write set. Assigning a
    /// pet to the shelter it is already in changes nothing.
    pub async fn assign_to_shelter(
        &self,
        pet_id: Uuid,
        shelter_id: Uuid,
    ) -> Result<DualView<Option<Pet>>> {
        let (_guard, _) = self.lock_pet(pet_id, Some(shelter_id)).await?;
        self.assign_locked(pet_id, shelter_id).await
    }

    /// Take a pet out of a shelter, in both stores.
    ///
    /// NotFound if the pet or shelter exists in neither store, NotMember if
    /// neither side records the membership. No writes happen in either case.
    pub async fn remove_from_shelter(&self, pet_id: Uuid, shelter_id: Uuid) -> Result<()> {
        let (_guard, _) = self.lock_pet(pet_id, Some(shelter_id)).await?;
        self.detach_locked(pet_id, shelter_id).await
    }

    /// Lock a pet together with every shelter it references plus `extra`,
    /// then read it again under the locks.
    ///
    /// The referenced shelters can change between the first read and the
    /// lock. If the fresh read points somewhere that was not locked, the
    /// locks are released and taken again for the new set.
    async fn lock_pet(
        &self,
        pet_id: Uuid,
        extra: Option<Uuid>,
    ) -> Result<(RecordGuard, DualView<Option<Pet>>)> {
        let mut pets = self.fetch_pet(pet_id).await?.require(pet_id)?;
        loop {
            let mut held = referenced_shelters(&pets);
            held.extend(extra);
            let guard = self
                .locks
                .lock_all(held.iter().copied().chain([pet_id]))
                .await;

            let fresh = self.fetch_pet(pet_id).await?.require(pet_id)?;
            if referenced_shelters(&fresh).is_subset(&held) {
                return Ok((guard, fresh));
            }
            tracing::debug!(%pet_id, "pet changed shelters while waiting for the lock");
            drop(guard);
            pets = fresh;
        }
    }

    /// Assignment body. The caller holds the pet, the target shelter and
    /// every shelter the pet references.
    async fn assign_locked(&self, pet_id: Uuid, shelter_id: Uuid) -> Result<DualView<Option<Pet>>> {
        let (pets, shelters) = futures::join!(self.fetch_pet(pet_id), self.fetch_shelter(shelter_id));
        let mut pets = pets?.require(pet_id)?;
        let mut shelters = shelters?.require(shelter_id)?;

        let already_assigned = pets.copies().all(|(_, p)| p.shelter_id == Some(shelter_id))
            && shelters.copies().all(|(_, s)| s.has_member(pet_id));
        if already_assigned {
            return Ok(pets);
        }

        ensure_room(&shelters, pet_id, shelter_id)?;
        let moving_from = previous_shelters(&pets, shelter_id);

        let mut writes = WriteSet::new("assign pet to shelter");
        for (kind, pet) in pets.copies_mut() {
            pet.shelter_id = Some(shelter_id);
            writes.update(kind, self.stores.get(kind).pets(), pet.clone());
        }
        for (kind, shelter) in shelters.copies_mut() {
            if shelter.add_member(pet_id) {
                writes.update(kind, self.stores.get(kind).shelters(), shelter.clone());
            }
        }

        for old_id in moving_from {
            let mut old = self.fetch_shelter(old_id).await?;
            for (kind, shelter) in old.copies_mut() {
                if shelter.remove_member(pet_id) {
                    writes.update(kind, self.stores.get(kind).shelters(), shelter.clone());
                }
            }
        }

        writes.commit().await?;

        tracing::info!(%pet_id, %shelter_id, "pet assigned to shelter");
        Ok(pets)
    }

    /// Removal body. The caller holds the pet and the shelter.
    async fn detach_locked(&self, pet_id: Uuid, shelter_id: Uuid) -> Result<()> {
        let (pets, shelters) = futures::join!(self.fetch_pet(pet_id), self.fetch_shelter(shelter_id));
        let mut pets = pets?.require(pet_id)?;
        let mut shelters = shelters?.require(shelter_id)?;

        let is_member = pets.copies().any(|(_, p)| p.shelter_id == Some(shelter_id))
            || shelters.copies().any(|(_, s)| s.has_member(pet_id));
        if !is_member {
            return Err(CoordinatorError::NotMember { pet_id, shelter_id });
        }

        let mut writes = WriteSet::new("remove pet from shelter");
        for (kind, pet) in pets.copies_mut() {
            if pet.shelter_id == Some(shelter_id) {
                pet.shelter_id = None;
                writes.update(kind, self.stores.get(kind).pets(), pet.clone());
            }
        }
        for (kind, shelter) in shelters.copies_mut() {
            if shelter.remove_member(pet_id) {
                writes.update(kind, self.stores.get(kind).shelters(), shelter.clone());
            }
        }
        writes.commit().await?;

        tracing::info!(%pet_id, %shelter_id, "pet removed from shelter");
        Ok(())
    }
}

impl DualStore {
    /// Replace every pet in both stores with `pets`.
    ///
    /// Shelter member lists are emptied along with the wipe so no shelter
    /// keeps listing a pet that is gone. Callers supply ids and timestamps;
    /// replacement pets are stored unassigned.
    pub async fn replace_pets(&self, mut pets: Vec<Pet>) -> Result<()> {
        for pet in &mut pets {
            pet.shelter_id = None;
        }
        let shelters = self.fetch_all::<Shelter>(&Default::default(), true).await?;
        let _guard = self
            .locks
            .lock_all(shelters.iter().flat_map(|(_, list)| list.iter().map(|s| s.id)))
            .await;

        let mut wipe = WriteSet::new("wipe pets");
        for (kind, handle) in self.stores.iter() {
            wipe.delete_all::<Pet>(kind, handle.pets());
            let emptied: Vec<Shelter> = shelters
                .get(kind)
                .iter()
                .filter(|s| !s.pet_ids.is_empty())
                .cloned()
                .map(|mut s| {
                    s.pet_ids.clear();
                    s
                })
                .collect();
            wipe.update_many(kind, handle.shelters(), emptied);
        }
        wipe.commit().await?;

        let count = pets.len();
        let mut insert = WriteSet::new("bulk insert pets");
        for (kind, handle) in self.stores.iter() {
            insert.create_many(kind, handle.pets(), pets.clone());
        }
        insert.commit().await?;

        tracing::info!(count, "pets replaced in both stores");
        Ok(())
    }
}

/// Reject if any existing shelter copy has no room for `pet_id`.
fn ensure_room(shelters: &DualView<Option<Shelter>>, pet_id: Uuid, shelter_id: Uuid) -> Result<()> {
    for (kind, shelter) in shelters.copies() {
        if !shelter.has_member(pet_id) && shelter.is_full() {
            tracing::info!(
                %shelter_id,
                store = %kind,
                occupancy = shelter.occupancy(),
                capacity = shelter.capacity,
                "shelter is full"
            );
            return Err(CoordinatorError::ShelterFull {
                shelter_id,
                capacity: shelter.capacity,
            });
        }
    }
    Ok(())
}

/// Shelters any copy of the pet references
fn referenced_shelters(pets: &DualView<Option<Pet>>) -> BTreeSet<Uuid> {
    pets.copies().filter_map(|(_, p)| p.shelter_id).collect()
}

/// Shelters the pet currently references, other than `target`
fn previous_shelters(pets: &DualView<Option<Pet>>, target: Uuid) -> BTreeSet<Uuid> {
    let mut shelters = referenced_shelters(pets);
    shelters.remove(&target);
    shelters
}
