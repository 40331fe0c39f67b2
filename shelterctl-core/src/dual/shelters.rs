//! Shelter operations

use uuid::Uuid;

use super::fanout::WriteSet;
use super::{creation_timestamp, DualStore, DualView};
use crate::error::Result;
use crate::model::{
    Pet, PetFilter, Shelter, ShelterFilter, ShelterInput, ValidationError, MAX_CAPACITY,
};

/// A shelter copy and the pets that reference it, from one store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShelterWithPets {
    pub shelter: Option<Shelter>,
    pub pets: Vec<Pet>,
}

impl DualStore {
    pub async fn list_shelters(&self, filter: &ShelterFilter) -> Result<DualView<Vec<Shelter>>> {
        self.fetch_all::<Shelter>(filter, filter.is_empty()).await
    }

    pub async fn get_shelter(&self, id: Uuid) -> Result<DualView<Option<Shelter>>> {
        self.fetch_shelter(id).await?.require(id)
    }

    /// Create an empty shelter in both stores.
    pub async fn create_shelter(&self, input: ShelterInput) -> Result<DualView<Shelter>> {
        let shelter = Shelter::new(Uuid::new_v4(), creation_timestamp(), input);

        let mut writes = WriteSet::new("create shelter");
        for (kind, handle) in self.stores.iter() {
            writes.create(kind, handle.shelters(), shelter.clone());
        }
        writes.commit().await?;

        tracing::info!(shelter_id = %shelter.id, capacity = shelter.capacity, "shelter created");
        Ok(DualView::splat(shelter))
    }

    /// Update name, location and capacity of every existing copy.
    ///
    /// Capacity may not drop below the number of pets a copy already holds.
    pub async fn update_shelter(&self, id: Uuid, input: ShelterInput) -> Result<()> {
        let _guard = self.locks.lock(id).await;
        let mut shelters = self.fetch_shelter(id).await?.require(id)?;

        let occupancy = shelters
            .copies()
            .map(|(_, s)| s.occupancy())
            .max()
            .unwrap_or(0);
        if (input.capacity as i64) < occupancy as i64 {
            return Err(ValidationError::OutOfRange {
                field: "capacity",
                min: occupancy as i64,
                max: MAX_CAPACITY as i64,
                value: input.capacity as i64,
            }
            .into());
        }

        let mut writes = WriteSet::new("update shelter");
        for (kind, shelter) in shelters.copies_mut() {
            shelter.apply(&input);
            writes.update(kind, self.stores.get(kind).shelters(), shelter.clone());
        }
        writes.commit().await?;

        tracing::info!(shelter_id = %id, "shelter updated");
        Ok(())
    }

    /// Delete a shelter from every store holding it.
    ///
    /// Member pets stay, with their shelter reference cleared first.
    pub async fn delete_shelter(&self, id: Uuid) -> Result<()> {
        let _guard = self.locks.lock(id).await;
        let shelters = self.fetch_shelter(id).await?.require(id)?;

        let members = self.members(id).await?;
        let mut detach = WriteSet::new("detach shelter members");
        for (kind, pets) in members.iter() {
            let cleared: Vec<Pet> = pets
                .iter()
                .cloned()
                .map(|mut p| {
                    p.shelter_id = None;
                    p
                })
                .collect();
            detach.update_many(kind, self.stores.get(kind).pets(), cleared);
        }
        detach.commit().await?;

        let mut writes = WriteSet::new("delete shelter");
        for (kind, _) in shelters.copies() {
            writes.delete::<Shelter>(kind, self.stores.get(kind).shelters(), id);
        }
        writes.commit().await?;

        tracing::info!(
            shelter_id = %id,
            detached = members.document.len().max(members.relational.len()),
            "shelter deleted"
        );
        Ok(())
    }

    /// A shelter and its pets, per store.
    pub async fn shelter_with_pets(&self, id: Uuid) -> Result<DualView<ShelterWithPets>> {
        let (shelters, pets) = futures::join!(self.fetch_shelter(id), self.members(id));
        let shelters = shelters?.require(id)?;
        let pets = pets?;

        Ok(DualView::new(
            ShelterWithPets {
                shelter: shelters.document,
                pets: pets.document,
            },
            ShelterWithPets {
                shelter: shelters.relational,
                pets: pets.relational,
            },
        ))
    }

    /// Pets referencing `shelter_id`, per store
    async fn members(&self, shelter_id: Uuid) -> Result<DualView<Vec<Pet>>> {
        self.fetch_all::<Pet>(&PetFilter::in_shelter(shelter_id), false)
            .await
    }
}
