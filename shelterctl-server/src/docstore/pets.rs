//! Pet collection

use async_trait::async_trait;
use futures::future::try_join_all;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shelterctl_core::model::{Pet, PetFilter};
use shelterctl_core::{Repository, StoreResult};

use super::{backend, from_bson_date, parse_id, to_bson_date, PETS_COLLECTION};

/// Pet as stored in `Pets`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub species: String,
    pub skin: String,
    pub age: i32,
    #[serde(default)]
    pub shelter_id: Option<String>,
    pub created_date: bson::DateTime,
}

impl From<&Pet> for PetDocument {
    fn from(p: &Pet) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            species: p.species.clone(),
            skin: p.skin.clone(),
            age: p.age,
            shelter_id: p.shelter_id.map(|id| id.to_string()),
            created_date: to_bson_date(p.created_at),
        }
    }
}

impl TryFrom<PetDocument> for Pet {
    type Error = shelterctl_core::StoreError;

    fn try_from(d: PetDocument) -> Result<Self, Self::Error> {
        let shelter_id = d
            .shelter_id
            .as_deref()
            .map(|id| parse_id("pet", id))
            .transpose()?;
        Ok(Self {
            id: parse_id("pet", &d.id)?,
            created_at: from_bson_date("pet", &d.id, d.created_date)?,
            name: d.name,
            species: d.species,
            skin: d.skin,
            age: d.age,
            shelter_id,
        })
    }
}

fn filter_doc(filter: &PetFilter) -> Document {
    let mut query = Document::new();
    if let Some(species) = &filter.species {
        query.insert("species", species.as_str());
    }
    if let Some(shelter_id) = filter.shelter_id {
        query.insert("shelterId", shelter_id.to_string());
    }
    query
}

fn by_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

#[derive(Debug, Clone)]
pub struct MongoPetRepo {
    pets: Collection<PetDocument>,
}

impl MongoPetRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            pets: db.collection(PETS_COLLECTION),
        }
    }
}

#[async_trait]
impl Repository<Pet> for MongoPetRepo {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Pet>> {
        self.pets
            .find_one(by_id(id))
            .await
            .map_err(backend)?
            .map(Pet::try_from)
            .transpose()
    }

    async fn get_all(&self) -> StoreResult<Vec<Pet>> {
        self.find(&PetFilter::default()).await
    }

    async fn find(&self, filter: &PetFilter) -> StoreResult<Vec<Pet>> {
        let docs: Vec<PetDocument> = self
            .pets
            .find(filter_doc(filter))
            .sort(doc! { "createdDate": 1, "_id": 1 })
            .await
            .map_err(backend)?
            .try_collect()
            .await
            .map_err(backend)?;
        docs.into_iter().map(Pet::try_from).collect()
    }

    async fn create(&self, pet: &Pet) -> StoreResult<()> {
        self.pets
            .insert_one(PetDocument::from(pet))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn create_many(&self, pets: &[Pet]) -> StoreResult<()> {
        if pets.is_empty() {
            return Ok(());
        }
        let docs: Vec<PetDocument> = pets.iter().map(PetDocument::from).collect();
        self.pets.insert_many(docs).await.map_err(backend)?;
        tracing::debug!(count = pets.len(), "inserted pet documents");
        Ok(())
    }

    async fn update(&self, pet: &Pet) -> StoreResult<bool> {
        let result = self
            .pets
            .replace_one(by_id(pet.id), PetDocument::from(pet))
            .await
            .map_err(backend)?;
        Ok(result.matched_count > 0)
    }

    async fn update_many(&self, pets: &[Pet]) -> StoreResult<u64> {
        let results = try_join_all(
            pets.iter()
                .map(|pet| async move { self.pets.replace_one(by_id(pet.id), PetDocument::from(pet)).await }),
        )
        .await
        .map_err(backend)?;
        Ok(results.iter().map(|r| r.matched_count).sum())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = self.pets.delete_one(by_id(id)).await.map_err(backend)?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = self.pets.delete_many(doc! {}).await.map_err(backend)?;
        Ok(result.deleted_count)
    }
}
