//! Shelter collection. Member ids are embedded in `pets`.

use async_trait::async_trait;
use futures::future::try_join_all;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shelterctl_core::model::{Shelter, ShelterFilter};
use shelterctl_core::{Repository, StoreError, StoreResult};

use super::{backend, from_bson_date, parse_id, to_bson_date, SHELTERS_COLLECTION};

/// Shelter as stored in `PetShelters`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    pub created_date: bson::DateTime,
    #[serde(default)]
    pub pets: Vec<String>,
}

impl From<&Shelter> for ShelterDocument {
    fn from(s: &Shelter) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            location: s.location.clone(),
            capacity: s.capacity,
            created_date: to_bson_date(s.created_at),
            pets: s.pet_ids.iter().map(Uuid::to_string).collect(),
        }
    }
}

impl TryFrom<ShelterDocument> for Shelter {
    type Error = StoreError;

    fn try_from(d: ShelterDocument) -> Result<Self, Self::Error> {
        let pet_ids = d
            .pets
            .iter()
            .map(|id| parse_id("shelter", id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: parse_id("shelter", &d.id)?,
            created_at: from_bson_date("shelter", &d.id, d.created_date)?,
            name: d.name,
            location: d.location,
            capacity: d.capacity,
            pet_ids,
        })
    }
}

fn filter_doc(filter: &ShelterFilter) -> Document {
    match &filter.location {
        Some(location) => doc! { "location": location.as_str() },
        None => Document::new(),
    }
}

fn by_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

#[derive(Debug, Clone)]
pub struct MongoShelterRepo {
    shelters: Collection<ShelterDocument>,
}

impl MongoShelterRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            shelters: db.collection(SHELTERS_COLLECTION),
        }
    }
}

#[async_trait]
impl Repository<Shelter> for MongoShelterRepo {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Shelter>> {
        self.shelters
            .find_one(by_id(id))
            .await
            .map_err(backend)?
            .map(Shelter::try_from)
            .transpose()
    }

    async fn get_all(&self) -> StoreResult<Vec<Shelter>> {
        self.find(&ShelterFilter::default()).await
    }

    async fn find(&self, filter: &ShelterFilter) -> StoreResult<Vec<Shelter>> {
        let docs: Vec<ShelterDocument> = self
            .shelters
            .find(filter_doc(filter))
            .sort(doc! { "createdDate": 1, "_id": 1 })
            .await
            .map_err(backend)?
            .try_collect()
            .await
            .map_err(backend)?;
        docs.into_iter().map(Shelter::try_from).collect()
    }

    async fn create(&self, shelter: &Shelter) -> StoreResult<()> {
        self.shelters
            .insert_one(ShelterDocument::from(shelter))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn create_many(&self, shelters: &[Shelter]) -> StoreResult<()> {
        if shelters.is_empty() {
            return Ok(());
        }
        let docs: Vec<ShelterDocument> = shelters.iter().map(ShelterDocument::from).collect();
        self.shelters.insert_many(docs).await.map_err(backend)?;
        Ok(())
    }

    async fn update(&self, shelter: &Shelter) -> StoreResult<bool> {
        let result = self
            .shelters
            .replace_one(by_id(shelter.id), ShelterDocument::from(shelter))
            .await
            .map_err(backend)?;
        Ok(result.matched_count > 0)
    }

    async fn update_many(&self, shelters: &[Shelter]) -> StoreResult<u64> {
        let results = try_join_all(shelters.iter().map(|shelter| async move {
            self.shelters
                .replace_one(by_id(shelter.id), ShelterDocument::from(shelter))
                .await
        }))
        .await
        .map_err(backend)?;
        Ok(results.iter().map(|r| r.matched_count).sum())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = self.shelters.delete_one(by_id(id)).await.map_err(backend)?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = self.shelters.delete_many(doc! {}).await.map_err(backend)?;
        Ok(result.deleted_count)
    }
}
