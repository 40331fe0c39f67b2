//! Document store: MongoDB
//!
//! Collections `Pets` and `PetShelters` in one database. Ids are stored as
//! hyphenated UUID strings in `_id`, timestamps as BSON dates (millisecond
//! precision), and a shelter document embeds its member ids in `pets`.

pub mod pets;
pub mod shelters;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc};
use mongodb::{Client, Database, IndexModel};
use uuid::Uuid;

use shelterctl_core::{MongoSettings, StoreError, StoreHandle, StoreKind};

use crate::error::ServerResult;

pub use pets::MongoPetRepo;
pub use shelters::MongoShelterRepo;

pub const PETS_COLLECTION: &str = "Pets";
pub const SHELTERS_COLLECTION: &str = "PetShelters";

/// Connected document store
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect and verify the server answers a ping.
    pub async fn connect(settings: &MongoSettings) -> ServerResult<Self> {
        let uri = settings.connection_string()?;
        let client = Client::with_uri_str(&uri).await?;
        let store = Self {
            db: client.database(&settings.database),
        };
        store.ping().await?;
        tracing::info!(database = %settings.database, "connected to MongoDB");
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Create the lookup indexes used by filtered reads.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        let pets = self.db.collection::<bson::Document>(PETS_COLLECTION);
        for key in ["species", "shelterId"] {
            let mut keys = bson::Document::new();
            keys.insert(key, 1);
            pets.create_index(IndexModel::builder().keys(keys).build())
                .await?;
        }
        self.db
            .collection::<bson::Document>(SHELTERS_COLLECTION)
            .create_index(IndexModel::builder().keys(doc! { "location": 1 }).build())
            .await?;
        Ok(())
    }

    pub fn handle(&self) -> StoreHandle {
        StoreHandle::new(
            Arc::new(MongoPetRepo::new(&self.db)),
            Arc::new(MongoShelterRepo::new(&self.db)),
        )
    }
}

fn backend(e: mongodb::error::Error) -> StoreError {
    StoreError::backend(StoreKind::Document, e)
}

fn to_bson_date(ts: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(ts.timestamp_millis())
}

fn from_bson_date(
    resource: &'static str,
    id: &str,
    ts: bson::DateTime,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis()).ok_or_else(|| {
        StoreError::corrupt(StoreKind::Document, resource, id, "createdDate out of range")
    })
}

fn parse_id(resource: &'static str, id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|e| StoreError::corrupt(StoreKind::Document, resource, id, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    #[test]
    fn millisecond_timestamps_survive_bson() {
        let ts = Utc::now().trunc_subsecs(3);
        assert_eq!(from_bson_date("pet", "x", to_bson_date(ts)).unwrap(), ts);
    }

    #[test]
    fn bad_id_is_corrupt() {
        let err = parse_id("pet", "not-a-uuid").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { store: StoreKind::Document, .. }));
    }

    #[tokio::test]
    #[ignore = "requires MongoDB"]
    async fn connect_and_ping() {
        let settings = MongoSettings {
            uri: std::env::var("MONGODB_URI").ok(),
            ..MongoSettings::default()
        };
        let store = MongoStore::connect(&settings).await.expect("connect failed");
        store.ensure_indexes().await.expect("indexes failed");
    }
}
