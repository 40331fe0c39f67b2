//! Shelter repository
//!
//! Membership is not stored on the shelter row. Reads aggregate member ids
//! from `pets.shelter_id` with a LEFT JOIN, and writes ignore `pet_ids`:
//! the pet rows are the source of truth here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use shelterctl_core::model::{Shelter, ShelterFilter};
use shelterctl_core::{Repository, StoreResult};

use super::{backend, INSERT_CHUNK};

const SELECT_SHELTERS: &str = r#"
    SELECT
        s.id,
        s.name,
        s.location,
        s.capacity,
        s.created_at,
        COALESCE(
            array_agg(p.id ORDER BY p.created_at, p.id) FILTER (WHERE p.id IS NOT NULL),
            '{}'
        ) AS pet_ids
    FROM shelters s
    LEFT JOIN pets p ON p.shelter_id = s.id
"#;

/// Shelter row with aggregated member ids
#[derive(Debug, Clone, FromRow)]
struct ShelterRow {
    id: Uuid,
    name: String,
    location: String,
    capacity: i32,
    created_at: DateTime<Utc>,
    pet_ids: Vec<Uuid>,
}

impl From<ShelterRow> for Shelter {
    fn from(r: ShelterRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            location: r.location,
            capacity: r.capacity,
            created_at: r.created_at,
            pet_ids: r.pet_ids,
        }
    }
}

/// Shelter repository
#[derive(Debug, Clone)]
pub struct PgShelterRepo {
    pool: PgPool,
}

impl PgShelterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Shelter> for PgShelterRepo {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Shelter>> {
        let row = sqlx::query_as::<_, ShelterRow>(&format!(
            "{SELECT_SHELTERS} WHERE s.id = $1 GROUP BY s.id"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Shelter::from))
    }

    async fn get_all(&self) -> StoreResult<Vec<Shelter>> {
        self.find(&ShelterFilter::default()).await
    }

    async fn find(&self, filter: &ShelterFilter) -> StoreResult<Vec<Shelter>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_SHELTERS);
        if let Some(location) = &filter.location {
            qb.push(" WHERE s.location = ").push_bind(location.clone());
        }
        qb.push(" GROUP BY s.id ORDER BY s.created_at, s.id");

        let rows = qb
            .build_query_as::<ShelterRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Shelter::from).collect())
    }

    async fn create(&self, shelter: &Shelter) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shelters (id, name, location, capacity, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(shelter.id)
        .bind(&shelter.name)
        .bind(&shelter.location)
        .bind(shelter.capacity)
        .bind(shelter.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn create_many(&self, shelters: &[Shelter]) -> StoreResult<()> {
        if shelters.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        for chunk in shelters.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO shelters (id, name, location, capacity, created_at) ",
            );
            qb.push_values(chunk, |mut b, shelter| {
                b.push_bind(shelter.id)
                    .push_bind(shelter.name.clone())
                    .push_bind(shelter.location.clone())
                    .push_bind(shelter.capacity)
                    .push_bind(shelter.created_at);
            });
            qb.build().execute(&mut *tx).await.map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn update(&self, shelter: &Shelter) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE shelters SET name = $2, location = $3, capacity = $4 WHERE id = $1",
        )
        .bind(shelter.id)
        .bind(&shelter.name)
        .bind(&shelter.location)
        .bind(shelter.capacity)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_many(&self, shelters: &[Shelter]) -> StoreResult<u64> {
        if shelters.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut matched = 0;
        for shelter in shelters {
            let result = sqlx::query(
                "UPDATE shelters SET name = $2, location = $3, capacity = $4 WHERE id = $1",
            )
            .bind(shelter.id)
            .bind(&shelter.name)
            .bind(&shelter.location)
            .bind(shelter.capacity)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
            matched += result.rows_affected();
        }
        tx.commit().await.map_err(backend)?;
        Ok(matched)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM shelters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM shelters")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}
