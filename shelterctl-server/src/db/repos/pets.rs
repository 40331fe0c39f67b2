//! Pet repository
//!
//! - find: optional WHERE clauses via QueryBuilder
//! - create_many: multi-row INSERT, chunked under the bind limit
//! - update_many: one transaction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use shelterctl_core::model::{Pet, PetFilter};
use shelterctl_core::{Repository, StoreResult};

use super::{backend, INSERT_CHUNK};

const SELECT_PETS: &str =
    "SELECT id, name, species, skin, age, shelter_id, created_at FROM pets";

/// Pet row from database
#[derive(Debug, Clone, FromRow)]
struct PetRow {
    id: Uuid,
    name: String,
    species: String,
    skin: String,
    age: i32,
    shelter_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<PetRow> for Pet {
    fn from(r: PetRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            species: r.species,
            skin: r.skin,
            age: r.age,
            shelter_id: r.shelter_id,
            created_at: r.created_at,
        }
    }
}

/// Pet repository
#[derive(Debug, Clone)]
pub struct PgPetRepo {
    pool: PgPool,
}

impl PgPetRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Pet> for PgPetRepo {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Pet>> {
        let row = sqlx::query_as::<_, PetRow>(&format!("{SELECT_PETS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(Pet::from))
    }

    async fn get_all(&self) -> StoreResult<Vec<Pet>> {
        self.find(&PetFilter::default()).await
    }

    async fn find(&self, filter: &PetFilter) -> StoreResult<Vec<Pet>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_PETS);
        let mut sep = " WHERE ";
        if let Some(species) = &filter.species {
            qb.push(sep).push("species = ").push_bind(species.clone());
            sep = " AND ";
        }
        if let Some(shelter_id) = filter.shelter_id {
            qb.push(sep).push("shelter_id = ").push_bind(shelter_id);
        }
        qb.push(" ORDER BY created_at, id");

        let rows = qb
            .build_query_as::<PetRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Pet::from).collect())
    }

    async fn create(&self, pet: &Pet) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pets (id, name, species, skin, age, shelter_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(pet.id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(&pet.skin)
        .bind(pet.age)
        .bind(pet.shelter_id)
        .bind(pet.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn create_many(&self, pets: &[Pet]) -> StoreResult<()> {
        if pets.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        for chunk in pets.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO pets (id, name, species, skin, age, shelter_id, created_at) ",
            );
            qb.push_values(chunk, |mut b, pet| {
                b.push_bind(pet.id)
                    .push_bind(pet.name.clone())
                    .push_bind(pet.species.clone())
                    .push_bind(pet.skin.clone())
                    .push_bind(pet.age)
                    .push_bind(pet.shelter_id)
                    .push_bind(pet.created_at);
            });
            qb.build().execute(&mut *tx).await.map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;

        tracing::debug!(count = pets.len(), "inserted pets");
        Ok(())
    }

    async fn update(&self, pet: &Pet) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pets
            SET name = $2, species = $3, skin = $4, age = $5, shelter_id = $6
            WHERE id = $1
            "#,
        )
        .bind(pet.id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(&pet.skin)
        .bind(pet.age)
        .bind(pet.shelter_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_many(&self, pets: &[Pet]) -> StoreResult<u64> {
        if pets.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut matched = 0;
        for pet in pets {
            let result = sqlx::query(
                r#"
                UPDATE pets
                SET name = $2, species = $3, skin = $4, age = $5, shelter_id = $6
                WHERE id = $1
                "#,
            )
            .bind(pet.id)
            .bind(&pet.name)
            .bind(&pet.species)
            .bind(&pet.skin)
            .bind(pet.age)
            .bind(pet.shelter_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
            matched += result.rows_affected();
        }
        tx.commit().await.map_err(backend)?;
        Ok(matched)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM pets")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, migrations};
    use chrono::SubsecRound;

    // Run with: DATABASE_URL=postgres://... cargo test -p shelterctl-server -- --ignored

    async fn repo() -> PgPetRepo {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");
        PgPetRepo::new(pool)
    }

    fn pet(species: &str) -> Pet {
        Pet {
            id: Uuid::new_v4(),
            name: "Rex".into(),
            species: species.into(),
            skin: "Brown".into(),
            age: 3,
            shelter_id: None,
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_get_update_delete() {
        let repo = repo().await;
        let mut rex = pet("Dog");

        repo.create(&rex).await.unwrap();
        assert_eq!(repo.get(rex.id).await.unwrap(), Some(rex.clone()));

        rex.age = 4;
        assert!(repo.update(&rex).await.unwrap());
        assert_eq!(repo.get(rex.id).await.unwrap().unwrap().age, 4);

        assert!(repo.delete(rex.id).await.unwrap());
        assert!(repo.get(rex.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn bulk_insert_and_filter() {
        let repo = repo().await;
        let species = format!("Test-{}", Uuid::new_v4());
        let pets: Vec<_> = (0..25).map(|_| pet(&species)).collect();

        repo.create_many(&pets).await.unwrap();
        let found = repo.find(&PetFilter::species(species.as_str())).await.unwrap();
        assert_eq!(found.len(), 25);

        for p in &pets {
            repo.delete(p.id).await.unwrap();
        }
    }
}
