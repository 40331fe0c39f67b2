//! Relational schema

use sqlx::PgPool;

/// Create tables and indexes if missing.
///
/// A shelter's member list is not stored: it is derived from
/// `pets.shelter_id` on read.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running PostgreSQL migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shelters (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT NOT NULL,
            capacity INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pets (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            species TEXT NOT NULL,
            skin TEXT NOT NULL,
            age INTEGER NOT NULL,
            shelter_id UUID REFERENCES shelters(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pets_shelter_id ON pets(shelter_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pets_species ON pets(species)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shelters_location ON shelters(location)")
        .execute(pool)
        .await?;

    tracing::info!("PostgreSQL migrations complete");
    Ok(())
}
