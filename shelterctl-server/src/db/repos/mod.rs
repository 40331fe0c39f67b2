//! Repository implementations for the relational store

pub mod pets;
pub mod shelters;

use shelterctl_core::{StoreError, StoreKind};

pub use pets::PgPetRepo;
pub use shelters::PgShelterRepo;

/// Rows per multi-row INSERT. Pets bind 7 parameters per row; Postgres
/// allows 65535 per statement.
const INSERT_CHUNK: usize = 5_000;

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::backend(StoreKind::Relational, e)
}
