//! Relational store: PostgreSQL via sqlx
//!
//! - Connection pool shared by both repositories
//! - Shelter membership derived with a LEFT JOIN on read (no N+1)
//! - Bulk writes run in one transaction per call

pub mod migrations;
pub mod pool;
pub mod repos;

use std::sync::Arc;

use sqlx::PgPool;

use shelterctl_core::StoreHandle;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::{PgPetRepo, PgShelterRepo};

/// Store handle backed by `pool`
pub fn pg_store(pool: PgPool) -> StoreHandle {
    StoreHandle::new(
        Arc::new(PgPetRepo::new(pool.clone())),
        Arc::new(PgShelterRepo::new(pool)),
    )
}
