//! shelterctl-server: dual-store pet shelter API
//!
//! Wires the PostgreSQL and MongoDB adapters under one `DualStore` and
//! serves it over HTTP.

pub mod db;
pub mod docstore;
pub mod error;
pub mod http;

use std::path::Path;

use shelterctl_core::{import_csv, DualStore, ShelterConfig};

pub use error::{ServerError, ServerResult};

/// Open both stores: PostgreSQL pool plus schema, MongoDB client plus indexes.
pub async fn connect(config: &ShelterConfig) -> ServerResult<DualStore> {
    let pool =
        db::create_pool_with_options(&config.postgres.url, config.postgres.max_connections)
            .await?;
    db::migrations::run(&pool).await?;
    tracing::info!("PostgreSQL schema ready");

    let mongo = docstore::MongoStore::connect(&config.mongo).await?;
    mongo.ensure_indexes().await?;

    Ok(DualStore::new(mongo.handle(), db::pg_store(pool)))
}

/// Connect, optionally seed pets from a CSV file, then serve until shutdown.
pub async fn serve(config: &ShelterConfig, seed_csv: Option<&Path>) -> ServerResult<()> {
    let server = http::ServerConfig::try_from(config)?;
    let store = connect(config).await?;

    if let Some(path) = seed_csv {
        let summary = import_csv(&store, path).await?;
        tracing::info!(imported = summary.imported, path = %path.display(), "seeded pets");
    }

    http::run_server(store, server).await
}
