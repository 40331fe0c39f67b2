//! Error types for shelterctl-server startup

use shelterctl_core::{ConfigError, ImportError};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("PostgreSQL error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Seed import failed: {0}")]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
