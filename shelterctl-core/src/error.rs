//! Structured error types for shelterctl-core.
//!
//! Store adapters report `StoreError`; the dual-store coordinator wraps those
//! and adds the domain failures (`CoordinatorError`). The HTTP layer maps the
//! latter onto status codes.

use thiserror::Error;
use uuid::Uuid;

use crate::model::ValidationError;
use crate::store::{StoreKind, WriteTarget};

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for coordinator operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Failure inside one backing store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The driver reported an error (connection, query, constraint)
    #[error("{store} error: {source}")]
    Backend {
        store: StoreKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A stored row/document could not be mapped onto a model
    #[error("{store} holds a corrupt {resource} record '{id}': {reason}")]
    Corrupt {
        store: StoreKind,
        resource: &'static str,
        id: String,
        reason: String,
    },

    /// Store refused the operation (injected fault, poisoned state)
    #[error("{store} unavailable: {reason}")]
    Unavailable { store: StoreKind, reason: String },
}

impl StoreError {
    /// Wrap a driver error
    pub fn backend(
        store: StoreKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            store,
            source: Box::new(source),
        }
    }

    /// Create a corrupt-record error
    pub fn corrupt(
        store: StoreKind,
        resource: &'static str,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Corrupt {
            store,
            resource,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(store: StoreKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            store,
            reason: reason.into(),
        }
    }

    /// Store the error originated from
    pub fn store(&self) -> StoreKind {
        match self {
            Self::Backend { store, .. }
            | Self::Corrupt { store, .. }
            | Self::Unavailable { store, .. } => *store,
        }
    }
}

/// Failure of a logical (dual-store) operation
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Input rejected before any store was touched
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Record absent from both stores
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: Uuid },

    /// Shelter has no room for another pet
    #[error("Shelter is full")]
    ShelterFull { shelter_id: Uuid, capacity: i32 },

    /// Pet is not a member of the given shelter
    #[error("pet '{pet_id}' is not in shelter '{shelter_id}'")]
    NotMember { pet_id: Uuid, shelter_id: Uuid },

    /// Some writes committed and some failed. Nothing was rolled back.
    #[error(
        "partial {operation}: committed [{}], failed [{}]",
        list_targets(.committed),
        list_failures(.failed)
    )]
    PartialWrite {
        operation: &'static str,
        committed: Vec<WriteTarget>,
        failed: Vec<(WriteTarget, StoreError)>,
    },

    /// Every write failed, or a read failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoordinatorError {
    pub fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource, id }
    }
}

fn list_targets(targets: &[WriteTarget]) -> String {
    targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn list_failures(failed: &[(WriteTarget, StoreError)]) -> String {
    failed
        .iter()
        .map(|(target, err)| format!("{}: {}", target, err))
        .collect::<Vec<_>>()
        .join(", ")
}
