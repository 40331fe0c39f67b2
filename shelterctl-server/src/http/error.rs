//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use shelterctl_core::store::WriteTarget;
use shelterctl_core::{CoordinatorError, StoreError, ValidationError};

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Resource absent from both stores (404)
    NotFound { resource: &'static str, id: Uuid },

    /// Pet is not in the shelter (404)
    NotMember { pet_id: Uuid, shelter_id: Uuid },

    /// Shelter at capacity (400)
    ShelterFull { shelter_id: Uuid },

    /// One store committed, the other failed (500)
    PartialWrite {
        operation: &'static str,
        committed: Vec<WriteTarget>,
        failed: Vec<(WriteTarget, StoreError)>,
    },

    /// Store error (500, logged)
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "validation_error",
                    "message": e.to_string()
                }),
            ),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{} '{}' not found", resource, id)
                }),
            ),
            Self::NotMember { pet_id, shelter_id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("pet '{}' is not in shelter '{}'", pet_id, shelter_id)
                }),
            ),
            Self::ShelterFull { shelter_id } => {
                tracing::debug!(%shelter_id, "rejected assignment to full shelter");
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "shelter_full",
                        "message": "Shelter is full"
                    }),
                )
            }
            Self::PartialWrite {
                operation,
                committed,
                failed,
            } => {
                tracing::error!(
                    operation,
                    committed = committed.len(),
                    failed = failed.len(),
                    "partial write, stores diverged"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "partial_write",
                        "message": format!("{} committed in one store only", operation),
                        "committed": committed.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        "failed": failed.iter().map(|(t, _)| t.to_string()).collect::<Vec<_>>(),
                    }),
                )
            }
            Self::Store(e) => {
                // Log the actual error, return generic message
                tracing::error!(store = %e.store(), "Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::Validation(e) => Self::Validation(e),
            CoordinatorError::NotFound { resource, id } => Self::NotFound { resource, id },
            CoordinatorError::NotMember { pet_id, shelter_id } => {
                Self::NotMember { pet_id, shelter_id }
            }
            CoordinatorError::ShelterFull { shelter_id, .. } => Self::ShelterFull { shelter_id },
            CoordinatorError::PartialWrite {
                operation,
                committed,
                failed,
            } => Self::PartialWrite {
                operation,
                committed,
                failed,
            },
            CoordinatorError::Store(e) => Self::Store(e),
        }
    }
}
