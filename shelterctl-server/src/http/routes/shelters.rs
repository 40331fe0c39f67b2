//! Shelter endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shelterctl_core::{DualView, Shelter, ShelterFilter, ShelterInput, ShelterWithPets};

use super::pets::PetDto;
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;

/// Create/update shelter request
#[derive(Debug, Deserialize)]
pub struct ShelterRequest {
    pub name: String,
    pub location: String,
    pub capacity: i32,
}

impl ShelterRequest {
    fn validate(&self) -> Result<ShelterInput, ApiError> {
        Ok(ShelterInput::new(&self.name, &self.location, self.capacity)?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ShelterQuery {
    pub location: Option<String>,
}

/// Shelter response. `pets` lists member ids.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterDto {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    pub created_date: DateTime<Utc>,
    pub pets: Vec<Uuid>,
}

impl From<Shelter> for ShelterDto {
    fn from(s: Shelter) -> Self {
        Self {
            id: s.id,
            name: s.name,
            location: s.location,
            capacity: s.capacity,
            created_date: s.created_at,
            pets: s.pet_ids,
        }
    }
}

/// One store's shelter with its member pets expanded
#[derive(Debug, Clone, Serialize)]
pub struct ShelterWithPetsDto {
    pub shelter: Option<ShelterDto>,
    pub pets: Vec<PetDto>,
}

impl From<ShelterWithPets> for ShelterWithPetsDto {
    fn from(v: ShelterWithPets) -> Self {
        Self {
            shelter: v.shelter.map(ShelterDto::from),
            pets: v.pets.into_iter().map(PetDto::from).collect(),
        }
    }
}

/// GET /api/shelters
async fn list_shelters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShelterQuery>,
) -> Result<Json<DualView<Vec<ShelterDto>>>, ApiError> {
    let filter = ShelterFilter {
        location: query.location,
    };
    let shelters = state.store.list_shelters(&filter).await?;
    Ok(Json(
        shelters.map(|v| v.into_iter().map(ShelterDto::from).collect()),
    ))
}

/// POST /api/shelters
async fn create_shelter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ShelterRequest>,
) -> Result<(StatusCode, Json<DualView<ShelterDto>>), ApiError> {
    let input = req.validate()?;
    let created = state.store.create_shelter(input).await?;
    Ok((StatusCode::CREATED, Json(created.map(ShelterDto::from))))
}

/// GET /api/shelters/{id}
async fn get_shelter(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DualView<Option<ShelterDto>>>, ApiError> {
    let shelter = state.store.get_shelter(id).await?;
    Ok(Json(shelter.map(|s| s.map(ShelterDto::from))))
}

/// PUT /api/shelters/{id}
async fn update_shelter(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<ShelterRequest>,
) -> Result<StatusCode, ApiError> {
    let input = req.validate()?;
    state.store.update_shelter(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/shelters/{id}
async fn delete_shelter(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    state.store.delete_shelter(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/shelters/{id}/getShelterWithPets
async fn shelter_with_pets(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DualView<ShelterWithPetsDto>>, ApiError> {
    let view = state.store.shelter_with_pets(id).await?;
    Ok(Json(view.map(ShelterWithPetsDto::from)))
}

/// Shelter routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/shelters", get(list_shelters).post(create_shelter))
        .route(
            "/api/shelters/{id}",
            get(get_shelter).put(update_shelter).delete(delete_shelter),
        )
        .route(
            "/api/shelters/{id}/getShelterWithPets",
            get(shelter_with_pets),
        )
}
