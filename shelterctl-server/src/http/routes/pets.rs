//! Pet endpoints
//!
//! Every read answers with one view per store, keyed `MongoDB` / `PostgreSQL`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shelterctl_core::{DualView, Pet, PetFilter, PetInput};

use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;

/// Create/update pet request
#[derive(Debug, Deserialize)]
pub struct PetRequest {
    pub name: String,
    pub species: String,
    pub skin: String,
    pub age: i32,
    #[serde(default)]
    pub shelter: Option<Uuid>,
}

impl PetRequest {
    fn validate(&self) -> Result<PetInput, ApiError> {
        Ok(PetInput::new(
            &self.name,
            &self.species,
            &self.skin,
            self.age,
            self.shelter,
        )?)
    }
}

/// Body of AddToShelter / RemoveFromShelter
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub pet_id: Uuid,
    pub shelter_id: Uuid,
}

/// Query parameters for GET /api/pets
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetQuery {
    pub species: Option<String>,
    pub shelter_id: Option<Uuid>,
}

impl From<PetQuery> for PetFilter {
    fn from(q: PetQuery) -> Self {
        Self {
            species: q.species,
            shelter_id: q.shelter_id,
        }
    }
}

/// Pet response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDto {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub skin: String,
    pub age: i32,
    pub shelter: Option<Uuid>,
    pub created_date: DateTime<Utc>,
}

impl From<Pet> for PetDto {
    fn from(p: Pet) -> Self {
        Self {
            id: p.id,
            name: p.name,
            species: p.species,
            skin: p.skin,
            age: p.age,
            shelter: p.shelter_id,
            created_date: p.created_at,
        }
    }
}

fn one(view: DualView<Option<Pet>>) -> DualView<Option<PetDto>> {
    view.map(|p| p.map(PetDto::from))
}

/// GET /api/pets
async fn list_pets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PetQuery>,
) -> Result<Json<DualView<Vec<PetDto>>>, ApiError> {
    let pets = state.store.list_pets(&query.into()).await?;
    Ok(Json(pets.map(|v| v.into_iter().map(PetDto::from).collect())))
}

/// POST /api/pets
async fn create_pet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PetRequest>,
) -> Result<(StatusCode, Json<DualView<PetDto>>), ApiError> {
    let input = req.validate()?;
    let created = state.store.create_pet(input).await?;
    Ok((StatusCode::CREATED, Json(created.map(PetDto::from))))
}

/// GET /api/pets/{id}
async fn get_pet(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DualView<Option<PetDto>>>, ApiError> {
    let pet = state.store.get_pet(id).await?;
    Ok(Json(one(pet)))
}

/// PUT /api/pets/{id}
async fn update_pet(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<PetRequest>,
) -> Result<StatusCode, ApiError> {
    let input = req.validate()?;
    state.store.update_pet(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/pets/{id}
async fn delete_pet(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    state.store.delete_pet(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/pets/AddToShelter
async fn add_to_shelter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MembershipRequest>,
) -> Result<Json<DualView<Option<PetDto>>>, ApiError> {
    let pet = state
        .store
        .assign_to_shelter(req.pet_id, req.shelter_id)
        .await?;
    Ok(Json(one(pet)))
}

/// POST /api/pets/RemoveFromShelter
async fn remove_from_shelter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MembershipRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .remove_from_shelter(req.pet_id, req.shelter_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pet routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pets", get(list_pets).post(create_pet))
        .route("/api/pets/AddToShelter", post(add_to_shelter))
        .route("/api/pets/RemoveFromShelter", post(remove_from_shelter))
        .route(
            "/api/pets/{id}",
            get(get_pet).put(update_pet).delete(delete_pet),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dto_uses_camel_case() {
        let input = PetInput::new("Rex", "Dog", "Brown", 3, None).unwrap();
        let pet = Pet::new(Uuid::new_v4(), Utc::now(), input);
        let json = serde_json::to_value(PetDto::from(pet)).unwrap();

        assert!(json.get("createdDate").is_some());
        assert!(json["shelter"].is_null());
        assert_eq!(json["name"], "Rex");
    }

    #[test]
    fn membership_request_reads_camel_case() {
        let pet = Uuid::new_v4();
        let shelter = Uuid::new_v4();
        let body = serde_json::json!({ "petId": pet, "shelterId": shelter });
        let req: MembershipRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.pet_id, pet);
        assert_eq!(req.shelter_id, shelter);
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        let req = PetRequest {
            name: "Rex".into(),
            species: "Dog".into(),
            skin: "Brown".into(),
            age: 51,
            shelter: None,
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }
}
