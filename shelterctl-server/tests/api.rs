//! HTTP routes against an in-memory dual store.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use shelterctl_core::store::MemoryStore;
use shelterctl_core::{DualStore, DualView};
use shelterctl_server::http::{build_router, ServerConfig};

fn setup() -> (Router, DualView<MemoryStore>) {
    let (store, mem) = DualStore::in_memory();
    (build_router(store, &ServerConfig::default()), mem)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_rex(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/pets",
        Some(json!({ "name": "Rex", "species": "Dog", "skin": "Brown", "age": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["MongoDB"]["id"].as_str().unwrap().to_string()
}

async fn create_shelter(app: &Router, capacity: i32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/shelters",
        Some(json!({ "name": "Happy Paws", "location": "Vienna", "capacity": capacity })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["PostgreSQL"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_get_pet() {
    let (app, _mem) = setup();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pets",
        Some(json!({ "name": "Rex", "species": "Dog", "skin": "Brown", "age": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["MongoDB"]["id"], body["PostgreSQL"]["id"]);
    assert_eq!(body["MongoDB"]["createdDate"], body["PostgreSQL"]["createdDate"]);

    let id = body["MongoDB"]["id"].as_str().unwrap();
    let (status, body) = send(&app, Method::GET, &format!("/api/pets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    for store in ["MongoDB", "PostgreSQL"] {
        assert_eq!(body[store]["id"], id);
        assert_eq!(body[store]["name"], "Rex");
        assert_eq!(body[store]["age"], 3);
    }
}

#[tokio::test]
async fn test_invalid_age_is_400_and_writes_nothing() {
    let (app, mem) = setup();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pets",
        Some(json!({ "name": "Rex", "species": "Dog", "skin": "Brown", "age": 51 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(mem.document.write_count() + mem.relational.write_count(), 0);
}

#[tokio::test]
async fn test_malformed_uuid_is_400() {
    let (app, _mem) = setup();
    let (status, body) = send(&app, Method::GET, "/api/pets/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_unknown_pet_is_404() {
    let (app, _mem) = setup();
    let uri = format!("/api/pets/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_to_full_shelter_is_400() {
    let (app, _mem) = setup();
    let pet = create_rex(&app).await;
    let shelter = create_shelter(&app, 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pets/AddToShelter",
        Some(json!({ "petId": pet, "shelterId": shelter })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Shelter is full");

    let (_, body) = send(&app, Method::GET, &format!("/api/pets/{pet}"), None).await;
    assert!(body["MongoDB"]["shelter"].is_null());
    assert!(body["PostgreSQL"]["shelter"].is_null());
}

#[tokio::test]
async fn test_add_then_remove_from_shelter() {
    let (app, _mem) = setup();
    let pet = create_rex(&app).await;
    let shelter = create_shelter(&app, 2).await;
    let membership = json!({ "petId": pet, "shelterId": shelter });

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pets/AddToShelter",
        Some(membership.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["MongoDB"]["shelter"], shelter.as_str());
    assert_eq!(body["PostgreSQL"]["shelter"], shelter.as_str());

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/shelters/{shelter}/getShelterWithPets"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["MongoDB"]["pets"][0]["id"], pet.as_str());
    assert_eq!(body["PostgreSQL"]["shelter"]["pets"][0], pet.as_str());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/pets/RemoveFromShelter",
        Some(membership.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pets/RemoveFromShelter",
        Some(membership),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_update_and_delete_pet() {
    let (app, _mem) = setup();
    let pet = create_rex(&app).await;
    let uri = format!("/api/pets/{pet}");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "name": "Max", "species": "Dog", "skin": "Black", "age": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["MongoDB"]["name"], "Max");
    assert_eq!(body["PostgreSQL"]["age"], 4);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters() {
    let (app, _mem) = setup();
    create_rex(&app).await;
    send(
        &app,
        Method::POST,
        "/api/pets",
        Some(json!({ "name": "Tom", "species": "Cat", "skin": "Gray", "age": 5 })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/pets?species=Cat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["MongoDB"].as_array().unwrap().len(), 1);
    assert_eq!(body["PostgreSQL"][0]["name"], "Tom");

    create_shelter(&app, 5).await;
    let (_, body) = send(&app, Method::GET, "/api/shelters?location=Graz", None).await;
    assert!(body["MongoDB"].as_array().unwrap().is_empty());
    let (_, body) = send(&app, Method::GET, "/api/shelters?location=Vienna", None).await;
    assert_eq!(body["PostgreSQL"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_shelter_update_and_delete() {
    let (app, _mem) = setup();
    let shelter = create_shelter(&app, 1).await;
    let uri = format!("/api/shelters/{shelter}");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "name": "Paws & Claws", "location": "Graz", "capacity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["MongoDB"]["location"], "Graz");
    assert_eq!(body["PostgreSQL"]["capacity"], 4);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_write_is_500() {
    let (app, mem) = setup();
    mem.relational.faults().fail_writes();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pets",
        Some(json!({ "name": "Rex", "species": "Dog", "skin": "Brown", "age": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "partial_write");
    assert_eq!(mem.document.pets.len(), 1);
    assert!(mem.relational.pets.is_empty());
}

#[tokio::test]
async fn test_health() {
    let (app, _mem) = setup();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
