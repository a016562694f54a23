use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use shared::EntityKind;
use tracing::info;

use super::{created_response, deleted_response, entities_response, entity_response, json_body, AppState};

const IGNORED_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Axum handler function for GET /api/v1/amenities
pub async fn list_amenities(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/v1/amenities");

    match state.catalog_service.list(EntityKind::Amenity).await {
        Ok(amenities) => entities_response(&amenities),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for GET /api/v1/amenities/:amenity_id
pub async fn get_amenity(
    State(state): State<AppState>,
    Path(amenity_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/amenities/{}", amenity_id);

    match state.catalog_service.get(EntityKind::Amenity, &amenity_id).await {
        Ok(found) => entity_response(StatusCode::OK, &found),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for POST /api/v1/amenities
pub async fn create_amenity(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("POST /api/v1/amenities");

    match state
        .catalog_service
        .create(EntityKind::Amenity, json_body(body), &["name"])
        .await
    {
        Ok(created) => created_response("amenities", &created),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for PUT /api/v1/amenities/:amenity_id
pub async fn update_amenity(
    State(state): State<AppState>,
    Path(amenity_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("PUT /api/v1/amenities/{}", amenity_id);

    match state
        .catalog_service
        .update(EntityKind::Amenity, &amenity_id, json_body(body), IGNORED_FIELDS)
        .await
    {
        Ok(updated) => entity_response(StatusCode::OK, &updated),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for DELETE /api/v1/amenities/:amenity_id
pub async fn delete_amenity(
    State(state): State<AppState>,
    Path(amenity_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/v1/amenities/{}", amenity_id);

    match state.catalog_service.delete(EntityKind::Amenity, &amenity_id).await {
        Ok(()) => deleted_response("Amenity"),
        Err(e) => e.into_response(),
    }
}
