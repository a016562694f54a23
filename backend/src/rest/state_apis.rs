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

/// Axum handler function for GET /api/v1/states
pub async fn list_states(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/v1/states");

    match state.catalog_service.list(EntityKind::State).await {
        Ok(states) => entities_response(&states),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for GET /api/v1/states/:state_id
pub async fn get_state(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/states/{}", state_id);

    match state.catalog_service.get(EntityKind::State, &state_id).await {
        Ok(found) => entity_response(StatusCode::OK, &found),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for POST /api/v1/states
pub async fn create_state(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("POST /api/v1/states");

    match state
        .catalog_service
        .create(EntityKind::State, json_body(body), &["name"])
        .await
    {
        Ok(created) => created_response("states", &created),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for PUT /api/v1/states/:state_id
pub async fn update_state(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("PUT /api/v1/states/{}", state_id);

    match state
        .catalog_service
        .update(EntityKind::State, &state_id, json_body(body), IGNORED_FIELDS)
        .await
    {
        Ok(updated) => entity_response(StatusCode::OK, &updated),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for DELETE /api/v1/states/:state_id
pub async fn delete_state(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/v1/states/{}", state_id);

    match state.catalog_service.delete(EntityKind::State, &state_id).await {
        Ok(()) => deleted_response("State"),
        Err(e) => e.into_response(),
    }
}
