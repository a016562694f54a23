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

/// Axum handler function for GET /api/v1/users
pub async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/v1/users");

    match state.catalog_service.list(EntityKind::User).await {
        Ok(users) => entities_response(&users),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for GET /api/v1/users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/users/{}", user_id);

    match state.catalog_service.get(EntityKind::User, &user_id).await {
        Ok(user) => entity_response(StatusCode::OK, &user),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    // Body is not logged; it carries a password
    info!("POST /api/v1/users");

    match state.catalog_service.create_user(json_body(body)).await {
        Ok(created) => created_response("users", &created),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for PUT /api/v1/users/:user_id
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("PUT /api/v1/users/{}", user_id);

    match state
        .catalog_service
        .update_user(&user_id, json_body(body))
        .await
    {
        Ok(updated) => entity_response(StatusCode::OK, &updated),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for DELETE /api/v1/users/:user_id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/v1/users/{}", user_id);

    match state.catalog_service.delete(EntityKind::User, &user_id).await {
        Ok(()) => deleted_response("User"),
        Err(e) => e.into_response(),
    }
}
