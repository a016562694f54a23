use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use shared::{Entity, EntityKind};
use tracing::info;

use super::{created_response, deleted_response, entities_response, entity_response, json_body, AppState};

/// Axum handler function for GET /api/v1/states/:state_id/cities
pub async fn list_cities_of_state(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/states/{}/cities", state_id);

    match state.catalog_service.cities_of_state(&state_id).await {
        Ok(cities) => {
            let cities: Vec<Entity> = cities.into_iter().map(Entity::from).collect();
            entities_response(&cities)
        }
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for POST /api/v1/states/:state_id/cities
pub async fn create_city(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("POST /api/v1/states/{}/cities", state_id);

    match state
        .catalog_service
        .create_city(&state_id, json_body(body))
        .await
    {
        Ok(created) => created_response("cities", &created),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for GET /api/v1/cities/:city_id
pub async fn get_city(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/cities/{}", city_id);

    match state.catalog_service.get(EntityKind::City, &city_id).await {
        Ok(city) => entity_response(StatusCode::OK, &city),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for PUT /api/v1/cities/:city_id
pub async fn update_city(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    info!("PUT /api/v1/cities/{}", city_id);

    match state
        .catalog_service
        .update_city(&city_id, json_body(body))
        .await
    {
        Ok(updated) => entity_response(StatusCode::OK, &updated),
        Err(e) => e.into_response(),
    }
}

/// Axum handler function for DELETE /api/v1/cities/:city_id
pub async fn delete_city(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/v1/cities/{}", city_id);

    match state.catalog_service.delete(EntityKind::City, &city_id).await {
        Ok(()) => deleted_response("City"),
        Err(e) => e.into_response(),
    }
}
