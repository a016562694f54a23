use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use shared::StatusResponse;
use tracing::info;

use super::AppState;

/// Axum handler function for GET /api/v1/status
pub async fn status() -> impl IntoResponse {
    info!("GET /api/v1/status");
    (StatusCode::OK, Json(StatusResponse::ok()))
}

/// Axum handler function for GET /api/v1/stats
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/v1/stats");

    match state.catalog_service.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => e.into_response(),
    }
}
