use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::ErrorResponse;
use tracing::error;

use crate::domain::CatalogError;
use crate::storage::StorageError;

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::Validation(_) | CatalogError::InvalidAttributes(_) => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Storage(StorageError::Constraint(_)) => StatusCode::CONFLICT,
            CatalogError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            CatalogError::Storage(StorageError::Constraint(_)) => {
                "Conflicts with existing data".to_string()
            }
            CatalogError::Storage(e) => {
                error!("Storage failure: {:?}", e);
                "Storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Body for routes that match nothing
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
        .into_response()
}
