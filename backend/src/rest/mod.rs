//! HTTP surface of the catalog, mounted under `/api/v1`.
//!
//! Every request ends with a storage `close()`, run by [`close_storage`]
//! after the handler has produced its response.

pub mod amenity_apis;
pub mod city_apis;
pub mod error;
pub mod index_apis;
pub mod state_apis;
pub mod user_apis;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use shared::{Entity, MessageResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::domain::{CatalogError, CatalogService};
use crate::storage::Storage;

pub const API_PREFIX: &str = "/api/v1";

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub catalog_service: CatalogService,
}

impl AppState {
    pub fn new(storage: Storage) -> Self {
        Self {
            catalog_service: CatalogService::new(storage.clone()),
            storage,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(index_apis::status))
        .route("/stats", get(index_apis::stats))
        .route(
            "/states",
            get(state_apis::list_states).post(state_apis::create_state),
        )
        .route(
            "/states/:state_id",
            get(state_apis::get_state)
                .put(state_apis::update_state)
                .delete(state_apis::delete_state),
        )
        .route(
            "/states/:state_id/cities",
            get(city_apis::list_cities_of_state).post(city_apis::create_city),
        )
        .route(
            "/cities/:city_id",
            get(city_apis::get_city)
                .put(city_apis::update_city)
                .delete(city_apis::delete_city),
        )
        .route(
            "/amenities",
            get(amenity_apis::list_amenities).post(amenity_apis::create_amenity),
        )
        .route(
            "/amenities/:amenity_id",
            get(amenity_apis::get_amenity)
                .put(amenity_apis::update_amenity)
                .delete(amenity_apis::delete_amenity),
        )
        .route("/users", get(user_apis::list_users).post(user_apis::create_user))
        .route(
            "/users/:user_id",
            get(user_apis::get_user)
                .put(user_apis::update_user)
                .delete(user_apis::delete_user),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(API_PREFIX, api_routes)
        .fallback(|| async { error::not_found() })
        .layer(middleware::from_fn_with_state(state.clone(), close_storage))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request teardown: release the storage session once the response is ready
async fn close_storage(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if let Err(e) = state.storage.close().await {
        error!("Failed to close storage session: {}", e);
    }
    response
}

/// An unparseable body and a non-object body are treated alike downstream
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> Option<Value> {
    body.ok().map(|Json(value)| value)
}

/// Public representation of an entity with the given status
pub(crate) fn entity_response(status: StatusCode, entity: &Entity) -> Response {
    match entity.to_public_dict() {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => CatalogError::from(e).into_response(),
    }
}

/// 201 with a `Location` pointing at the new resource
pub(crate) fn created_response(collection: &str, entity: &Entity) -> Response {
    let location = format!("{}/{}/{}", API_PREFIX, collection, entity.id());
    let mut response = entity_response(StatusCode::CREATED, entity);
    if response.status() == StatusCode::CREATED {
        if let Ok(value) = location.parse() {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }
    response
}

pub(crate) fn entities_response(entities: &[Entity]) -> Response {
    let bodies: Result<Vec<_>, _> = entities.iter().map(Entity::to_public_dict).collect();
    match bodies {
        Ok(bodies) => (StatusCode::OK, Json(bodies)).into_response(),
        Err(e) => CatalogError::from(e).into_response(),
    }
}

pub(crate) fn deleted_response(entity_name: &str) -> Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: format!("{} deleted", entity_name),
        }),
    )
        .into_response()
}
