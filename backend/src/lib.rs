//! # Rental Catalog Backend
//!
//! REST backend for a property-rental catalog. Entities are persisted
//! either in a single JSON file or in SQLite, chosen at startup.
//!
//! - [`config`]: environment-driven configuration
//! - [`storage`]: the two object stores and the [`storage::Storage`] facade
//! - [`domain`]: validation and mutation rules
//! - [`rest`]: axum router and handlers

use anyhow::Result;

pub mod config;
pub mod domain;
pub mod rest;
pub mod storage;

pub use config::{AppConfig, StorageBackend, StorageConfig};
pub use domain::CatalogService;
pub use rest::{create_router, AppState};
pub use storage::Storage;

/// Open the configured storage and wire every service onto it
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    let storage = Storage::open(&config.storage).await?;
    Ok(AppState::new(storage))
}
