//! Business rules layered on the storage facade: request-body validation,
//! immutable keys, password hashing and persisting each mutation.

pub mod catalog_service;

pub use catalog_service::{hash_password, CatalogError, CatalogResult, CatalogService};
