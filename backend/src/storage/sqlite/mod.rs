//! SQLite-backed implementation of the object store

pub mod db;
pub mod schema;

pub use db::DbStorage;
