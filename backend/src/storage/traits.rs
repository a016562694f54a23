//! # Storage Traits
//!
//! The object-store contract shared by the file-backed and the
//! database-backed storage, so that the API layer can use either one without
//! knowing which is active.

use std::collections::BTreeMap;

use async_trait::async_trait;
use shared::{Entity, EntityKind};

use super::error::StorageResult;

/// Entities addressed by composite key `"<ClassName>.<id>"`
pub type ObjectMap = BTreeMap<String, Entity>;

/// What a `reload()` found on the backing medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Nothing persisted yet (e.g. the JSON file does not exist)
    NoPriorState,
    /// Persisted state was read; carries the number of entities loaded
    Loaded(usize),
    /// Persisted state exists but could not be used; in-memory state is untouched
    Corrupt(String),
    /// A fresh database session is ready
    SessionReady,
}

/// Trait defining the object-store interface
///
/// Writes (`new`, `delete`) are staged and become durable only on `save`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// All entities, optionally restricted to one kind
    async fn all(&self, kind: Option<EntityKind>) -> StorageResult<ObjectMap>;

    /// Look up one entity; `None` when absent
    async fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Entity>>;

    /// Register (or replace) an entity in the pending set
    async fn new(&self, entity: Entity) -> StorageResult<()>;

    /// Remove an entity from the live set; `None` or an unknown entity is a no-op
    async fn delete(&self, entity: Option<&Entity>) -> StorageResult<()>;

    /// Make all pending changes durable
    async fn save(&self) -> StorageResult<()>;

    /// (Re)load state from the backing medium
    async fn reload(&self) -> StorageResult<ReloadOutcome>;

    /// End-of-request hook
    async fn close(&self) -> StorageResult<()>;

    /// Number of entities, optionally restricted to one kind
    async fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize>;
}
