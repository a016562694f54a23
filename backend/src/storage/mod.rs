//! # Storage Module
//!
//! Persistence for catalog entities. Two interchangeable backends implement
//! [`ObjectStore`]:
//!
//! - [`FileStorage`]: in-memory map written to a single JSON file on `save()`
//! - [`DbStorage`]: SQLite tables accessed through a unit-of-work session
//!
//! [`Storage`] is the facade the rest of the backend talks to. It is built
//! once at startup from configuration, reloaded once, and then shared by
//! handle with every request handler.

pub mod error;
pub mod file;
pub mod sqlite;
pub mod traits;

use std::sync::Arc;

use shared::{City, Entity, EntityKind, StatsResponse};
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{info, warn};

use crate::config::{StorageBackend, StorageConfig};

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use sqlite::DbStorage;
pub use traits::{ObjectMap, ObjectStore, ReloadOutcome};

/// Process-wide storage handle; cloning shares the same store.
///
/// Reads share a gate that write sequences hold exclusively, so a reader
/// never observes changes another caller has staged but not yet saved.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
    backend: StorageBackend,
    gate: Arc<RwLock<()>>,
}

/// Exclusive access for one read-modify-write sequence. Staged changes
/// are visible only through this writer until `save()`.
pub struct StorageWriter<'a> {
    store: &'a dyn ObjectStore,
    _gate: RwLockWriteGuard<'a, ()>,
}

impl StorageWriter<'_> {
    pub async fn all(&self, kind: Option<EntityKind>) -> StorageResult<ObjectMap> {
        self.store.all(kind).await
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Entity>> {
        self.store.get(kind, id).await
    }

    pub async fn new(&self, entity: Entity) -> StorageResult<()> {
        self.store.new(entity).await
    }

    pub async fn delete(&self, entity: Option<&Entity>) -> StorageResult<()> {
        self.store.delete(entity).await
    }

    pub async fn save(&self) -> StorageResult<()> {
        self.store.save().await
    }

    pub async fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize> {
        self.store.count(kind).await
    }
}

impl Storage {
    /// Build the configured backend and load its initial state
    pub async fn open(config: &StorageConfig) -> StorageResult<Self> {
        let storage = match config.backend {
            StorageBackend::File => {
                info!("Using file storage at {}", config.file_path.display());
                Self::from_store(StorageBackend::File, FileStorage::with_path(&config.file_path))
            }
            StorageBackend::Db => {
                info!("Using database storage");
                let store = DbStorage::connect(&config.database).await?;
                Self::from_store(StorageBackend::Db, store)
            }
        };

        match storage.reload().await? {
            ReloadOutcome::NoPriorState => info!("No stored objects yet"),
            ReloadOutcome::Loaded(count) => info!("Loaded {} stored objects", count),
            ReloadOutcome::Corrupt(reason) => {
                warn!("Ignoring unreadable stored objects: {}", reason)
            }
            ReloadOutcome::SessionReady => info!("Storage session ready"),
        }
        Ok(storage)
    }

    /// Wrap an already constructed store. Does not reload it.
    pub fn from_store<S: ObjectStore + 'static>(backend: StorageBackend, store: S) -> Self {
        Self {
            store: Arc::new(store),
            backend,
            gate: Arc::new(RwLock::new(())),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    /// Wait until no reader or other writer is active
    pub async fn exclusive(&self) -> StorageWriter<'_> {
        StorageWriter {
            store: self.store.as_ref(),
            _gate: self.gate.write().await,
        }
    }

    pub async fn all(&self, kind: Option<EntityKind>) -> StorageResult<ObjectMap> {
        let _gate = self.gate.read().await;
        self.store.all(kind).await
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Entity>> {
        let _gate = self.gate.read().await;
        self.store.get(kind, id).await
    }

    pub async fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize> {
        let _gate = self.gate.read().await;
        self.store.count(kind).await
    }

    /// Stage a single entity. Use [`Storage::exclusive`] for multi-step changes.
    pub async fn new(&self, entity: Entity) -> StorageResult<()> {
        let writer = self.exclusive().await;
        writer.new(entity).await
    }

    pub async fn delete(&self, entity: Option<&Entity>) -> StorageResult<()> {
        let writer = self.exclusive().await;
        writer.delete(entity).await
    }

    pub async fn save(&self) -> StorageResult<()> {
        let writer = self.exclusive().await;
        writer.save().await
    }

    pub async fn reload(&self) -> StorageResult<ReloadOutcome> {
        let _gate = self.gate.write().await;
        self.store.reload().await
    }

    /// End-of-request hook; waits for any in-flight write sequence
    pub async fn close(&self) -> StorageResult<()> {
        let _gate = self.gate.write().await;
        self.store.close().await
    }

    /// Number of stored objects per kind
    pub async fn stats(&self) -> StorageResult<StatsResponse> {
        let _gate = self.gate.read().await;
        let mut stats = StatsResponse::default();
        for kind in EntityKind::ALL {
            stats.set(kind, self.store.count(Some(kind)).await?);
        }
        Ok(stats)
    }

    /// Cities whose `state_id` references the given state
    pub async fn cities_of_state(&self, state_id: &str) -> StorageResult<Vec<City>> {
        let cities = self.all(Some(EntityKind::City)).await?;
        Ok(cities
            .into_values()
            .filter_map(|entity| match entity {
                Entity::City(city) if city.state_id == state_id => Some(city),
                _ => None,
            })
            .collect())
    }
}
