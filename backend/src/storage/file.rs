//! # File Storage
//!
//! Keeps every entity in an in-memory map keyed by `"<ClassName>.<id>"` and
//! persists the whole map as one JSON document on `save()`.
//!
//! The map and the file may diverge between a mutation and the next
//! `save()`; there is no write-ahead log. No referential checks are made.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use shared::{Entity, EntityKind};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::StorageResult;
use super::traits::{ObjectMap, ObjectStore, ReloadOutcome};

/// Default location of the JSON file, relative to the working directory
pub const DEFAULT_FILE_PATH: &str = "file.json";

/// JSON-file backed object store
pub struct FileStorage {
    file_path: PathBuf,
    objects: RwLock<ObjectMap>,
}

impl FileStorage {
    /// Create an empty store bound to `file_path`. Nothing is read until `reload()`.
    pub fn with_path<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            objects: RwLock::new(ObjectMap::new()),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Parse a whole snapshot. Either every entry is reconstructed or the
    /// snapshot is rejected as a unit.
    fn parse_snapshot(contents: &str) -> Result<ObjectMap, String> {
        let document: Map<String, Value> =
            serde_json::from_str(contents).map_err(|e| format!("malformed JSON: {}", e))?;

        let mut loaded = ObjectMap::new();
        for (key, value) in document {
            let fields = match value {
                Value::Object(fields) => fields,
                other => return Err(format!("entry {} is not an object: {}", key, other)),
            };
            let entity =
                Entity::from_dict(fields).map_err(|e| format!("entry {}: {}", key, e))?;
            if entity.key() != key {
                debug!("Re-keying stored entry {} as {}", key, entity.key());
            }
            loaded.insert(entity.key(), entity);
        }
        Ok(loaded)
    }

    /// Write `contents` next to the target and rename it into place
    fn write_atomically(&self, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.file_path)
    }
}

#[async_trait]
impl ObjectStore for FileStorage {
    async fn all(&self, kind: Option<EntityKind>) -> StorageResult<ObjectMap> {
        let objects = self.objects.read().await;
        Ok(match kind {
            None => objects.clone(),
            Some(kind) => objects
                .iter()
                .filter(|(_, entity)| entity.kind() == kind)
                .map(|(key, entity)| (key.clone(), entity.clone()))
                .collect(),
        })
    }

    async fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Entity>> {
        let objects = self.objects.read().await;
        Ok(objects.get(&kind.key_for(id)).cloned())
    }

    async fn new(&self, entity: Entity) -> StorageResult<()> {
        debug!("Registering {}", entity.key());
        self.objects.write().await.insert(entity.key(), entity);
        Ok(())
    }

    async fn delete(&self, entity: Option<&Entity>) -> StorageResult<()> {
        if let Some(entity) = entity {
            if self.objects.write().await.remove(&entity.key()).is_some() {
                debug!("Removed {}", entity.key());
            }
        }
        Ok(())
    }

    async fn save(&self) -> StorageResult<()> {
        // Held for the whole snapshot + write so no mutation interleaves
        let objects = self.objects.write().await;

        let mut document = Map::with_capacity(objects.len());
        for (key, entity) in objects.iter() {
            document.insert(key.clone(), Value::Object(entity.to_dict()?));
        }
        let contents = serde_json::to_string(&document)?;
        self.write_atomically(&contents)?;

        info!(
            "Saved {} objects to {}",
            objects.len(),
            self.file_path.display()
        );
        Ok(())
    }

    async fn reload(&self) -> StorageResult<ReloadOutcome> {
        let contents = match fs::read_to_string(&self.file_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No storage file at {}", self.file_path.display());
                return Ok(ReloadOutcome::NoPriorState);
            }
            Err(e) => {
                warn!(
                    "Could not read storage file {}: {}. Keeping current state.",
                    self.file_path.display(),
                    e
                );
                return Ok(ReloadOutcome::Corrupt(e.to_string()));
            }
        };

        match Self::parse_snapshot(&contents) {
            Ok(loaded) => {
                let count = loaded.len();
                self.objects.write().await.extend(loaded);
                debug!("Loaded {} objects from {}", count, self.file_path.display());
                Ok(ReloadOutcome::Loaded(count))
            }
            Err(reason) => {
                warn!(
                    "Storage file {} is corrupt ({}). Keeping current state.",
                    self.file_path.display(),
                    reason
                );
                Ok(ReloadOutcome::Corrupt(reason))
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        self.reload().await.map(|_| ())
    }

    async fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize> {
        let objects = self.objects.read().await;
        Ok(match kind {
            None => objects.len(),
            Some(kind) => objects.values().filter(|e| e.kind() == kind).count(),
        })
    }
}
