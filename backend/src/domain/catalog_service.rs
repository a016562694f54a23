use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use shared::{City, Entity, EntityError, EntityKind, StatsResponse};
use thiserror::Error;
use tracing::{info, warn};

use crate::storage::{Storage, StorageError, StorageWriter};

/// Keys a client may never overwrite
const IDENTITY_FIELDS: &[&str] = &["id", "created_at", "updated_at"];
const CITY_IGNORED_FIELDS: &[&str] = &["id", "state_id", "created_at", "updated_at"];
const USER_IGNORED_FIELDS: &[&str] = &["id", "email", "created_at", "updated_at"];

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request body was unusable
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(EntityKind),

    /// A body field had the wrong type for the target entity
    #[error("invalid attributes: {0}")]
    InvalidAttributes(#[from] EntityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Hex SHA-256 digest stored in place of a plain password
pub fn hash_password(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// CRUD over catalog entities on top of the shared [`Storage`] facade.
///
/// Every mutation is persisted with `save()` before returning.
#[derive(Clone)]
pub struct CatalogService {
    storage: Storage,
}

impl CatalogService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub async fn list(&self, kind: EntityKind) -> CatalogResult<Vec<Entity>> {
        info!("Listing all {}", kind.plural());
        let objects = self.storage.all(Some(kind)).await?;
        Ok(objects.into_values().collect())
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> CatalogResult<Entity> {
        found(kind, id, self.storage.get(kind, id).await?)
    }

    /// Create an entity from a request body that must carry `required`
    pub async fn create(
        &self,
        kind: EntityKind,
        body: Option<Value>,
        required: &[&str],
    ) -> CatalogResult<Entity> {
        let fields = require_fields(body, required)?;
        let writer = self.storage.exclusive().await;
        Self::insert(&writer, kind, &fields).await
    }

    /// Update mutable attributes; keys in `ignored` are silently skipped
    pub async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        body: Option<Value>,
        ignored: &[&str],
    ) -> CatalogResult<Entity> {
        let writer = self.storage.exclusive().await;
        let mut entity = found(kind, id, writer.get(kind, id).await?)?;
        let fields = require_fields(body, &[])?;
        entity.apply_update(&fields, ignored)?;
        entity.touch();
        writer.new(entity.clone()).await?;
        writer.save().await?;
        info!("Updated {}", entity.key());
        Ok(entity)
    }

    pub async fn delete(&self, kind: EntityKind, id: &str) -> CatalogResult<()> {
        let writer = self.storage.exclusive().await;
        let entity = found(kind, id, writer.get(kind, id).await?)?;
        writer.delete(Some(&entity)).await?;
        writer.save().await?;
        info!("Deleted {}", entity.key());
        Ok(())
    }

    pub async fn stats(&self) -> CatalogResult<StatsResponse> {
        Ok(self.storage.stats().await?)
    }

    /// Cities of an existing state
    pub async fn cities_of_state(&self, state_id: &str) -> CatalogResult<Vec<City>> {
        self.get(EntityKind::State, state_id).await?;
        Ok(self.storage.cities_of_state(state_id).await?)
    }

    /// Create a city under an existing state; a `state_id` in the body is ignored
    pub async fn create_city(&self, state_id: &str, body: Option<Value>) -> CatalogResult<Entity> {
        let writer = self.storage.exclusive().await;
        found(
            EntityKind::State,
            state_id,
            writer.get(EntityKind::State, state_id).await?,
        )?;
        let mut fields = require_fields(body, &["name"])?;
        fields.insert("state_id".to_string(), Value::String(state_id.to_string()));
        Self::insert(&writer, EntityKind::City, &fields).await
    }

    pub async fn update_city(&self, id: &str, body: Option<Value>) -> CatalogResult<Entity> {
        self.update(EntityKind::City, id, body, CITY_IGNORED_FIELDS).await
    }

    /// Create a user; the password is stored hashed
    pub async fn create_user(&self, body: Option<Value>) -> CatalogResult<Entity> {
        let mut fields = require_fields(body, &["email", "password"])?;
        hash_password_field(&mut fields)?;
        let writer = self.storage.exclusive().await;
        Self::insert(&writer, EntityKind::User, &fields).await
    }

    /// Update a user; the email is immutable and a new password is hashed
    pub async fn update_user(&self, id: &str, mut body: Option<Value>) -> CatalogResult<Entity> {
        if let Some(Value::Object(fields)) = body.as_mut() {
            hash_password_field(fields)?;
        }
        self.update(EntityKind::User, id, body, USER_IGNORED_FIELDS)
            .await
    }

    /// Stage and persist a new entity with fresh identity
    async fn insert(
        writer: &StorageWriter<'_>,
        kind: EntityKind,
        fields: &Map<String, Value>,
    ) -> CatalogResult<Entity> {
        let mut entity = Entity::blank(kind);
        entity.apply_update(fields, IDENTITY_FIELDS)?;
        writer.new(entity.clone()).await?;
        writer.save().await?;
        info!("Created {}", entity.key());
        Ok(entity)
    }
}

fn found(kind: EntityKind, id: &str, entity: Option<Entity>) -> CatalogResult<Entity> {
    entity.ok_or_else(|| {
        warn!("{} not found: {}", kind, id);
        CatalogError::NotFound(kind)
    })
}

/// The body must be a non-empty JSON object holding every key in `required`
fn require_fields(body: Option<Value>, required: &[&str]) -> CatalogResult<Map<String, Value>> {
    let fields = match body {
        Some(Value::Object(fields)) if !fields.is_empty() => fields,
        _ => return Err(CatalogError::Validation("Not a valid JSON".to_string())),
    };
    if let Some(missing) = required.iter().find(|key| !fields.contains_key(**key)) {
        return Err(CatalogError::Validation(format!("Missing {}", missing)));
    }
    Ok(fields)
}

fn hash_password_field(fields: &mut Map<String, Value>) -> CatalogResult<()> {
    match fields.get_mut("password") {
        None => Ok(()),
        Some(Value::String(raw)) => {
            *raw = hash_password(raw);
            Ok(())
        }
        Some(_) => Err(CatalogError::Validation(
            "password must be a string".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use serde_json::json;
    use tempfile::TempDir;

    async fn init_test() -> (CatalogService, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = StorageConfig::file(temp_dir.path().join("file.json"));
        let storage = Storage::open(&config).await.expect("Failed to open storage");
        (CatalogService::new(storage), temp_dir)
    }

    #[test]
    fn test_hash_password_is_hex_sha256() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_create_ignores_client_identity() {
        let (service, _temp_dir) = init_test().await;

        let created = service
            .create(
                EntityKind::State,
                Some(json!({"name": "Nevada", "id": "chosen", "created_at": "2001-01-01T00:00:00"})),
                &["name"],
            )
            .await
            .unwrap();

        assert_ne!(created.id(), "chosen");
        let fetched = service.get(EntityKind::State, created.id()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_validates_body() {
        let (service, _temp_dir) = init_test().await;

        let err = service
            .create(EntityKind::Amenity, None, &["name"])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a valid JSON");

        let err = service
            .create(EntityKind::Amenity, Some(json!(["Wifi"])), &["name"])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a valid JSON");

        let err = service
            .create(EntityKind::Amenity, Some(json!({"label": "Wifi"})), &["name"])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing name");
        assert_eq!(service.list(EntityKind::Amenity).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_empty_object_is_not_a_valid_body() {
        let (service, _temp_dir) = init_test().await;
        let created = service
            .create(EntityKind::Amenity, Some(json!({"name": "Gym"})), &["name"])
            .await
            .unwrap();

        let err = service
            .update(EntityKind::Amenity, created.id(), Some(json!({})), IDENTITY_FIELDS)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(err.to_string(), "Not a valid JSON");

        let err = service
            .create(EntityKind::State, Some(json!({})), &["name"])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a valid JSON");
        assert_eq!(
            service.get(EntityKind::Amenity, created.id()).await.unwrap(),
            created
        );
    }

    #[tokio::test]
    async fn test_wrongly_typed_attribute_is_rejected() {
        let (service, _temp_dir) = init_test().await;
        let err = service
            .create(EntityKind::State, Some(json!({"name": 42})), &["name"])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidAttributes(_)));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at_and_keeps_identity() {
        let (service, _temp_dir) = init_test().await;
        let created = service
            .create(EntityKind::State, Some(json!({"name": "Utah"})), &["name"])
            .await
            .unwrap();

        let updated = service
            .update(
                EntityKind::State,
                created.id(),
                Some(json!({"name": "Idaho", "id": "other"})),
                IDENTITY_FIELDS,
            )
            .await
            .unwrap();

        assert_eq!(updated.id(), created.id());
        assert_eq!(updated.base().created_at, created.base().created_at);
        assert!(updated.base().updated_at >= created.base().updated_at);
        let Entity::State(state) = service.get(EntityKind::State, created.id()).await.unwrap()
        else {
            panic!("expected a state");
        };
        assert_eq!(state.name, "Idaho");
    }

    #[tokio::test]
    async fn test_missing_entity_is_not_found() {
        let (service, _temp_dir) = init_test().await;
        let err = service.delete(EntityKind::User, "nope").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(EntityKind::User)));
        assert_eq!(err.to_string(), "User not found");

        let err = service
            .update(EntityKind::Amenity, "nope", Some(json!({})), IDENTITY_FIELDS)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(EntityKind::Amenity)));
    }

    #[tokio::test]
    async fn test_cities_are_scoped_to_their_state() {
        let (service, _temp_dir) = init_test().await;
        let state = service
            .create(EntityKind::State, Some(json!({"name": "Oregon"})), &["name"])
            .await
            .unwrap();

        let city = service
            .create_city(state.id(), Some(json!({"name": "Portland", "state_id": "elsewhere"})))
            .await
            .unwrap();
        let Entity::City(city) = city else { panic!("expected a city") };
        assert_eq!(city.state_id, state.id());

        let cities = service.cities_of_state(state.id()).await.unwrap();
        assert_eq!(cities.len(), 1);

        let err = service
            .create_city("missing", Some(json!({"name": "Nowhere"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(EntityKind::State)));

        let moved = service
            .update_city(&city.base.id, Some(json!({"state_id": "elsewhere", "name": "Salem"})))
            .await
            .unwrap();
        let Entity::City(moved) = moved else { panic!("expected a city") };
        assert_eq!(moved.state_id, state.id());
        assert_eq!(moved.name, "Salem");
    }

    #[tokio::test]
    async fn test_user_password_is_hashed_and_email_immutable() {
        let (service, _temp_dir) = init_test().await;
        let user = service
            .create_user(Some(json!({"email": "a@b.io", "password": "secret"})))
            .await
            .unwrap();
        let Entity::User(created) = &user else { panic!("expected a user") };
        assert_eq!(created.password, hash_password("secret"));

        let updated = service
            .update_user(
                user.id(),
                Some(json!({"email": "x@y.io", "password": "better", "first_name": "Ada"})),
            )
            .await
            .unwrap();
        let Entity::User(updated) = updated else { panic!("expected a user") };
        assert_eq!(updated.email, "a@b.io");
        assert_eq!(updated.password, hash_password("better"));
        assert_eq!(updated.first_name.as_deref(), Some("Ada"));

        let err = service
            .create_user(Some(json!({"email": "c@d.io"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing password");
    }

    #[tokio::test]
    async fn test_delete_removes_and_persists() {
        let (service, _temp_dir) = init_test().await;
        let amenity = service
            .create(EntityKind::Amenity, Some(json!({"name": "Pool"})), &["name"])
            .await
            .unwrap();

        service.delete(EntityKind::Amenity, amenity.id()).await.unwrap();
        service.storage().reload().await.unwrap();

        assert_eq!(service.stats().await.unwrap().amenities, 0);
    }
}
