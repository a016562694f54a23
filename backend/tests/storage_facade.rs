use rental_catalog_backend::config::StorageConfig;
use rental_catalog_backend::storage::{ReloadOutcome, Storage, StorageError};
use rental_catalog_backend::StorageBackend;
use shared::{Amenity, City, Entity, EntityKind, State, User};
use tempfile::TempDir;

fn file_config(temp_dir: &TempDir) -> StorageConfig {
    StorageConfig::file(temp_dir.path().join("file.json"))
}

fn db_config(temp_dir: &TempDir) -> StorageConfig {
    let url = format!("sqlite://{}", temp_dir.path().join("hbnb.db").display());
    StorageConfig::database(url, false)
}

async fn open_both() -> Vec<(Storage, StorageConfig, TempDir)> {
    let mut stores = Vec::new();
    let configs: [fn(&TempDir) -> StorageConfig; 2] = [file_config, db_config];
    for make_config in configs {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = make_config(&temp_dir);
        let storage = Storage::open(&config).await.expect("Failed to open storage");
        stores.push((storage, config, temp_dir));
    }
    stores
}

#[tokio::test]
async fn saved_state_is_visible_after_reopening() {
    for (storage, config, _temp_dir) in open_both().await {
        let state: Entity = State::new("California").into();
        storage.new(state.clone()).await.unwrap();
        storage.save().await.unwrap();

        let reopened = Storage::open(&config).await.unwrap();
        let fetched = reopened.get(EntityKind::State, state.id()).await.unwrap();
        assert_eq!(fetched, Some(state), "{:?}", storage.backend());
    }
}

#[tokio::test]
async fn unsaved_changes_are_not_durable() {
    for (storage, config, _temp_dir) in open_both().await {
        storage.new(Amenity::new("Sauna").into()).await.unwrap();
        assert_eq!(storage.count(Some(EntityKind::Amenity)).await.unwrap(), 1);
        storage.close().await.unwrap();

        let reopened = Storage::open(&config).await.unwrap();
        assert_eq!(reopened.count(None).await.unwrap(), 0, "{:?}", storage.backend());
    }
}

#[tokio::test]
async fn counts_follow_creates_and_deletes() {
    for (storage, _config, _temp_dir) in open_both().await {
        let state = State::new("Texas");
        let city: Entity = City::new(state.base.id.clone(), "Austin").into();
        storage.new(state.into()).await.unwrap();
        storage.new(city.clone()).await.unwrap();
        storage.new(User::new("u@x.io", "digest").into()).await.unwrap();
        storage.save().await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!((stats.states, stats.cities, stats.users), (1, 1, 1));
        assert_eq!(storage.count(None).await.unwrap(), 3);

        storage.delete(Some(&city)).await.unwrap();
        storage.save().await.unwrap();
        assert_eq!(storage.count(Some(EntityKind::City)).await.unwrap(), 0);
        assert!(storage.get(EntityKind::City, city.id()).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn all_is_keyed_by_class_and_id() {
    for (storage, _config, _temp_dir) in open_both().await {
        let amenity: Entity = Amenity::new("Wifi").into();
        storage.new(amenity.clone()).await.unwrap();
        storage.new(State::new("Ohio").into()).await.unwrap();
        storage.save().await.unwrap();

        let amenities = storage.all(Some(EntityKind::Amenity)).await.unwrap();
        assert_eq!(amenities.len(), 1);
        assert_eq!(
            amenities.get(&format!("Amenity.{}", amenity.id())),
            Some(&amenity)
        );
        assert_eq!(storage.all(None).await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn dangling_reference_only_fails_on_database_store() {
    for (storage, _config, _temp_dir) in open_both().await {
        storage
            .new(City::new("no-such-state", "Ghost Town").into())
            .await
            .unwrap();
        let result = storage.save().await;
        match storage.backend() {
            StorageBackend::File => assert!(result.is_ok()),
            StorageBackend::Db => assert!(matches!(result, Err(StorageError::Constraint(_)))),
        }
    }
}

#[tokio::test]
async fn corrupt_file_is_reported_and_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let config = file_config(&temp_dir);
    std::fs::write(&config.file_path, "{ this is not json").unwrap();

    let storage = Storage::open(&config).await.unwrap();
    assert_eq!(storage.count(None).await.unwrap(), 0);
    assert!(matches!(
        storage.reload().await.unwrap(),
        ReloadOutcome::Corrupt(_)
    ));
}

#[tokio::test]
async fn test_environment_resets_database() {
    let temp_dir = TempDir::new().unwrap();
    let config = db_config(&temp_dir);
    let storage = Storage::open(&config).await.unwrap();
    storage.new(State::new("Kansas").into()).await.unwrap();
    storage.save().await.unwrap();
    drop(storage);

    let mut reset_config = config.clone();
    reset_config.database.reset_on_connect = true;
    let reset = Storage::open(&reset_config).await.unwrap();
    assert_eq!(reset.count(None).await.unwrap(), 0);
}
