//! # Database Storage
//!
//! Object store backed by SQLite through sqlx. A session is one database
//! transaction: it is opened lazily by the first operation after `reload()`,
//! `save()` or `close()`, and every staged write is executed inside it
//! straight away, so reads in the same session see them. Nothing is durable
//! until `save()` commits.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use shared::{Entity, EntityKind};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, query::Query, Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::schema::{self, Column, ColumnType};
use crate::config::DatabaseConfig;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::traits::{ObjectMap, ObjectStore, ReloadOutcome};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

enum Session {
    /// `reload()` has not run yet
    Uninitialised,
    /// Ready; no transaction open
    Idle,
    Open(Transaction<'static, Sqlite>),
}

/// SQLite-backed object store
pub struct DbStorage {
    pool: SqlitePool,
    session: Mutex<Session>,
}

impl DbStorage {
    /// Connect to the configured database, creating it if needed. When
    /// `reset_on_connect` is set every managed table is dropped first.
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let url = config.url.as_str();

        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }

        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Connected to database {}", url);

        if config.reset_on_connect {
            warn!("Test environment: dropping all managed tables");
            schema::drop_all(&pool).await?;
        }

        Ok(Self {
            pool,
            session: Mutex::new(Session::Uninitialised),
        })
    }

    /// The session transaction, opening one if the session is idle
    async fn transaction<'a>(
        pool: &SqlitePool,
        session: &'a mut Session,
    ) -> StorageResult<&'a mut Transaction<'static, Sqlite>> {
        if let Session::Uninitialised = session {
            return Err(StorageError::NotReady);
        }
        if let Session::Idle = session {
            *session = Session::Open(pool.begin().await?);
            debug!("Opened session transaction");
        }
        match session {
            Session::Open(tx) => Ok(tx),
            _ => Err(StorageError::NotReady),
        }
    }

    fn bind_column<'q>(
        query: SqliteQuery<'q>,
        column: &Column,
        value: Option<&Value>,
    ) -> StorageResult<SqliteQuery<'q>> {
        Ok(match (column.ty, value) {
            (_, None) | (_, Some(Value::Null)) => query.bind(None::<String>),
            (ColumnType::Text, Some(Value::String(s))) => query.bind(s.clone()),
            (ColumnType::Integer, Some(Value::Number(n))) if n.is_i64() => query.bind(n.as_i64()),
            (ColumnType::Real, Some(Value::Number(n))) => query.bind(n.as_f64()),
            (_, Some(other)) => {
                return Err(StorageError::InvalidColumn {
                    column: column.name,
                    value: other.to_string(),
                })
            }
        })
    }

    fn row_to_entity(kind: EntityKind, row: &SqliteRow) -> StorageResult<Entity> {
        let mut fields = Map::new();
        for column in schema::columns(kind) {
            let value = match column.ty {
                ColumnType::Text => row
                    .try_get::<Option<String>, _>(column.name)?
                    .map(Value::String),
                ColumnType::Integer => row
                    .try_get::<Option<i64>, _>(column.name)?
                    .map(Value::from),
                ColumnType::Real => row
                    .try_get::<Option<f64>, _>(column.name)?
                    .map(Value::from),
            };
            fields.insert(column.name.to_string(), value.unwrap_or(Value::Null));
        }
        Ok(Entity::from_dict_as(kind, fields)?)
    }

    async fn load_amenity_ids(
        tx: &mut Transaction<'static, Sqlite>,
        place_id: &str,
    ) -> StorageResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT amenity_id FROM place_amenity WHERE place_id = ? ORDER BY rowid",
        )
        .bind(place_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(ids)
    }

    /// Rows of the table are enough for every kind except places, which also
    /// carry their amenity links
    async fn hydrate(
        tx: &mut Transaction<'static, Sqlite>,
        kind: EntityKind,
        row: &SqliteRow,
    ) -> StorageResult<Entity> {
        let mut entity = Self::row_to_entity(kind, row)?;
        if let Entity::Place(place) = &mut entity {
            place.amenity_ids = Self::load_amenity_ids(tx, &place.base.id).await?;
        }
        Ok(entity)
    }

    async fn store_amenity_links(
        tx: &mut Transaction<'static, Sqlite>,
        place_id: &str,
        amenity_ids: &[String],
    ) -> StorageResult<()> {
        sqlx::query("DELETE FROM place_amenity WHERE place_id = ?")
            .bind(place_id)
            .execute(&mut **tx)
            .await?;
        for amenity_id in amenity_ids {
            sqlx::query("INSERT OR IGNORE INTO place_amenity (place_id, amenity_id) VALUES (?, ?)")
                .bind(place_id)
                .bind(amenity_id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    fn kinds(kind: Option<EntityKind>) -> Vec<EntityKind> {
        match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        }
    }
}

#[async_trait]
impl ObjectStore for DbStorage {
    async fn all(&self, kind: Option<EntityKind>) -> StorageResult<ObjectMap> {
        let mut session = self.session.lock().await;
        let tx = Self::transaction(&self.pool, &mut session).await?;

        let mut objects = ObjectMap::new();
        for kind in Self::kinds(kind) {
            let rows = sqlx::query(&schema::select_all_sql(kind))
                .fetch_all(&mut **tx)
                .await?;
            for row in &rows {
                let entity = Self::hydrate(tx, kind, row).await?;
                objects.insert(entity.key(), entity);
            }
        }
        Ok(objects)
    }

    async fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Entity>> {
        let mut session = self.session.lock().await;
        let tx = Self::transaction(&self.pool, &mut session).await?;

        let row = sqlx::query(&schema::select_one_sql(kind))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        match row {
            Some(row) => Ok(Some(Self::hydrate(tx, kind, &row).await?)),
            None => Ok(None),
        }
    }

    async fn new(&self, entity: Entity) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        let tx = Self::transaction(&self.pool, &mut session).await?;

        let kind = entity.kind();
        let fields = entity.to_dict()?;
        let sql = schema::upsert_sql(kind);
        let mut query = sqlx::query(&sql);
        for column in schema::columns(kind) {
            query = Self::bind_column(query, column, fields.get(column.name))?;
        }
        query.execute(&mut **tx).await?;

        if let Entity::Place(place) = &entity {
            Self::store_amenity_links(tx, &place.base.id, &place.amenity_ids).await?;
        }
        debug!("Staged {}", entity.key());
        Ok(())
    }

    async fn delete(&self, entity: Option<&Entity>) -> StorageResult<()> {
        let Some(entity) = entity else {
            return Ok(());
        };
        let mut session = self.session.lock().await;
        let tx = Self::transaction(&self.pool, &mut session).await?;

        let result = sqlx::query(&schema::delete_sql(entity.kind()))
            .bind(entity.id())
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() > 0 {
            debug!("Staged removal of {}", entity.key());
        }
        Ok(())
    }

    async fn save(&self) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        match std::mem::replace(&mut *session, Session::Idle) {
            Session::Uninitialised => {
                *session = Session::Uninitialised;
                Err(StorageError::NotReady)
            }
            Session::Idle => Ok(()),
            Session::Open(tx) => match tx.commit().await {
                Ok(()) => {
                    info!("Committed session");
                    Ok(())
                }
                // The failed transaction is rolled back when dropped
                Err(e) => {
                    error!("Commit failed, session rolled back: {}", e);
                    Err(e.into())
                }
            },
        }
    }

    async fn reload(&self) -> StorageResult<ReloadOutcome> {
        let mut session = self.session.lock().await;
        if let Session::Open(tx) = std::mem::replace(&mut *session, Session::Uninitialised) {
            tx.rollback().await?;
            debug!("Discarded previous session");
        }

        schema::create_all(&self.pool).await?;
        *session = Session::Idle;
        info!("Database session ready");
        Ok(ReloadOutcome::SessionReady)
    }

    async fn close(&self) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        match std::mem::replace(&mut *session, Session::Idle) {
            Session::Open(tx) => {
                tx.rollback().await?;
                debug!("Closed session, uncommitted changes discarded");
            }
            Session::Uninitialised => *session = Session::Uninitialised,
            Session::Idle => {}
        }
        Ok(())
    }

    async fn count(&self, kind: Option<EntityKind>) -> StorageResult<usize> {
        let mut session = self.session.lock().await;
        let tx = Self::transaction(&self.pool, &mut session).await?;

        let mut total = 0usize;
        for kind in Self::kinds(kind) {
            let count = sqlx::query_scalar::<_, i64>(&schema::count_sql(kind))
                .fetch_one(&mut **tx)
                .await?;
            total += count as usize;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Amenity, City, Place, Review, State, User};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> DatabaseConfig {
        DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("hbnb_test.db").display()),
            reset_on_connect: false,
        }
    }

    // Setup a new test database for each test
    async fn setup_test() -> (DbStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = DbStorage::connect(&test_config(&temp_dir))
            .await
            .expect("Failed to create test database");
        storage.reload().await.expect("Failed to initialise session");
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_operations_before_reload_are_not_ready() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DbStorage::connect(&test_config(&temp_dir)).await.unwrap();

        assert!(matches!(storage.count(None).await, Err(StorageError::NotReady)));
        assert!(matches!(storage.save().await, Err(StorageError::NotReady)));
        assert!(matches!(
            storage.get(EntityKind::State, "x").await,
            Err(StorageError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_save_then_get_in_fresh_store() {
        let (storage, temp_dir) = setup_test().await;
        let state: Entity = State::new("California").into();
        storage.new(state.clone()).await.unwrap();
        storage.save().await.unwrap();

        let fresh = DbStorage::connect(&test_config(&temp_dir)).await.unwrap();
        fresh.reload().await.unwrap();
        let fetched = fresh.get(EntityKind::State, state.id()).await.unwrap();
        assert_eq!(fetched, Some(state));
        match fetched {
            Some(Entity::State(state)) => assert_eq!(state.name, "California"),
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (storage, _temp_dir) = setup_test().await;
        assert!(storage.get(EntityKind::User, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_staged_writes_visible_in_session_but_not_durable() {
        let (storage, _temp_dir) = setup_test().await;
        let amenity: Entity = Amenity::new("Wifi").into();
        storage.new(amenity.clone()).await.unwrap();

        assert_eq!(storage.count(Some(EntityKind::Amenity)).await.unwrap(), 1);

        storage.close().await.unwrap();
        assert_eq!(storage.count(Some(EntityKind::Amenity)).await.unwrap(), 0);
        assert!(storage
            .get(EntityKind::Amenity, amenity.id())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_count_and_all_by_kind() {
        let (storage, _temp_dir) = setup_test().await;
        let state = State::new("Oregon");
        let state_id = state.base.id.clone();
        storage.new(state.into()).await.unwrap();
        storage.save().await.unwrap();
        let before = storage.count(Some(EntityKind::City)).await.unwrap();

        for name in ["Portland", "Salem", "Eugene"] {
            storage.new(City::new(state_id.clone(), name).into()).await.unwrap();
        }
        storage.save().await.unwrap();

        assert_eq!(storage.count(Some(EntityKind::City)).await.unwrap(), before + 3);
        assert_eq!(storage.count(None).await.unwrap(), 4);

        let cities = storage.all(Some(EntityKind::City)).await.unwrap();
        assert_eq!(cities.len(), 3);
        assert!(cities.values().all(|e| e.kind() == EntityKind::City));
        assert!(cities.keys().all(|k| k.starts_with("City.")));
        assert_eq!(storage.all(None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_new_on_existing_id_updates_row() {
        let (storage, _temp_dir) = setup_test().await;
        let mut state: Entity = State::new("Calfornia").into();
        storage.new(state.clone()).await.unwrap();
        storage.save().await.unwrap();

        let Value::Object(updates) = serde_json::json!({ "name": "California" }) else {
            unreachable!()
        };
        state.apply_update(&updates, &["id"]).unwrap();
        state.touch();
        storage.new(state.clone()).await.unwrap();
        storage.save().await.unwrap();

        assert_eq!(storage.count(Some(EntityKind::State)).await.unwrap(), 1);
        assert_eq!(
            storage.get(EntityKind::State, state.id()).await.unwrap(),
            Some(state)
        );
    }

    #[tokio::test]
    async fn test_delete_save_makes_get_return_none() {
        let (storage, temp_dir) = setup_test().await;
        let user: Entity = User::new("a@b.c", "digest").into();
        storage.new(user.clone()).await.unwrap();
        storage.save().await.unwrap();

        storage.delete(Some(&user)).await.unwrap();
        storage.delete(None).await.unwrap();
        storage.save().await.unwrap();

        let fresh = DbStorage::connect(&test_config(&temp_dir)).await.unwrap();
        fresh.reload().await.unwrap();
        assert!(fresh.get(EntityKind::User, user.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dangling_foreign_key_fails_commit() {
        let (storage, _temp_dir) = setup_test().await;
        let city: Entity = City::new("no-such-state", "SF").into();

        // Staging succeeds; the check happens at commit
        storage.new(city.clone()).await.unwrap();
        let result = storage.save().await;
        assert!(matches!(result, Err(StorageError::Constraint(_))));

        // The rolled-back city is gone and the store is usable again
        assert!(storage.get(EntityKind::City, city.id()).await.unwrap().is_none());
        storage.new(State::new("Nevada").into()).await.unwrap();
        storage.save().await.unwrap();
        assert_eq!(storage.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_place_round_trip_with_amenities() {
        let (storage, _temp_dir) = setup_test().await;
        let state = State::new("California");
        let city = City::new(state.base.id.clone(), "San Francisco");
        let user = User::new("host@example.com", "digest");
        let wifi = Amenity::new("Wifi");
        let pool = Amenity::new("Pool");
        let mut place = Place::new(city.base.id.clone(), user.base.id.clone(), "Loft");
        place.number_rooms = 2;
        place.price_by_night = 150;
        place.latitude = Some(37.7749);
        place.amenity_ids = vec![wifi.base.id.clone(), pool.base.id.clone()];
        let review = Review::new(place.base.id.clone(), user.base.id.clone(), "Lovely");
        let place: Entity = place.into();
        let review: Entity = review.into();

        for entity in [
            Entity::from(state),
            city.into(),
            user.into(),
            wifi.into(),
            pool.into(),
            place.clone(),
            review.clone(),
        ] {
            storage.new(entity).await.unwrap();
        }
        storage.save().await.unwrap();
        storage.close().await.unwrap();

        assert_eq!(
            storage.get(EntityKind::Place, place.id()).await.unwrap(),
            Some(place)
        );
        assert_eq!(
            storage.get(EntityKind::Review, review.id()).await.unwrap(),
            Some(review)
        );
    }

    #[tokio::test]
    async fn test_deleting_state_cascades_to_cities() {
        let (storage, _temp_dir) = setup_test().await;
        let state = State::new("Utah");
        let city = City::new(state.base.id.clone(), "Provo");
        let state: Entity = state.into();
        storage.new(state.clone()).await.unwrap();
        storage.new(city.into()).await.unwrap();
        storage.save().await.unwrap();

        storage.delete(Some(&state)).await.unwrap();
        storage.save().await.unwrap();

        assert_eq!(storage.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_on_connect_drops_tables() {
        let (storage, temp_dir) = setup_test().await;
        storage.new(State::new("Kansas").into()).await.unwrap();
        storage.save().await.unwrap();
        drop(storage);

        let config = DatabaseConfig {
            reset_on_connect: true,
            ..test_config(&temp_dir)
        };
        let reset = DbStorage::connect(&config).await.unwrap();
        reset.reload().await.unwrap();
        assert_eq!(reset.count(None).await.unwrap(), 0);
    }
}
