//! Table layout for the database-backed store.
//!
//! Foreign keys are declared `DEFERRABLE INITIALLY DEFERRED`: a dangling
//! reference is only reported when the session commits.

use shared::EntityKind;
use sqlx::SqlitePool;
use tracing::info;

use crate::storage::error::StorageResult;

/// Storage class of a mapped column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

/// A mapped column; `name` matches the entity field name
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn text(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Text }
}

const fn integer(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Integer }
}

const fn real(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Real }
}

const STATE_COLUMNS: &[Column] = &[
    text("id"),
    text("created_at"),
    text("updated_at"),
    text("name"),
];

const CITY_COLUMNS: &[Column] = &[
    text("id"),
    text("created_at"),
    text("updated_at"),
    text("state_id"),
    text("name"),
];

const AMENITY_COLUMNS: &[Column] = &[
    text("id"),
    text("created_at"),
    text("updated_at"),
    text("name"),
];

const USER_COLUMNS: &[Column] = &[
    text("id"),
    text("created_at"),
    text("updated_at"),
    text("email"),
    text("password"),
    text("first_name"),
    text("last_name"),
];

const PLACE_COLUMNS: &[Column] = &[
    text("id"),
    text("created_at"),
    text("updated_at"),
    text("city_id"),
    text("user_id"),
    text("name"),
    text("description"),
    integer("number_rooms"),
    integer("number_bathrooms"),
    integer("max_guest"),
    integer("price_by_night"),
    real("latitude"),
    real("longitude"),
];

const REVIEW_COLUMNS: &[Column] = &[
    text("id"),
    text("created_at"),
    text("updated_at"),
    text("place_id"),
    text("user_id"),
    text("text"),
];

/// Mapped columns of the table holding `kind`
pub fn columns(kind: EntityKind) -> &'static [Column] {
    match kind {
        EntityKind::Amenity => AMENITY_COLUMNS,
        EntityKind::City => CITY_COLUMNS,
        EntityKind::Place => PLACE_COLUMNS,
        EntityKind::Review => REVIEW_COLUMNS,
        EntityKind::State => STATE_COLUMNS,
        EntityKind::User => USER_COLUMNS,
    }
}

fn column_list(kind: EntityKind) -> String {
    columns(kind)
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn select_all_sql(kind: EntityKind) -> String {
    format!("SELECT {} FROM {}", column_list(kind), kind.plural())
}

pub fn select_one_sql(kind: EntityKind) -> String {
    format!("{} WHERE id = ?", select_all_sql(kind))
}

pub fn count_sql(kind: EntityKind) -> String {
    format!("SELECT COUNT(*) FROM {}", kind.plural())
}

pub fn delete_sql(kind: EntityKind) -> String {
    format!("DELETE FROM {} WHERE id = ?", kind.plural())
}

/// Insert, or update every mutable column when the id already exists
pub fn upsert_sql(kind: EntityKind) -> String {
    let cols = columns(kind);
    let placeholders = vec!["?"; cols.len()].join(", ");
    let updates = cols
        .iter()
        .filter(|c| c.name != "id" && c.name != "created_at")
        .map(|c| format!("{0} = excluded.{0}", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        kind.plural(),
        column_list(kind),
        placeholders,
        updates
    )
}

/// Parents before children
const CREATE_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS states (
        id VARCHAR(60) PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name VARCHAR(128) NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cities (
        id VARCHAR(60) PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        state_id VARCHAR(60) NOT NULL,
        name VARCHAR(128) NOT NULL,
        FOREIGN KEY (state_id) REFERENCES states (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id VARCHAR(60) PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        email VARCHAR(128) NOT NULL,
        password VARCHAR(128) NOT NULL,
        first_name VARCHAR(128),
        last_name VARCHAR(128)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS amenities (
        id VARCHAR(60) PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name VARCHAR(128) NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS places (
        id VARCHAR(60) PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        city_id VARCHAR(60) NOT NULL,
        user_id VARCHAR(60) NOT NULL,
        name VARCHAR(128) NOT NULL,
        description VARCHAR(1024),
        number_rooms INTEGER NOT NULL DEFAULT 0,
        number_bathrooms INTEGER NOT NULL DEFAULT 0,
        max_guest INTEGER NOT NULL DEFAULT 0,
        price_by_night INTEGER NOT NULL DEFAULT 0,
        latitude REAL,
        longitude REAL,
        FOREIGN KEY (city_id) REFERENCES cities (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        FOREIGN KEY (user_id) REFERENCES users (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id VARCHAR(60) PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        place_id VARCHAR(60) NOT NULL,
        user_id VARCHAR(60) NOT NULL,
        text VARCHAR(1024) NOT NULL,
        FOREIGN KEY (place_id) REFERENCES places (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        FOREIGN KEY (user_id) REFERENCES users (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS place_amenity (
        place_id VARCHAR(60) NOT NULL,
        amenity_id VARCHAR(60) NOT NULL,
        PRIMARY KEY (place_id, amenity_id),
        FOREIGN KEY (place_id) REFERENCES places (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        FOREIGN KEY (amenity_id) REFERENCES amenities (id)
            ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
    );
    "#,
];

/// Children before parents
const MANAGED_TABLES_DROP_ORDER: &[&str] = &[
    "place_amenity",
    "reviews",
    "places",
    "cities",
    "amenities",
    "users",
    "states",
];

/// Create every managed table that does not exist yet
pub async fn create_all(pool: &SqlitePool) -> StorageResult<()> {
    for statement in CREATE_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Drop every managed table. Destructive; only used in the test environment.
pub async fn drop_all(pool: &SqlitePool) -> StorageResult<()> {
    for table in MANAGED_TABLES_DROP_ORDER {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    info!("Dropped all managed tables");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_sql_lists_columns() {
        assert_eq!(
            select_one_sql(EntityKind::City),
            "SELECT id, created_at, updated_at, state_id, name FROM cities WHERE id = ?"
        );
    }

    #[test]
    fn test_upsert_keeps_identity_columns() {
        let sql = upsert_sql(EntityKind::State);
        assert_eq!(
            sql,
            "INSERT INTO states (id, created_at, updated_at, name) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at, name = excluded.name"
        );
    }

    #[test]
    fn test_every_kind_maps_base_columns() {
        for kind in EntityKind::ALL {
            let names: Vec<_> = columns(kind).iter().map(|c| c.name).collect();
            assert_eq!(&names[..3], &["id", "created_at", "updated_at"]);
        }
    }
}
