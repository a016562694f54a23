use shared::EntityError;
use thiserror::Error;

/// Failures surfaced by the storage layer.
///
/// Not-found is never an error here; lookups return `Option`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An operation was attempted before the first `reload()`
    #[error("storage session not initialised; call reload() first")]
    NotReady,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize storage contents: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stored entity: {0}")]
    Entity(#[from] EntityError),

    #[error("column {column} cannot hold {value}")]
    InvalidColumn { column: &'static str, value: String },

    /// The commit was rejected by a constraint (e.g. a dangling foreign key)
    /// and the transaction was rolled back
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        let is_constraint = matches!(
            &err,
            sqlx::Error::Database(db) if db.message().contains("constraint failed")
        );
        if is_constraint {
            StorageError::Constraint(err.to_string())
        } else {
            StorageError::Database(err)
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
