//! Identity and timestamps shared by every catalog entity.

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format used when rendering timestamps (ISO-8601, microsecond precision, UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Accepts timestamps with or without a fractional part
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Errors raised while reconstructing entities from plain mappings
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("unknown entity class: {0}")]
    UnknownClass(String),

    #[error("missing __class__ discriminator")]
    MissingClass,

    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid entity fields: {0}")]
    InvalidFields(#[from] serde_json::Error),

    #[error("entity did not serialize to a JSON object")]
    NotAnObject,
}

/// Common shape of every entity: immutable id plus creation/update timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default = "now", with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default = "now", with = "timestamp")]
    pub updated_at: NaiveDateTime,
}

impl BaseModel {
    /// Fresh identity with both timestamps set to the current time
    pub fn new() -> Self {
        let now = now();
        Self {
            id: generate_id(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`; called on every mutating save
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a new entity id (UUID v4)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time truncated to the precision the timestamp format keeps,
/// so that a render/parse round trip is lossless.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Render a timestamp in the persisted format
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the persisted format
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, EntityError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).map_err(|source| {
        EntityError::InvalidTimestamp {
            value: value.to_string(),
            source,
        }
    })
}

/// Serde adapter for `NaiveDateTime` fields using [`TIMESTAMP_FORMAT`]
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}
