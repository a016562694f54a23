use serde::{Deserialize, Serialize};

pub mod base;
pub mod entities;
pub mod entity;

pub use base::{BaseModel, EntityError, TIMESTAMP_FORMAT};
pub use entities::{Amenity, City, Place, Review, State, User};
pub use entity::{Entity, EntityKind, CLASS_KEY};

/// Response for GET /api/v1/status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

/// Response for GET /api/v1/stats: number of stored objects per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub amenities: usize,
    pub cities: usize,
    pub places: usize,
    pub reviews: usize,
    pub states: usize,
    pub users: usize,
}

impl StatsResponse {
    /// Record the count for one kind
    pub fn set(&mut self, kind: EntityKind, count: usize) {
        match kind {
            EntityKind::Amenity => self.amenities = count,
            EntityKind::City => self.cities = count,
            EntityKind::Place => self.places = count,
            EntityKind::Review => self.reviews = count,
            EntityKind::State => self.states = count,
            EntityKind::User => self.users = count,
        }
    }
}

/// Confirmation body, e.g. after a delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_set_by_kind() {
        let mut stats = StatsResponse::default();
        stats.set(EntityKind::City, 3);
        stats.set(EntityKind::User, 7);
        assert_eq!(stats.cities, 3);
        assert_eq!(stats.users, 7);
        assert_eq!(stats.states, 0);
    }

    #[test]
    fn test_status_ok_serializes() {
        let body = serde_json::to_value(StatusResponse::ok()).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "OK" }));
    }
}
