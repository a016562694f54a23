//! Closed set of entity kinds and the polymorphic [`Entity`] wrapper.
//!
//! The serialized form of an [`Entity`] carries a `__class__` discriminator
//! naming the concrete kind, which is what allows a flat JSON document to be
//! turned back into the right type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::base::{BaseModel, EntityError};
use crate::entities::{Amenity, City, Place, Review, State, User};

/// Key of the type discriminator inside a serialized entity
pub const CLASS_KEY: &str = "__class__";

/// The kinds of entity the catalog knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Amenity,
    City,
    Place,
    Review,
    State,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Amenity,
        EntityKind::City,
        EntityKind::Place,
        EntityKind::Review,
        EntityKind::State,
        EntityKind::User,
    ];

    /// Class name used in composite keys and the `__class__` discriminator
    pub fn class_name(self) -> &'static str {
        match self {
            EntityKind::Amenity => "Amenity",
            EntityKind::City => "City",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
            EntityKind::State => "State",
            EntityKind::User => "User",
        }
    }

    /// Plural name, used for database tables and the stats endpoint
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Amenity => "amenities",
            EntityKind::City => "cities",
            EntityKind::Place => "places",
            EntityKind::Review => "reviews",
            EntityKind::State => "states",
            EntityKind::User => "users",
        }
    }

    /// Composite key `"<ClassName>.<id>"`
    pub fn key_for(self, id: &str) -> String {
        format!("{}.{}", self.class_name(), id)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

impl FromStr for EntityKind {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.class_name() == s)
            .ok_or_else(|| EntityError::UnknownClass(s.to_string()))
    }
}

/// Any catalog entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    Amenity(Amenity),
    City(City),
    Place(Place),
    Review(Review),
    State(State),
    User(User),
}

impl Entity {
    /// Fresh entity of `kind` with a new identity and empty attributes
    pub fn blank(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Amenity => Amenity::new("").into(),
            EntityKind::City => City::new("", "").into(),
            EntityKind::Place => Place::new("", "", "").into(),
            EntityKind::Review => Review::new("", "", "").into(),
            EntityKind::State => State::new("").into(),
            EntityKind::User => User::new("", "").into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Amenity(_) => EntityKind::Amenity,
            Entity::City(_) => EntityKind::City,
            Entity::Place(_) => EntityKind::Place,
            Entity::Review(_) => EntityKind::Review,
            Entity::State(_) => EntityKind::State,
            Entity::User(_) => EntityKind::User,
        }
    }

    pub fn base(&self) -> &BaseModel {
        match self {
            Entity::Amenity(e) => &e.base,
            Entity::City(e) => &e.base,
            Entity::Place(e) => &e.base,
            Entity::Review(e) => &e.base,
            Entity::State(e) => &e.base,
            Entity::User(e) => &e.base,
        }
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        match self {
            Entity::Amenity(e) => &mut e.base,
            Entity::City(e) => &mut e.base,
            Entity::Place(e) => &mut e.base,
            Entity::Review(e) => &mut e.base,
            Entity::State(e) => &mut e.base,
            Entity::User(e) => &mut e.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Composite key `"<ClassName>.<id>"`
    pub fn key(&self) -> String {
        self.kind().key_for(self.id())
    }

    /// Refresh `updated_at`
    pub fn touch(&mut self) {
        self.base_mut().touch();
    }

    /// Plain mapping of every field plus the `__class__` discriminator
    pub fn to_dict(&self) -> Result<Map<String, Value>, EntityError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(EntityError::NotAnObject),
        }
    }

    /// Like [`Entity::to_dict`] but without secrets, for API responses
    pub fn to_public_dict(&self) -> Result<Map<String, Value>, EntityError> {
        let mut map = self.to_dict()?;
        if self.kind() == EntityKind::User {
            map.remove("password");
        }
        Ok(map)
    }

    /// Reconstruct an entity, picking its kind from the `__class__` field
    pub fn from_dict(map: Map<String, Value>) -> Result<Self, EntityError> {
        let kind = match map.get(CLASS_KEY) {
            Some(Value::String(name)) => name.parse::<EntityKind>()?,
            Some(other) => return Err(EntityError::UnknownClass(other.to_string())),
            None => return Err(EntityError::MissingClass),
        };
        Self::from_dict_as(kind, map)
    }

    /// Reconstruct an entity of a known kind; any `__class__` field is ignored
    pub fn from_dict_as(kind: EntityKind, map: Map<String, Value>) -> Result<Self, EntityError> {
        Ok(match kind {
            EntityKind::Amenity => Entity::Amenity(Amenity::from_dict(map)?),
            EntityKind::City => Entity::City(City::from_dict(map)?),
            EntityKind::Place => Entity::Place(Place::from_dict(map)?),
            EntityKind::Review => Entity::Review(Review::from_dict(map)?),
            EntityKind::State => Entity::State(State::from_dict(map)?),
            EntityKind::User => Entity::User(User::from_dict(map)?),
        })
    }

    /// Overwrite fields from `updates`, skipping the discriminator and any key
    /// in `ignored`. Keys that are not fields of this kind are dropped.
    pub fn apply_update(
        &mut self,
        updates: &Map<String, Value>,
        ignored: &[&str],
    ) -> Result<(), EntityError> {
        let mut fields = self.to_dict()?;
        for (key, value) in updates {
            if key == CLASS_KEY || ignored.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
        *self = Self::from_dict_as(self.kind(), fields)?;
        Ok(())
    }
}

macro_rules! impl_from_entity {
    ($($kind:ident),*) => {
        $(
            impl From<$kind> for Entity {
                fn from(value: $kind) -> Self {
                    Entity::$kind(value)
                }
            }
        )*
    };
}

impl_from_entity!(Amenity, City, Place, Review, State, User);
