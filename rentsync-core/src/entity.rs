//! Entity type enumeration and the trait every syncable payload implements.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity types that are synchronized with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Vehicles,
    Reservations,
    Users,
    Messages,
    Locations,
}

impl EntityType {
    /// All entity types, in the order a full sync visits them.
    pub const ALL: [EntityType; 5] = [
        EntityType::Locations,
        EntityType::Vehicles,
        EntityType::Users,
        EntityType::Reservations,
        EntityType::Messages,
    ];

    /// Resource name, used both as the REST path segment and the local table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Vehicles => "vehicles",
            EntityType::Reservations => "reservations",
            EntityType::Users => "users",
            EntityType::Messages => "messages",
            EntityType::Locations => "locations",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type '{0}' (expected one of: vehicles, reservations, users, messages, locations)")]
pub struct ParseEntityTypeError(pub String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vehicles" | "vehicle" => Ok(EntityType::Vehicles),
            "reservations" | "reservation" => Ok(EntityType::Reservations),
            "users" | "user" => Ok(EntityType::Users),
            "messages" | "message" => Ok(EntityType::Messages),
            "locations" | "location" => Ok(EntityType::Locations),
            _ => Err(ParseEntityTypeError(s.to_string())),
        }
    }
}

/// A payload that can be stored locally and pushed to the backend.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const ENTITY_TYPE: EntityType;

    /// Trims free-text fields before the payload is stored.
    fn normalize(&mut self) {}
}
