use serde::{Deserialize, Serialize};
use std::fmt;

use super::{trim_in_place, trim_optional};
use crate::entity::{Entity, EntityType};

/// A rental branch where vehicles are picked up and returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Location {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            city: city.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

impl Entity for Location {
    const ENTITY_TYPE: EntityType = EntityType::Locations;

    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.address);
        trim_in_place(&mut self.city);
        trim_optional(&mut self.phone);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}, {}", self.name, self.address, self.city)
    }
}
