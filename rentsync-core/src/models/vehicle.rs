use serde::{Deserialize, Serialize};
use std::fmt;

use super::{trim_in_place, trim_optional};
use crate::entity::{Entity, EntityType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub daily_rate_cents: i64,
    /// Remote id of the location the vehicle is parked at.
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Vehicle {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        license_plate: impl Into<String>,
    ) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            license_plate: license_plate.into(),
            daily_rate_cents: 0,
            location_id: None,
            available: true,
        }
    }

    pub fn with_daily_rate(mut self, cents: i64) -> Self {
        self.daily_rate_cents = cents;
        self
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

impl Entity for Vehicle {
    const ENTITY_TYPE: EntityType = EntityType::Vehicles;

    fn normalize(&mut self) {
        trim_in_place(&mut self.make);
        trim_in_place(&mut self.model);
        trim_in_place(&mut self.license_plate);
        trim_optional(&mut self.location_id);
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}.{:02}/day",
            self.display_name(),
            self.license_plate,
            self.daily_rate_cents / 100,
            self.daily_rate_cents % 100
        )?;
        if !self.available {
            write!(f, " (unavailable)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_builder() {
        let vehicle = Vehicle::new("Toyota", "Corolla", 2022, "ABC-123")
            .with_daily_rate(4599)
            .with_location("7");

        assert_eq!(vehicle.display_name(), "2022 Toyota Corolla");
        assert_eq!(vehicle.location_id.as_deref(), Some("7"));
        assert!(vehicle.available);
        assert_eq!(vehicle.to_string(), "2022 Toyota Corolla [ABC-123] 45.99/day");
    }

    #[test]
    fn test_vehicle_normalize_trims() {
        let mut vehicle = Vehicle::new(" Ford ", "Focus  ", 2019, " XYZ-9 ");
        vehicle.normalize();
        assert_eq!(vehicle.make, "Ford");
        assert_eq!(vehicle.model, "Focus");
        assert_eq!(vehicle.license_plate, "XYZ-9");
    }

    #[test]
    fn test_vehicle_deserialize_defaults() {
        let json = r#"{"make":"Kia","model":"Rio","year":2020,"license_plate":"K1","daily_rate_cents":3000}"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert!(vehicle.available);
        assert!(vehicle.location_id.is_none());
    }
}
