use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{trim_in_place, trim_optional};
use crate::entity::{Entity, EntityType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Confirmed => write!(f, "confirmed"),
            ReservationStatus::Active => write!(f, "active"),
            ReservationStatus::Completed => write!(f, "completed"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "active" => Ok(ReservationStatus::Active),
            "completed" => Ok(ReservationStatus::Completed),
            "cancelled" | "canceled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!(
                "Invalid status '{}'. Valid statuses: pending, confirmed, active, completed, cancelled",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    /// Remote id of the reserved vehicle.
    pub vehicle_id: String,
    /// Remote id of the renting user.
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: ReservationStatus,
    #[serde(default)]
    pub total_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Reservation {
    pub fn new(
        vehicle_id: impl Into<String>,
        user_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            user_id: user_id.into(),
            start_date,
            end_date,
            status: ReservationStatus::Pending,
            total_cents: 0,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Prices the reservation from a vehicle's daily rate.
    pub fn priced_at(mut self, daily_rate_cents: i64) -> Self {
        self.total_cents = daily_rate_cents * self.days();
        self
    }

    /// Number of rental days; a same-day return counts as one day.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days().max(1)
    }

    pub fn cancel(&mut self) {
        self.status = ReservationStatus::Cancelled;
    }
}

impl Entity for Reservation {
    const ENTITY_TYPE: EntityType = EntityType::Reservations;

    fn normalize(&mut self) {
        trim_in_place(&mut self.vehicle_id);
        trim_in_place(&mut self.user_id);
        trim_optional(&mut self.notes);
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} vehicle {} for user {} ({})",
            self.start_date, self.end_date, self.vehicle_id, self.user_id, self.status
        )
    }
}
