use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{trim_in_place, trim_optional};
use crate::entity::{Entity, EntityType};

/// A support conversation message, optionally tied to a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default)]
    pub reservation_id: Option<String>,
    pub sender: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub from_support: bool,
}

impl Message {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            reservation_id: None,
            sender: sender.into(),
            body: body.into(),
            sent_at: Utc::now(),
            from_support: false,
        }
    }

    pub fn with_reservation(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }

    pub fn from_support(mut self) -> Self {
        self.from_support = true;
        self
    }
}

impl Entity for Message {
    const ENTITY_TYPE: EntityType = EntityType::Messages;

    fn normalize(&mut self) {
        trim_in_place(&mut self.sender);
        trim_in_place(&mut self.body);
        trim_optional(&mut self.reservation_id);
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = if self.from_support {
            "support"
        } else {
            self.sender.as_str()
        };
        write!(
            f,
            "[{}] {}: {}",
            self.sent_at.format("%Y-%m-%d %H:%M"),
            who,
            self.body
        )
    }
}
