mod location;
mod message;
mod reservation;
mod user;
mod vehicle;

pub use location::Location;
pub use message::Message;
pub use reservation::{Reservation, ReservationStatus};
pub use user::{User, UserRole};
pub use vehicle::Vehicle;

/// Trims leading and trailing whitespace without reallocating when nothing changes.
pub(crate) fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

pub(crate) fn trim_optional(value: &mut Option<String>) {
    if let Some(inner) = value {
        trim_in_place(inner);
        if inner.is_empty() {
            *value = None;
        }
    }
}
