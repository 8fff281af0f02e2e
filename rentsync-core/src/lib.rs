//! rentsync Core Library
//!
//! Entity models and the offline-first sync engine shared by the rentsync
//! applications. Writes land in a local store first, marked pending, and are
//! reconciled against the rental backend by per-entity reconcilers.

pub mod entity;
pub mod models;
pub mod record;
pub mod remote;
pub mod repository;
pub mod store;
pub mod sync;

pub use entity::{Entity, EntityType, ParseEntityTypeError};
pub use models::{
    Location, Message, Reservation, ReservationStatus, User, UserRole, Vehicle,
};
pub use record::{LocalDelete, LocalId, PendingOp, RemoteId, SyncRecord};
pub use remote::{check_server, HttpRemote, MockRemote, RemoteClient, RemoteError};
pub use repository::{Repository, RepositoryError};
pub use store::{LocalStore, MemoryStore, StoreError};
pub use sync::{
    MemoryLease, MemoryScheduleStore, PassLease, PullStatus, Reconcile, Reconciler,
    ScheduleEntry, ScheduleStore, SyncCoordinator, SyncError, SyncReport, SyncScheduler,
    LEASE_TTL,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
