//! Sync error types.

use thiserror::Error;

use crate::entity::EntityType;
use crate::store::StoreError;

/// Errors that fail a whole pass or a trigger operation.
///
/// Remote errors never appear here: they are counted in the
/// [`SyncReport`](super::SyncReport) and retried on the next pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store failed; the pass for this entity type was aborted.
    #[error("{entity_type}: local store failure: {source}")]
    LocalStore {
        entity_type: EntityType,
        #[source]
        source: StoreError,
    },

    /// No reconciler is registered for the entity type.
    #[error("no reconciler registered for {0}")]
    NotRegistered(EntityType),

    /// The persisted schedule registry failed.
    #[error("schedule registry error: {0}")]
    Schedule(#[source] StoreError),

    /// Another process held the pass lease for too long.
    #[error("{0} is being synced by another process")]
    Busy(EntityType),

    /// A periodic interval of zero was requested.
    #[error("sync interval for {0} must be greater than zero")]
    InvalidInterval(EntityType),
}

impl SyncError {
    pub fn local_store(entity_type: EntityType, source: StoreError) -> Self {
        SyncError::LocalStore {
            entity_type,
            source,
        }
    }
}
