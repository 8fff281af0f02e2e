//! Local persistence boundary.
//!
//! A [`LocalStore`] holds one entity type's [`SyncRecord`]s. Every method is
//! a suspension point; implementations decide how durable they are. The
//! reconciler treats any [`StoreError`] as fatal to the current pass.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::Entity;
use crate::record::{LocalId, RemoteId, SyncRecord};

/// Errors raised by a local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database or filesystem failed.
    #[error("local store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored row could not be decoded.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// The store was asked to fail (test doubles only).
    #[error("injected store failure: {0}")]
    Injected(String),
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(error))
    }
}

/// Per-entity local persistence.
#[async_trait]
pub trait LocalStore<T: Entity>: Send + Sync {
    /// All records with a pending flag set, oldest change first.
    async fn query_pending(&self) -> Result<Vec<SyncRecord<T>>, StoreError>;

    /// All visible records. Records pending deletion are excluded.
    async fn query_all(&self) -> Result<Vec<SyncRecord<T>>, StoreError>;

    /// A single record by local id, including records pending deletion.
    async fn get(&self, local_id: LocalId) -> Result<Option<SyncRecord<T>>, StoreError>;

    /// A single record by backend id, including records pending deletion.
    async fn find_by_remote_id(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Option<SyncRecord<T>>, StoreError>;

    /// Inserts the record or replaces the one with the same local id.
    async fn upsert(&self, record: &SyncRecord<T>) -> Result<(), StoreError>;

    /// Erases a record. Erasing an unknown id is not an error.
    async fn delete(&self, local_id: LocalId) -> Result<(), StoreError>;

    /// Replaces a stored record only while it has no pending flag, checked
    /// and written as one step. Returns false, leaving the store untouched,
    /// if a local write made it pending or removed it since it was read.
    async fn replace_if_synced(&self, record: &SyncRecord<T>) -> Result<bool, StoreError>;

    /// Erases a record only while it has no pending flag, checked and
    /// written as one step. Returns false if nothing was erased.
    async fn delete_if_synced(&self, local_id: LocalId) -> Result<bool, StoreError>;

    async fn count_pending(&self) -> Result<usize, StoreError> {
        Ok(self.query_pending().await?.len())
    }
}
