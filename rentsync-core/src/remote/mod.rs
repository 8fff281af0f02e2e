//! Backend boundary.
//!
//! A [`RemoteClient`] performs the four CRUD calls a reconciler needs for one
//! entity type. [`HttpRemote`] talks to the rental REST API; [`MockRemote`]
//! is an in-memory double for tests.

mod http;
mod mock;

pub use http::{check_server, http_client, HttpRemote};
pub use mock::{MockRemote, RemoteCall, RemoteOp};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::Entity;
use crate::record::{LocalId, RemoteId};

/// Request header carrying the local id of a create. The backend answers a
/// repeated key with the record the first request made.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Errors returned by a remote client.
///
/// None of these are fatal to a reconciliation pass: the affected record
/// keeps its pending flag and is retried on the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network failure, timeout or a transient server error.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the request (4xx).
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered with a body that could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

/// A backend record: its id plus the entity fields, flattened on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord<T> {
    pub id: RemoteId,
    #[serde(flatten)]
    pub data: T,
}

/// Per-entity CRUD against the backend.
#[async_trait]
pub trait RemoteClient<T: Entity>: Send + Sync {
    /// Creates the entity and returns the id the backend assigned.
    ///
    /// `local_id` is the idempotency key: retrying a create whose reply was
    /// lost returns the id of the record already made.
    async fn create(&self, local_id: LocalId, entity: &T) -> Result<RemoteId, RemoteError>;

    async fn update(&self, remote_id: &RemoteId, entity: &T) -> Result<(), RemoteError>;

    /// Deletes the entity. Deleting an id the backend no longer has succeeds.
    async fn delete(&self, remote_id: &RemoteId) -> Result<(), RemoteError>;

    /// The full authoritative set for this entity type.
    async fn list_all(&self) -> Result<Vec<RemoteRecord<T>>, RemoteError>;
}
