//! Sync bookkeeping wrapped around every locally stored entity.
//!
//! A [`SyncRecord`] pairs an entity payload with its client-generated local
//! id, the backend id (once the record has been pushed), and the pending
//! operation that still has to be confirmed by the backend.
//!
//! The three pending flags (`pending_create`, `pending_update`,
//! `pending_delete`) are stored as a single [`PendingOp`], so at most one of
//! them can ever be set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Client-generated identifier, stable for the record's local lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LocalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for LocalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier assigned by the backend on a successful create.
///
/// Backends hand these out as JSON numbers or strings; both decode to the
/// same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Ok(RemoteId(s)),
            RawId::Number(n) => Ok(RemoteId(n.to_string())),
        }
    }
}

impl From<i64> for RemoteId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for RemoteId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local mutation that has not yet been confirmed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingOp {
    #[default]
    None,
    Create,
    Update,
    Delete,
}

impl fmt::Display for PendingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOp::None => write!(f, "synced"),
            PendingOp::Create => write!(f, "pending create"),
            PendingOp::Update => write!(f, "pending update"),
            PendingOp::Delete => write!(f, "pending delete"),
        }
    }
}

/// What the store has to do after a local delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalDelete {
    /// The record never reached the backend; erase it right away.
    Erase,
    /// Keep the record, hidden, until the backend confirms the delete.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord<T> {
    pub local_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub pending: PendingOp,
    pub data: T,
    pub updated_at: DateTime<Utc>,
}

impl<T> SyncRecord<T> {
    /// A record created on this device, waiting for its first push.
    pub fn new_local(data: T) -> Self {
        Self {
            local_id: LocalId::new(),
            remote_id: None,
            pending: PendingOp::Create,
            data,
            updated_at: Utc::now(),
        }
    }

    /// A record materialized from the backend during a pull.
    pub fn from_remote(remote_id: RemoteId, data: T) -> Self {
        Self {
            local_id: LocalId::new(),
            remote_id: Some(remote_id),
            pending: PendingOp::None,
            data,
            updated_at: Utc::now(),
        }
    }

    pub fn pending_create(&self) -> bool {
        self.pending == PendingOp::Create
    }

    pub fn pending_update(&self) -> bool {
        self.pending == PendingOp::Update
    }

    pub fn pending_delete(&self) -> bool {
        self.pending == PendingOp::Delete
    }

    pub fn is_pending(&self) -> bool {
        self.pending != PendingOp::None
    }

    /// Applies a local edit. A record that was never pushed stays a create.
    pub fn mark_updated(&mut self, data: T) {
        self.data = data;
        self.updated_at = Utc::now();
        if self.pending != PendingOp::Create {
            self.pending = PendingOp::Update;
        }
    }

    pub fn mark_deleted(&mut self) -> LocalDelete {
        self.updated_at = Utc::now();
        if self.remote_id.is_none() {
            return LocalDelete::Erase;
        }
        self.pending = PendingOp::Delete;
        LocalDelete::Pending
    }

    /// Replaces the payload with the backend's copy. Callers must check
    /// [`is_pending`](Self::is_pending) first.
    pub fn overwrite_from_remote(&mut self, data: T) {
        debug_assert!(!self.is_pending());
        self.data = data;
        self.updated_at = Utc::now();
    }
}

impl<T: PartialEq> SyncRecord<T> {
    /// Confirms that `pushed` now exists on the backend as `remote_id`.
    ///
    /// If the payload was edited locally while the create was in flight, the
    /// record stays pending as an update carrying the newer payload.
    pub fn confirm_created(&mut self, remote_id: RemoteId, pushed: &T) {
        self.remote_id = Some(remote_id);
        self.pending = if self.data == *pushed {
            PendingOp::None
        } else {
            PendingOp::Update
        };
    }

    /// Confirms that `pushed` was stored by the backend. Newer local edits
    /// and local deletes stay pending.
    pub fn confirm_updated(&mut self, pushed: &T) {
        if self.pending == PendingOp::Update && self.data == *pushed {
            self.pending = PendingOp::None;
        }
    }
}
