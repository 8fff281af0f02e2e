//! Mock remote for testing.
//!
//! Keeps an in-memory backend, records every call, and lets tests queue
//! failures per operation, drop replies after the backend has applied a
//! call, or take the whole backend offline.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{RemoteClient, RemoteError, RemoteRecord};
use crate::entity::Entity;
use crate::record::{LocalId, RemoteId};

/// Remote operation kinds, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Create,
    Update,
    Delete,
    List,
}

/// A call observed by the mock, with the payload it carried.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall<T> {
    Create(T),
    Update(RemoteId, T),
    Delete(RemoteId),
    List,
}

#[derive(Debug)]
struct MockRemoteInner<T> {
    records: Vec<RemoteRecord<T>>,
    next_id: i64,
    unreachable: bool,
    latency: Option<Duration>,
    failures: HashMap<RemoteOp, VecDeque<RemoteError>>,
    lost_replies: HashMap<RemoteOp, usize>,
    keys: HashMap<LocalId, RemoteId>,
    calls: Vec<RemoteCall<T>>,
}

impl<T> MockRemoteInner<T> {
    /// Fails an applied call as if its reply never arrived.
    fn deliver<R>(&mut self, op: RemoteOp, reply: R) -> Result<R, RemoteError> {
        match self.lost_replies.get_mut(&op) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(RemoteError::Unavailable("reply lost".to_string()))
            }
            _ => Ok(reply),
        }
    }
}

#[derive(Debug)]
pub struct MockRemote<T> {
    inner: Arc<Mutex<MockRemoteInner<T>>>,
}

impl<T> Clone for MockRemote<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> Default for MockRemote<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MockRemote<T> {
    /// Create an empty mock backend whose first assigned id is 1.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRemoteInner {
                records: Vec::new(),
                next_id: 1,
                unreachable: false,
                latency: None,
                failures: HashMap::new(),
                lost_replies: HashMap::new(),
                keys: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockRemoteInner<T>> {
        // A panic in another test thread must not cascade here
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the id the next successful create will return.
    pub fn set_next_id(&self, id: i64) {
        self.lock().next_id = id;
    }

    /// Take the backend offline (every call fails with `Unavailable`) or back online.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Delay every call by the given duration.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Cause the next call of the given kind to fail with `error`.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Apply the next call of the given kind, then fail it with `Unavailable`.
    pub fn lose_next_reply(&self, op: RemoteOp) {
        *self.lock().lost_replies.entry(op).or_default() += 1;
    }

    /// Seed a record on the backend side.
    pub fn insert(&self, id: impl Into<RemoteId>, data: T) {
        let id = id.into();
        let mut inner = self.lock();
        inner.records.retain(|r| r.id != id);
        inner.records.push(RemoteRecord { id, data });
    }

    /// Remove a record on the backend side without recording a call.
    pub fn remove(&self, id: &RemoteId) {
        self.lock().records.retain(|r| &r.id != id);
    }

    pub fn get(&self, id: &RemoteId) -> Option<T> {
        self.lock()
            .records
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.data.clone())
    }

    pub fn records(&self) -> Vec<RemoteRecord<T>> {
        self.lock().records.clone()
    }

    pub fn calls(&self) -> Vec<RemoteCall<T>> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Records the call, sleeps for the configured latency, then reports any failure.
    async fn enter(&self, op: RemoteOp, call: RemoteCall<T>) -> Result<(), RemoteError> {
        let latency = {
            let mut inner = self.lock();
            inner.calls.push(call);
            inner.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.lock();
        if inner.unreachable {
            return Err(RemoteError::Unavailable("connection refused".to_string()));
        }
        if let Some(error) = inner.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> RemoteClient<T> for MockRemote<T> {
    async fn create(&self, local_id: LocalId, entity: &T) -> Result<RemoteId, RemoteError> {
        self.enter(RemoteOp::Create, RemoteCall::Create(entity.clone()))
            .await?;

        let mut inner = self.lock();
        let existing = inner
            .keys
            .get(&local_id)
            .filter(|id| inner.records.iter().any(|r| &r.id == *id))
            .cloned();
        let id = match existing {
            Some(id) => id,
            None => {
                let id = RemoteId::from(inner.next_id);
                inner.next_id += 1;
                inner.records.push(RemoteRecord {
                    id: id.clone(),
                    data: entity.clone(),
                });
                inner.keys.insert(local_id, id.clone());
                id
            }
        };
        inner.deliver(RemoteOp::Create, id)
    }

    async fn update(&self, remote_id: &RemoteId, entity: &T) -> Result<(), RemoteError> {
        self.enter(
            RemoteOp::Update,
            RemoteCall::Update(remote_id.clone(), entity.clone()),
        )
        .await?;

        let mut inner = self.lock();
        match inner.records.iter_mut().find(|r| &r.id == remote_id) {
            Some(record) => {
                record.data = entity.clone();
                inner.deliver(RemoteOp::Update, ())
            }
            None => Err(RemoteError::Rejected {
                status: 404,
                message: format!("{} not found", remote_id),
            }),
        }
    }

    async fn delete(&self, remote_id: &RemoteId) -> Result<(), RemoteError> {
        self.enter(RemoteOp::Delete, RemoteCall::Delete(remote_id.clone()))
            .await?;

        let mut inner = self.lock();
        inner.records.retain(|r| &r.id != remote_id);
        inner.deliver(RemoteOp::Delete, ())
    }

    async fn list_all(&self) -> Result<Vec<RemoteRecord<T>>, RemoteError> {
        self.enter(RemoteOp::List, RemoteCall::List).await?;
        Ok(self.lock().records.clone())
    }
}
