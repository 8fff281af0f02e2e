//! In-memory local store.
//!
//! Backs tests and short-lived tools. Supports injecting a failure into the
//! next write so callers can exercise local-store error paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{LocalStore, StoreError};
use crate::entity::Entity;
use crate::record::{LocalId, RemoteId, SyncRecord};

#[derive(Debug)]
pub struct MemoryStore<T> {
    records: Arc<RwLock<HashMap<LocalId, SyncRecord<T>>>>,
    fail_next_write: Arc<Mutex<Option<String>>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            fail_next_write: Arc::clone(&self.fail_next_write),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            fail_next_write: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause the next `upsert()` or `delete()` to fail with the given message.
    pub async fn fail_next_write(&self, reason: &str) {
        *self.fail_next_write.lock().await = Some(reason.to_string());
    }

    /// Snapshot of every record, pending deletes included, ordered by local id.
    pub async fn snapshot(&self) -> Vec<SyncRecord<T>> {
        let records = self.records.read().await;
        let mut all: Vec<SyncRecord<T>> = records.values().cloned().collect();
        all.sort_by_key(|r| r.local_id);
        all
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn check_write(&self) -> Result<(), StoreError> {
        match self.fail_next_write.lock().await.take() {
            Some(reason) => Err(StoreError::Injected(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T: Entity> LocalStore<T> for MemoryStore<T> {
    async fn query_pending(&self) -> Result<Vec<SyncRecord<T>>, StoreError> {
        let records = self.records.read().await;
        let mut pending: Vec<SyncRecord<T>> =
            records.values().filter(|r| r.is_pending()).cloned().collect();
        pending.sort_by_key(|r| r.updated_at);
        Ok(pending)
    }

    async fn query_all(&self) -> Result<Vec<SyncRecord<T>>, StoreError> {
        let records = self.records.read().await;
        let mut visible: Vec<SyncRecord<T>> = records
            .values()
            .filter(|r| !r.pending_delete())
            .cloned()
            .collect();
        visible.sort_by_key(|r| r.updated_at);
        Ok(visible)
    }

    async fn get(&self, local_id: LocalId) -> Result<Option<SyncRecord<T>>, StoreError> {
        Ok(self.records.read().await.get(&local_id).cloned())
    }

    async fn find_by_remote_id(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Option<SyncRecord<T>>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.remote_id.as_ref() == Some(remote_id))
            .cloned())
    }

    async fn upsert(&self, record: &SyncRecord<T>) -> Result<(), StoreError> {
        self.check_write().await?;
        self.records
            .write()
            .await
            .insert(record.local_id, record.clone());
        Ok(())
    }

    async fn delete(&self, local_id: LocalId) -> Result<(), StoreError> {
        self.check_write().await?;
        self.records.write().await.remove(&local_id);
        Ok(())
    }

    async fn replace_if_synced(&self, record: &SyncRecord<T>) -> Result<bool, StoreError> {
        self.check_write().await?;
        let mut records = self.records.write().await;
        match records.get_mut(&record.local_id) {
            Some(current) if !current.is_pending() => {
                *current = record.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_if_synced(&self, local_id: LocalId) -> Result<bool, StoreError> {
        self.check_write().await?;
        let mut records = self.records.write().await;
        match records.get(&local_id) {
            Some(current) if !current.is_pending() => {
                records.remove(&local_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
