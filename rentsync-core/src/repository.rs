//! Local-first writes and reads for one entity type.
//!
//! Every write lands in the local store with the matching pending flag and
//! returns without touching the network. When a [`SyncCoordinator`] is
//! attached, the write also requests an on-demand pass for the entity type.

use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

use crate::entity::Entity;
use crate::record::{LocalDelete, LocalId, RemoteId, SyncRecord};
use crate::store::{LocalStore, StoreError};
use crate::sync::SyncCoordinator;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Repository<T, S> {
    store: Arc<S>,
    coordinator: Option<Arc<SyncCoordinator>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Repository<T, S>
where
    T: Entity,
    S: LocalStore<T>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            coordinator: None,
            _entity: PhantomData,
        }
    }

    /// Requests a sync pass after each successful write.
    pub fn with_sync(mut self, coordinator: Arc<SyncCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn request_sync(&self) {
        if let Some(coordinator) = &self.coordinator {
            coordinator.request(T::ENTITY_TYPE);
        }
    }

    pub async fn create(&self, mut data: T) -> Result<SyncRecord<T>, RepositoryError> {
        data.normalize();
        let record = SyncRecord::new_local(data);
        self.store.upsert(&record).await?;
        tracing::debug!("{}: created {} locally", T::ENTITY_TYPE, record.local_id);

        self.request_sync();
        Ok(record)
    }

    pub async fn update(
        &self,
        local_id: LocalId,
        mut data: T,
    ) -> Result<SyncRecord<T>, RepositoryError> {
        let mut record = self
            .get(local_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(local_id.to_string()))?;

        data.normalize();
        record.mark_updated(data);
        self.store.upsert(&record).await?;
        tracing::debug!("{}: updated {} locally", T::ENTITY_TYPE, local_id);

        self.request_sync();
        Ok(record)
    }

    /// Deletes a record. A record that never reached the backend is erased;
    /// any other record is hidden until the backend confirms the delete.
    pub async fn delete(&self, local_id: LocalId) -> Result<LocalDelete, RepositoryError> {
        let mut record = self
            .get(local_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(local_id.to_string()))?;

        let outcome = record.mark_deleted();
        match outcome {
            LocalDelete::Erase => self.store.delete(local_id).await?,
            LocalDelete::Pending => {
                self.store.upsert(&record).await?;
                self.request_sync();
            }
        }
        tracing::debug!("{}: deleted {} locally ({:?})", T::ENTITY_TYPE, local_id, outcome);
        Ok(outcome)
    }

    /// A visible record by local id. Records pending deletion are hidden.
    pub async fn get(&self, local_id: LocalId) -> Result<Option<SyncRecord<T>>, RepositoryError> {
        let record = self.store.get(local_id).await?;
        Ok(record.filter(|r| !r.pending_delete()))
    }

    /// A visible record by local UUID or backend id.
    pub async fn find(&self, reference: &str) -> Result<Option<SyncRecord<T>>, RepositoryError> {
        if let Ok(local_id) = reference.parse::<LocalId>() {
            if let Some(record) = self.get(local_id).await? {
                return Ok(Some(record));
            }
        }
        let record = self
            .store
            .find_by_remote_id(&RemoteId::new(reference.trim()))
            .await?;
        Ok(record.filter(|r| !r.pending_delete()))
    }

    pub async fn list(&self) -> Result<Vec<SyncRecord<T>>, RepositoryError> {
        Ok(self.store.query_all().await?)
    }

    pub async fn list_pending(&self) -> Result<Vec<SyncRecord<T>>, RepositoryError> {
        Ok(self.store.query_pending().await?)
    }
}
