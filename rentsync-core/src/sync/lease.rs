//! Cross-process exclusion for reconciliation passes.
//!
//! The coordinator's lane mutex only serializes passes inside one process.
//! When several processes share a local store (a daemon plus short-lived CLI
//! invocations), each pass also takes a [`PassLease`] for its entity type.
//! Leases expire so a crashed holder cannot block syncing forever; a running
//! pass renews its lease while it works.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::error::SyncError;
use crate::entity::EntityType;
use crate::store::StoreError;

/// How long a lease stays valid without renewal.
pub const LEASE_TTL: Duration = Duration::from_secs(60);

/// How often a running pass renews its lease.
pub(crate) const LEASE_RENEW: Duration = Duration::from_secs(20);

const LEASE_POLL: Duration = Duration::from_millis(50);

/// Per-entity-type lease shared by every process using the same store.
#[async_trait]
pub trait PassLease: Send + Sync {
    /// Takes or renews the lease. Returns false while another holder has an
    /// unexpired lease on the entity type.
    async fn try_acquire(&self, entity_type: EntityType) -> Result<bool, StoreError>;

    /// Releases the lease if this holder has it.
    async fn release(&self, entity_type: EntityType) -> Result<(), StoreError>;
}

/// Waits for the lease, polling until `wait` has elapsed.
pub(crate) async fn acquire(
    lease: &dyn PassLease,
    entity_type: EntityType,
    wait: Duration,
) -> Result<(), SyncError> {
    let deadline = Instant::now() + wait;
    loop {
        let acquired = lease
            .try_acquire(entity_type)
            .await
            .map_err(|e| SyncError::local_store(entity_type, e))?;
        if acquired {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SyncError::Busy(entity_type));
        }
        tracing::debug!("{}: another process is syncing, waiting", entity_type);
        tokio::time::sleep(LEASE_POLL).await;
    }
}

/// In-process lease table.
///
/// Clones are the same holder. [`share`](Self::share) returns a different
/// holder on the same table, so coordinators given shared handles exclude
/// each other.
#[derive(Debug, Clone, Default)]
pub struct MemoryLease {
    held: Arc<Mutex<HashMap<EntityType, usize>>>,
    holders: Arc<AtomicUsize>,
    holder: usize,
}

impl MemoryLease {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn share(&self) -> Self {
        Self {
            held: Arc::clone(&self.held),
            holders: Arc::clone(&self.holders),
            holder: self.holders.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    pub fn is_held(&self, entity_type: EntityType) -> bool {
        self.table().contains_key(&entity_type)
    }

    fn table(&self) -> MutexGuard<'_, HashMap<EntityType, usize>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PassLease for MemoryLease {
    async fn try_acquire(&self, entity_type: EntityType) -> Result<bool, StoreError> {
        let mut held = self.table();
        let holder = *held.entry(entity_type).or_insert(self.holder);
        Ok(holder == self.holder)
    }

    async fn release(&self, entity_type: EntityType) -> Result<(), StoreError> {
        let mut held = self.table();
        if held.get(&entity_type) == Some(&self.holder) {
            held.remove(&entity_type);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_lease_excludes_other_holders() {
        let lease = MemoryLease::new();
        let other = lease.share();

        assert!(lease.try_acquire(EntityType::Vehicles).await.unwrap());
        // Renewal by the same holder
        assert!(lease.try_acquire(EntityType::Vehicles).await.unwrap());
        assert!(!other.try_acquire(EntityType::Vehicles).await.unwrap());
        assert!(other.try_acquire(EntityType::Users).await.unwrap());

        // Only the holder can release
        other.release(EntityType::Vehicles).await.unwrap();
        assert!(lease.is_held(EntityType::Vehicles));

        lease.release(EntityType::Vehicles).await.unwrap();
        assert!(other.try_acquire(EntityType::Vehicles).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_gives_up_after_wait() {
        let lease = MemoryLease::new();
        lease.try_acquire(EntityType::Messages).await.unwrap();

        let err = acquire(&lease.share(), EntityType::Messages, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Busy(EntityType::Messages)));
    }
}
