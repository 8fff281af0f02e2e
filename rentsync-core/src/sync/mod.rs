//! Offline-first synchronization engine.
//!
//! # Passes
//!
//! A reconciliation pass handles one entity type:
//! 1. Push: every pending create, update and delete is sent to the backend.
//!    Failures leave the pending flag set and the pass moves on.
//! 2. Pull: the backend's full set is merged into the local store. Records
//!    with a pending flag are never overwritten. If the backend could not be
//!    reached at all, the pull is skipped so an empty answer cannot wipe
//!    local data.
//!
//! # Triggers
//!
//! [`SyncCoordinator`] runs passes with at most one in flight per entity
//! type, across processes when given a [`PassLease`]. [`SyncScheduler`]
//! arms persisted periodic timers on top of it.

mod coordinator;
mod error;
mod lease;
mod reconciler;
mod report;
mod scheduler;

pub use coordinator::SyncCoordinator;
pub use error::SyncError;
pub use lease::{MemoryLease, PassLease, LEASE_TTL};
pub use reconciler::{Reconcile, Reconciler};
pub use report::{PullStatus, SyncReport};
pub use scheduler::{
    periodic_task_id, MemoryScheduleStore, ScheduleEntry, ScheduleStore, SyncScheduler,
};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{Reconcile, SyncError, SyncReport};
    use crate::entity::EntityType;

    /// Reconciler double that counts passes and tracks overlap.
    #[derive(Clone)]
    pub struct CountingReconciler {
        pub entity_type: EntityType,
        pub delay: Duration,
        pub passes: Arc<AtomicUsize>,
        pub active: Arc<AtomicUsize>,
        pub max_active: Arc<AtomicUsize>,
    }

    impl CountingReconciler {
        pub fn new(entity_type: EntityType, delay: Duration) -> Self {
            Self {
                entity_type,
                delay,
                passes: Arc::new(AtomicUsize::new(0)),
                active: Arc::new(AtomicUsize::new(0)),
                max_active: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn passes(&self) -> usize {
            self.passes.load(Ordering::SeqCst)
        }

        pub fn max_active(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Reconcile for CountingReconciler {
        fn entity_type(&self) -> EntityType {
            self.entity_type
        }

        async fn reconcile(&self) -> Result<SyncReport, SyncError> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.passes.fetch_add(1, Ordering::SeqCst);
            Ok(SyncReport::new(self.entity_type))
        }
    }
}
