//! Single-flight execution of reconciliation passes.
//!
//! Each entity type gets a lane guarded by an async mutex, so at most one
//! pass per entity type is in flight. Lanes are independent: vehicles and
//! reservations may reconcile at the same time.
//!
//! On-demand requests are coalesced: while a requested pass is waiting for
//! its lane, further requests for the same entity type are absorbed by it.
//!
//! With a [`PassLease`] attached, every pass also holds the entity type's
//! lease, which extends single flight to other processes sharing the store.

use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::error::SyncError;
use super::lease::{self, PassLease, LEASE_RENEW};
use super::reconciler::Reconcile;
use super::report::SyncReport;
use crate::entity::EntityType;

#[derive(Clone)]
struct SharedLease {
    lease: Arc<dyn PassLease>,
    wait: Duration,
}

impl SharedLease {
    /// Runs the pass while holding the lease, renewing it until the pass ends.
    async fn run(&self, reconciler: &dyn Reconcile) -> Result<SyncReport, SyncError> {
        let entity_type = reconciler.entity_type();
        lease::acquire(self.lease.as_ref(), entity_type, self.wait).await?;

        let pass = reconciler.reconcile();
        tokio::pin!(pass);
        let mut renew = tokio::time::interval_at(Instant::now() + LEASE_RENEW, LEASE_RENEW);
        let result = loop {
            tokio::select! {
                result = &mut pass => break result,
                _ = renew.tick() => match self.lease.try_acquire(entity_type).await {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!("{}: sync lease taken by another process", entity_type),
                    Err(e) => tracing::warn!("{}: failed to renew sync lease: {}", entity_type, e),
                },
            }
        };

        if let Err(e) = self.lease.release(entity_type).await {
            tracing::warn!("{}: failed to release sync lease: {}", entity_type, e);
        }
        result
    }
}

struct Lane {
    reconciler: Arc<dyn Reconcile>,
    running: tokio::sync::Mutex<()>,
    /// A requested pass is waiting for the lane.
    queued: AtomicBool,
}

impl Lane {
    async fn run(&self, lease: Option<&SharedLease>) -> Result<SyncReport, SyncError> {
        let _guard = self.running.lock().await;
        // Requests made before this point are covered by this pass
        self.queued.store(false, Ordering::SeqCst);
        match lease {
            Some(lease) => lease.run(self.reconciler.as_ref()).await,
            None => self.reconciler.reconcile().await,
        }
    }
}

/// Runs reconciliation passes with at most one in flight per entity type.
#[derive(Default)]
pub struct SyncCoordinator {
    lanes: HashMap<EntityType, Arc<Lane>>,
    lease: Option<SharedLease>,
    requested: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("entity_types", &self.entity_types())
            .field("leased", &self.lease.is_some())
            .finish_non_exhaustive()
    }
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every pass hold `lease` for its entity type. A pass that cannot
    /// get the lease within `wait` fails with [`SyncError::Busy`].
    pub fn with_lease(mut self, lease: Arc<dyn PassLease>, wait: Duration) -> Self {
        self.lease = Some(SharedLease { lease, wait });
        self
    }

    /// Registers the reconciler for its entity type, replacing any previous one.
    pub fn register(&mut self, reconciler: Arc<dyn Reconcile>) {
        let entity_type = reconciler.entity_type();
        self.lanes.insert(
            entity_type,
            Arc::new(Lane {
                reconciler,
                running: tokio::sync::Mutex::new(()),
                queued: AtomicBool::new(false),
            }),
        );
    }

    pub fn with(mut self, reconciler: impl Reconcile + 'static) -> Self {
        self.register(Arc::new(reconciler));
        self
    }

    /// Registered entity types in sync order.
    pub fn entity_types(&self) -> Vec<EntityType> {
        EntityType::ALL
            .into_iter()
            .filter(|t| self.lanes.contains_key(t))
            .collect()
    }

    fn lane(&self, entity_type: EntityType) -> Result<Arc<Lane>, SyncError> {
        self.lanes
            .get(&entity_type)
            .cloned()
            .ok_or(SyncError::NotRegistered(entity_type))
    }

    fn requested(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.requested.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs one pass and waits for it. Queues behind a pass already running
    /// for the same entity type.
    pub async fn run_once(&self, entity_type: EntityType) -> Result<SyncReport, SyncError> {
        self.lane(entity_type)?.run(self.lease.as_ref()).await
    }

    /// Requests a pass in the background.
    ///
    /// Returns false if the request was coalesced into a pass that is already
    /// waiting to start, or if no reconciler is registered.
    pub fn request(&self, entity_type: EntityType) -> bool {
        let lane = match self.lane(entity_type) {
            Ok(lane) => lane,
            Err(e) => {
                tracing::warn!("Sync request ignored: {}", e);
                return false;
            }
        };

        if lane.queued.swap(true, Ordering::SeqCst) {
            tracing::debug!("{}: sync request coalesced", entity_type);
            return false;
        }

        let lease = self.lease.clone();
        let handle = tokio::spawn(async move {
            match lane.run(lease.as_ref()).await {
                Ok(report) => tracing::debug!("Requested sync finished: {}", report),
                Err(e) => tracing::warn!("Requested sync failed: {}", e),
            }
        });

        let mut requested = self.requested();
        requested.retain(|h| !h.is_finished());
        requested.push(handle);
        true
    }

    /// Waits for every pass started through [`request`](Self::request).
    pub async fn flush(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.requested());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
    }

    /// Runs one pass per registered entity type, concurrently.
    pub async fn run_all(&self) -> Vec<(EntityType, Result<SyncReport, SyncError>)> {
        let entity_types = self.entity_types();
        let passes = entity_types.iter().map(|&t| self.run_once(t));
        let results = join_all(passes).await;
        entity_types.into_iter().zip(results).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::lease::MemoryLease;
    use crate::sync::test_support::CountingReconciler;

    #[tokio::test]
    async fn test_run_once_unknown_entity() {
        let coordinator = SyncCoordinator::new();
        let err = coordinator.run_once(EntityType::Vehicles).await.unwrap_err();
        assert!(matches!(err, SyncError::NotRegistered(EntityType::Vehicles)));
        assert!(!coordinator.request(EntityType::Vehicles));
    }

    #[tokio::test]
    async fn test_same_entity_passes_never_overlap() {
        let vehicles = CountingReconciler::new(EntityType::Vehicles, Duration::from_millis(20));
        let coordinator = Arc::new(SyncCoordinator::new().with(vehicles.clone()));

        let a = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.run_once(EntityType::Vehicles).await }
        });
        let b = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.run_once(EntityType::Vehicles).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(vehicles.passes(), 2);
        assert_eq!(vehicles.max_active(), 1);
    }

    #[tokio::test]
    async fn test_requests_during_pass_are_coalesced() {
        let messages = CountingReconciler::new(EntityType::Messages, Duration::from_millis(30));
        let coordinator = SyncCoordinator::new().with(messages.clone());

        assert!(coordinator.request(EntityType::Messages));
        // Let the first pass take the lane
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(coordinator.request(EntityType::Messages));
        assert!(!coordinator.request(EntityType::Messages));
        assert!(!coordinator.request(EntityType::Messages));

        coordinator.flush().await;

        assert_eq!(messages.passes(), 2);
        assert_eq!(messages.max_active(), 1);
    }

    #[tokio::test]
    async fn test_different_entities_run_concurrently() {
        let vehicles = CountingReconciler::new(EntityType::Vehicles, Duration::from_millis(20));
        let users = CountingReconciler::new(EntityType::Users, Duration::from_millis(20));
        let coordinator = SyncCoordinator::new()
            .with(vehicles.clone())
            .with(users.clone());

        let results = coordinator.run_all().await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(results[0].0, EntityType::Vehicles);
        assert_eq!(results[1].0, EntityType::Users);
        assert_eq!(vehicles.passes(), 1);
        assert_eq!(users.passes(), 1);
    }

    #[tokio::test]
    async fn test_entity_types_follow_sync_order() {
        let coordinator = SyncCoordinator::new()
            .with(CountingReconciler::new(EntityType::Messages, Duration::ZERO))
            .with(CountingReconciler::new(EntityType::Locations, Duration::ZERO));

        assert_eq!(
            coordinator.entity_types(),
            vec![EntityType::Locations, EntityType::Messages]
        );
    }

    #[tokio::test]
    async fn test_lease_serializes_coordinators_sharing_a_store() {
        let vehicles = CountingReconciler::new(EntityType::Vehicles, Duration::from_millis(30));
        let lease = MemoryLease::new();
        let wait = Duration::from_secs(5);

        // Two processes on one store: separate coordinators, one lease table
        let first = SyncCoordinator::new()
            .with(vehicles.clone())
            .with_lease(Arc::new(lease.share()), wait);
        let second = SyncCoordinator::new()
            .with(vehicles.clone())
            .with_lease(Arc::new(lease.share()), wait);

        let (a, b) = tokio::join!(
            first.run_once(EntityType::Vehicles),
            second.run_once(EntityType::Vehicles)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(vehicles.passes(), 2);
        assert_eq!(vehicles.max_active(), 1);
        assert!(!lease.is_held(EntityType::Vehicles));
    }

    #[tokio::test]
    async fn test_busy_lease_fails_pass() {
        let users = CountingReconciler::new(EntityType::Users, Duration::ZERO);
        let lease = MemoryLease::new();
        lease.try_acquire(EntityType::Users).await.unwrap();

        let coordinator = SyncCoordinator::new()
            .with(users.clone())
            .with_lease(Arc::new(lease.share()), Duration::from_millis(120));

        let err = coordinator.run_once(EntityType::Users).await.unwrap_err();
        assert!(matches!(err, SyncError::Busy(EntityType::Users)));
        assert_eq!(users.passes(), 0);
    }

    #[test]
    fn test_debug_lists_entity_types() {
        let coordinator = SyncCoordinator::new()
            .with(CountingReconciler::new(EntityType::Users, Duration::ZERO));
        let debug = format!("{:?}", coordinator);
        assert!(debug.contains("Users"));
    }
}
