//! Push-then-pull reconciliation for one entity type.

use async_trait::async_trait;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use super::error::SyncError;
use super::report::{PullStatus, SyncReport};
use crate::entity::{Entity, EntityType};
use crate::record::{PendingOp, RemoteId, SyncRecord};
use crate::remote::{RemoteClient, RemoteError};
use crate::store::{LocalStore, StoreError};

/// One reconciliation pass for a single entity type.
///
/// Object safe, so a coordinator can hold reconcilers for different entity
/// types side by side.
#[async_trait]
pub trait Reconcile: Send + Sync {
    fn entity_type(&self) -> EntityType;

    async fn reconcile(&self) -> Result<SyncReport, SyncError>;
}

/// Reconciles a [`LocalStore`] against a [`RemoteClient`].
pub struct Reconciler<T, S, R> {
    store: Arc<S>,
    remote: Arc<R>,
    _entity: PhantomData<fn() -> T>,
}

/// Tally of remote outcomes during the push phase.
#[derive(Default)]
struct PushTally {
    attempts: usize,
    unavailable: usize,
}

impl PushTally {
    /// Every push call failed because the backend could not be reached.
    fn backend_unreachable(&self) -> bool {
        self.attempts > 0 && self.unavailable == self.attempts
    }
}

impl<T, S, R> Reconciler<T, S, R>
where
    T: Entity,
    S: LocalStore<T>,
    R: RemoteClient<T>,
{
    pub fn new(store: Arc<S>, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            _entity: PhantomData,
        }
    }

    async fn push(&self, report: &mut SyncReport) -> Result<PushTally, StoreError> {
        let pending = self.store.query_pending().await?;
        let mut tally = PushTally::default();

        let (creates, rest): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|r| r.pending_create() || r.remote_id.is_none());
        let (updates, deletes): (Vec<_>, Vec<_>) =
            rest.into_iter().partition(|r| r.pending_update());

        for record in creates {
            if record.pending_delete() {
                // Never reached the backend, nothing to delete there
                self.store.delete(record.local_id).await?;
                continue;
            }
            tally.attempts += 1;
            match self.remote.create(record.local_id, &record.data).await {
                Ok(remote_id) => {
                    self.confirm_create(record, remote_id).await?;
                    report.pushed_creates += 1;
                }
                Err(e) => self.note_failure(&mut tally, report, "create", &record, e),
            }
        }

        for record in updates {
            let Some(remote_id) = record.remote_id.clone() else {
                continue;
            };
            tally.attempts += 1;
            match self.remote.update(&remote_id, &record.data).await {
                Ok(()) => {
                    if let Some(mut current) = self.store.get(record.local_id).await? {
                        current.confirm_updated(&record.data);
                        self.store.upsert(&current).await?;
                    }
                    report.pushed_updates += 1;
                }
                Err(e) => self.note_failure(&mut tally, report, "update", &record, e),
            }
        }

        for record in deletes {
            let Some(remote_id) = record.remote_id.clone() else {
                continue;
            };
            tally.attempts += 1;
            match self.remote.delete(&remote_id).await {
                Ok(()) => {
                    self.store.delete(record.local_id).await?;
                    report.pushed_deletes += 1;
                }
                Err(e) => self.note_failure(&mut tally, report, "delete", &record, e),
            }
        }

        Ok(tally)
    }

    /// Stores the backend id on the current copy of the record, which may
    /// have been edited while the create was in flight.
    async fn confirm_create(
        &self,
        pushed: SyncRecord<T>,
        remote_id: RemoteId,
    ) -> Result<(), StoreError> {
        let mut current = match self.store.get(pushed.local_id).await? {
            Some(current) => current,
            None => {
                // Erased locally mid-flight; the backend copy must go too
                let mut orphan = pushed.clone();
                orphan.pending = PendingOp::Delete;
                orphan
            }
        };
        // A pull may already have copied a create whose reply was lost
        if let Some(copy) = self.store.find_by_remote_id(&remote_id).await? {
            if copy.local_id != current.local_id {
                self.store.delete_if_synced(copy.local_id).await?;
            }
        }
        if current.pending == PendingOp::Delete {
            current.remote_id = Some(remote_id);
        } else {
            current.confirm_created(remote_id, &pushed.data);
        }
        tracing::debug!(
            "{}: {} created as {:?}",
            T::ENTITY_TYPE,
            current.local_id,
            current.remote_id
        );
        self.store.upsert(&current).await
    }

    fn note_failure(
        &self,
        tally: &mut PushTally,
        report: &mut SyncReport,
        op: &str,
        record: &SyncRecord<T>,
        error: RemoteError,
    ) {
        if error.is_unavailable() {
            tally.unavailable += 1;
        }
        report.push_failures += 1;
        tracing::warn!(
            "{}: {} of {} failed, will retry: {}",
            T::ENTITY_TYPE,
            op,
            record.local_id,
            error
        );
    }

    async fn pull(&self, report: &mut SyncReport) -> Result<(), StoreError> {
        let remote_records = match self.remote.list_all().await {
            Ok(records) => records,
            Err(e) if e.is_unavailable() => {
                tracing::warn!("{}: backend unreachable, skipping pull: {}", T::ENTITY_TYPE, e);
                report.pull = PullStatus::SkippedUnreachable;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("{}: list failed, skipping pull: {}", T::ENTITY_TYPE, e);
                report.pull = PullStatus::Failed(e);
                return Ok(());
            }
        };

        let mut seen: HashSet<RemoteId> = HashSet::with_capacity(remote_records.len());

        for remote in remote_records {
            seen.insert(remote.id.clone());

            match self.store.find_by_remote_id(&remote.id).await? {
                Some(local) if local.is_pending() => {
                    report.skipped_pending += 1;
                }
                Some(mut local) => {
                    if local.data != remote.data {
                        local.overwrite_from_remote(remote.data);
                        // A local write may have landed since the read
                        if self.store.replace_if_synced(&local).await? {
                            report.pulled_updates += 1;
                        } else {
                            report.skipped_pending += 1;
                        }
                    }
                }
                None => {
                    let record = SyncRecord::from_remote(remote.id, remote.data);
                    self.store.upsert(&record).await?;
                    report.pulled_inserts += 1;
                }
            }
        }

        for local in self.store.query_all().await? {
            if local.is_pending() {
                continue;
            }
            if let Some(remote_id) = &local.remote_id {
                if !seen.contains(remote_id) {
                    if self.store.delete_if_synced(local.local_id).await? {
                        report.pulled_removals += 1;
                    } else {
                        report.skipped_pending += 1;
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<T, S, R> Reconcile for Reconciler<T, S, R>
where
    T: Entity,
    S: LocalStore<T> + 'static,
    R: RemoteClient<T> + 'static,
{
    fn entity_type(&self) -> EntityType {
        T::ENTITY_TYPE
    }

    async fn reconcile(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(T::ENTITY_TYPE);
        let to_store_error = |e| SyncError::local_store(T::ENTITY_TYPE, e);

        let tally = self.push(&mut report).await.map_err(to_store_error)?;

        if tally.backend_unreachable() {
            tracing::warn!(
                "{}: every push failed with the backend unreachable, skipping pull",
                T::ENTITY_TYPE
            );
            report.pull = PullStatus::SkippedUnreachable;
        } else {
            self.pull(&mut report).await.map_err(to_store_error)?;
        }

        if report.is_clean() {
            tracing::info!("{}", report);
        } else {
            tracing::warn!("{}", report);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reservation, Vehicle};
    use crate::record::LocalId;
    use crate::remote::{MockRemote, RemoteCall, RemoteOp};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    type VehicleReconciler = Reconciler<Vehicle, MemoryStore<Vehicle>, MockRemote<Vehicle>>;

    struct TestContext {
        store: Arc<MemoryStore<Vehicle>>,
        remote: Arc<MockRemote<Vehicle>>,
        reconciler: VehicleReconciler,
    }

    fn setup() -> TestContext {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(MockRemote::new());
        let reconciler = Reconciler::new(Arc::clone(&store), Arc::clone(&remote));
        TestContext {
            store,
            remote,
            reconciler,
        }
    }

    fn corolla() -> Vehicle {
        Vehicle::new("Toyota", "Corolla", 2022, "ABC-123").with_daily_rate(4500)
    }

    fn civic() -> Vehicle {
        Vehicle::new("Honda", "Civic", 2021, "HND-777").with_daily_rate(4200)
    }

    fn unavailable() -> RemoteError {
        RemoteError::Unavailable("connection reset".to_string())
    }

    #[tokio::test]
    async fn test_create_assigns_remote_id() {
        let ctx = setup();
        ctx.remote.set_next_id(42);

        let record = SyncRecord::new_local(corolla());
        ctx.store.upsert(&record).await.unwrap();

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed_creates, 1);
        assert!(report.is_clean());

        let stored = ctx.store.get(record.local_id).await.unwrap().unwrap();
        assert_eq!(stored.remote_id, Some(RemoteId::from(42)));
        assert!(!stored.pending_create());
        assert_eq!(ctx.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_create_is_retried_with_same_payload() {
        let ctx = setup();
        ctx.remote.fail_next(RemoteOp::Create, unavailable());

        let record = SyncRecord::new_local(corolla());
        ctx.store.upsert(&record).await.unwrap();

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.push_failures, 1);
        let stored = ctx.store.get(record.local_id).await.unwrap().unwrap();
        assert!(stored.pending_create());
        assert!(stored.remote_id.is_none());

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed_creates, 1);

        let creates: Vec<Vehicle> = ctx
            .remote
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteCall::Create(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(creates, vec![corolla(), corolla()]);
    }

    #[tokio::test]
    async fn test_lost_create_reply_does_not_duplicate() {
        let ctx = setup();
        ctx.remote.lose_next_reply(RemoteOp::Create);

        let record = SyncRecord::new_local(corolla());
        ctx.store.upsert(&record).await.unwrap();

        // The backend stored it but the pass never heard back
        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.push_failures, 1);
        assert_eq!(ctx.remote.records().len(), 1);
        assert!(ctx.store.get(record.local_id).await.unwrap().unwrap().pending_create());

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed_creates, 1);
        assert_eq!(ctx.remote.records().len(), 1);
        assert_eq!(ctx.store.len().await, 1);

        let stored = ctx.store.get(record.local_id).await.unwrap().unwrap();
        assert_eq!(stored.remote_id, Some(RemoteId::from(1)));
        assert_eq!(stored.pending, PendingOp::None);
    }

    #[tokio::test]
    async fn test_lost_create_reply_pulled_copy_is_dropped() {
        let ctx = setup();
        ctx.remote.lose_next_reply(RemoteOp::Create);

        ctx.store.upsert(&SyncRecord::new_local(corolla())).await.unwrap();
        ctx.store.upsert(&SyncRecord::new_local(civic())).await.unwrap();

        // One create succeeds, so the pull runs and copies the lost one back
        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed_creates, 1);
        assert_eq!(report.push_failures, 1);
        assert_eq!(report.pulled_inserts, 1);
        assert_eq!(ctx.store.len().await, 3);

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed_creates, 1);
        assert_eq!(ctx.remote.records().len(), 2);
        assert_eq!(ctx.store.len().await, 2);
        assert_eq!(ctx.store.count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_batch() {
        let ctx = setup();
        ctx.remote.fail_next(
            RemoteOp::Create,
            RemoteError::Rejected {
                status: 422,
                message: "duplicate plate".to_string(),
            },
        );

        let first = SyncRecord::new_local(corolla());
        ctx.store.upsert(&first).await.unwrap();
        let mut second = SyncRecord::new_local(civic());
        second.updated_at = first.updated_at + chrono::Duration::seconds(1);
        ctx.store.upsert(&second).await.unwrap();

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.push_failures, 1);
        assert_eq!(report.pushed_creates, 1);
        assert_eq!(report.pull, PullStatus::Completed);

        assert!(ctx.store.get(first.local_id).await.unwrap().unwrap().pending_create());
        assert!(!ctx.store.get(second.local_id).await.unwrap().unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_local_fields() {
        let ctx = setup();
        ctx.remote.insert(RemoteId::from(5), corolla());

        let mut record = SyncRecord::from_remote(RemoteId::from(5), corolla());
        record.mark_updated(corolla().with_daily_rate(9900));
        ctx.store.upsert(&record).await.unwrap();

        ctx.remote.fail_next(RemoteOp::Update, unavailable());
        let report = ctx.reconciler.reconcile().await.unwrap();

        // The only push failed as unreachable, so no pull may touch the record
        assert_eq!(report.pull, PullStatus::SkippedUnreachable);
        let stored = ctx.store.get(record.local_id).await.unwrap().unwrap();
        assert!(stored.pending_update());
        assert_eq!(stored.data.daily_rate_cents, 9900);
    }

    #[tokio::test]
    async fn test_pull_never_overwrites_pending_record() {
        let ctx = setup();
        ctx.remote.insert(RemoteId::from(5), corolla());
        ctx.remote.insert(RemoteId::from(6), civic());

        // Record 5 has a pending update that keeps failing with a rejection
        let mut record = SyncRecord::from_remote(RemoteId::from(5), corolla());
        record.mark_updated(corolla().unavailable());
        ctx.store.upsert(&record).await.unwrap();

        ctx.remote.fail_next(
            RemoteOp::Update,
            RemoteError::Rejected {
                status: 409,
                message: "stale".to_string(),
            },
        );
        let report = ctx.reconciler.reconcile().await.unwrap();

        assert_eq!(report.pull, PullStatus::Completed);
        assert_eq!(report.skipped_pending, 1);
        assert_eq!(report.pulled_inserts, 1);

        let stored = ctx.store.get(record.local_id).await.unwrap().unwrap();
        assert!(stored.pending_update());
        assert!(!stored.data.available);
    }

    #[tokio::test]
    async fn test_delete_erases_after_confirmation() {
        let ctx = setup();
        ctx.remote.insert(RemoteId::from(8), civic());

        let mut record = SyncRecord::from_remote(RemoteId::from(8), civic());
        record.mark_deleted();
        ctx.store.upsert(&record).await.unwrap();

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed_deletes, 1);
        assert!(ctx.store.is_empty().await);
        assert!(ctx.remote.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_stays_pending_and_hidden() {
        let ctx = setup();
        ctx.remote.insert(RemoteId::from(8), civic());

        let mut record = SyncRecord::from_remote(RemoteId::from(8), civic());
        record.mark_deleted();
        ctx.store.upsert(&record).await.unwrap();

        ctx.remote.fail_next(
            RemoteOp::Delete,
            RemoteError::Rejected {
                status: 423,
                message: "vehicle has active reservation".to_string(),
            },
        );
        ctx.reconciler.reconcile().await.unwrap();

        let stored = ctx.store.get(record.local_id).await.unwrap().unwrap();
        assert!(stored.pending_delete());
        assert!(ctx.store.query_all().await.unwrap().is_empty());
        // The remote copy must not be pulled back in as a new record
        assert_eq!(ctx.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_pull_inserts_updates_and_removes() {
        let ctx = setup();

        let stale = SyncRecord::from_remote(RemoteId::from(1), corolla());
        let gone = SyncRecord::from_remote(RemoteId::from(2), civic());
        ctx.store.upsert(&stale).await.unwrap();
        ctx.store.upsert(&gone).await.unwrap();

        ctx.remote.insert(RemoteId::from(1), corolla().with_daily_rate(5000));
        ctx.remote.insert(RemoteId::from(3), civic());

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pulled_updates, 1);
        assert_eq!(report.pulled_inserts, 1);
        assert_eq!(report.pulled_removals, 1);

        let updated = ctx.store.get(stale.local_id).await.unwrap().unwrap();
        assert_eq!(updated.data.daily_rate_cents, 5000);
        assert!(ctx.store.get(gone.local_id).await.unwrap().is_none());
        assert!(ctx
            .store
            .find_by_remote_id(&RemoteId::from(3))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unreachable_backend_leaves_store_untouched() {
        let ctx = setup();

        let synced = SyncRecord::from_remote(RemoteId::from(1), corolla());
        let created = SyncRecord::new_local(civic());
        ctx.store.upsert(&synced).await.unwrap();
        ctx.store.upsert(&created).await.unwrap();
        let before = ctx.store.snapshot().await;

        ctx.remote.set_unreachable(true);
        let report = ctx.reconciler.reconcile().await.unwrap();

        assert_eq!(report.push_failures, 1);
        assert_eq!(report.pull, PullStatus::SkippedUnreachable);
        assert_eq!(ctx.store.snapshot().await, before);
        // Pull was skipped explicitly, without asking for the list
        assert!(!ctx.remote.calls().contains(&RemoteCall::List));
    }

    #[tokio::test]
    async fn test_unreachable_list_with_nothing_pending_skips_pull() {
        let ctx = setup();
        let synced = SyncRecord::from_remote(RemoteId::from(1), corolla());
        ctx.store.upsert(&synced).await.unwrap();

        ctx.remote.set_unreachable(true);
        let report = ctx.reconciler.reconcile().await.unwrap();

        assert_eq!(report.pull, PullStatus::SkippedUnreachable);
        assert_eq!(ctx.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconcile_clears_all_flags_and_is_idempotent() {
        let ctx = setup();
        ctx.remote.insert(RemoteId::from(10), civic());
        ctx.remote.insert(RemoteId::from(11), corolla());
        ctx.remote.set_next_id(100);

        let created = SyncRecord::new_local(corolla().with_location("3"));
        let mut updated = SyncRecord::from_remote(RemoteId::from(10), civic());
        updated.mark_updated(civic().with_daily_rate(1));
        let mut deleted = SyncRecord::from_remote(RemoteId::from(11), corolla());
        deleted.mark_deleted();
        for record in [&created, &updated, &deleted] {
            ctx.store.upsert(record).await.unwrap();
        }

        ctx.reconciler.reconcile().await.unwrap();
        assert!(ctx.store.query_pending().await.unwrap().is_empty());
        let after_first = ctx.store.snapshot().await;

        let report = ctx.reconciler.reconcile().await.unwrap();
        assert_eq!(report.pushed(), 0);
        assert_eq!(report.pulled(), 0);
        assert_eq!(ctx.store.snapshot().await, after_first);
    }

    #[tokio::test]
    async fn test_local_store_failure_aborts_pass() {
        let ctx = setup();
        ctx.store
            .upsert(&SyncRecord::new_local(corolla()))
            .await
            .unwrap();
        ctx.store.fail_next_write("disk I/O error").await;

        let err = ctx.reconciler.reconcile().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::LocalStore {
                entity_type: EntityType::Vehicles,
                ..
            }
        ));
        // Abort happened before the pull phase
        assert!(!ctx.remote.calls().contains(&RemoteCall::List));
    }

    #[tokio::test]
    async fn test_edit_during_create_stays_pending_update() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(MockRemote::new());
        remote.set_latency(std::time::Duration::from_millis(50));
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&store), Arc::clone(&remote)));

        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();
        let record = SyncRecord::new_local(Reservation::new("1", "2", start, end));
        store.upsert(&record).await.unwrap();

        let pass = tokio::spawn({
            let reconciler = Arc::clone(&reconciler);
            async move { reconciler.reconcile().await }
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let mut edited = store.get(record.local_id).await.unwrap().unwrap();
        edited.mark_updated(Reservation::new("1", "2", start, end).with_notes("child seat"));
        store.upsert(&edited).await.unwrap();

        pass.await.unwrap().unwrap();

        let stored = store.get(record.local_id).await.unwrap().unwrap();
        assert!(stored.remote_id.is_some());
        assert!(stored.pending_update());
        assert_eq!(stored.data.notes.as_deref(), Some("child seat"));
    }

    /// Store that lets another writer edit a record right after the pull has
    /// read it, the way a second process sharing the database can.
    struct InterleavedStore {
        inner: MemoryStore<Vehicle>,
        edit: std::sync::Mutex<Option<(LocalId, Vehicle)>>,
    }

    impl InterleavedStore {
        fn new(inner: MemoryStore<Vehicle>, local_id: LocalId, data: Vehicle) -> Self {
            Self {
                inner,
                edit: std::sync::Mutex::new(Some((local_id, data))),
            }
        }

        async fn apply_edit(&self) {
            let edit = self.edit.lock().unwrap().take();
            if let Some((local_id, data)) = edit {
                let mut record = self.inner.get(local_id).await.unwrap().unwrap();
                record.mark_updated(data);
                self.inner.upsert(&record).await.unwrap();
            }
        }
    }

    #[async_trait]
    impl LocalStore<Vehicle> for InterleavedStore {
        async fn query_pending(&self) -> Result<Vec<SyncRecord<Vehicle>>, StoreError> {
            self.inner.query_pending().await
        }

        async fn query_all(&self) -> Result<Vec<SyncRecord<Vehicle>>, StoreError> {
            let all = self.inner.query_all().await?;
            self.apply_edit().await;
            Ok(all)
        }

        async fn get(&self, local_id: LocalId) -> Result<Option<SyncRecord<Vehicle>>, StoreError> {
            self.inner.get(local_id).await
        }

        async fn find_by_remote_id(
            &self,
            remote_id: &RemoteId,
        ) -> Result<Option<SyncRecord<Vehicle>>, StoreError> {
            let found = self.inner.find_by_remote_id(remote_id).await?;
            self.apply_edit().await;
            Ok(found)
        }

        async fn upsert(&self, record: &SyncRecord<Vehicle>) -> Result<(), StoreError> {
            self.inner.upsert(record).await
        }

        async fn delete(&self, local_id: LocalId) -> Result<(), StoreError> {
            self.inner.delete(local_id).await
        }

        async fn replace_if_synced(&self, record: &SyncRecord<Vehicle>) -> Result<bool, StoreError> {
            self.inner.replace_if_synced(record).await
        }

        async fn delete_if_synced(&self, local_id: LocalId) -> Result<bool, StoreError> {
            self.inner.delete_if_synced(local_id).await
        }
    }

    #[tokio::test]
    async fn test_pull_keeps_edit_made_after_read() {
        let memory = MemoryStore::new();
        let synced = SyncRecord::from_remote(RemoteId::from(5), corolla());
        memory.upsert(&synced).await.unwrap();

        let remote = Arc::new(MockRemote::new());
        remote.insert(RemoteId::from(5), corolla().with_daily_rate(5000));

        let store = Arc::new(InterleavedStore::new(
            memory.clone(),
            synced.local_id,
            corolla().with_daily_rate(9900),
        ));
        let reconciler = Reconciler::new(store, remote);

        let report = reconciler.reconcile().await.unwrap();
        assert_eq!(report.pulled_updates, 0);
        assert_eq!(report.skipped_pending, 1);

        let stored = memory.get(synced.local_id).await.unwrap().unwrap();
        assert!(stored.pending_update());
        assert_eq!(stored.data.daily_rate_cents, 9900);
    }

    #[tokio::test]
    async fn test_pull_removal_keeps_edit_made_after_read() {
        let memory = MemoryStore::new();
        let synced = SyncRecord::from_remote(RemoteId::from(7), civic());
        memory.upsert(&synced).await.unwrap();

        // Gone on the backend, edited locally while the pull runs
        let remote: Arc<MockRemote<Vehicle>> = Arc::new(MockRemote::new());
        let store = Arc::new(InterleavedStore::new(
            memory.clone(),
            synced.local_id,
            civic().unavailable(),
        ));
        let reconciler = Reconciler::new(store, remote);

        let report = reconciler.reconcile().await.unwrap();
        assert_eq!(report.pulled_removals, 0);
        assert_eq!(report.skipped_pending, 1);

        let stored = memory.get(synced.local_id).await.unwrap().unwrap();
        assert!(stored.pending_update());
        assert!(!stored.data.available);
    }
}
