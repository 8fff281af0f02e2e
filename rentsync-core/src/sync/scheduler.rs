//! Persisted periodic sync triggers.
//!
//! Registrations live in a [`ScheduleStore`] so they survive restarts;
//! [`SyncScheduler::init`] re-arms them. Each registration has a stable task
//! id, so registering the same entity type twice replaces the timer instead
//! of adding a second one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::coordinator::SyncCoordinator;
use super::error::SyncError;
use crate::entity::EntityType;
use crate::store::StoreError;

/// Stable task id of the periodic trigger for an entity type.
pub fn periodic_task_id(entity_type: EntityType) -> String {
    format!("periodic-sync:{}", entity_type)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub task_id: String,
    pub entity_type: EntityType,
    pub interval: Duration,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    pub fn periodic(entity_type: EntityType, interval: Duration) -> Self {
        Self {
            task_id: periodic_task_id(entity_type),
            entity_type,
            interval,
            last_run_at: None,
        }
    }

    /// Delay before the first tick, measured from `now`.
    ///
    /// A fresh registration waits one full interval. A re-armed one fires
    /// one interval after its last recorded run, or immediately if that is
    /// already overdue.
    pub fn first_delay(&self, now: DateTime<Utc>) -> Duration {
        match self.last_run_at {
            None => self.interval,
            Some(last) => {
                let elapsed = now
                    .signed_duration_since(last)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                self.interval.saturating_sub(elapsed)
            }
        }
    }
}

/// Persistent registry of periodic triggers.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Inserts or replaces a registration. An existing `last_run_at` is kept.
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), StoreError>;

    async fn get(&self, task_id: &str) -> Result<Option<ScheduleEntry>, StoreError>;

    async fn list(&self) -> Result<Vec<ScheduleEntry>, StoreError>;

    /// Returns false if no registration had this id.
    async fn remove(&self, task_id: &str) -> Result<bool, StoreError>;

    async fn record_run(&self, task_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScheduleStore {
    entries: Arc<RwLock<BTreeMap<String, ScheduleEntry>>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let last_run_at = entries
            .get(&entry.task_id)
            .and_then(|existing| existing.last_run_at)
            .or(entry.last_run_at);
        entries.insert(
            entry.task_id.clone(),
            ScheduleEntry {
                last_run_at,
                ..entry.clone()
            },
        );
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(self.entries.read().await.get(task_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn remove(&self, task_id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(task_id).is_some())
    }

    async fn record_run(&self, task_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(entry) = self.entries.write().await.get_mut(task_id) {
            entry.last_run_at = Some(at);
        }
        Ok(())
    }
}

/// Arms periodic timers that run passes through a [`SyncCoordinator`].
pub struct SyncScheduler {
    coordinator: Arc<SyncCoordinator>,
    registry: Arc<dyn ScheduleStore>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(coordinator: Arc<SyncCoordinator>, registry: Arc<dyn ScheduleStore>) -> Self {
        Self {
            coordinator,
            registry,
            timers: Mutex::new(HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-arms every persisted registration. Returns how many timers were armed.
    ///
    /// Registrations for entity types without a reconciler are left in the
    /// registry but not armed.
    pub async fn init(&self) -> Result<usize, SyncError> {
        let entries = self.registry.list().await.map_err(SyncError::Schedule)?;
        let registered = self.coordinator.entity_types();

        let mut armed = 0;
        for entry in entries {
            if !registered.contains(&entry.entity_type) {
                tracing::warn!(
                    "Skipping schedule {}: no reconciler for {}",
                    entry.task_id,
                    entry.entity_type
                );
                continue;
            }
            if entry.interval.is_zero() {
                tracing::warn!("Skipping schedule {}: zero interval", entry.task_id);
                continue;
            }
            self.arm(entry);
            armed += 1;
        }

        tracing::info!("Re-armed {} periodic sync task(s)", armed);
        Ok(armed)
    }

    /// Registers (or re-registers) the periodic trigger for an entity type.
    pub async fn schedule_periodic(
        &self,
        entity_type: EntityType,
        interval: Duration,
    ) -> Result<(), SyncError> {
        if interval.is_zero() {
            return Err(SyncError::InvalidInterval(entity_type));
        }
        if !self.coordinator.entity_types().contains(&entity_type) {
            return Err(SyncError::NotRegistered(entity_type));
        }

        let entry = ScheduleEntry::periodic(entity_type, interval);
        self.registry
            .upsert(&entry)
            .await
            .map_err(SyncError::Schedule)?;
        let persisted = self
            .registry
            .get(&entry.task_id)
            .await
            .map_err(SyncError::Schedule)?
            .unwrap_or(entry);

        tracing::info!(
            "Scheduled {} every {}s",
            persisted.task_id,
            persisted.interval.as_secs()
        );
        self.arm(persisted);
        Ok(())
    }

    /// Best-effort pass for every entity type at process start.
    ///
    /// Successful passes are recorded against their periodic registration,
    /// so timers armed afterwards wait a full interval instead of firing a
    /// second pass straight away. Failures are logged and swallowed.
    pub async fn startup(&self) {
        for (entity_type, result) in self.coordinator.run_all().await {
            match result {
                Ok(report) => {
                    tracing::debug!("Startup sync finished: {}", report);
                    let task_id = periodic_task_id(entity_type);
                    if let Err(e) = self.registry.record_run(&task_id, Utc::now()).await {
                        tracing::warn!("Failed to record run of {}: {}", task_id, e);
                    }
                }
                Err(e) => tracing::warn!("Startup sync of {} failed: {}", entity_type, e),
            }
        }
    }

    /// Requests an immediate pass outside the periodic schedule.
    pub fn run_once(&self, entity_type: EntityType) -> bool {
        self.coordinator.request(entity_type)
    }

    /// Stops the periodic trigger and removes its registration.
    pub async fn cancel(&self, entity_type: EntityType) -> Result<bool, SyncError> {
        let task_id = periodic_task_id(entity_type);
        if let Some(handle) = self.timers().remove(&task_id) {
            handle.abort();
        }
        self.registry
            .remove(&task_id)
            .await
            .map_err(SyncError::Schedule)
    }

    /// Stops every timer and waits for requested passes. Registrations are kept.
    pub async fn shutdown(&self) {
        let timers: Vec<(String, JoinHandle<()>)> = self.timers().drain().collect();
        for (task_id, handle) in timers {
            tracing::debug!("Stopping {}", task_id);
            handle.abort();
        }
        self.coordinator.flush().await;
    }

    /// Task ids of the armed timers, sorted.
    pub fn active_tasks(&self) -> Vec<String> {
        let mut tasks: Vec<String> = self.timers().keys().cloned().collect();
        tasks.sort();
        tasks
    }

    fn arm(&self, entry: ScheduleEntry) {
        let start = Instant::now() + entry.first_delay(Utc::now());
        let coordinator = Arc::clone(&self.coordinator);
        let registry = Arc::clone(&self.registry);
        let task_id = entry.task_id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, entry.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match coordinator.run_once(entry.entity_type).await {
                    Ok(report) => tracing::debug!("Periodic sync finished: {}", report),
                    Err(e) => tracing::error!("Periodic sync of {} failed: {}", entry.entity_type, e),
                }
                if let Err(e) = registry.record_run(&entry.task_id, Utc::now()).await {
                    tracing::warn!("Failed to record run of {}: {}", entry.task_id, e);
                }
            }
        });

        if let Some(previous) = self.timers().insert(task_id, handle) {
            previous.abort();
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers().drain() {
            handle.abort();
        }
    }
}
