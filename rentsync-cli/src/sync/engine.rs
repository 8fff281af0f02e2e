use rentsync_core::remote::http_client;
use rentsync_core::{
    Entity, EntityType, HttpRemote, Location, Message, Reconciler, RemoteError, Reservation,
    SyncCoordinator, SyncError, SyncReport, SyncScheduler, User, Vehicle,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::SyncConfig;
use crate::db::{SqliteLease, SqliteScheduleStore, SqliteStore};

/// How long a pass waits for another process sharing the database to finish
/// the same entity type.
const LEASE_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sync is not configured (set sync.server_url or RENT_SYNC_URL)")]
    NotConfigured,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] RemoteError),
}

type SqliteReconciler<T> = Reconciler<T, SqliteStore<T>, HttpRemote<T>>;

fn reconciler<T: Entity>(
    pool: &SqlitePool,
    client: &reqwest::Client,
    server_url: &str,
) -> SqliteReconciler<T> {
    Reconciler::new(
        Arc::new(SqliteStore::new(pool.clone())),
        Arc::new(HttpRemote::new(client.clone(), server_url)),
    )
}

/// Registers one SQLite-to-HTTP reconciler per entity type, leased through
/// the database so other processes on the same file take turns.
fn build_coordinator(
    pool: &SqlitePool,
    config: &SyncConfig,
) -> Result<SyncCoordinator, EngineError> {
    let server_url = config
        .server_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or(EngineError::NotConfigured)?;
    let client = http_client(config.request_timeout())?;

    Ok(SyncCoordinator::new()
        .with(reconciler::<Location>(pool, &client, server_url))
        .with(reconciler::<Vehicle>(pool, &client, server_url))
        .with(reconciler::<User>(pool, &client, server_url))
        .with(reconciler::<Reservation>(pool, &client, server_url))
        .with(reconciler::<Message>(pool, &client, server_url))
        .with_lease(Arc::new(SqliteLease::new(pool.clone())), LEASE_WAIT))
}

/// Coordinator plus the persisted schedule registry for one database.
pub struct SyncEngine {
    pool: SqlitePool,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncEngine {
    pub fn new(pool: SqlitePool, config: &SyncConfig) -> Result<Self, EngineError> {
        let coordinator = Arc::new(build_coordinator(&pool, config)?);
        Ok(Self { pool, coordinator })
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn scheduler(&self) -> SyncScheduler {
        SyncScheduler::new(
            Arc::clone(&self.coordinator),
            Arc::new(SqliteScheduleStore::new(self.pool.clone())),
        )
    }

    pub async fn sync_one(&self, entity_type: EntityType) -> Result<SyncReport, SyncError> {
        self.coordinator.run_once(entity_type).await
    }

    pub async fn sync_all(&self) -> Vec<(EntityType, Result<SyncReport, SyncError>)> {
        self.coordinator.run_all().await
    }
}
