use async_trait::async_trait;
use chrono::Utc;
use rentsync_core::{EntityType, PassLease, StoreError, LEASE_TTL};
use sqlx::SqlitePool;
use std::time::Duration;
use uuid::Uuid;

/// Sync pass lease kept in the `sync_locks` table, shared by every process
/// that opens the same database file.
#[derive(Debug, Clone)]
pub struct SqliteLease {
    pool: SqlitePool,
    holder: String,
    ttl: Duration,
}

impl SqliteLease {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_ttl(pool, LEASE_TTL)
    }

    pub fn with_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        Self {
            pool,
            holder: Uuid::new_v4().to_string(),
            ttl,
        }
    }
}

#[async_trait]
impl PassLease for SqliteLease {
    async fn try_acquire(&self, entity_type: EntityType) -> Result<bool, StoreError> {
        let now = Utc::now().timestamp_millis();
        let expires_at = now + self.ttl.as_millis() as i64;

        // Takes a free or expired row, or renews our own, in one statement
        let result = sqlx::query(
            r#"
            INSERT INTO sync_locks (entity_type, holder, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(entity_type) DO UPDATE SET
                holder = excluded.holder,
                expires_at = excluded.expires_at
            WHERE sync_locks.holder = excluded.holder OR sync_locks.expires_at <= ?
            "#,
        )
        .bind(entity_type.as_str())
        .bind(&self.holder)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, entity_type: EntityType) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sync_locks WHERE entity_type = ? AND holder = ?")
            .bind(entity_type.as_str())
            .bind(&self.holder)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}
