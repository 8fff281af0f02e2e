use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentsync_core::{EntityType, ScheduleEntry, ScheduleStore, StoreError};
use sqlx::SqlitePool;
use std::time::Duration;

/// Periodic sync registrations kept in the `sync_schedules` table.
#[derive(Clone)]
pub struct SqliteScheduleStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    task_id: String,
    entity_type: String,
    interval_secs: i64,
    last_run_at: Option<String>,
}

impl TryFrom<ScheduleRow> for ScheduleEntry {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.task_id.clone(),
            reason,
        };

        let entity_type: EntityType = row
            .entity_type
            .parse()
            .map_err(|e| corrupt(format!("{}", e)))?;
        let last_run_at = row
            .last_run_at
            .as_deref()
            .map(DateTime::parse_from_rfc3339)
            .transpose()
            .map_err(|e| corrupt(format!("bad timestamp: {}", e)))?
            .map(|t| t.with_timezone(&Utc));

        Ok(ScheduleEntry {
            task_id: row.task_id.clone(),
            entity_type,
            interval: Duration::from_secs(row.interval_secs.max(0) as u64),
            last_run_at,
        })
    }
}

impl SqliteScheduleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_schedules (task_id, entity_type, interval_secs, last_run_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(task_id) DO UPDATE SET
                entity_type = excluded.entity_type,
                interval_secs = excluded.interval_secs,
                last_run_at = COALESCE(sync_schedules.last_run_at, excluded.last_run_at)
            "#,
        )
        .bind(&entry.task_id)
        .bind(entry.entity_type.as_str())
        .bind(entry.interval.as_secs() as i64)
        .bind(entry.last_run_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<ScheduleEntry>, StoreError> {
        let row: Option<ScheduleRow> = sqlx::query_as(
            "SELECT task_id, entity_type, interval_secs, last_run_at FROM sync_schedules WHERE task_id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        row.map(ScheduleEntry::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT task_id, entity_type, interval_secs, last_run_at FROM sync_schedules ORDER BY task_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        rows.into_iter().map(ScheduleEntry::try_from).collect()
    }

    async fn remove(&self, task_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sync_schedules WHERE task_id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_run(&self, task_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE sync_schedules SET last_run_at = ? WHERE task_id = ?")
            .bind(at.to_rfc3339())
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}
