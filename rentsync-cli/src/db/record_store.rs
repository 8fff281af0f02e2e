use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentsync_core::{
    Entity, LocalId, LocalStore, PendingOp, RemoteId, StoreError, SyncRecord,
};
use sqlx::SqlitePool;
use std::marker::PhantomData;

/// SQLite-backed [`LocalStore`]; one table per entity type, named after
/// [`EntityType::as_str`](rentsync_core::EntityType::as_str).
pub struct SqliteStore<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    local_id: String,
    remote_id: Option<String>,
    pending_create: bool,
    pending_update: bool,
    pending_delete: bool,
    payload: String,
    updated_at: String,
}

impl RecordRow {
    fn into_record<T: Entity>(self) -> Result<SyncRecord<T>, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.local_id.clone(),
            reason,
        };

        let local_id: LocalId = self
            .local_id
            .parse()
            .map_err(|e| corrupt(format!("bad local id: {}", e)))?;
        let data: T = serde_json::from_str(&self.payload)
            .map_err(|e| corrupt(format!("bad payload: {}", e)))?;
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| corrupt(format!("bad timestamp: {}", e)))?
            .with_timezone(&Utc);

        let pending = match (self.pending_create, self.pending_update, self.pending_delete) {
            (false, false, false) => PendingOp::None,
            (true, false, false) => PendingOp::Create,
            (false, true, false) => PendingOp::Update,
            (false, false, true) => PendingOp::Delete,
            _ => return Err(corrupt("more than one pending flag set".to_string())),
        };

        Ok(SyncRecord {
            local_id,
            remote_id: self.remote_id.map(RemoteId::new),
            pending,
            data,
            updated_at,
        })
    }
}

const COLUMNS: &str =
    "local_id, remote_id, pending_create, pending_update, pending_delete, payload, updated_at";

/// Row has no pending flag.
const SYNCED: &str = "pending_create = 0 AND pending_update = 0 AND pending_delete = 0";

impl<T: Entity> SqliteStore<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::ENTITY_TYPE.as_str()
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<SyncRecord<T>>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }
}

#[async_trait]
impl<T: Entity> LocalStore<T> for SqliteStore<T> {
    async fn query_pending(&self) -> Result<Vec<SyncRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE pending_create = 1 OR pending_update = 1 OR pending_delete = 1 ORDER BY updated_at",
            COLUMNS,
            Self::table()
        );
        self.fetch(&sql).await
    }

    async fn query_all(&self) -> Result<Vec<SyncRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE pending_delete = 0 ORDER BY updated_at",
            COLUMNS,
            Self::table()
        );
        self.fetch(&sql).await
    }

    async fn get(&self, local_id: LocalId) -> Result<Option<SyncRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE local_id = ?",
            COLUMNS,
            Self::table()
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(local_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(RecordRow::into_record).transpose()
    }

    async fn find_by_remote_id(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Option<SyncRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE remote_id = ?",
            COLUMNS,
            Self::table()
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(remote_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(RecordRow::into_record).transpose()
    }

    async fn upsert(&self, record: &SyncRecord<T>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&record.data).map_err(StoreError::backend)?;
        let sql = format!(
            r#"
            INSERT INTO {} ({})
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(local_id) DO UPDATE SET
                remote_id = excluded.remote_id,
                pending_create = excluded.pending_create,
                pending_update = excluded.pending_update,
                pending_delete = excluded.pending_delete,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
            Self::table(),
            COLUMNS
        );

        sqlx::query(&sql)
            .bind(record.local_id.to_string())
            .bind(record.remote_id.as_ref().map(|id| id.as_str()))
            .bind(record.pending_create())
            .bind(record.pending_update())
            .bind(record.pending_delete())
            .bind(&payload)
            .bind(record.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn delete(&self, local_id: LocalId) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE local_id = ?", Self::table());
        sqlx::query(&sql)
            .bind(local_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn replace_if_synced(&self, record: &SyncRecord<T>) -> Result<bool, StoreError> {
        let payload = serde_json::to_string(&record.data).map_err(StoreError::backend)?;
        let sql = format!(
            r#"
            UPDATE {}
            SET remote_id = ?, pending_create = ?, pending_update = ?, pending_delete = ?,
                payload = ?, updated_at = ?
            WHERE local_id = ? AND {}
            "#,
            Self::table(),
            SYNCED
        );

        let result = sqlx::query(&sql)
            .bind(record.remote_id.as_ref().map(|id| id.as_str()))
            .bind(record.pending_create())
            .bind(record.pending_update())
            .bind(record.pending_delete())
            .bind(&payload)
            .bind(record.updated_at.to_rfc3339())
            .bind(record.local_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_synced(&self, local_id: LocalId) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE local_id = ? AND {}",
            Self::table(),
            SYNCED
        );
        let result = sqlx::query(&sql)
            .bind(local_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_pending(&self) -> Result<usize, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE pending_create = 1 OR pending_update = 1 OR pending_delete = 1",
            Self::table()
        );
        let (count,): (i64,) = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(count as usize)
    }
}
