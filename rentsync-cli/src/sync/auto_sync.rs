//! Auto-sync around CLI commands.
//!
//! When `sync.auto_sync` is enabled, entity commands reconcile their entity
//! type before reads and after successful writes. Every failure is reported
//! on stderr and otherwise ignored so the CLI keeps working offline.

use rentsync_core::{check_server, EntityType};
use sqlx::SqlitePool;

use super::engine::SyncEngine;
use crate::config::Config;

/// Reconciles one entity type if auto-sync is enabled and the server is reachable.
pub async fn try_auto_sync(config: &Config, pool: &SqlitePool, entity_type: EntityType) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    let url = match config.sync.server_url.as_deref() {
        Some(url) => url,
        None => return,
    };

    // Fast fail before spending a full request timeout per record
    if !check_server(url).await {
        eprintln!("Auto-sync: server unreachable, skipping");
        return;
    }

    let engine = match SyncEngine::new(pool.clone(), &config.sync) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Auto-sync: {}", e);
            return;
        }
    };

    match engine.sync_one(entity_type).await {
        Ok(report) if !report.is_clean() => eprintln!("Auto-sync: {}", report),
        Ok(report) => tracing::debug!("Auto-sync: {}", report),
        Err(e) => eprintln!("Auto-sync: {}", e),
    }
}
