//! Sync CLI commands for reconciling with the rental backend.

use clap::{Args, Subcommand};
use rentsync_core::{
    check_server, Entity, EntityType, LocalStore, Location, Message, PullStatus, Reservation,
    ScheduleStore, SyncReport, User, Vehicle,
};
use sqlx::SqlitePool;

use super::CommandResult;
use crate::config::Config;
use crate::db::{SqliteScheduleStore, SqliteStore};
use crate::sync::SyncEngine;

/// Sync with remote server
#[derive(Args)]
pub struct SyncCommand {
    /// Only sync this entity type
    #[arg(long, short)]
    entity: Option<EntityType>,

    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration, pending changes and server status
    Status,
}

impl SyncCommand {
    pub async fn run(&self, config: &Config, pool: &SqlitePool) -> CommandResult {
        match &self.command {
            None => self.sync(config, pool).await,
            Some(SyncSubcommand::Status) => status(config, pool).await,
        }
    }

    async fn sync(&self, config: &Config, pool: &SqlitePool) -> CommandResult {
        let engine = SyncEngine::new(pool.clone(), &config.sync)?;

        println!("Syncing with server...");
        println!();

        let results = match self.entity {
            Some(entity_type) => vec![(entity_type, engine.sync_one(entity_type).await)],
            None => engine.sync_all().await,
        };

        let mut clean = true;
        for (entity_type, result) in results {
            match result {
                Ok(report) => {
                    clean &= report.is_clean();
                    println!("  {} {}", if report.is_clean() { "✓" } else { "!" }, summary(&report));
                }
                Err(e) => {
                    clean = false;
                    println!("  ✗ {} - {}", entity_type, e);
                }
            }
        }

        println!();
        if clean {
            println!("Sync complete.");
        } else {
            println!("Sync finished with errors; pending changes will be retried.");
        }
        Ok(())
    }
}

fn summary(report: &SyncReport) -> String {
    let mut parts = vec![format!(
        "{}: pushed {}, pulled {}",
        report.entity_type,
        report.pushed(),
        report.pulled()
    )];
    if report.push_failures > 0 {
        parts.push(format!("{} push failure(s)", report.push_failures));
    }
    match &report.pull {
        PullStatus::Completed => {}
        PullStatus::SkippedUnreachable => parts.push("server unreachable".to_string()),
        PullStatus::Failed(e) => parts.push(format!("pull failed: {}", e)),
    }
    parts.join(", ")
}

async fn pending_count<T: Entity>(pool: &SqlitePool) -> Result<usize, rentsync_core::StoreError> {
    SqliteStore::<T>::new(pool.clone()).count_pending().await
}

async fn status(config: &Config, pool: &SqlitePool) -> CommandResult {
    println!("Sync Configuration");
    println!("==================");
    println!();

    let server_url = match config.sync.server_url.as_deref() {
        Some(url) if config.sync.is_configured() => url,
        _ => {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!();
            println!("Or set environment variable:");
            println!("  RENT_SYNC_URL");
            return Ok(());
        }
    };

    println!("Server:    {}", server_url);
    println!(
        "Auto-sync: {}",
        if config.sync.auto_sync {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "Interval:  {} min ({})",
        config.sync.interval_minutes.value, config.sync.interval_minutes.source
    );
    println!(
        "Status:    {}",
        if check_server(server_url).await {
            "✓ connected"
        } else {
            "✗ unreachable"
        }
    );
    println!();

    println!("Pending changes");
    for entity_type in EntityType::ALL {
        let count = match entity_type {
            EntityType::Vehicles => pending_count::<Vehicle>(pool).await?,
            EntityType::Reservations => pending_count::<Reservation>(pool).await?,
            EntityType::Users => pending_count::<User>(pool).await?,
            EntityType::Messages => pending_count::<Message>(pool).await?,
            EntityType::Locations => pending_count::<Location>(pool).await?,
        };
        println!("  {:<14} {}", entity_type, count);
    }
    println!();

    let schedules = SqliteScheduleStore::new(pool.clone()).list().await?;
    if schedules.is_empty() {
        println!("Periodic sync: none registered (run 'rent daemon')");
    } else {
        println!("Periodic sync");
        for entry in schedules {
            let last_run = entry
                .last_run_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<28} every {}s, last run {}",
                entry.task_id,
                entry.interval.as_secs(),
                last_run
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentsync_core::RemoteError;

    #[test]
    fn test_summary_mentions_failures() {
        let mut report = SyncReport::new(EntityType::Vehicles);
        report.pushed_creates = 2;
        report.push_failures = 1;
        report.pull = PullStatus::Failed(RemoteError::Malformed("bad json".into()));

        let text = summary(&report);
        assert!(text.starts_with("vehicles: pushed 2, pulled 0"));
        assert!(text.contains("1 push failure(s)"));
        assert!(text.contains("pull failed"));
    }
}
