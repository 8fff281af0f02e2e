use clap::Args;
use rentsync_core::EntityType;
use sqlx::SqlitePool;

use super::CommandResult;
use crate::config::Config;
use crate::sync::SyncEngine;

/// Run periodic background sync until interrupted
#[derive(Args)]
pub struct DaemonCommand {
    /// Override the sync interval in minutes
    #[arg(long)]
    interval: Option<u64>,
}

impl DaemonCommand {
    pub async fn run(&self, config: &Config, pool: &SqlitePool) -> CommandResult {
        let interval = match self.interval {
            Some(0) => return Err("Interval must be at least one minute".into()),
            Some(minutes) => std::time::Duration::from_secs(minutes * 60),
            None => config.sync.interval(),
        };

        let engine = SyncEngine::new(pool.clone(), &config.sync)?;
        let scheduler = engine.scheduler();

        // Runs before the timers are armed so overdue ones start from this pass
        scheduler.startup().await;

        let restored = scheduler.init().await?;
        tracing::info!("Restored {} periodic sync registration(s)", restored);

        for entity_type in EntityType::ALL {
            scheduler.schedule_periodic(entity_type, interval).await?;
        }

        println!(
            "Sync daemon running every {} min for {}. Press Ctrl-C to stop.",
            interval.as_secs() / 60,
            scheduler.active_tasks().join(", ")
        );

        tokio::signal::ctrl_c().await?;
        println!("Stopping sync daemon...");
        scheduler.shutdown().await;
        Ok(())
    }
}
