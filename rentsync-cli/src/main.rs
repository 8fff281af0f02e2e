use clap::{Parser, Subcommand};
use rentsync_core::{Entity, Location, Message, Repository, Reservation, User, Vehicle};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod sync;

use commands::{
    CommandKind, ConfigCommand, DaemonCommand, LocationCommand, MessageCommand,
    ReservationCommand, SyncCommand, UserCommand, VehicleCommand,
};
use config::Config;
use db::{init_db, SqliteRepository, SqliteStore};
use sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "rent")]
#[command(version)]
#[command(about = "Offline-first car rental client", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the vehicle fleet
    Vehicle(VehicleCommand),

    /// Manage reservations
    Reservation(ReservationCommand),

    /// Support messages
    Message(MessageCommand),

    /// Manage users
    User(UserCommand),

    /// Manage rental locations
    Location(LocationCommand),

    /// Sync with the rental backend
    Sync(SyncCommand),

    /// Run periodic background sync
    Daemon(DaemonCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rent=warn,rentsync_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config, cli_config_path);
    }

    let pool = init_db(&config.database_path.value).await?;

    match &command {
        Commands::Vehicle(cmd) => {
            with_auto_sync::<Vehicle, _>(&config, &pool, cmd.kind(), |repo| async move {
                cmd.run(&repo).await
            })
            .await
        }
        Commands::Reservation(cmd) => {
            with_auto_sync::<Reservation, _>(&config, &pool, cmd.kind(), |repo| async move {
                cmd.run(&repo).await
            })
            .await
        }
        Commands::Message(cmd) => {
            with_auto_sync::<Message, _>(&config, &pool, cmd.kind(), |repo| async move {
                cmd.run(&repo).await
            })
            .await
        }
        Commands::User(cmd) => {
            with_auto_sync::<User, _>(&config, &pool, cmd.kind(), |repo| async move {
                cmd.run(&repo).await
            })
            .await
        }
        Commands::Location(cmd) => {
            with_auto_sync::<Location, _>(&config, &pool, cmd.kind(), |repo| async move {
                cmd.run(&repo).await
            })
            .await
        }
        Commands::Sync(cmd) => cmd.run(&config, &pool).await,
        Commands::Daemon(cmd) => cmd.run(&config, &pool).await,
        Commands::Config(_) => Ok(()),
    }
}

/// Runs an entity command, syncing its entity type before reads and after
/// successful writes when auto-sync is enabled.
async fn with_auto_sync<T, F>(
    config: &Config,
    pool: &SqlitePool,
    kind: CommandKind,
    command: impl FnOnce(SqliteRepository<T>) -> F,
) -> Result<(), Box<dyn std::error::Error>>
where
    T: Entity,
    F: std::future::Future<Output = Result<(), Box<dyn std::error::Error>>>,
{
    if kind == CommandKind::Read {
        try_auto_sync(config, pool, T::ENTITY_TYPE).await;
    }

    let repo = Repository::new(Arc::new(SqliteStore::<T>::new(pool.clone())));
    command(repo).await?;

    if kind == CommandKind::Write {
        try_auto_sync(config, pool, T::ENTITY_TYPE).await;
    }
    Ok(())
}
