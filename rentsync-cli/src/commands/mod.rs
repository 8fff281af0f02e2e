mod config_cmd;
mod daemon;
mod location;
mod message;
mod reservation;
mod sync_cmd;
mod user;
mod vehicle;

pub use config_cmd::ConfigCommand;
pub use daemon::DaemonCommand;
pub use location::LocationCommand;
pub use message::MessageCommand;
pub use reservation::ReservationCommand;
pub use sync_cmd::SyncCommand;
pub use user::UserCommand;
pub use vehicle::VehicleCommand;

use clap::ValueEnum;
use rentsync_core::{Entity, LocalStore, Repository, SyncRecord};
use std::fmt::Display;
use std::io::{self, Write};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Whether a command only reads local data, writes it, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Read,
    Write,
}

/// Looks a record up by local UUID or remote id.
pub async fn find_record<T, S>(
    repo: &Repository<T, S>,
    identifier: &str,
) -> Result<SyncRecord<T>, Box<dyn std::error::Error>>
where
    T: Entity,
    S: LocalStore<T>,
{
    repo.find(identifier)
        .await?
        .ok_or_else(|| format!("{} not found: {}", T::ENTITY_TYPE, identifier).into())
}

fn sync_marker<T>(record: &SyncRecord<T>) -> &'static str {
    if record.pending_create() {
        "+"
    } else if record.pending_update() {
        "~"
    } else if record.pending_delete() {
        "-"
    } else {
        ""
    }
}

pub fn print_records<T: Entity + Display>(
    records: &[SyncRecord<T>],
    format: &OutputFormat,
) -> CommandResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No {} found", T::ENTITY_TYPE);
                return Ok(());
            }

            println!("{:<36}  {:<8}  {:<4}  DETAILS", "ID", "REMOTE", "SYNC");
            println!("{}", "-".repeat(90));
            for record in records {
                let remote = record
                    .remote_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<36}  {:<8}  {:<4}  {}",
                    record.local_id,
                    remote,
                    sync_marker(record),
                    record.data
                );
            }

            let pending = records.iter().filter(|r| r.is_pending()).count();
            println!("\nTotal: {} {}", records.len(), T::ENTITY_TYPE);
            if pending > 0 {
                println!("Pending sync: {} (+ create, ~ update)", pending);
            }
        }
    }
    Ok(())
}

pub fn print_record<T: Entity + Display>(
    record: &SyncRecord<T>,
    format: &OutputFormat,
) -> CommandResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        OutputFormat::Text => {
            println!("{}", record.data);
            println!();
            println!("ID:      {}", record.local_id);
            match &record.remote_id {
                Some(id) => println!("Remote:  {}", id),
                None => println!("Remote:  (not synced)"),
            }
            println!("Sync:    {}", record.pending);
            println!("Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}

/// Asks for confirmation on stdin. Returns true on "y".
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Prints the outcome of a local delete.
pub fn print_deleted(noun: &str, label: &str, outcome: rentsync_core::LocalDelete) {
    match outcome {
        rentsync_core::LocalDelete::Erase => println!("Deleted {}: {}", noun, label),
        rentsync_core::LocalDelete::Pending => {
            println!("Deleted {}: {} (will be removed from the server on next sync)", noun, label)
        }
    }
}
