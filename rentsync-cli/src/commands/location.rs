use clap::{Args, Subcommand};
use rentsync_core::Location;

use super::{
    confirm, find_record, print_deleted, print_record, print_records, CommandKind, CommandResult,
    OutputFormat,
};
use crate::db::SqliteRepository;

#[derive(Args)]
pub struct LocationCommand {
    #[command(subcommand)]
    pub command: LocationSubcommand,
}

#[derive(Subcommand)]
pub enum LocationSubcommand {
    /// Add a rental branch
    Add {
        name: String,

        #[arg(long)]
        address: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// List locations
    List {
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show locations in this city
        #[arg(long)]
        city: Option<String>,
    },

    /// Show a location's details
    Show {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a location
    Update {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Delete a location
    Delete {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short)]
        force: bool,
    },
}

impl LocationCommand {
    pub fn kind(&self) -> CommandKind {
        match self.command {
            LocationSubcommand::List { .. } | LocationSubcommand::Show { .. } => CommandKind::Read,
            _ => CommandKind::Write,
        }
    }

    pub async fn run(&self, repo: &SqliteRepository<Location>) -> CommandResult {
        match &self.command {
            LocationSubcommand::Add {
                name,
                address,
                city,
                phone,
            } => {
                let mut location = Location::new(name, address, city);
                if let Some(phone) = phone {
                    location = location.with_phone(phone);
                }

                let created = repo.create(location).await?;
                println!("Added location:");
                print_record(&created, &OutputFormat::Text)
            }

            LocationSubcommand::List { format, city } => {
                let mut locations = repo.list().await?;
                if let Some(city) = city {
                    locations.retain(|r| r.data.city.eq_ignore_ascii_case(city.trim()));
                }
                print_records(&locations, format)
            }

            LocationSubcommand::Show { identifier, format } => {
                let record = find_record(repo, identifier).await?;
                print_record(&record, format)
            }

            LocationSubcommand::Update {
                identifier,
                name,
                address,
                city,
                phone,
            } => {
                if name.is_none() && address.is_none() && city.is_none() && phone.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let record = find_record(repo, identifier).await?;
                let mut location = record.data.clone();
                if let Some(name) = name {
                    location.name = name.clone();
                }
                if let Some(address) = address {
                    location.address = address.clone();
                }
                if let Some(city) = city {
                    location.city = city.clone();
                }
                if let Some(phone) = phone {
                    location.phone = Some(phone.clone());
                }

                let updated = repo.update(record.local_id, location).await?;
                println!("Updated location:");
                print_record(&updated, &OutputFormat::Text)
            }

            LocationSubcommand::Delete { identifier, force } => {
                let record = find_record(repo, identifier).await?;
                let label = record.data.name.clone();

                if !force && !confirm(&format!("Delete location '{}'?", label))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let outcome = repo.delete(record.local_id).await?;
                print_deleted("location", &label, outcome);
                Ok(())
            }
        }
    }
}
