use clap::{Args, Subcommand};
use rentsync_core::Vehicle;

use super::{
    confirm, find_record, print_deleted, print_record, print_records, CommandKind, CommandResult,
    OutputFormat,
};
use crate::db::SqliteRepository;

#[derive(Args)]
pub struct VehicleCommand {
    #[command(subcommand)]
    pub command: VehicleSubcommand,
}

#[derive(Subcommand)]
pub enum VehicleSubcommand {
    /// Add a vehicle to the fleet
    Add {
        make: String,
        model: String,
        year: i32,

        /// License plate
        #[arg(long)]
        plate: String,

        /// Daily rate in cents
        #[arg(long, default_value_t = 0)]
        rate: i64,

        /// Remote id of the location the vehicle is parked at
        #[arg(long)]
        location: Option<String>,

        /// Add the vehicle as not available for rental
        #[arg(long)]
        unavailable: bool,
    },

    /// List vehicles
    List {
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show available vehicles
        #[arg(long)]
        available: bool,
    },

    /// Show a vehicle's details
    Show {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a vehicle
    Update {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long)]
        make: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        plate: Option<String>,

        /// Daily rate in cents
        #[arg(long)]
        rate: Option<i64>,

        #[arg(long)]
        location: Option<String>,

        /// Mark the vehicle available (true) or unavailable (false)
        #[arg(long)]
        available: Option<bool>,
    },

    /// Delete a vehicle
    Delete {
        /// Local ID (UUID) or remote ID
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl VehicleCommand {
    pub fn kind(&self) -> CommandKind {
        match self.command {
            VehicleSubcommand::List { .. } | VehicleSubcommand::Show { .. } => CommandKind::Read,
            _ => CommandKind::Write,
        }
    }

    pub async fn run(&self, repo: &SqliteRepository<Vehicle>) -> CommandResult {
        match &self.command {
            VehicleSubcommand::Add {
                make,
                model,
                year,
                plate,
                rate,
                location,
                unavailable,
            } => {
                let mut vehicle = Vehicle::new(make, model, *year, plate).with_daily_rate(*rate);
                if let Some(location) = location {
                    vehicle = vehicle.with_location(location);
                }
                if *unavailable {
                    vehicle = vehicle.unavailable();
                }

                let created = repo.create(vehicle).await?;
                println!("Added vehicle:");
                print_record(&created, &OutputFormat::Text)
            }

            VehicleSubcommand::List { format, available } => {
                let mut vehicles = repo.list().await?;
                if *available {
                    vehicles.retain(|r| r.data.available);
                }
                print_records(&vehicles, format)
            }

            VehicleSubcommand::Show { identifier, format } => {
                let record = find_record(repo, identifier).await?;
                print_record(&record, format)
            }

            VehicleSubcommand::Update {
                identifier,
                make,
                model,
                year,
                plate,
                rate,
                location,
                available,
            } => {
                let has_updates = make.is_some()
                    || model.is_some()
                    || year.is_some()
                    || plate.is_some()
                    || rate.is_some()
                    || location.is_some()
                    || available.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let record = find_record(repo, identifier).await?;
                let mut vehicle = record.data.clone();

                if let Some(make) = make {
                    vehicle.make = make.clone();
                }
                if let Some(model) = model {
                    vehicle.model = model.clone();
                }
                if let Some(year) = year {
                    vehicle.year = *year;
                }
                if let Some(plate) = plate {
                    vehicle.license_plate = plate.clone();
                }
                if let Some(rate) = rate {
                    vehicle.daily_rate_cents = *rate;
                }
                if let Some(location) = location {
                    vehicle.location_id = Some(location.clone()).filter(|l| !l.trim().is_empty());
                }
                if let Some(available) = available {
                    vehicle.available = *available;
                }

                let updated = repo.update(record.local_id, vehicle).await?;
                println!("Updated vehicle:");
                print_record(&updated, &OutputFormat::Text)
            }

            VehicleSubcommand::Delete { identifier, force } => {
                let record = find_record(repo, identifier).await?;
                let label = record.data.display_name();

                if !force && !confirm(&format!("Delete vehicle '{}'?", label))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let outcome = repo.delete(record.local_id).await?;
                print_deleted("vehicle", &label, outcome);
                Ok(())
            }
        }
    }
}
