use chrono::NaiveDate;
use clap::{Args, Subcommand};
use rentsync_core::{Reservation, ReservationStatus};

use super::{
    confirm, find_record, print_deleted, print_record, print_records, CommandKind, CommandResult,
    OutputFormat,
};
use crate::db::SqliteRepository;

#[derive(Args)]
pub struct ReservationCommand {
    #[command(subcommand)]
    pub command: ReservationSubcommand,
}

#[derive(Subcommand)]
pub enum ReservationSubcommand {
    /// Book a vehicle
    Add {
        /// Remote id of the vehicle
        #[arg(long)]
        vehicle: String,

        /// Remote id of the renting user
        #[arg(long)]
        user: String,

        /// Pick-up date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Return date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Daily rate in cents used to price the booking
        #[arg(long)]
        rate: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List reservations
    List {
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show reservations with this status
        #[arg(long)]
        status: Option<ReservationStatus>,
    },

    /// Show a reservation's details
    Show {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a reservation
    Update {
        /// Local ID (UUID) or remote ID
        identifier: String,

        /// pending, confirmed, active, completed or cancelled
        #[arg(long)]
        status: Option<ReservationStatus>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        /// Re-price the booking with this daily rate in cents
        #[arg(long)]
        rate: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a reservation
    Delete {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short)]
        force: bool,
    },
}

impl ReservationCommand {
    pub fn kind(&self) -> CommandKind {
        match self.command {
            ReservationSubcommand::List { .. } | ReservationSubcommand::Show { .. } => {
                CommandKind::Read
            }
            _ => CommandKind::Write,
        }
    }

    pub async fn run(&self, repo: &SqliteRepository<Reservation>) -> CommandResult {
        match &self.command {
            ReservationSubcommand::Add {
                vehicle,
                user,
                start,
                end,
                rate,
                notes,
            } => {
                let mut reservation = Reservation::new(vehicle, user, *start, *end);
                if let Some(rate) = rate {
                    reservation = reservation.priced_at(*rate);
                }
                if let Some(notes) = notes {
                    reservation = reservation.with_notes(notes);
                }

                let created = repo.create(reservation).await?;
                println!("Added reservation:");
                print_record(&created, &OutputFormat::Text)
            }

            ReservationSubcommand::List { format, status } => {
                let mut reservations = repo.list().await?;
                if let Some(status) = status {
                    reservations.retain(|r| r.data.status == *status);
                }
                reservations.sort_by_key(|r| r.data.start_date);
                print_records(&reservations, format)
            }

            ReservationSubcommand::Show { identifier, format } => {
                let record = find_record(repo, identifier).await?;
                print_record(&record, format)?;
                if matches!(format, OutputFormat::Text) {
                    println!("Days:    {}", record.data.days());
                    println!(
                        "Total:   {}.{:02}",
                        record.data.total_cents / 100,
                        record.data.total_cents % 100
                    );
                }
                Ok(())
            }

            ReservationSubcommand::Update {
                identifier,
                status,
                start,
                end,
                rate,
                notes,
            } => {
                if status.is_none()
                    && start.is_none()
                    && end.is_none()
                    && rate.is_none()
                    && notes.is_none()
                {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let record = find_record(repo, identifier).await?;
                let mut reservation = record.data.clone();
                if let Some(start) = start {
                    reservation.start_date = *start;
                }
                if let Some(end) = end {
                    reservation.end_date = *end;
                }
                if let Some(rate) = rate {
                    reservation = reservation.priced_at(*rate);
                }
                if let Some(notes) = notes {
                    reservation.notes = Some(notes.clone());
                }
                match status {
                    Some(ReservationStatus::Cancelled) => reservation.cancel(),
                    Some(status) => reservation.status = *status,
                    None => {}
                }

                let updated = repo.update(record.local_id, reservation).await?;
                println!("Updated reservation:");
                print_record(&updated, &OutputFormat::Text)
            }

            ReservationSubcommand::Delete { identifier, force } => {
                let record = find_record(repo, identifier).await?;
                let label = record.data.to_string();

                if !force && !confirm(&format!("Delete reservation '{}'?", label))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let outcome = repo.delete(record.local_id).await?;
                print_deleted("reservation", &label, outcome);
                Ok(())
            }
        }
    }
}
