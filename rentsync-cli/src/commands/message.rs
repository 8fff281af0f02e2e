use clap::{Args, Subcommand};
use rentsync_core::Message;

use super::{
    confirm, find_record, print_deleted, print_record, print_records, CommandKind, CommandResult,
    OutputFormat,
};
use crate::db::SqliteRepository;

#[derive(Args)]
pub struct MessageCommand {
    #[command(subcommand)]
    pub command: MessageSubcommand,
}

#[derive(Subcommand)]
pub enum MessageSubcommand {
    /// Send a support message
    Add {
        /// Message text
        body: String,

        /// Sender name or email
        #[arg(long)]
        sender: String,

        /// Remote id of the reservation the message is about
        #[arg(long)]
        reservation: Option<String>,

        /// Message is from the support team
        #[arg(long)]
        support: bool,
    },

    /// List messages, oldest first
    List {
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show messages for this reservation
        #[arg(long)]
        reservation: Option<String>,
    },

    /// Show a message
    Show {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a message's text
    Update {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long)]
        body: String,
    },

    /// Delete a message
    Delete {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short)]
        force: bool,
    },
}

impl MessageCommand {
    pub fn kind(&self) -> CommandKind {
        match self.command {
            MessageSubcommand::List { .. } | MessageSubcommand::Show { .. } => CommandKind::Read,
            _ => CommandKind::Write,
        }
    }

    pub async fn run(&self, repo: &SqliteRepository<Message>) -> CommandResult {
        match &self.command {
            MessageSubcommand::Add {
                body,
                sender,
                reservation,
                support,
            } => {
                let mut message = Message::new(sender, body);
                if let Some(reservation) = reservation {
                    message = message.with_reservation(reservation);
                }
                if *support {
                    message = message.from_support();
                }

                let created = repo.create(message).await?;
                println!("Added message:");
                print_record(&created, &OutputFormat::Text)
            }

            MessageSubcommand::List {
                format,
                reservation,
            } => {
                let mut messages = repo.list().await?;
                if let Some(reservation) = reservation {
                    messages.retain(|r| {
                        r.data.reservation_id.as_deref() == Some(reservation.trim())
                    });
                }
                messages.sort_by_key(|r| r.data.sent_at);
                print_records(&messages, format)
            }

            MessageSubcommand::Show { identifier, format } => {
                let record = find_record(repo, identifier).await?;
                print_record(&record, format)
            }

            MessageSubcommand::Update { identifier, body } => {
                let record = find_record(repo, identifier).await?;
                let mut message = record.data.clone();
                message.body = body.clone();

                let updated = repo.update(record.local_id, message).await?;
                println!("Updated message:");
                print_record(&updated, &OutputFormat::Text)
            }

            MessageSubcommand::Delete { identifier, force } => {
                let record = find_record(repo, identifier).await?;

                if !force && !confirm("Delete this message?")? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let outcome = repo.delete(record.local_id).await?;
                print_deleted("message", &record.local_id.to_string(), outcome);
                Ok(())
            }
        }
    }
}
