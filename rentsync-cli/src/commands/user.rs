use clap::{Args, Subcommand};
use rentsync_core::{User, UserRole};

use super::{
    confirm, find_record, print_deleted, print_record, print_records, CommandKind, CommandResult,
    OutputFormat,
};
use crate::db::SqliteRepository;

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Add a user
    Add {
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: Option<String>,

        /// customer, agent or admin
        #[arg(long, default_value = "customer")]
        role: UserRole,
    },

    /// List users
    List {
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show users with this role
        #[arg(long)]
        role: Option<UserRole>,
    },

    /// Show a user's details
    Show {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a user
    Update {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        role: Option<UserRole>,
    },

    /// Delete a user
    Delete {
        /// Local ID (UUID) or remote ID
        identifier: String,

        #[arg(long, short)]
        force: bool,
    },
}

impl UserCommand {
    pub fn kind(&self) -> CommandKind {
        match self.command {
            UserSubcommand::List { .. } | UserSubcommand::Show { .. } => CommandKind::Read,
            _ => CommandKind::Write,
        }
    }

    pub async fn run(&self, repo: &SqliteRepository<User>) -> CommandResult {
        match &self.command {
            UserSubcommand::Add {
                name,
                email,
                phone,
                role,
            } => {
                let mut user = User::new(name, email).with_role(*role);
                if let Some(phone) = phone {
                    user = user.with_phone(phone);
                }

                let created = repo.create(user).await?;
                println!("Added user:");
                print_record(&created, &OutputFormat::Text)
            }

            UserSubcommand::List { format, role } => {
                let mut users = repo.list().await?;
                if let Some(role) = role {
                    users.retain(|r| r.data.role == *role);
                }
                print_records(&users, format)
            }

            UserSubcommand::Show { identifier, format } => {
                let record = find_record(repo, identifier).await?;
                print_record(&record, format)
            }

            UserSubcommand::Update {
                identifier,
                name,
                email,
                phone,
                role,
            } => {
                if name.is_none() && email.is_none() && phone.is_none() && role.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let record = find_record(repo, identifier).await?;
                let mut user = record.data.clone();
                if let Some(name) = name {
                    user.name = name.clone();
                }
                if let Some(email) = email {
                    user.email = email.clone();
                }
                if let Some(phone) = phone {
                    user.phone = Some(phone.clone());
                }
                if let Some(role) = role {
                    user.role = *role;
                }

                let updated = repo.update(record.local_id, user).await?;
                println!("Updated user:");
                print_record(&updated, &OutputFormat::Text)
            }

            UserSubcommand::Delete { identifier, force } => {
                let record = find_record(repo, identifier).await?;
                let label = record.data.email.clone();

                if !force && !confirm(&format!("Delete user '{}'?", label))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let outcome = repo.delete(record.local_id).await?;
                print_deleted("user", &label, outcome);
                Ok(())
            }
        }
    }
}
