use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;

use super::{CommandResult, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# rent configuration

# Path to SQLite database (default: ~/.local/share/rent/rent.db)
# database_path: ~/.local/share/rent/rent.db

sync:
  # Rental backend base URL
  # server_url: "http://localhost:8080"

  # Sync the affected entity type before reads and after writes
  auto_sync: false

  # Periodic sync interval for 'rent daemon'
  interval_minutes: 15

  # Per-request timeout
  request_timeout_secs: 10
"#;

impl ConfigCommand {
    pub fn run(&self, config: &Config, cli_config_path: Option<PathBuf>) -> CommandResult {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!(
                            "sync.server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.auto_sync: {}", config.sync.auto_sync);
                        println!(
                            "sync.interval_minutes: {}",
                            config.sync.interval_minutes.value
                        );
                        println!("  source: {}", config.sync.interval_minutes.source);
                        println!(
                            "sync.request_timeout_secs: {}",
                            config.sync.request_timeout_secs
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'rent config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&config_path, DEFAULT_CONFIG)?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}
