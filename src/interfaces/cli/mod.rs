//! CLI interface module
//!
//! This module provides command-line interface functionality for milkeyway.

pub mod commands;

use std::fmt;

use crate::cli::{Commands, ConfigCommands};
use crate::storage::StorageFactory;
use commands::{config_generate, run_migrate, run_sweep_daemon, run_sweep_once, run_track, show_consumer, update_tier};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::MilkeywayError> for CliError {
    fn from(err: crate::errors::MilkeywayError) -> Self {
        CliError::StorageError(err.to_string())
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    // Generate doesn't need DB connection
    if let Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    } = cmd
    {
        return config_generate(output_path, force).await;
    }

    // 连接时会自动运行迁移
    let storage = StorageFactory::create().await?;
    let settings = crate::config::get_config().activity.clone();

    match cmd {
        Commands::Migrate => run_migrate(storage).await,
        Commands::Sweep => run_sweep_once(storage, settings).await,
        Commands::Run => run_sweep_daemon(storage, settings).await,
        Commands::Show { consumer_id, json } => {
            show_consumer(storage, settings, consumer_id, json).await
        }
        Commands::Tier { consumer_id } => update_tier(storage, settings, consumer_id).await,
        Commands::Track { event } => run_track(storage, settings, event).await,
        Commands::Config { .. } => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_format() {
        let err = CliError::CommandError("sweep failed".into());
        assert_eq!(err.format_simple(), "Command error: sweep failed");
        assert_eq!(err.to_string(), "Command error: sweep failed");
    }

    #[test]
    fn test_from_milkeyway_error() {
        let err: CliError = crate::errors::MilkeywayError::database_connection("refused").into();
        assert!(matches!(err, CliError::StorageError(_)));
    }
}
