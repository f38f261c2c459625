//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for milkeyway using clap's derive macros.

use clap::{Parser, Subcommand};

/// Milkeyway - consumer activity aggregator
#[derive(Parser)]
#[command(name = "milkeyway")]
#[command(version)]
#[command(about = "Per-consumer activity summaries for the Milkeyway marketplace", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Run the staleness sweep once and exit
    Sweep,

    /// Run the periodic staleness sweep until Ctrl+C
    Run,

    /// Show the activity summary of a consumer
    Show {
        consumer_id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute the tier of a consumer
    Tier { consumer_id: i64 },

    /// Record a single activity event
    Track {
        #[command(subcommand)]
        event: TrackCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Activity events
#[derive(Subcommand)]
pub enum TrackCommands {
    /// Ensure a summary row exists
    Init { consumer_id: i64 },

    /// Consumer sent a connection request to a farmer
    Sent { consumer_id: i64, farmer_id: i64 },

    /// Farmer accepted the consumer's request
    Accepted { consumer_id: i64, farmer_id: i64 },

    /// Farmer rejected the consumer's request
    Rejected { consumer_id: i64, farmer_id: i64 },

    /// Consumer placed an order
    Order {
        consumer_id: i64,

        /// Order amount (missing or non-finite amounts count as 0)
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<f64>,
    },

    /// Consumer left a review
    Review { consumer_id: i64 },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}
