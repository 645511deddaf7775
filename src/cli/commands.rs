//! Command definitions and structures for the CLI
//!
//! This module contains all the clap-based command line argument definitions,
//! including the main CLI structure and all subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "alert-slack")]
#[command(about = "Deliver alert notifications to Slack and handle their button callbacks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "ALERT_SLACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compose and deliver a notification for an event context file
    Send {
        /// JSON file with the event context ("-" reads stdin)
        #[arg(short, long)]
        event: PathBuf,

        /// Print the composed payload instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Send a plain test message
    Test {
        /// Message text
        text: String,

        /// Override the configured channel
        #[arg(long)]
        channel: Option<String>,
    },

    /// Resolve a Slack display name to a user id
    Lookup {
        /// Display name, with or without a leading '@'
        name: String,
    },

    /// Run the interactive callback server
    Serve {
        /// Address to listen on (overrides server.bind_address)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file location
    Path,
}
