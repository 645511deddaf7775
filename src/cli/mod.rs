//! CLI module providing command-line interface functionality
//!
//! This module handles argument parsing and routes commands to handlers
//! that share one [`CliContext`].

pub mod commands;
pub mod context;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

pub use commands::{Cli, Commands, ConfigAction};
pub use context::CliContext;
pub use handlers::CommandHandler;

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Parse command line arguments and execute the requested command
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        if let Commands::Config {
            action: ConfigAction::Init { force },
        } = cli.command
        {
            return handlers::config::ConfigHandler::init(cli.config, force);
        }

        let context = CliContext::new(cli.config.clone(), cli.verbose)?;
        // Held until exit so buffered file logs are flushed
        let _log_guard = context.init_logging()?;

        CommandHandler::new(context).handle_command(cli.command).await
    }
}
