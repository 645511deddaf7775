//! Command handlers for all CLI operations
//!
//! This module routes parsed commands to their handlers, keeping CLI parsing
//! separate from the notification logic.

pub mod config;
pub mod lookup;
pub mod send;
pub mod serve;
pub mod traits;

use super::{CliContext, Commands};
use anyhow::Result;

use config::ConfigHandler;
use lookup::LookupHandler;
use send::SendHandler;
use serve::ServeHandler;
use test::TestHandler;
use traits::HandlerBuilder;

/// Coordinates all command handling operations with dependency injection via CliContext
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    /// Route commands to their appropriate handlers
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        let handlers = HandlerBuilder::new(&self.context);
        match command {
            Commands::Send { event, dry_run } => {
                handlers.create::<SendHandler>().handle(&event, dry_run).await
            }
            Commands::Test { text, channel } => {
                handlers.create::<TestHandler>().handle(text, channel).await
            }
            Commands::Lookup { name } => handlers.create::<LookupHandler>().handle(&name).await,
            Commands::Serve { bind } => handlers.create::<ServeHandler>().handle(bind).await,
            Commands::Config { action } => handlers.create::<ConfigHandler>().handle(action),
        }
    }
}
