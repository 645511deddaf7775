//! Configuration management handler

use super::super::{CliContext, ConfigAction};
use crate::config::ConfigManager;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Handler for configuration operations
pub struct ConfigHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ConfigHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    /// Write a default configuration file.
    ///
    /// Runs without a [`CliContext`] because loading one would already create
    /// the file being initialized.
    pub fn init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
        let manager = ConfigManager::init(config_path, force)?;
        println!(
            "Configuration initialized at: {}",
            manager.config_path().display()
        );
        Ok(())
    }

    pub fn handle(&self, action: ConfigAction) -> Result<()> {
        let config_manager = &self.context.config_manager;
        match action {
            ConfigAction::Show => {
                let rendered = toml::to_string_pretty(config_manager.config())
                    .context("Failed to render configuration")?;
                println!("{rendered}");
            }
            ConfigAction::Init { force } => {
                Self::init(Some(config_manager.config_path().to_path_buf()), force)?;
            }
            ConfigAction::Path => {
                println!("{}", config_manager.config_path().display());
            }
        }
        Ok(())
    }
}

super::traits::impl_context_handler!(ConfigHandler<'a>);
