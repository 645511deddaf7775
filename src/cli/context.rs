//! CLI Context for dependency injection and shared state
//!
//! This module provides the CliContext abstraction that centralizes
//! configuration management and logging setup for CLI handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigManager;
use crate::slack::UserDirectoryCache;

/// CLI execution context containing shared dependencies and configuration
#[derive(Clone)]
pub struct CliContext {
    pub verbose: bool,
    pub config_manager: Arc<ConfigManager>,
    /// Shared by every client the process builds
    pub directory: UserDirectoryCache,
}

impl CliContext {
    /// Create a new CLI context from an optional explicit config path
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let config_manager = Arc::new(ConfigManager::load(config_path)?);
        Ok(Self {
            verbose,
            config_manager,
            directory: UserDirectoryCache::new(),
        })
    }

    /// Initialize logging from verbosity and the `[logging]` section.
    ///
    /// Logs go to stderr so stdout stays clean for command output. With
    /// `logging.log_path` set they are also written to a daily rolling file;
    /// the returned guard must be held until exit to flush it.
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let logging = &self.config_manager.config().logging;
        let level = if self.verbose { "debug" } else { logging.level.as_str() };
        let env_filter = EnvFilter::from_default_env()
            .add_directive(level.parse().unwrap_or_else(|_| tracing::Level::INFO.into()));

        let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        let guard = match &logging.log_path {
            Some(log_path) => {
                let (directory, file_name) = split_log_path(log_path);
                std::fs::create_dir_all(directory).context("Failed to create log directory")?;
                let file_appender = tracing_appender::rolling::daily(directory, file_name);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()
                    .context("Failed to initialize logging")?;
                Some(guard)
            }
            None => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init()
                    .context("Failed to initialize logging")?;
                None
            }
        };

        if self.verbose {
            tracing::debug!(
                config = %self.config_manager.config_path().display(),
                "Verbose logging enabled"
            );
        }
        Ok(guard)
    }
}

fn split_log_path(log_path: &Path) -> (&Path, &std::ffi::OsStr) {
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("alert-slack.log"));
    (directory, file_name)
}
