//! Event notification handler
//!
//! Reads an event context produced by the alerting pipeline and runs it
//! through the same compose-and-deliver path the pipeline uses.

use super::super::CliContext;
use crate::errors::ErrorContextExt;
use crate::event::EventContext;
use crate::notifier::SlackNotification;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub struct SendHandler<'a> {
    context: &'a CliContext,
}

impl<'a> SendHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle(&self, event: &Path, dry_run: bool) -> Result<()> {
        let raw = read_event(event)?;
        let ctx = EventContext::from_json(&raw)?;
        debug!(event = ctx.title(), backlog = ctx.backlog.len(), "Loaded event context");

        let notification = SlackNotification::from_config(
            self.context.config_manager.config(),
            self.context.directory.clone(),
        )?;

        if dry_run {
            let message = notification.preview(&ctx).await;
            println!("{}", serde_json::to_string_pretty(&message)?);
            return Ok(());
        }

        notification
            .execute(&ctx)
            .await
            .context("Could not send message to Slack")?;
        println!("Notification sent for event: {}", ctx.title());
        Ok(())
    }
}

fn read_event(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read event context from stdin")?;
        return Ok(buffer);
    }
    Ok(std::fs::read_to_string(path).in_file_operation(path, "read event context")?)
}

super::traits::impl_context_handler!(SendHandler<'a>);
