//! Explicit user lookup handler
//!
//! Unlike mention resolution during a send, a directory failure here is
//! reported to the caller.

use super::super::CliContext;
use crate::slack::{DeliveryClient, DeliveryConfig};
use anyhow::{bail, Result};

pub struct LookupHandler<'a> {
    context: &'a CliContext,
}

impl<'a> LookupHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle(&self, name: &str) -> Result<()> {
        let config = self.context.config_manager.config();
        if !config.slack.has_token() {
            bail!("User lookup needs slack.token; webhook mode cannot list users");
        }

        let client = DeliveryClient::with_directory(
            DeliveryConfig::from(&config.slack),
            self.context.directory.clone(),
        )?;
        let name = name.trim().trim_start_matches('@');
        let id = client.resolve_user(name).await?;
        if id == name {
            println!("{name}: not found");
        } else {
            println!("{name}: {id}");
        }
        Ok(())
    }
}

super::traits::impl_context_handler!(LookupHandler<'a>);
