//! Callback server handler

use super::super::CliContext;
use crate::server;
use anyhow::Result;

pub struct ServeHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ServeHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle(&self, bind: Option<String>) -> Result<()> {
        let bind = bind.unwrap_or_else(|| {
            self.context
                .config_manager
                .config()
                .server
                .bind_address
                .clone()
        });
        server::serve(&bind).await?;
        Ok(())
    }
}

super::traits::impl_context_handler!(ServeHandler<'a>);
