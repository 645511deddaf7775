use async_trait::async_trait;

use super::message::Message;
use crate::errors::AppResult;

/// Delivery interface used by the message composer and the notifier
#[async_trait]
pub trait SlackClient: Send + Sync {
    /// Deliver a message to Slack
    async fn send(&self, message: &Message) -> AppResult<()>;

    /// Resolve a display name to a Slack user id.
    ///
    /// Unknown names are returned unchanged; only a failing directory
    /// traversal is reported as an error.
    async fn resolve_user(&self, display_name: &str) -> AppResult<String>;
}
