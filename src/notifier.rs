//! Entry point used by the event pipeline: compose, deliver, classify failure

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::composer::MessageComposer;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::event::EventContext;
use crate::slack::{DeliveryClient, DeliveryConfig, Message, SlackClient, UserDirectoryCache};

/// Outcome reported back to the pipeline so it can schedule retries
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Temporary failure sending Slack notification: {source}")]
    Temporary {
        #[source]
        source: AppError,
    },

    #[error("Permanent failure sending Slack notification: {source}")]
    Permanent {
        #[source]
        source: AppError,
    },
}

impl NotificationError {
    pub fn is_temporary(&self) -> bool {
        matches!(self, NotificationError::Temporary { .. })
    }

    pub fn into_inner(self) -> AppError {
        match self {
            NotificationError::Temporary { source } | NotificationError::Permanent { source } => {
                source
            }
        }
    }
}

impl From<AppError> for NotificationError {
    fn from(source: AppError) -> Self {
        if source.is_retryable() {
            NotificationError::Temporary { source }
        } else {
            NotificationError::Permanent { source }
        }
    }
}

pub struct SlackNotification {
    composer: MessageComposer,
    client: Arc<dyn SlackClient>,
}

impl SlackNotification {
    pub fn new(composer: MessageComposer, client: Arc<dyn SlackClient>) -> Self {
        SlackNotification { composer, client }
    }

    /// Validate `config` and wire a delivery client around `directory`
    pub fn from_config(config: &Config, directory: UserDirectoryCache) -> AppResult<Self> {
        config.validate()?;
        let client = DeliveryClient::with_directory(DeliveryConfig::from(&config.slack), directory)?;
        let composer = MessageComposer::new(config.slack.clone(), config.message.clone());
        Ok(Self::new(composer, Arc::new(client)))
    }

    /// Compose the message without sending it
    pub async fn preview(&self, ctx: &EventContext) -> Message {
        self.composer.compose(ctx, self.client.as_ref()).await
    }

    pub async fn execute(&self, ctx: &EventContext) -> Result<(), NotificationError> {
        let message = self.preview(ctx).await;
        match self.client.send(&message).await {
            Ok(()) => {
                info!(
                    event = ctx.title(),
                    attachments = message.attachments.len(),
                    "Sent Slack notification"
                );
                Ok(())
            }
            Err(e) => {
                let outcome = NotificationError::from(e);
                if outcome.is_temporary() {
                    warn!(error = %outcome, "Slack notification failed; pipeline may retry");
                } else {
                    error!(error = %outcome, "Slack notification failed");
                }
                Err(outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MessageConfig, SlackConfig};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedSlack {
        failure: Mutex<Option<AppError>>,
        sent: Mutex<Vec<Message>>,
    }

    impl ScriptedSlack {
        fn new(failure: Option<AppError>) -> Arc<Self> {
            Arc::new(ScriptedSlack {
                failure: Mutex::new(failure),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SlackClient for ScriptedSlack {
        async fn send(&self, message: &Message) -> AppResult<()> {
            if let Some(e) = self.failure.lock().unwrap().take() {
                return Err(e);
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn resolve_user(&self, display_name: &str) -> AppResult<String> {
            Ok(display_name.to_string())
        }
    }

    fn notification(slack: Arc<ScriptedSlack>) -> SlackNotification {
        let composer = MessageComposer::new(SlackConfig::default(), MessageConfig::default());
        SlackNotification::new(composer, slack)
    }

    #[tokio::test]
    async fn test_execute_sends_composed_message() {
        let slack = ScriptedSlack::new(None);
        notification(slack.clone())
            .execute(&EventContext::default())
            .await
            .unwrap();
        let sent = slack.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text.as_deref(), Some("Unknown"));
    }

    #[tokio::test]
    async fn test_server_errors_are_temporary() {
        let slack = ScriptedSlack::new(Some(AppError::rejected(503, "unavailable")));
        let err = notification(slack).execute(&EventContext::default()).await.unwrap_err();
        assert!(err.is_temporary());
    }

    #[tokio::test]
    async fn test_client_errors_are_permanent() {
        let slack = ScriptedSlack::new(Some(AppError::rejected(404, "no_service")));
        let err = notification(slack).execute(&EventContext::default()).await.unwrap_err();
        assert!(!err.is_temporary());
        assert!(matches!(
            err.into_inner(),
            AppError::Rejected { status_code: 404, .. }
        ));
    }

    #[test]
    fn test_from_config_requires_destination() {
        let err = SlackNotification::from_config(&Config::default(), UserDirectoryCache::new())
            .err()
            .unwrap();
        assert_eq!(err.category(), "config");
    }
}
