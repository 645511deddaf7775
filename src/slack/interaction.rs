//! Interactive button callbacks
//!
//! When a user clicks *Acknowledge* or *It is not me!!* Slack POSTs the click
//! together with a snapshot of the message it was attached to. Handling is
//! stateless: the snapshot is rebuilt into a [`Message`], the clicked
//! attachment loses its buttons, a status attachment is inserted right after
//! it, and the result replaces the original message.
//!
//! The endpoint must never fail towards Slack, so every problem collapses into
//! the fixed ephemeral reply [`EPHEMERAL_ERROR_RESPONSE`].

use serde::{Deserialize, Deserializer};
use tracing::{debug, error};

use super::message::{Action, Attachment, Message};
use crate::errors::{AppError, AppResult};

pub const ACKNOWLEDGE_ACTION: &str = "acknowledge";
pub const DECLINE_ACTION: &str = "decline";

pub const EPHEMERAL_ERROR_RESPONSE: &str = r#"{"response_type":"ephemeral","replace_original":false,"text":"Sorry, that didn't work. Please try again."}"#;

/// Body of the `payload` form field sent by Slack
#[derive(Debug, Clone, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub actions: Option<Vec<Action>>,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub team: Option<CallbackTeam>,
    #[serde(default)]
    pub channel: Option<CallbackChannel>,
    #[serde(default)]
    pub user: Option<CallbackUser>,
    #[serde(default)]
    pub action_ts: Option<String>,
    #[serde(default)]
    pub message_ts: Option<String>,
    #[serde(default, deserialize_with = "deserialize_ordinal")]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub original_message: Option<Message>,
    #[serde(default)]
    pub response_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackTeam {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl CallbackUser {
    fn mention(&self) -> String {
        match &self.name {
            Some(name) => format!("<@{}|{}>", self.id, name),
            None => format!("<@{}>", self.id),
        }
    }
}

/// Result of a clicked button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Acknowledged,
    Declined,
}

impl ActionOutcome {
    /// Only `acknowledge` with value `true` counts as an acknowledgement;
    /// every other button is a decline.
    pub fn from_action(action: &Action) -> Self {
        if action.name == ACKNOWLEDGE_ACTION && action.value.as_deref() == Some("true") {
            ActionOutcome::Acknowledged
        } else {
            ActionOutcome::Declined
        }
    }

    fn status_attachment(self, user: &CallbackUser, now: i64) -> Attachment {
        let (text, color) = match self {
            ActionOutcome::Acknowledged => (
                format!(":white_check_mark: {} *acknowledged*", user.mention()),
                "good",
            ),
            ActionOutcome::Declined => (
                format!(":x: {} *It is not me!!* <!here>", user.mention()),
                "danger",
            ),
        };
        let mut attachment = Attachment::new(text)
            .with_color(color)
            .with_footer(None)
            .with_ts(Some(now));
        attachment.set_markdown_in(&["text"]);
        attachment
    }
}

/// Stateless handler for interactive callbacks
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractionHandler;

impl InteractionHandler {
    pub fn new() -> Self {
        InteractionHandler
    }

    /// Turn a raw `payload` document into the JSON body returned to Slack.
    /// Never fails: errors become the ephemeral "didn't work" reply.
    pub fn respond(&self, raw_payload: &str) -> String {
        debug!(payload = raw_payload, "Received Slack action callback");
        let result = serde_json::from_str::<ActionPayload>(raw_payload)
            .map_err(AppError::from)
            .and_then(|payload| self.apply(payload, chrono::Utc::now().timestamp()))
            .and_then(|message| message.serialize_json());

        match result {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, category = e.category(), "Slack action callback failed");
                EPHEMERAL_ERROR_RESPONSE.to_string()
            }
        }
    }

    /// Apply the first clicked action to the original message
    pub fn apply(&self, payload: ActionPayload, now: i64) -> AppResult<Message> {
        let action = payload
            .actions
            .as_ref()
            .and_then(|actions| actions.first())
            .ok_or_else(|| AppError::invalid_callback("no actions in payload"))?;
        let outcome = ActionOutcome::from_action(action);

        let user = payload
            .user
            .as_ref()
            .ok_or_else(|| AppError::invalid_callback("missing user"))?;
        let ordinal = parse_ordinal(payload.attachment_id.as_deref())?;
        let mut message = payload
            .original_message
            .ok_or_else(|| AppError::invalid_callback("missing original_message"))?;

        let attachment = message
            .attachments
            .get_mut(ordinal - 1)
            .ok_or_else(|| {
                AppError::invalid_callback(format!("attachment {ordinal} does not exist"))
            })?;
        attachment.actions = None;

        message.insert_attachment(ordinal as isize, outcome.status_attachment(user, now));
        debug!(?outcome, ordinal, user = %user.id, "Resolved Slack action");
        Ok(message)
    }
}

/// Attachment ordinals are 1-based
fn parse_ordinal(raw: Option<&str>) -> AppResult<usize> {
    let raw = raw.ok_or_else(|| AppError::invalid_callback("missing attachment_id"))?;
    match raw.trim().parse::<usize>() {
        Ok(ordinal) if ordinal >= 1 => Ok(ordinal),
        _ => Err(AppError::invalid_callback(format!(
            "invalid attachment_id '{raw}'"
        ))),
    }
}

fn deserialize_ordinal<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOrdinal {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawOrdinal>::deserialize(deserializer)?.map(|raw| match raw {
        RawOrdinal::Text(text) => text,
        RawOrdinal::Number(number) => number.to_string(),
    }))
}
