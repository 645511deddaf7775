//! Slack message payload model
//!
//! A [`Message`] is built fresh for every notification and serialized either as
//! the JSON body used by webhooks and `chat.postMessage`, or as a URL-encoded
//! form for the legacy query-string API. The same type is deserialized from the
//! `original_message` echoed back by interactive callbacks, so attachment order
//! must survive a round trip untouched.

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::errors::AppResult;

pub const DEFAULT_ATTACHMENT_COLOR: &str = "good";
pub const DEFAULT_FOOTER_TEXT: &str = "Graylog";

/// Sender icon, classified once from the configured `message_icon` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageIcon {
    Url(String),
    Emoji(String),
}

impl MessageIcon {
    /// Classify a raw icon value: http(s) URLs become [`MessageIcon::Url`],
    /// anything else (including unparseable input) is an emoji code.
    pub fn classify(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Some(MessageIcon::Url(raw.to_string()))
            }
            _ => Some(MessageIcon::Emoji(raw.to_string())),
        }
    }
}

/// Message formatting mode. Slack is always told not to parse the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ParseMode {
    #[default]
    #[serde(rename = "none")]
    Disabled,
}

/// Outbound Slack message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MessageWire", into = "MessageWire")]
pub struct Message {
    pub text: Option<String>,
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon: Option<MessageIcon>,
    pub parse: ParseMode,
    pub link_names: bool,
    pub attachments: Vec<Attachment>,
}

/// Flat wire shape of [`Message`]; `icon_url` and `icon_emoji` are separate keys.
/// `username` is read from callbacks but never sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing)]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<String>,
    #[serde(default)]
    link_names: bool,
    #[serde(default, skip_deserializing)]
    parse: ParseMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment>,
}

impl From<MessageWire> for Message {
    fn from(wire: MessageWire) -> Self {
        let icon = match (wire.icon_url, wire.icon_emoji) {
            (Some(url), _) => Some(MessageIcon::Url(url)),
            (None, Some(emoji)) => Some(MessageIcon::Emoji(emoji)),
            (None, None) => None,
        };
        Message {
            text: wire.text,
            channel: wire.channel,
            username: wire.username,
            icon,
            parse: wire.parse,
            link_names: wire.link_names,
            attachments: wire.attachments,
        }
    }
}

impl From<Message> for MessageWire {
    fn from(message: Message) -> Self {
        let (icon_url, icon_emoji) = match message.icon {
            Some(MessageIcon::Url(url)) => (Some(url), None),
            Some(MessageIcon::Emoji(emoji)) => (None, Some(emoji)),
            None => (None, None),
        };
        MessageWire {
            channel: message.channel,
            text: message.text,
            username: message.username,
            icon_url,
            icon_emoji,
            link_names: message.link_names,
            parse: message.parse,
            attachments: message.attachments,
        }
    }
}

impl Message {
    pub fn new(
        text: impl Into<String>,
        channel: impl Into<String>,
        username: impl Into<String>,
        message_icon: &str,
        link_names: bool,
    ) -> Self {
        Message {
            text: Some(text.into()),
            channel: Some(channel.into()),
            username: Some(username.into()),
            icon: MessageIcon::classify(message_icon),
            parse: ParseMode::Disabled,
            link_names,
            attachments: Vec::new(),
        }
    }

    pub fn icon_url(&self) -> Option<&str> {
        match &self.icon {
            Some(MessageIcon::Url(url)) => Some(url),
            _ => None,
        }
    }

    pub fn icon_emoji(&self) -> Option<&str> {
        match &self.icon {
            Some(MessageIcon::Emoji(emoji)) => Some(emoji),
            _ => None,
        }
    }

    /// JSON body for webhook and `chat.postMessage` delivery
    pub fn serialize_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// URL-encoded form body; attachments are embedded as one JSON value
    pub fn serialize_form(&self) -> AppResult<String> {
        let attachments = if self.attachments.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&self.attachments)?)
        };
        let link_names = self.link_names.to_string();
        let params: [(&str, Option<&str>); 7] = [
            ("channel", self.channel.as_deref()),
            ("text", self.text.as_deref()),
            ("icon_url", self.icon_url()),
            ("icon_emoji", self.icon_emoji()),
            ("link_names", Some(link_names.as_str())),
            ("parse", Some("none")),
            ("attachments", attachments.as_deref()),
        ];

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            if let Some(value) = value {
                serializer.append_pair(key, value);
            }
        }
        Ok(serializer.finish())
    }

    /// Append an attachment and return it for further decoration
    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Attachment {
        self.attachments.push(attachment);
        let last = self.attachments.len() - 1;
        &mut self.attachments[last]
    }

    /// Insert an attachment at `index`. Negative indexes insert at the front,
    /// indexes past the end append.
    pub fn insert_attachment(&mut self, index: isize, attachment: Attachment) -> &mut Attachment {
        let position = if index < 0 {
            0
        } else {
            (index as usize).min(self.attachments.len())
        };
        self.attachments.insert(position, attachment);
        &mut self.attachments[position]
    }
}

/// Message attachment, addressed by 1-based ordinal in interactive callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "footer", default, skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(rename = "footer_icon", default, skip_serializing_if = "Option::is_none")]
    pub footer_icon_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_ts",
        skip_serializing_if = "Option::is_none"
    )]
    pub ts: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
    #[serde(rename = "mrkdwn_in", default, skip_serializing_if = "Vec::is_empty")]
    pub markdown_in: Vec<String>,
}

impl Attachment {
    /// New attachment whose text doubles as the notification fallback
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Attachment {
            fallback: Some(text.clone()),
            text: Some(text),
            pretext: None,
            color: Some(DEFAULT_ATTACHMENT_COLOR.to_string()),
            footer_text: Some(DEFAULT_FOOTER_TEXT.to_string()),
            footer_icon_url: None,
            ts: None,
            fields: Vec::new(),
            callback_id: None,
            actions: None,
            markdown_in: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_footer(mut self, footer_text: Option<String>) -> Self {
        self.footer_text = footer_text;
        self
    }

    pub fn with_footer_icon(mut self, footer_icon_url: Option<String>) -> Self {
        self.footer_icon_url = footer_icon_url.filter(|url| !url.is_empty());
        self
    }

    pub fn with_ts(mut self, ts: Option<i64>) -> Self {
        self.ts = ts;
        self
    }

    pub fn with_callback_id(mut self, callback_id: impl Into<String>) -> Self {
        self.callback_id = Some(callback_id.into());
        self
    }

    pub fn with_actions(mut self, actions: Option<Vec<Action>>) -> Self {
        self.actions = actions;
        self
    }

    pub fn set_markdown_in(&mut self, fields: &[&str]) -> &mut Self {
        self.markdown_in = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn has_actions(&self) -> bool {
        self.actions.as_ref().is_some_and(|actions| !actions.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    #[serde(default)]
    pub short: bool,
}

impl Field {
    pub fn new(title: impl Into<String>, value: impl Into<String>, short: bool) -> Self {
        Field {
            title: title.into(),
            value: value.into(),
            short,
        }
    }
}

/// Interactive button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(rename = "text", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default = "default_action_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default = "default_action_style")]
    pub style: String,
}

impl Action {
    pub fn button(
        name: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        Action {
            name: name.into(),
            label: Some(label.into()),
            kind: default_action_type(),
            value: Some(value.into()),
            style: style.into(),
        }
    }
}

fn default_action_type() -> String {
    "button".to_string()
}

fn default_action_style() -> String {
    "default".to_string()
}

/// Slack echoes attachment timestamps either as numbers or numeric strings
fn deserialize_ts<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTs {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let raw = Option::<RawTs>::deserialize(deserializer)?;
    Ok(raw.and_then(|ts| match ts {
        RawTs::Int(value) => Some(value),
        RawTs::Float(value) => Some(value as i64),
        RawTs::Text(text) => text.trim().parse::<f64>().ok().map(|value| value as i64),
    }))
}
