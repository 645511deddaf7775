//! Builds the outbound Slack message for a fired alert
//!
//! The message text names the people to notify, the streams that matched and
//! the event title. Each of the first `backlog_items` backlog entries becomes
//! one attachment whose position (1-based) is what interactive callbacks later
//! use to address it, so attachment order follows backlog order exactly.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{MessageConfig, SlackConfig};
use crate::event::{BacklogEntry, EventContext, StreamRef};
use crate::slack::interaction::{ACKNOWLEDGE_ACTION, DECLINE_ACTION};
use crate::slack::{Action, Attachment, Field, Message, SlackClient};
use crate::templates::TemplateEngine;

pub const INVALID_FOOTER_TEMPLATE: &str = "Invalid footer template";

/// Field name that selects the backlog entry's own receipt time
const ENTRY_TIMESTAMP_FIELD: &str = "timestamp";

const STREAM_LINK_QUERY: &str = "messages?q=*&rangetype=relative&relative=3600";

#[derive(Debug, Clone)]
pub struct MessageComposer {
    slack: SlackConfig,
    message: MessageConfig,
    templates: TemplateEngine,
}

impl MessageComposer {
    pub fn new(slack: SlackConfig, message: MessageConfig) -> Self {
        MessageComposer {
            slack,
            message,
            templates: TemplateEngine::new(),
        }
    }

    /// Compose the message for `ctx`, resolving mentions through `client`.
    ///
    /// Never fails; every problem degrades to a fallback value.
    pub async fn compose(&self, ctx: &EventContext, client: &dyn SlackClient) -> Message {
        let text = self.build_text(ctx, client).await;
        let mut message = Message::new(
            text,
            &self.slack.channel,
            &self.slack.user_name,
            &self.slack.message_icon,
            self.slack.link_names,
        );

        let custom_fields = self.message.custom_fields();
        for entry in ctx.backlog.iter().take(self.message.backlog_items) {
            let fields = ctx.entry_fields(entry);
            let attachment = message.add_attachment(self.build_attachment(entry, &fields));
            for name in &custom_fields {
                if let Some(value) = self.resolve_field(name, &fields) {
                    attachment.add_field(Field::new(name, value, self.message.short_mode));
                }
            }
        }

        debug!(
            attachments = message.attachments.len(),
            event = ctx.title(),
            "Composed Slack message"
        );
        message
    }

    async fn build_text(&self, ctx: &EventContext, client: &dyn SlackClient) -> String {
        let mut text = String::new();

        if !self.slack.notify_users.is_empty() {
            let mentions = self.build_mentions(ctx, client).await;
            text.push_str(mentions.trim());
            text.push(' ');
        }

        let base_url = self.console_url();
        for stream in &ctx.streams {
            match base_url {
                Some(base) => {
                    text.push_str(&format!(" <{}|{}> ", stream_link(base, stream), stream.title))
                }
                None => text.push_str(&format!(" _{}_ ", stream.title)),
            }
        }

        text.push_str(ctx.title());
        text
    }

    /// Render the mention directive and turn every `@name` into `<@id>`
    async fn build_mentions(&self, ctx: &EventContext, client: &dyn SlackClient) -> String {
        let fields = ctx.merged_backlog_fields();
        let directive = self
            .templates
            .render(&self.slack.notify_users, &fields)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Mention directive is not a valid template; using it verbatim");
                self.slack.notify_users.clone()
            });

        if !directive.contains('@') {
            return directive;
        }

        let mut mentions = String::new();
        for name in directive.split('@').map(str::trim).filter(|n| !n.is_empty()) {
            let id = match client.resolve_user(name).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(user = name, error = %e, "Could not resolve Slack user; mentioning by name");
                    name.to_string()
                }
            };
            mentions.push_str(&format!("<@{id}> "));
        }
        mentions
    }

    fn build_attachment(&self, entry: &BacklogEntry, fields: &Map<String, Value>) -> Attachment {
        let mut text = entry.message.clone();
        if self.message.preformat {
            text = format!("```{text}```");
        }

        let (footer, ts) = if self.message.footer_text.is_empty() {
            (None, None)
        } else {
            (Some(self.render_footer(entry, fields)), self.entry_ts(entry))
        };

        let actions = self.message.acknowledge.then(acknowledge_actions);

        let mut attachment = Attachment::new(text)
            .with_color(&self.message.color)
            .with_footer(footer)
            .with_footer_icon(Some(self.message.footer_icon_url.clone()))
            .with_ts(ts)
            .with_callback_id(&entry.id)
            .with_actions(actions);
        if self.message.preformat {
            attachment.set_markdown_in(&["text"]);
        }
        attachment
    }

    fn render_footer(&self, entry: &BacklogEntry, fields: &Map<String, Value>) -> String {
        let footer = match self.templates.render(&self.message.footer_text, fields) {
            Ok(rendered) => rendered.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Footer template failed to render");
                INVALID_FOOTER_TEMPLATE.to_string()
            }
        };
        match self.console_url() {
            Some(base) => format!("<{}|{}>", message_link(base, entry), footer),
            None => footer,
        }
    }

    /// Epoch seconds for the attachment footer, or `None` when the configured
    /// field is missing or unparseable
    fn entry_ts(&self, entry: &BacklogEntry) -> Option<i64> {
        let field = self.message.footer_ts_field.as_str();
        if field == ENTRY_TIMESTAMP_FIELD {
            return Some(entry.timestamp.timestamp());
        }
        let ts = entry.fields.get(field).and_then(parse_timestamp);
        if ts.is_none() {
            debug!(field, message_id = %entry.id, "Footer timestamp field missing or unparseable");
        }
        ts
    }

    /// A custom field is first tried as a template. When the output is empty
    /// or just the field name again, the name is looked up directly instead.
    fn resolve_field(&self, name: &str, fields: &Map<String, Value>) -> Option<String> {
        let rendered = self
            .templates
            .render(name, fields)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && value != name);

        rendered.or_else(|| fields.get(name).and_then(field_value))
    }

    fn console_url(&self) -> Option<&str> {
        Some(self.message.graylog_url.as_str()).filter(|url| !url.is_empty())
    }
}

fn acknowledge_actions() -> Vec<Action> {
    vec![
        Action::button(ACKNOWLEDGE_ACTION, "Acknowledge", "true", "primary"),
        Action::button(DECLINE_ACTION, "It is not me!!", "true", "danger"),
    ]
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

pub fn stream_link(base: &str, stream: &StreamRef) -> String {
    format!(
        "{}streams/{}/{}",
        with_trailing_slash(base),
        stream.id,
        STREAM_LINK_QUERY
    )
}

pub fn message_link(base: &str, entry: &BacklogEntry) -> String {
    format!("{}messages/{}/{}", with_trailing_slash(base), entry.index, entry.id)
}

fn field_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Numbers are epoch milliseconds; strings are RFC 3339 or
/// `YYYY-MM-DD HH:MM:SS[.fff]` in UTC. Returns epoch seconds.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|millis| millis / 1000),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.timestamp());
            }
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .map(|naive| naive.and_utc().timestamp())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, AppResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSlack {
        users: HashMap<String, String>,
        failing: bool,
        lookups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SlackClient for FakeSlack {
        async fn send(&self, _message: &Message) -> AppResult<()> {
            Ok(())
        }

        async fn resolve_user(&self, display_name: &str) -> AppResult<String> {
            self.lookups.lock().unwrap().push(display_name.to_string());
            if self.failing {
                return Err(AppError::directory_lookup("users.list unavailable"));
            }
            Ok(self
                .users
                .get(display_name)
                .cloned()
                .unwrap_or_else(|| display_name.to_string()))
        }
    }

    fn context() -> EventContext {
        serde_json::from_value(json!({
            "event_definition": {"id": "def-1", "type": "aggregation-v1", "title": "High error rate"},
            "job_definition_id": "job-1",
            "job_trigger_id": "trigger-1",
            "event": {"priority": 2},
            "streams": [{"id": "s1", "title": "Errors"}],
            "backlog": [
                {"id": "m1", "index": "graylog_0", "timestamp": "2024-03-01T10:00:00Z",
                 "message": "boom", "fields": {"source": "web-01", "owner": "alice", "level": 3,
                                               "seen_at": "2024-03-01 09:59:58.123"}},
                {"id": "m2", "index": "graylog_1", "timestamp": "2024-03-01T10:00:05Z",
                 "message": "bang", "fields": {"source": "web-02", "owner": "bob"}}
            ]
        }))
        .unwrap()
    }

    fn composer(configure: impl FnOnce(&mut SlackConfig, &mut MessageConfig)) -> MessageComposer {
        let mut slack = SlackConfig::default();
        let mut message = MessageConfig::default();
        configure(&mut slack, &mut message);
        MessageComposer::new(slack, message)
    }

    #[tokio::test]
    async fn test_plain_text_without_console_url() {
        let composer = composer(|_, _| {});
        let message = composer.compose(&context(), &FakeSlack::default()).await;

        assert_eq!(message.text.as_deref(), Some(" _Errors_ High error rate"));
        assert_eq!(message.channel.as_deref(), Some("#channel"));
        assert_eq!(message.username.as_deref(), Some("Graylog"));
        assert_eq!(message.attachments.len(), 1);

        let attachment = &message.attachments[0];
        assert_eq!(attachment.text.as_deref(), Some("boom"));
        assert_eq!(attachment.color.as_deref(), Some("#FF0000"));
        assert_eq!(attachment.footer_text.as_deref(), Some("web-01"));
        assert_eq!(attachment.callback_id.as_deref(), Some("m1"));
        assert_eq!(attachment.ts, Some(1_709_287_200));
        assert!(attachment.actions.is_none());
    }

    #[tokio::test]
    async fn test_links_with_console_url() {
        let composer = composer(|_, message| {
            message.graylog_url = "https://graylog.example.com".to_string();
        });
        let message = composer.compose(&context(), &FakeSlack::default()).await;

        assert_eq!(
            message.text.as_deref(),
            Some(" <https://graylog.example.com/streams/s1/messages?q=*&rangetype=relative&relative=3600|Errors> High error rate")
        );
        assert_eq!(
            message.attachments[0].footer_text.as_deref(),
            Some("<https://graylog.example.com/messages/graylog_0/m1|web-01>")
        );
    }

    #[tokio::test]
    async fn test_mentions_are_resolved() {
        let fake = FakeSlack {
            users: HashMap::from([("alice".to_string(), "U1".to_string())]),
            ..FakeSlack::default()
        };
        let composer = composer(|slack, _| slack.notify_users = "@{{owner}} @carol".to_string());
        let message = composer.compose(&context(), &fake).await;

        assert_eq!(
            message.text.as_deref(),
            Some("<@U1> <@carol>  _Errors_ High error rate")
        );
        assert_eq!(*fake.lookups.lock().unwrap(), vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_mention_lookup_failure_falls_back_to_name() {
        let fake = FakeSlack {
            failing: true,
            ..FakeSlack::default()
        };
        let composer = composer(|slack, _| slack.notify_users = "@alice".to_string());
        let message = composer.compose(&context(), &fake).await;
        assert!(message.text.as_deref().unwrap().starts_with("<@alice> "));
    }

    #[tokio::test]
    async fn test_mentions_without_backlog_render_empty_placeholders() {
        let mut ctx = context();
        ctx.backlog.clear();
        let composer = composer(|slack, _| slack.notify_users = "on call {{owner}}".to_string());
        let message = composer.compose(&ctx, &FakeSlack::default()).await;

        assert_eq!(message.text.as_deref(), Some("on call  _Errors_ High error rate"));
        assert!(message.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_backlog_items_limit_and_order() {
        let composer = composer(|_, message| message.backlog_items = 5);
        let message = composer.compose(&context(), &FakeSlack::default()).await;
        let ids: Vec<_> = message
            .attachments
            .iter()
            .map(|a| a.callback_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        let none = composer_with_zero_backlog()
            .compose(&context(), &FakeSlack::default())
            .await;
        assert!(none.attachments.is_empty());
    }

    fn composer_with_zero_backlog() -> MessageComposer {
        composer(|_, message| message.backlog_items = 0)
    }

    #[tokio::test]
    async fn test_acknowledge_and_preformat() {
        let composer = composer(|_, message| {
            message.acknowledge = true;
            message.preformat = true;
        });
        let message = composer.compose(&context(), &FakeSlack::default()).await;
        let attachment = &message.attachments[0];

        assert_eq!(attachment.text.as_deref(), Some("```boom```"));
        assert_eq!(attachment.markdown_in, vec!["text".to_string()]);
        let actions = attachment.actions.as_ref().unwrap();
        assert_eq!(actions[0].name, "acknowledge");
        assert_eq!(actions[0].style, "primary");
        assert_eq!(actions[1].name, "decline");
        assert_eq!(actions[1].label.as_deref(), Some("It is not me!!"));
        assert_eq!(actions[1].style, "danger");
    }

    #[tokio::test]
    async fn test_custom_fields() {
        let composer = composer(|_, message| {
            message.fields = "source, level, missing, {{event_definition_title}}".to_string();
            message.short_mode = false;
        });
        let message = composer.compose(&context(), &FakeSlack::default()).await;
        let fields = &message.attachments[0].fields;

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], Field::new("source", "web-01", false));
        assert_eq!(fields[1], Field::new("level", "3", false));
        assert_eq!(
            fields[2],
            Field::new("{{event_definition_title}}", "High error rate", false)
        );
    }

    #[tokio::test]
    async fn test_footer_failures_degrade() {
        let broken = composer(|_, message| message.footer_text = "{{#if}}".to_string());
        let message = broken.compose(&context(), &FakeSlack::default()).await;
        assert_eq!(
            message.attachments[0].footer_text.as_deref(),
            Some(INVALID_FOOTER_TEMPLATE)
        );

        let no_footer = composer(|_, message| message.footer_text.clear());
        let message = no_footer.compose(&context(), &FakeSlack::default()).await;
        assert!(message.attachments[0].footer_text.is_none());
        assert!(message.attachments[0].ts.is_none());
    }

    #[tokio::test]
    async fn test_custom_ts_field() {
        let custom = composer(|_, message| message.footer_ts_field = "seen_at".to_string());
        let message = custom.compose(&context(), &FakeSlack::default()).await;
        assert_eq!(message.attachments[0].ts, Some(1_709_287_198));

        let missing = composer(|_, message| message.footer_ts_field = "nope".to_string());
        let message = missing.compose(&context(), &FakeSlack::default()).await;
        assert!(message.attachments[0].ts.is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp(&json!(1_709_287_200_123_i64)), Some(1_709_287_200));
        assert_eq!(parse_timestamp(&json!("2024-03-01T10:00:00+01:00")), Some(1_709_283_600));
        assert_eq!(parse_timestamp(&json!("2024-03-01 10:00:00")), Some(1_709_287_200));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
    }

    #[test]
    fn test_links_insert_separator_once() {
        let stream = StreamRef {
            id: "s1".to_string(),
            title: "Errors".to_string(),
        };
        assert_eq!(
            stream_link("http://g/", &stream),
            stream_link("http://g", &stream)
        );
    }
}
