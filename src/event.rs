//! Alert context handed over by the event pipeline
//!
//! The pipeline decides *when* to notify; this module only describes *what* it
//! hands over: the firing event definition, the streams involved and the
//! backlog of log messages that matched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{AppResult, ErrorContextExt};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRef {
    pub id: String,
    pub title: String,
}

/// One matched log message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub id: String,
    /// Name of the index the message is stored in
    #[serde(default)]
    pub index: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl BacklogEntry {
    /// Template fields of this entry: its own fields plus `gl2_document_index`
    pub fn template_fields(&self) -> Map<String, Value> {
        let mut fields = self.fields.clone();
        fields.insert(
            "gl2_document_index".to_string(),
            Value::String(self.index.clone()),
        );
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default)]
    pub event_definition: EventDefinition,
    #[serde(default)]
    pub job_definition_id: String,
    #[serde(default)]
    pub job_trigger_id: String,
    #[serde(default)]
    pub event: Value,
    #[serde(default)]
    pub streams: Vec<StreamRef>,
    #[serde(default)]
    pub backlog: Vec<BacklogEntry>,
}

impl EventContext {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw).with_context("parse event context")
    }

    pub fn title(&self) -> &str {
        self.event_definition.title.as_deref().unwrap_or("Unknown")
    }

    /// Event-level template fields shared by every backlog entry
    pub fn event_fields(&self) -> Map<String, Value> {
        let definition = &self.event_definition;
        let optional = |value: &Option<String>| {
            value.clone().map(Value::String).unwrap_or(Value::Null)
        };

        let mut fields = Map::new();
        fields.insert("event_definition_id".into(), Value::String(definition.id.clone()));
        fields.insert("event_definition_type".into(), Value::String(definition.kind.clone()));
        fields.insert("event_definition_title".into(), optional(&definition.title));
        fields.insert(
            "event_definition_description".into(),
            optional(&definition.description),
        );
        fields.insert("job_definition_id".into(), Value::String(self.job_definition_id.clone()));
        fields.insert("job_trigger_id".into(), Value::String(self.job_trigger_id.clone()));
        fields.insert("event".into(), self.event.clone());
        fields
    }

    /// Event fields overlaid with the entry's own fields
    pub fn entry_fields(&self, entry: &BacklogEntry) -> Map<String, Value> {
        let mut fields = self.event_fields();
        fields.extend(entry.template_fields());
        fields
    }

    /// Fields of every backlog entry merged; earlier entries win on conflicts
    pub fn merged_backlog_fields(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for entry in &self.backlog {
            for (key, value) in entry.template_fields() {
                merged.entry(key).or_insert(value);
            }
        }
        merged
    }
}
