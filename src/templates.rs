//! Field templates for footers, custom fields and mentions
//!
//! Templates use handlebars syntax (`{{source}}`, `{{fields.level}}`). Unknown
//! placeholders render as empty strings and text without placeholders renders
//! to itself, which custom-field resolution relies on to tell a template from a
//! plain field name. Output is never HTML-escaped since it ends up in Slack
//! markup.

use handlebars::Handlebars;
use serde_json::{Map, Value};

use crate::errors::{AppError, AppResult};

/// Renders templates against alert fields
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        TemplateEngine { handlebars }
    }

    /// Render a one-off template string
    pub fn render(&self, template: &str, fields: &Map<String, Value>) -> AppResult<String> {
        self.handlebars
            .render_template(template, fields)
            .map_err(|e| AppError::template_with_source(format!("Failed to render '{template}'"), e))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}
