use minijinja::{context, AutoEscape, Environment, Value};
use std::fs;
use std::path::Path;

use crate::core::{InvoiceError, InvoiceResult};
use crate::models::{DeliveryMode, InvoiceRecord};
use super::helpers;

/// Sandboxed template evaluation shared by all three renderers. Templates
/// only see the invoice context and the registered filters.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_filter("money", helpers::money_filter);
        env.add_filter("date", helpers::date_filter);
        env.add_filter("cell", helpers::cell_filter);

        env.set_auto_escape_callback(|name| {
            if name.ends_with(".html") || name.ends_with(".htm") {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });

        TemplateEngine { env }
    }

    /// Context every template is evaluated against.
    pub fn context(record: &InvoiceRecord, mode: DeliveryMode) -> Value {
        context! {
            company => record.company(),
            head => record.head(),
            billto => record.billto(),
            shipto => record.shipto(),
            items => record.items(),
            totals => record.totals(),
            notes => record.notes(),
            template => &record.template().identifier,
            mode => mode.name(),
        }
    }

    /// Reads and evaluates the template at `path`.
    pub fn render_file(&self, path: &Path, ctx: Value) -> InvoiceResult<String> {
        let source = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("template")
            .to_string();
        self.render_str(&name, &source, ctx)
    }

    pub fn render_str(&self, name: &str, source: &str, ctx: Value) -> InvoiceResult<String> {
        self.env
            .render_named_str(name, source, ctx)
            .map_err(|err| InvoiceError::Template {
                name: name.to_string(),
                source: err,
            })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}
