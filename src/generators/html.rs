use std::fs;
use std::sync::Arc;

use crate::core::InvoiceResult;
use crate::models::{DeliveryMode, InvoiceRecord};
use crate::output::default_filename;
use crate::templates::resolver::ensure_file;
use crate::templates::{TemplateEngine, TemplateResolver};
use super::FormatRenderer;

/// Renders the invoice into a standalone HTML page: the template's
/// stylesheet inlined, and the markup output inside `<div id="invoice">`.
pub struct HtmlRenderer {
    resolver: TemplateResolver,
    engine: Arc<TemplateEngine>,
    capture_script: String,
}

impl HtmlRenderer {
    pub fn new(
        resolver: TemplateResolver,
        engine: Arc<TemplateEngine>,
        capture_script: impl Into<String>,
    ) -> Self {
        HtmlRenderer {
            resolver,
            engine,
            capture_script: capture_script.into(),
        }
    }

    pub fn render_page(
        &self,
        record: &InvoiceRecord,
        mode: DeliveryMode,
        filename: Option<&str>,
    ) -> InvoiceResult<String> {
        let identifier = &record.template().identifier;
        let (style, markup) = self.resolver.html_pair(identifier);
        ensure_file(&style)?;
        ensure_file(&markup)?;

        let css = fs::read_to_string(&style)?;
        let body = self
            .engine
            .render_file(&markup, TemplateEngine::context(record, mode))?;

        let capture = (mode == DeliveryMode::Capture).then(|| {
            let name = filename
                .map(str::to_string)
                .unwrap_or_else(|| default_filename("png"));
            capture_fragment(&self.capture_script, &name)
        });

        let page = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>{css}</style>
{capture}</head>
<body>
<div id="invoice">{body}</div>
</body>
</html>
"#,
            css = css,
            capture = capture.unwrap_or_default(),
            body = body,
        );

        tracing::debug!(identifier = %identifier, %mode, bytes = page.len(), "Rendered HTML invoice");
        Ok(page)
    }
}

impl FormatRenderer for HtmlRenderer {
    fn render(
        &self,
        record: &InvoiceRecord,
        mode: DeliveryMode,
        filename: Option<&str>,
    ) -> InvoiceResult<Vec<u8>> {
        self.render_page(record, mode, filename).map(String::into_bytes)
    }
}

/// Once the page has loaded, rasterizes `#invoice` with html2canvas and
/// triggers a PNG download named `filename`.
fn capture_fragment(script_src: &str, filename: &str) -> String {
    let name = serde_json::to_string(filename)
        .unwrap_or_else(|_| "\"invoice.png\"".to_string())
        .replace("</", "<\\/");
    format!(
        r#"<script src="{src}"></script>
<script>window.onload = () => html2canvas(document.getElementById("invoice")).then(canvas => {{
  let a = document.createElement("a");
  a.download = {name};
  a.href = canvas.toDataURL("image/png");
  a.click();
}});</script>
"#,
        src = script_src.replace('"', "&quot;"),
        name = name,
    )
}
