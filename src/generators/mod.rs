pub mod docx;
pub mod html;
pub mod pdf;

pub use docx::{DocxRenderer, DocxSession};
pub use html::HtmlRenderer;
pub use pdf::{PdfRenderer, PdfSession};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fs;

use crate::core::InvoiceResult;
use crate::models::{DeliveryMode, InvoiceRecord, OutputFormat};
use crate::templates::{LayoutScript, TemplateEngine, TemplateResolver, TemplateResource};

/// One output format: turns the record into that format's bytes.
pub trait FormatRenderer: Send + Sync {
    /// `filename` is the caller's output name; only HTML capture uses it
    /// while rendering.
    fn render(
        &self,
        record: &InvoiceRecord,
        mode: DeliveryMode,
        filename: Option<&str>,
    ) -> InvoiceResult<Vec<u8>>;
}

/// Resolves the record's template for `format`, checks it exists, evaluates
/// it and parses the resulting layout script.
pub(crate) fn layout_for(
    resolver: &TemplateResolver,
    engine: &TemplateEngine,
    format: OutputFormat,
    record: &InvoiceRecord,
    mode: DeliveryMode,
) -> InvoiceResult<LayoutScript> {
    let selection = record.template();
    let resource = resolver.resolve(format, &selection.identifier, selection.vendor);
    resource.ensure_exists()?;

    let path = match &resource {
        TemplateResource::Definition(path) => path,
        TemplateResource::Html { markup, .. } => markup,
    };
    let script = engine.render_file(path, TemplateEngine::context(record, mode))?;
    LayoutScript::parse(&script)
}

/// Loaded image bytes with their pixel size.
pub(crate) struct ImageData {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Reads a file path or `data:<mime>;base64,` URI. Unreadable or undecodable
/// images are skipped with a warning, matching how the engines treat a
/// missing logo.
pub(crate) fn load_image(source: &str) -> Option<ImageData> {
    let bytes = if let Some(rest) = source.strip_prefix("data:") {
        let Some((header, data)) = rest.split_once(',') else {
            tracing::warn!("Skipping image: data URI without `,` separator");
            return None;
        };
        if !header.contains(";base64") {
            tracing::warn!("Skipping image: only base64 data URIs are supported");
            return None;
        }
        match BASE64.decode(data.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping image: base64 decode error: {}", e);
                return None;
            }
        }
    } else {
        match fs::read(source) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping image {}: {}", source, e);
                return None;
            }
        }
    };

    match image::load_from_memory(&bytes) {
        Ok(img) => Some(ImageData {
            width: img.width(),
            height: img.height(),
            bytes,
        }),
        Err(e) => {
            tracing::warn!("Skipping image {}: decode error: {}", preview(source), e);
            None
        }
    }
}

fn preview(source: &str) -> &str {
    match source.char_indices().nth(60) {
        Some((idx, _)) => &source[..idx],
        None => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    pub(crate) const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    #[test]
    fn loads_data_uri_images() {
        let img = load_image(PIXEL_PNG).unwrap();
        assert_eq!((img.width, img.height), (1, 1));
    }

    #[test]
    fn bad_sources_are_skipped() {
        assert!(load_image("/definitely/not/here.png").is_none());
        assert!(load_image("data:image/png,plain").is_none());
        assert!(load_image("data:image/png;base64,!!!").is_none());
    }
}
