use std::sync::Arc;

use crate::core::{AppConfig, InvoiceResult};
use crate::generators::{DocxRenderer, FormatRenderer, HtmlRenderer, PdfRenderer};
use crate::models::{DeliveryMode, InvoiceRecord, OutputFormat};
use crate::output::{Delivery, OutputDispatcher};
use crate::templates::{TemplateEngine, TemplateResolver};

/// Entry point tying the renderers to the dispatcher. One instance can serve
/// many records; the record itself is owned by the caller.
pub struct Invoicer {
    resolver: TemplateResolver,
    html: HtmlRenderer,
    pdf: PdfRenderer,
    docx: DocxRenderer,
    dispatcher: OutputDispatcher,
}

impl Invoicer {
    pub fn new(config: &AppConfig) -> Self {
        let resolver = TemplateResolver::new(config.templates.clone());
        let engine = Arc::new(TemplateEngine::new());

        Invoicer {
            html: HtmlRenderer::new(resolver.clone(), engine.clone(), config.capture_script.clone()),
            pdf: PdfRenderer::new(resolver.clone(), engine.clone(), config.pdf.clone()),
            docx: DocxRenderer::new(resolver.clone(), engine),
            dispatcher: OutputDispatcher::new(config.output_dir.clone()),
            resolver,
        }
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    pub fn renderer(&self, format: OutputFormat) -> &dyn FormatRenderer {
        match format {
            OutputFormat::Html => &self.html,
            OutputFormat::Pdf => &self.pdf,
            OutputFormat::Docx => &self.docx,
        }
    }

    /// HTML modes: 1 display, 2 download, 3 save, 4 display with PNG capture.
    pub fn output_html(
        &self,
        record: &mut InvoiceRecord,
        mode: u32,
        filename: Option<&str>,
    ) -> InvoiceResult<Delivery> {
        let mode = DeliveryMode::from_code(OutputFormat::Html, mode);
        self.output(record, OutputFormat::Html, mode, filename)
    }

    /// PDF modes: 1 display, 2 download, 3 save.
    pub fn output_pdf(
        &self,
        record: &mut InvoiceRecord,
        mode: u32,
        filename: Option<&str>,
    ) -> InvoiceResult<Delivery> {
        let mode = DeliveryMode::from_code(OutputFormat::Pdf, mode);
        self.output(record, OutputFormat::Pdf, mode, filename)
    }

    /// DOCX modes: 1 download, 2 save.
    pub fn output_docx(
        &self,
        record: &mut InvoiceRecord,
        mode: u32,
        filename: Option<&str>,
    ) -> InvoiceResult<Delivery> {
        let mode = DeliveryMode::from_code(OutputFormat::Docx, mode);
        self.output(record, OutputFormat::Docx, mode, filename)
    }

    /// Renders `record` as `format` and delivers it. HTML output is kept on
    /// the record as its rendering buffer; other formats clear it.
    pub fn output(
        &self,
        record: &mut InvoiceRecord,
        format: OutputFormat,
        mode: DeliveryMode,
        filename: Option<&str>,
    ) -> InvoiceResult<Delivery> {
        let mode = mode.supported_for(format);
        let start = std::time::Instant::now();

        let body = match format {
            OutputFormat::Html => {
                record.set_rendered(None);
                let page = self.html.render_page(record, mode, filename)?;
                record.set_rendered(Some(page.clone()));
                page.into_bytes()
            }
            _ => {
                record.set_rendered(None);
                self.renderer(format).render(record, mode, filename)?
            }
        };

        tracing::info!(
            %format,
            %mode,
            template = %record.template().identifier,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered invoice"
        );

        self.dispatcher.deliver(format, body, mode, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceError, TemplateRoots};
    use std::fs;

    fn invoicer(dir: &std::path::Path) -> Invoicer {
        let roots = TemplateRoots::under(dir.join("templates"));
        fs::create_dir_all(&roots.html_dir).unwrap();
        fs::create_dir_all(&roots.pdf_dir).unwrap();
        fs::create_dir_all(&roots.docx_dir).unwrap();
        fs::write(roots.html_dir.join("simple.css"), "body{}").unwrap();
        fs::write(roots.html_dir.join("simple.html"), "<b>{{ head[0] }}</b>").unwrap();
        fs::write(roots.pdf_dir.join("simple.jinja"), "title: {{ head[0] }}").unwrap();
        fs::write(roots.docx_dir.join("simple.jinja"), "title: {{ head[0] }}").unwrap();

        let config = AppConfig {
            templates: roots,
            output_dir: dir.to_path_buf(),
            ..AppConfig::default()
        };
        Invoicer::new(&config)
    }

    fn record() -> InvoiceRecord {
        let mut record = InvoiceRecord::new();
        record.add("head", "INV-001").unwrap();
        record
    }

    #[test]
    fn html_render_is_kept_on_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let invoicer = invoicer(dir.path());
        let mut record = record();

        let delivery = invoicer.output_html(&mut record, 1, None).unwrap();
        assert!(record.rendered().unwrap().contains("<b>INV-001</b>"));
        assert!(matches!(delivery, Delivery::Inline { content_type, .. } if content_type.starts_with("text/html")));

        invoicer.output_pdf(&mut record, 1, None).unwrap();
        assert!(record.rendered().is_none());
    }

    #[test]
    fn failed_html_render_leaves_no_stale_page() {
        let dir = tempfile::tempdir().unwrap();
        let invoicer = invoicer(dir.path());
        let mut record = record();

        invoicer.output_html(&mut record, 1, None).unwrap();
        assert!(record.rendered().is_some());

        record.use_template("missing", true);
        assert!(invoicer.output_html(&mut record, 1, None).is_err());
        assert!(record.rendered().is_none());
    }

    #[test]
    fn docx_mode_two_saves() {
        let dir = tempfile::tempdir().unwrap();
        let invoicer = invoicer(dir.path());
        let delivery = invoicer
            .output_docx(&mut record(), 2, Some("inv.docx"))
            .unwrap();
        assert!(matches!(delivery, Delivery::Saved { ref path, .. } if path.ends_with("inv.docx")));
        assert!(dir.path().join("inv.docx").exists());
    }

    #[test]
    fn pdf_download_names_the_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let invoicer = invoicer(dir.path());
        let delivery = invoicer.output_pdf(&mut record(), 2, Some("inv.pdf")).unwrap();
        match delivery {
            Delivery::Attachment { filename, body, content_length } => {
                assert_eq!(filename, "inv.pdf");
                assert_eq!(content_length, Some(body.len()));
                assert_eq!(&body[0..5], b"%PDF-");
            }
            other => panic!("expected attachment, got {:?}", other),
        }
    }

    #[test]
    fn missing_template_stops_before_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let invoicer = invoicer(dir.path());
        let mut record = record();
        record.use_template("ornate", true);
        let err = invoicer.output_pdf(&mut record, 3, Some("never.pdf")).unwrap_err();
        assert!(matches!(err, InvoiceError::TemplateNotFound(_)));
        assert!(!dir.path().join("never.pdf").exists());
    }
}
