use printpdf::*;
use std::sync::Arc;

use crate::core::{InvoiceError, InvoiceResult, PdfConfig};
use crate::models::{DeliveryMode, InvoiceRecord, OutputFormat};
use crate::templates::{Block, BuildSession, TemplateEngine, TemplateResolver};
use super::{layout_for, load_image, FormatRenderer};

const PT_PER_MM: f32 = 2.834_646;
/// Rough Helvetica advance width as a fraction of the font size.
const CHAR_WIDTH: f32 = 0.5;
const CELL_PADDING: f32 = 3.0;

#[derive(Clone, Copy)]
struct Style {
    size: f32,
    font: BuiltinFont,
    gray: f32,
}

/// Flow layout over printpdf's builtin Helvetica: blocks stack top-down and
/// start a new page when they no longer fit.
pub struct PdfSession {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    page_w: f32,
    page_h: f32,
    margin: f32,
    font_size: f32,
    line_height: f32,
    /// Distance from the top edge of the page, in points.
    cursor: f32,
}

impl PdfSession {
    pub fn new(config: &PdfConfig) -> Self {
        let (w_mm, h_mm) = config.page_mm();
        let margin = config.margin_mm * PT_PER_MM;
        PdfSession {
            doc: PdfDocument::new(&config.title),
            pages: Vec::new(),
            ops: Vec::new(),
            page_w: w_mm * PT_PER_MM,
            page_h: h_mm * PT_PER_MM,
            margin,
            font_size: config.font_size,
            line_height: config.line_height,
            cursor: margin,
        }
    }

    fn content_width(&self) -> f32 {
        self.page_w - 2.0 * self.margin
    }

    /// Nothing drawn and the cursor still at the top margin.
    fn page_is_blank(&self) -> bool {
        self.ops.is_empty() && self.cursor <= self.margin
    }

    /// Closed pages plus the open one, unless it is a blank page after others.
    fn page_count(&self) -> usize {
        let open = !self.page_is_blank() || self.pages.is_empty();
        self.pages.len() + usize::from(open)
    }

    fn close_page(&mut self) {
        if !self.page_is_blank() || self.pages.is_empty() {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(
            Mm(self.page_w / PT_PER_MM),
            Mm(self.page_h / PT_PER_MM),
            ops,
        ));
        self.cursor = self.margin;
    }

    fn ensure_space(&mut self, height: f32) {
        let on_fresh_page = self.cursor <= self.margin;
        if !on_fresh_page && self.cursor + height > self.page_h - self.margin {
            self.new_page();
        }
    }

    fn style(&self, scale: f32, font: BuiltinFont) -> Style {
        Style {
            size: self.font_size * scale,
            font,
            gray: 0.0,
        }
    }

    fn advance(&self, style: Style) -> f32 {
        style.size * self.line_height
    }

    fn write_at(&mut self, text: &str, x: f32, top: f32, style: Style) {
        let baseline = self.page_h - top - style.size;
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(x),
                y: Pt(baseline),
            },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(style.size),
            font: style.font,
        });
        self.ops.push(Op::SetFillColor {
            col: Color::Rgb(Rgb {
                r: style.gray,
                g: style.gray,
                b: style.gray,
                icc_profile: None,
            }),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(sanitize(text))],
            font: style.font,
        });
        self.ops.push(Op::EndTextSection);
    }

    fn paragraph(&mut self, text: &str, style: Style) {
        let advance = self.advance(style);
        for line in wrap(text, style.size, self.content_width()) {
            self.ensure_space(advance);
            let (x, top) = (self.margin, self.cursor);
            self.write_at(&line, x, top, style);
            self.cursor += advance;
        }
    }

    fn horizontal_rule(&mut self, top: f32) {
        let y = self.page_h - top;
        self.ops.push(Op::SetOutlineColor {
            col: Color::Rgb(Rgb {
                r: 0.6,
                g: 0.6,
                b: 0.6,
                icc_profile: None,
            }),
        });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: vec![
                    LinePoint {
                        p: Point {
                            x: Pt(self.margin),
                            y: Pt(y),
                        },
                        bezier: false,
                    },
                    LinePoint {
                        p: Point {
                            x: Pt(self.page_w - self.margin),
                            y: Pt(y),
                        },
                        bezier: false,
                    },
                ],
                is_closed: false,
            },
        });
    }

    fn table_row(&mut self, cells: &[String], columns: usize, style: Style) {
        let column_width = self.content_width() / columns as f32;
        let advance = self.advance(style);
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .map(|c| wrap(c, style.size, column_width - CELL_PADDING))
            .collect();
        let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);

        self.ensure_space(advance * lines as f32);
        let top = self.cursor;
        for (col, cell) in wrapped.iter().enumerate() {
            let x = self.margin + col as f32 * column_width;
            for (i, line) in cell.iter().enumerate() {
                self.write_at(line, x, top + i as f32 * advance, style);
            }
        }
        self.cursor += advance * lines as f32;
    }

    fn table(&mut self, header: Option<&[String]>, rows: &[Vec<String>]) {
        let columns = header
            .map(<[String]>::len)
            .into_iter()
            .chain(rows.iter().map(Vec::len))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        if let Some(header) = header {
            let style = self.style(1.0, BuiltinFont::HelveticaBold);
            self.table_row(header, columns, style);
            let top = self.cursor;
            self.horizontal_rule(top);
            self.cursor += 2.0;
        }
        let style = self.style(1.0, BuiltinFont::Helvetica);
        for row in rows {
            self.table_row(row, columns, style);
        }
    }

    fn image(&mut self, source: &str, width_mm: Option<f32>) -> InvoiceResult<()> {
        let Some(data) = load_image(source) else {
            return Ok(());
        };
        if data.width == 0 || data.height == 0 {
            return Ok(());
        }

        let mut warnings = Vec::new();
        let raw = RawImage::decode_from_bytes(&data.bytes, &mut warnings)
            .map_err(|e| InvoiceError::engine("pdf", e))?;
        let id = self.doc.add_image(&raw);

        // Pixels at 96 dpi when no width is given.
        let natural = data.width as f32 * 0.75;
        let width = width_mm
            .map(|mm| mm * PT_PER_MM)
            .unwrap_or(natural)
            .min(self.content_width());
        let height = width * data.height as f32 / data.width as f32;

        self.ensure_space(height);
        let bottom = self.page_h - self.cursor - height;
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(self.margin)),
                translate_y: Some(Pt(bottom)),
                dpi: Some(72.0),
                scale_x: Some(width / data.width as f32),
                scale_y: Some(height / data.height as f32),
                rotate: None,
            },
        });
        self.cursor += height + self.font_size * 0.5;
        Ok(())
    }
}

impl BuildSession for PdfSession {
    fn push(&mut self, block: &Block) -> InvoiceResult<()> {
        match block {
            Block::Title(text) => {
                let style = self.style(1.8, BuiltinFont::HelveticaBold);
                self.paragraph(text, style);
                self.cursor += self.font_size * 0.4;
            }
            Block::Heading(text) => {
                let style = self.style(1.3, BuiltinFont::HelveticaBold);
                self.paragraph(text, style);
            }
            Block::Text(text) => {
                let style = self.style(1.0, BuiltinFont::Helvetica);
                self.paragraph(text, style);
            }
            Block::Strong(text) => {
                let style = self.style(1.0, BuiltinFont::HelveticaBold);
                self.paragraph(text, style);
            }
            Block::Small(text) => {
                let style = Style {
                    gray: 0.4,
                    ..self.style(0.8, BuiltinFont::Helvetica)
                };
                self.paragraph(text, style);
            }
            Block::Image { source, width_mm } => self.image(source, *width_mm)?,
            Block::Table { header, rows } => self.table(header.as_deref(), rows),
            Block::Space => self.cursor += self.font_size * self.line_height,
            Block::Rule => {
                self.ensure_space(self.font_size);
                let top = self.cursor + self.font_size * 0.5;
                self.horizontal_rule(top);
                self.cursor += self.font_size;
            }
            Block::PageBreak => {
                if !self.page_is_blank() {
                    self.new_page();
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> InvoiceResult<Vec<u8>> {
        tracing::debug!(pages = self.page_count(), "Serializing PDF");
        self.close_page();
        let pages = std::mem::take(&mut self.pages);
        self.doc.with_pages(pages);
        let mut warnings = Vec::new();
        Ok(self.doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

/// Renders the PDF layout template through a fresh [`PdfSession`].
pub struct PdfRenderer {
    resolver: TemplateResolver,
    engine: Arc<TemplateEngine>,
    config: PdfConfig,
}

impl PdfRenderer {
    pub fn new(resolver: TemplateResolver, engine: Arc<TemplateEngine>, config: PdfConfig) -> Self {
        PdfRenderer {
            resolver,
            engine,
            config,
        }
    }
}

impl FormatRenderer for PdfRenderer {
    fn render(
        &self,
        record: &InvoiceRecord,
        mode: DeliveryMode,
        _filename: Option<&str>,
    ) -> InvoiceResult<Vec<u8>> {
        let script = layout_for(&self.resolver, &self.engine, OutputFormat::Pdf, record, mode)?;
        let session = PdfSession::new(&self.config);
        tracing::debug!(
            blocks = script.blocks.len(),
            page_size = ?self.config.page_size,
            orientation = %self.config.orientation,
            "Building PDF"
        );
        script.apply(session)
    }
}

/// Greedy word wrap using an average glyph width.
fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * CHAR_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(max_chars)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split].to_string());
            word = word[split..].to_string();
        }
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Builtin fonts only cover a single-byte encoding; keep text to ASCII.
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' => out.push('*'),
            '\u{20AC}' => out.push_str("EUR"),
            '\u{00A3}' => out.push_str("GBP"),
            '\u{00A0}' | '\t' => out.push(' '),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
