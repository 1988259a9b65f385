use docx_rs::*;
use std::io::Cursor;
use std::sync::Arc;

use crate::core::{InvoiceError, InvoiceResult};
use crate::models::{DeliveryMode, InvoiceRecord, OutputFormat};
use crate::templates::{Block, BuildSession, TemplateEngine, TemplateResolver};
use super::{layout_for, load_image, FormatRenderer};

const EMU_PER_MM: f32 = 36_000.0;
const DEFAULT_IMAGE_MM: f32 = 40.0;

// Run sizes are in half-points.
const TITLE_SIZE: usize = 36;
const HEADING_SIZE: usize = 28;
const BODY_SIZE: usize = 20;
const SMALL_SIZE: usize = 16;

/// Appends blocks to a word-processing document.
pub struct DocxSession {
    docx: Docx,
    blocks: usize,
}

impl DocxSession {
    pub fn new() -> Self {
        DocxSession {
            docx: Docx::new(),
            blocks: 0,
        }
    }

    fn add_paragraph(&mut self, paragraph: Paragraph) {
        let docx = std::mem::replace(&mut self.docx, Docx::new());
        self.docx = docx.add_paragraph(paragraph);
    }

    fn add_table(&mut self, table: Table) {
        let docx = std::mem::replace(&mut self.docx, Docx::new());
        self.docx = docx.add_table(table);
    }

    fn text_run(text: &str, size: usize) -> Run {
        Run::new().add_text(text).size(size)
    }

    fn table(header: Option<&[String]>, rows: &[Vec<String>]) -> Table {
        let columns = header
            .map(<[String]>::len)
            .into_iter()
            .chain(rows.iter().map(Vec::len))
            .max()
            .unwrap_or(0);

        let row = |cells: &[String], bold: bool| {
            let mut out: Vec<TableCell> = cells
                .iter()
                .map(|text| {
                    let mut run = Self::text_run(text, BODY_SIZE);
                    if bold {
                        run = run.bold();
                    }
                    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
                })
                .collect();
            while out.len() < columns {
                out.push(TableCell::new());
            }
            TableRow::new(out)
        };

        let mut table_rows = Vec::new();
        if let Some(header) = header {
            table_rows.push(row(header, true));
        }
        table_rows.extend(rows.iter().map(|r| row(r, false)));
        Table::new(table_rows)
    }
}

impl Default for DocxSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildSession for DocxSession {
    fn push(&mut self, block: &Block) -> InvoiceResult<()> {
        self.blocks += 1;
        match block {
            Block::Title(text) => self.add_paragraph(
                Paragraph::new().add_run(Self::text_run(text, TITLE_SIZE).bold()),
            ),
            Block::Heading(text) => self.add_paragraph(
                Paragraph::new().add_run(Self::text_run(text, HEADING_SIZE).bold()),
            ),
            Block::Text(text) => {
                self.add_paragraph(Paragraph::new().add_run(Self::text_run(text, BODY_SIZE)))
            }
            Block::Strong(text) => self.add_paragraph(
                Paragraph::new().add_run(Self::text_run(text, BODY_SIZE).bold()),
            ),
            Block::Small(text) => self.add_paragraph(
                Paragraph::new().add_run(Self::text_run(text, SMALL_SIZE).color("666666")),
            ),
            Block::Image { source, width_mm } => {
                let Some(data) = load_image(source) else {
                    return Ok(());
                };
                if data.width == 0 || data.height == 0 {
                    return Ok(());
                }
                let width = width_mm.unwrap_or(DEFAULT_IMAGE_MM) * EMU_PER_MM;
                let height = width * data.height as f32 / data.width as f32;
                let pic = Pic::new_with_dimensions(data.bytes, data.width, data.height)
                    .size(width as u32, height as u32);
                self.add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)));
            }
            Block::Table { header, rows } => {
                self.add_table(Self::table(header.as_deref(), rows));
            }
            // Word has no flow-level rule; an empty paragraph keeps the spacing.
            Block::Space | Block::Rule => self.add_paragraph(Paragraph::new()),
            Block::PageBreak => self.add_paragraph(
                Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            ),
        }
        Ok(())
    }

    fn finish(self) -> InvoiceResult<Vec<u8>> {
        tracing::debug!(blocks = self.blocks, "Packing DOCX");
        let mut buffer = Cursor::new(Vec::new());
        self.docx
            .build()
            .pack(&mut buffer)
            .map_err(|e| InvoiceError::engine("docx", e))?;
        Ok(buffer.into_inner())
    }
}

/// Renders the DOCX layout template through a fresh [`DocxSession`].
pub struct DocxRenderer {
    resolver: TemplateResolver,
    engine: Arc<TemplateEngine>,
}

impl DocxRenderer {
    pub fn new(resolver: TemplateResolver, engine: Arc<TemplateEngine>) -> Self {
        DocxRenderer { resolver, engine }
    }
}

impl FormatRenderer for DocxRenderer {
    fn render(
        &self,
        record: &InvoiceRecord,
        mode: DeliveryMode,
        _filename: Option<&str>,
    ) -> InvoiceResult<Vec<u8>> {
        let script = layout_for(&self.resolver, &self.engine, OutputFormat::Docx, record, mode)?;
        script.apply(DocxSession::new())
    }
}
