//! Layout scripts: what PDF and DOCX templates render to.
//!
//! A template is evaluated with the invoice context and must produce one
//! directive per line:
//!
//! ```text
//! # comment
//! title: INVOICE
//! image: /srv/logo.png | 40
//! text: {{ company[2] }}
//! th: Item | Qty | Price
//! tr: {{ item.description|cell }} | {{ item.qty }} | {{ item.price|money }}
//! space
//! rule
//! pagebreak
//! ```
//!
//! Consecutive `th`/`tr` lines form one table. The parsed [`Block`]s are fed
//! to a [`BuildSession`], which owns the actual document engine.

use crate::core::{InvoiceError, InvoiceResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Text(String),
    Strong(String),
    Small(String),
    /// File path or `data:` URI, with an optional width in millimetres.
    Image { source: String, width_mm: Option<f32> },
    Table {
        header: Option<Vec<String>>,
        rows: Vec<Vec<String>>,
    },
    Space,
    Rule,
    PageBreak,
}

/// A document engine being populated by a template.
pub trait BuildSession {
    fn push(&mut self, block: &Block) -> InvoiceResult<()>;

    /// Serializes the finished document.
    fn finish(self) -> InvoiceResult<Vec<u8>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutScript {
    pub blocks: Vec<Block>,
}

impl LayoutScript {
    pub fn parse(source: &str) -> InvoiceResult<Self> {
        let mut blocks: Vec<Block> = Vec::new();

        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = index + 1;

            let (directive, argument) = match line.split_once(':') {
                Some((d, a)) => (d.trim(), a.trim()),
                None => (line, ""),
            };

            let block = match directive {
                "title" => Block::Title(unescape(argument)),
                "heading" => Block::Heading(unescape(argument)),
                "text" => Block::Text(unescape(argument)),
                "strong" => Block::Strong(unescape(argument)),
                "small" => Block::Small(unescape(argument)),
                "image" => parse_image(argument, line_no)?,
                "th" | "tr" => {
                    let cells = split_cells(argument);
                    let is_header = directive == "th";
                    if let Some(Block::Table { header, rows }) = blocks.last_mut() {
                        if is_header && rows.is_empty() && header.is_none() {
                            *header = Some(cells);
                            continue;
                        }
                        if !is_header {
                            rows.push(cells);
                            continue;
                        }
                    }
                    if is_header {
                        Block::Table { header: Some(cells), rows: Vec::new() }
                    } else {
                        Block::Table { header: None, rows: vec![cells] }
                    }
                }
                "space" => Block::Space,
                "rule" => Block::Rule,
                "pagebreak" => Block::PageBreak,
                other => {
                    return Err(InvoiceError::Layout {
                        line: line_no,
                        message: format!("unknown directive `{}`", other),
                    })
                }
            };
            blocks.push(block);
        }

        Ok(LayoutScript { blocks })
    }

    pub fn apply<S: BuildSession>(&self, mut session: S) -> InvoiceResult<Vec<u8>> {
        for block in &self.blocks {
            session.push(block)?;
        }
        session.finish()
    }
}

fn parse_image(argument: &str, line: usize) -> InvoiceResult<Block> {
    let mut parts = split_cells(argument).into_iter();
    let source = parts.next().unwrap_or_default();
    if source.is_empty() {
        return Err(InvoiceError::Layout {
            line,
            message: "image needs a path or data URI".to_string(),
        });
    }
    let width_mm = match parts.next() {
        Some(w) if !w.is_empty() => Some(w.parse::<f32>().map_err(|_| InvoiceError::Layout {
            line,
            message: format!("invalid image width `{}`", w),
        })?),
        _ => None,
    };
    Ok(Block::Image { source, width_mm })
}

/// Splits on unescaped `|` and unescapes each cell.
fn split_cells(argument: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = argument.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn unescape(text: &str) -> String {
    text.replace("\\|", "|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directives_in_order() {
        let script = LayoutScript::parse(
            "# header\n\
             title: INVOICE\n\
             \n\
             text: Acme Inc\n\
             strong: Due: 2024-01-31\n\
             space\n\
             rule\n\
             pagebreak\n",
        )
        .unwrap();
        assert_eq!(
            script.blocks,
            vec![
                Block::Title("INVOICE".into()),
                Block::Text("Acme Inc".into()),
                Block::Strong("Due: 2024-01-31".into()),
                Block::Space,
                Block::Rule,
                Block::PageBreak,
            ]
        );
    }

    #[test]
    fn consecutive_rows_form_one_table() {
        let script = LayoutScript::parse(
            "th: Item | Qty\n\
             tr: Widget | 2\n\
             tr: Pipe \\| fitting | 1\n\
             text: between\n\
             tr: Total | 3\n",
        )
        .unwrap();
        assert_eq!(script.blocks.len(), 3);
        assert_eq!(
            script.blocks[0],
            Block::Table {
                header: Some(vec!["Item".into(), "Qty".into()]),
                rows: vec![
                    vec!["Widget".into(), "2".into()],
                    vec!["Pipe | fitting".into(), "1".into()],
                ],
            }
        );
        assert_eq!(
            script.blocks[2],
            Block::Table { header: None, rows: vec![vec!["Total".into(), "3".into()]] }
        );
    }

    #[test]
    fn image_width_is_optional() {
        let script = LayoutScript::parse("image: /srv/logo.png | 40\nimage: logo.png").unwrap();
        assert_eq!(
            script.blocks,
            vec![
                Block::Image { source: "/srv/logo.png".into(), width_mm: Some(40.0) },
                Block::Image { source: "logo.png".into(), width_mm: None },
            ]
        );
    }

    #[test]
    fn text_keeps_colons_after_the_directive() {
        let script = LayoutScript::parse("text: Phone: 555-0100 | Fax: 555-0101").unwrap();
        assert_eq!(
            script.blocks,
            vec![Block::Text("Phone: 555-0100 | Fax: 555-0101".into())]
        );
    }

    #[test]
    fn unknown_directive_reports_line() {
        let err = LayoutScript::parse("title: ok\n\nbarcode: 123").unwrap_err();
        assert!(matches!(err, InvoiceError::Layout { line: 3, .. }));
    }

    #[test]
    fn bad_image_width_is_rejected() {
        assert!(LayoutScript::parse("image: logo.png | wide").is_err());
        assert!(LayoutScript::parse("image:").is_err());
    }
}
