use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{InvoiceError, InvoiceResult, TemplateRoots};
use crate::models::OutputFormat;

pub const STYLE_EXTENSION: &str = "css";
pub const MARKUP_EXTENSION: &str = "html";
pub const DEFINITION_EXTENSION: &str = "jinja";

/// Concrete template resources for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateResource {
    /// Stylesheet inlined into the HTML shell plus the markup template.
    Html { style: PathBuf, markup: PathBuf },
    /// Layout-script template driving a PDF or DOCX build session.
    Definition(PathBuf),
}

impl TemplateResource {
    /// Fails with `TemplateNotFound` on the first missing file.
    pub fn ensure_exists(&self) -> InvoiceResult<()> {
        let paths: Vec<&Path> = match self {
            TemplateResource::Html { style, markup } => vec![style.as_path(), markup.as_path()],
            TemplateResource::Definition(path) => vec![path.as_path()],
        };
        paths.into_iter().try_for_each(ensure_file)
    }
}

pub fn ensure_file(path: &Path) -> InvoiceResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(InvoiceError::TemplateNotFound(path.to_path_buf()))
    }
}

/// Maps a template identifier to per-format resource paths. Pure: existence
/// is checked by the renderer right before use.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    roots: TemplateRoots,
}

impl TemplateResolver {
    pub fn new(roots: TemplateRoots) -> Self {
        TemplateResolver { roots }
    }

    pub fn root(&self, format: OutputFormat) -> &Path {
        match format {
            OutputFormat::Html => &self.roots.html_dir,
            OutputFormat::Pdf => &self.roots.pdf_dir,
            OutputFormat::Docx => &self.roots.docx_dir,
        }
    }

    /// HTML only has vendor templates, so `vendor` is ignored for it.
    pub fn resolve(&self, format: OutputFormat, identifier: &str, vendor: bool) -> TemplateResource {
        let root = self.root(format);
        let resource = match format {
            OutputFormat::Html => {
                let (style, markup) = self.html_pair(identifier);
                TemplateResource::Html { style, markup }
            }
            _ if vendor => TemplateResource::Definition(
                root.join(format!("{}.{}", identifier, DEFINITION_EXTENSION)),
            ),
            _ => TemplateResource::Definition(PathBuf::from(identifier)),
        };
        tracing::debug!(%format, identifier, vendor, ?resource, "Resolved template");
        resource
    }

    /// Stylesheet and markup paths of an HTML vendor template.
    pub fn html_pair(&self, identifier: &str) -> (PathBuf, PathBuf) {
        let root = &self.roots.html_dir;
        (
            root.join(format!("{}.{}", identifier, STYLE_EXTENSION)),
            root.join(format!("{}.{}", identifier, MARKUP_EXTENSION)),
        )
    }

    /// Vendor identifiers available for `format`, sorted. HTML identifiers
    /// are listed only when both the stylesheet and the markup exist.
    pub fn list(&self, format: OutputFormat) -> InvoiceResult<Vec<String>> {
        let root = self.root(format);
        if !root.is_dir() {
            tracing::warn!("Template directory does not exist: {:?}", root);
            return Ok(Vec::new());
        }

        let wanted = match format {
            OutputFormat::Html => MARKUP_EXTENSION,
            _ => DEFINITION_EXTENSION,
        };

        let mut identifiers = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(wanted) {
                continue;
            }
            let Some(identifier) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if self.resolve(format, identifier, true).ensure_exists().is_ok() {
                identifiers.push(identifier.to_string());
            }
        }
        identifiers.sort();
        Ok(identifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TemplateResolver {
        TemplateResolver::new(TemplateRoots::under("/vendor"))
    }

    #[test]
    fn vendor_paths_use_format_roots() {
        let r = resolver();
        assert_eq!(
            r.resolve(OutputFormat::Html, "simple", true),
            TemplateResource::Html {
                style: PathBuf::from("/vendor/html/simple.css"),
                markup: PathBuf::from("/vendor/html/simple.html"),
            }
        );
        assert_eq!(
            r.resolve(OutputFormat::Pdf, "blueline", true),
            TemplateResource::Definition(PathBuf::from("/vendor/pdf/blueline.jinja"))
        );
        assert_eq!(
            r.resolve(OutputFormat::Docx, "simple", true),
            TemplateResource::Definition(PathBuf::from("/vendor/docx/simple.jinja"))
        );
    }

    #[test]
    fn html_pair_matches_resolved_resource() {
        let r = resolver();
        let (style, markup) = r.html_pair("simple");
        assert_eq!(
            r.resolve(OutputFormat::Html, "simple", false),
            TemplateResource::Html { style, markup }
        );
    }

    #[test]
    fn custom_identifier_is_a_literal_path() {
        let r = resolver();
        assert_eq!(
            r.resolve(OutputFormat::Pdf, "/srv/mine/invoice.jinja", false),
            TemplateResource::Definition(PathBuf::from("/srv/mine/invoice.jinja"))
        );
        assert_eq!(
            r.resolve(OutputFormat::Docx, "rel/invoice.jinja", false),
            TemplateResource::Definition(PathBuf::from("rel/invoice.jinja"))
        );
    }

    #[test]
    fn html_ignores_custom_flag() {
        let r = resolver();
        assert_eq!(
            r.resolve(OutputFormat::Html, "simple", false),
            r.resolve(OutputFormat::Html, "simple", true)
        );
    }

    #[test]
    fn missing_markup_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let roots = TemplateRoots::under(dir.path());
        fs::create_dir_all(&roots.html_dir).unwrap();
        fs::write(roots.html_dir.join("lonely.css"), "body {}").unwrap();

        let r = TemplateResolver::new(roots.clone());
        let err = r
            .resolve(OutputFormat::Html, "lonely", true)
            .ensure_exists()
            .unwrap_err();
        match err {
            InvoiceError::TemplateNotFound(path) => {
                assert_eq!(path, roots.html_dir.join("lonely.html"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn list_skips_incomplete_html_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let roots = TemplateRoots::under(dir.path());
        fs::create_dir_all(&roots.html_dir).unwrap();
        fs::create_dir_all(&roots.pdf_dir).unwrap();
        for name in ["simple.css", "simple.html", "half.html"] {
            fs::write(roots.html_dir.join(name), "").unwrap();
        }
        fs::write(roots.pdf_dir.join("simple.jinja"), "").unwrap();
        fs::write(roots.pdf_dir.join("notes.txt"), "").unwrap();

        let r = TemplateResolver::new(roots);
        assert_eq!(r.list(OutputFormat::Html).unwrap(), vec!["simple"]);
        assert_eq!(r.list(OutputFormat::Pdf).unwrap(), vec!["simple"]);
        assert!(r.list(OutputFormat::Docx).unwrap().is_empty());
    }
}
