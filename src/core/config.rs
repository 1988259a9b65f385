use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    A3,
}

impl PageSize {
    /// Width and height in millimetres, portrait.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::A3 => (297.0, 420.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub title: String,
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin_mm: f32,
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        PdfConfig {
            title: "Invoice".to_string(),
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 15.0,
            font_size: 10.0,
            line_height: 1.4,
        }
    }
}

impl PdfConfig {
    pub fn builder() -> PdfConfigBuilder {
        PdfConfigBuilder::default()
    }

    /// Page size in millimetres after applying the orientation.
    pub fn page_mm(&self) -> (f32, f32) {
        let (w, h) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

#[derive(Default)]
pub struct PdfConfigBuilder {
    title: Option<String>,
    page_size: Option<PageSize>,
    orientation: Option<Orientation>,
    margin_mm: Option<f32>,
    font_size: Option<f32>,
}

impl PdfConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn margin_mm(mut self, margin: f32) -> Self {
        self.margin_mm = Some(margin);
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn build(self) -> PdfConfig {
        let default = PdfConfig::default();
        PdfConfig {
            title: self.title.unwrap_or(default.title),
            page_size: self.page_size.unwrap_or(default.page_size),
            orientation: self.orientation.unwrap_or(default.orientation),
            margin_mm: self.margin_mm.unwrap_or(default.margin_mm),
            font_size: self.font_size.unwrap_or(default.font_size),
            line_height: default.line_height,
        }
    }
}

/// Vendor template roots, one per output format.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateRoots {
    pub html_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub docx_dir: PathBuf,
}

impl Default for TemplateRoots {
    fn default() -> Self {
        TemplateRoots {
            html_dir: PathBuf::from("templates/html"),
            pdf_dir: PathBuf::from("templates/pdf"),
            docx_dir: PathBuf::from("templates/docx"),
        }
    }
}

impl TemplateRoots {
    /// All three roots under one base directory (`<base>/html`, `<base>/pdf`, `<base>/docx`).
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        TemplateRoots {
            html_dir: base.join("html"),
            pdf_dir: base.join("pdf"),
            docx_dir: base.join("docx"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub templates: TemplateRoots,
    pub output_dir: PathBuf,
    pub capture_script: String,
    pub pdf: PdfConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            templates: TemplateRoots::default(),
            output_dir: PathBuf::from("."),
            capture_script: "invlib/html2canvas.min.js".to_string(),
            pdf: PdfConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then an optional `invoice.toml`, then `INVOICE_*` environment
    /// variables (`INVOICE_TEMPLATES__HTML_DIR=...`).
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("invoice").required(false))
            .add_source(
                config::Environment::with_prefix("INVOICE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
