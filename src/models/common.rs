use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Html,
    Pdf,
    Docx,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Html, OutputFormat::Pdf, OutputFormat::Docx];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }

    /// Native content type used for display delivery.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html; charset=utf-8",
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" => Ok(OutputFormat::Docx),
            other => Err(format!("unsupported output format: {}", other)),
        }
    }
}

/// How a rendered artifact reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Stream inline with the format's content type.
    Display,
    /// Stream as an attachment.
    Download,
    /// Write to a path on the serving host.
    Save,
    /// Display, and have the client rasterize the invoice to a PNG (HTML only).
    Capture,
}

impl DeliveryMode {
    /// Maps the numeric mode codes each output entry point accepts.
    ///
    /// HTML: 1 display, 2 download, 3 save, 4 display + capture.
    /// PDF: 1 display, 2 download, 3 save.
    /// DOCX: 1 download, 2 save.
    /// Anything else falls back to the format's mode 1.
    pub fn from_code(format: OutputFormat, code: u32) -> Self {
        match (format, code) {
            (OutputFormat::Html, 4) => DeliveryMode::Capture,
            (OutputFormat::Html | OutputFormat::Pdf, 2) => DeliveryMode::Download,
            (OutputFormat::Html | OutputFormat::Pdf, 3) => DeliveryMode::Save,
            (OutputFormat::Html | OutputFormat::Pdf, _) => DeliveryMode::Display,
            (OutputFormat::Docx, 2) => DeliveryMode::Save,
            (OutputFormat::Docx, _) => DeliveryMode::Download,
        }
    }

    /// Narrows a mode to what `format` supports. PDF has no capture step and
    /// DOCX cannot be displayed, so both fall back to their mode 1 behavior.
    pub fn supported_for(self, format: OutputFormat) -> Self {
        match (format, self) {
            (OutputFormat::Pdf, DeliveryMode::Capture) => DeliveryMode::Display,
            (OutputFormat::Docx, DeliveryMode::Display | DeliveryMode::Capture) => {
                DeliveryMode::Download
            }
            (_, mode) => mode,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeliveryMode::Display => "display",
            DeliveryMode::Download => "download",
            DeliveryMode::Save => "save",
            DeliveryMode::Capture => "capture",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_mode_codes() {
        assert_eq!(DeliveryMode::from_code(OutputFormat::Html, 1), DeliveryMode::Display);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Html, 2), DeliveryMode::Download);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Html, 3), DeliveryMode::Save);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Html, 4), DeliveryMode::Capture);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Html, 9), DeliveryMode::Display);
    }

    #[test]
    fn pdf_has_no_capture_mode() {
        assert_eq!(DeliveryMode::from_code(OutputFormat::Pdf, 4), DeliveryMode::Display);
        assert_eq!(
            DeliveryMode::Capture.supported_for(OutputFormat::Pdf),
            DeliveryMode::Display
        );
    }

    #[test]
    fn docx_codes_start_at_download() {
        assert_eq!(DeliveryMode::from_code(OutputFormat::Docx, 1), DeliveryMode::Download);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Docx, 2), DeliveryMode::Save);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Docx, 3), DeliveryMode::Download);
        assert_eq!(
            DeliveryMode::Display.supported_for(OutputFormat::Docx),
            DeliveryMode::Download
        );
    }

    #[test]
    fn codes_past_a_byte_fall_back_to_mode_one() {
        assert_eq!(DeliveryMode::from_code(OutputFormat::Pdf, 256), DeliveryMode::Display);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Html, 258), DeliveryMode::Display);
        assert_eq!(DeliveryMode::from_code(OutputFormat::Docx, 258), DeliveryMode::Download);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }
}
