use chrono::Utc;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::{InvoiceError, InvoiceResult};
use crate::models::{DeliveryMode, OutputFormat};

pub const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// `invoice-<unix timestamp>.<ext>`
pub fn default_filename(extension: &str) -> String {
    format!("invoice-{}.{}", Utc::now().timestamp(), extension)
}

/// A rendered artifact on its way to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Streamed with the format's own content type.
    Inline {
        content_type: &'static str,
        body: Vec<u8>,
    },
    /// Streamed as a file download.
    Attachment {
        filename: String,
        body: Vec<u8>,
        content_length: Option<usize>,
    },
    /// Written to the serving host's filesystem.
    Saved { path: PathBuf, bytes: usize },
}

impl Delivery {
    /// Transport headers, in the order they are sent.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Delivery::Inline { content_type, .. } => {
                vec![("Content-Type", content_type.to_string())]
            }
            Delivery::Attachment {
                filename,
                content_length,
                ..
            } => {
                let mut headers = vec![
                    ("Content-Type", ATTACHMENT_CONTENT_TYPE.to_string()),
                    (
                        "Content-Disposition",
                        format!("attachment; filename=\"{}\"", filename.replace('"', "")),
                    ),
                    ("Expires", "0".to_string()),
                    ("Cache-Control", "must-revalidate".to_string()),
                    ("Pragma", "public".to_string()),
                ];
                if let Some(len) = content_length {
                    headers.push(("Content-Length", len.to_string()));
                }
                headers
            }
            Delivery::Saved { .. } => Vec::new(),
        }
    }

    /// Bytes that will go over the wire; `None` once saved.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Delivery::Inline { body, .. } | Delivery::Attachment { body, .. } => Some(body),
            Delivery::Saved { .. } => None,
        }
    }
}

/// Routes rendered bytes to their destination according to the delivery mode.
#[derive(Debug, Clone)]
pub struct OutputDispatcher {
    output_dir: PathBuf,
}

impl OutputDispatcher {
    /// Relative save paths are resolved against `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        OutputDispatcher {
            output_dir: output_dir.into(),
        }
    }

    pub fn deliver(
        &self,
        format: OutputFormat,
        body: Vec<u8>,
        mode: DeliveryMode,
        filename: Option<&str>,
    ) -> InvoiceResult<Delivery> {
        let filename = filename
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_filename(format.extension()));

        let delivery = match mode.supported_for(format) {
            DeliveryMode::Display | DeliveryMode::Capture => Delivery::Inline {
                content_type: format.content_type(),
                body,
            },
            DeliveryMode::Download => Delivery::Attachment {
                content_length: Some(body.len()),
                filename,
                body,
            },
            DeliveryMode::Save => {
                let path = self.save_path(&filename);
                write_file(&path, &body)?;
                Delivery::Saved {
                    path,
                    bytes: body.len(),
                }
            }
        };

        match &delivery {
            Delivery::Saved { path, bytes } => {
                tracing::info!(%format, bytes, "Saved invoice to {:?}", path)
            }
            Delivery::Attachment { filename, body, .. } => {
                tracing::info!(%format, bytes = body.len(), filename = %filename, "Delivering invoice download")
            }
            Delivery::Inline { body, .. } => {
                tracing::info!(%format, bytes = body.len(), "Delivering invoice inline")
            }
        }
        Ok(delivery)
    }

    fn save_path(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }
}

/// Writes and syncs `body` to `path`. A file that was created but could not
/// be fully written is removed again.
fn write_file(path: &Path, body: &[u8]) -> InvoiceResult<()> {
    let write_error = |source| InvoiceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(write_error)?;
    // Close errors on drop are lost; sync_all surfaces deferred write-back failures first.
    if let Err(source) = file.write_all(body).and_then(|_| file.sync_all()) {
        drop(file);
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Could not remove partial file {:?}: {}", path, e);
        }
        return Err(write_error(source));
    }
    Ok(())
}
