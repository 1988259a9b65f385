use std::path::PathBuf;
use thiserror::Error;

use crate::models::Slot;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("not a valid data slot: {0}")]
    InvalidSlot(String),

    #[error("slot `{slot}` expects {expected}")]
    SlotMismatch { slot: Slot, expected: &'static str },

    #[error("{} not found", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("template `{name}` failed: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("layout script line {line}: {message}")]
    Layout { line: usize, message: String },

    #[error("error writing {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine} engine failed: {message}")]
    Engine { engine: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvoiceError {
    pub fn engine(engine: &'static str, message: impl ToString) -> Self {
        InvoiceError::Engine {
            engine,
            message: message.to_string(),
        }
    }
}

pub type InvoiceResult<T> = Result<T, InvoiceError>;
