pub mod api;
pub mod core;
pub mod generators;
pub mod invoicer;
pub mod models;
pub mod output;
pub mod templates;

// Re-export commonly used types
pub use crate::core::{AppConfig, InvoiceError, InvoiceResult, PdfConfig, TemplateRoots};
pub use generators::{DocxRenderer, FormatRenderer, HtmlRenderer, PdfRenderer};
pub use invoicer::Invoicer;
pub use models::{DeliveryMode, InvoiceRecord, OutputFormat, Slot, TemplateSelection};
pub use output::{Delivery, OutputDispatcher};
pub use templates::{TemplateEngine, TemplateResolver, TemplateResource};
