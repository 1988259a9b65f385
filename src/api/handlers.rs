use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::models::{DeliveryMode, InvoiceRecord, OutputFormat};
use crate::output::Delivery;
use super::error::{ApiError, ApiResult};
use super::state::ApiState;

/// Body of `POST /api/v1/invoices/{format}`.
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub record: InvoiceRecord,
    /// Format-specific mode code; defaults to 1.
    pub mode: Option<u32>,
    pub filename: Option<String>,
}

/// Render a record and deliver it per the requested mode
pub async fn render_invoice(
    path: web::Path<String>,
    body: web::Json<RenderRequest>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let format: OutputFormat = path.into_inner().parse().map_err(ApiError::not_found)?;
    let RenderRequest {
        mut record,
        mode,
        filename,
    } = body.into_inner();

    check_template(&record)?;
    if let Some(name) = &filename {
        check_filename(name)?;
    }

    let mode = DeliveryMode::from_code(format, mode.unwrap_or(1)).supported_for(format);
    let invoicer = state.invoicer.clone();

    let delivery = tokio::task::spawn_blocking(move || {
        invoicer.output(&mut record, format, mode, filename.as_deref())
    })
    .await
    .map_err(|e| ApiError::internal_server_error(format!("render task failed: {}", e)))??;

    state
        .metrics
        .renders
        .with_label_values(&[format.extension(), mode.name()])
        .inc();

    Ok(into_response(delivery))
}

/// Vendor template identifiers per format
pub async fn list_templates(state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    let resolver = state.invoicer.resolver();
    let mut templates = BTreeMap::new();
    for format in OutputFormat::ALL {
        templates.insert(format.extension(), resolver.list(format)?);
    }

    Ok(HttpResponse::Ok().json(json!({
        "templates": templates
    })))
}

pub fn into_response(delivery: Delivery) -> HttpResponse {
    match delivery {
        Delivery::Saved { path, bytes } => HttpResponse::Ok().json(json!({
            "status": "saved",
            "path": path,
            "bytes": bytes,
        })),
        delivery => {
            let mut response = HttpResponse::Ok();
            for (name, value) in delivery.headers() {
                // actix sets the length from the body itself
                if name != "Content-Length" {
                    response.insert_header((name, value));
                }
            }
            let body = match delivery {
                Delivery::Inline { body, .. } | Delivery::Attachment { body, .. } => body,
                Delivery::Saved { .. } => Vec::new(),
            };
            response.body(body)
        }
    }
}

/// HTTP callers may only pick vendor templates, by plain identifier.
fn check_template(record: &InvoiceRecord) -> ApiResult<()> {
    let selection = record.template();
    if !selection.vendor {
        return Err(ApiError::bad_request("only vendor templates can be used over HTTP"));
    }
    if !is_plain_name(&selection.identifier) {
        return Err(ApiError::bad_request(format!(
            "invalid template identifier: {}",
            selection.identifier
        )));
    }
    Ok(())
}

/// Names end up in `Content-Disposition` or on disk, so they must be a
/// single path component free of control characters.
fn check_filename(name: &str) -> ApiResult<()> {
    if name.chars().any(char::is_control) {
        return Err(ApiError::bad_request(format!(
            "filename must not contain control characters: {:?}",
            name
        )));
    }
    if !is_plain_name(name) {
        return Err(ApiError::bad_request(format!(
            "filename must not contain directories: {}",
            name
        )));
    }
    Ok(())
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_only() {
        assert!(is_plain_name("invoice.pdf"));
        assert!(!is_plain_name("../invoice.pdf"));
        assert!(!is_plain_name("/tmp/invoice.pdf"));
        assert!(!is_plain_name("out/invoice.pdf"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
    }

    #[test]
    fn filenames_with_control_characters_are_rejected() {
        assert!(check_filename("invoice.pdf").is_ok());
        assert!(check_filename("a\nb.pdf").is_err());
        assert!(check_filename("a\rb.pdf").is_err());
        assert!(check_filename("tab\there.pdf").is_err());
        assert!(check_filename("nul\0.pdf").is_err());
    }

    #[test]
    fn non_vendor_templates_are_rejected() {
        let mut record = InvoiceRecord::new();
        assert!(check_template(&record).is_ok());
        record.use_template("/etc/passwd", false);
        assert!(check_template(&record).is_err());
        record.use_template("../secret", true);
        assert!(check_template(&record).is_err());
    }
}
