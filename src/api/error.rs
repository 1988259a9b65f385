use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

use crate::core::InvoiceError;

#[derive(Debug)]
pub struct ApiError {
    message: String,
    status_code: StatusCode,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status_code: StatusCode) -> Self {
        ApiError {
            message: message.into(),
            status_code,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code)
            .json(serde_json::json!({
                "error": self.message,
                "status": self.status_code.as_u16()
            }))
    }

    fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::InvalidSlot(_) | InvoiceError::SlotMismatch { .. } => {
                ApiError::bad_request(err.to_string())
            }
            InvoiceError::TemplateNotFound(_) => ApiError::not_found(err.to_string()),
            other => {
                tracing::error!("Invoice rendering failed: {:?}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn invoice_errors_map_to_status_codes() {
        let bad: ApiError = InvoiceError::InvalidSlot("footer".into()).into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let missing: ApiError = InvoiceError::TemplateNotFound(PathBuf::from("x.css")).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let engine: ApiError = InvoiceError::engine("pdf", "boom").into();
        assert_eq!(engine.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(engine.to_string(), "pdf engine failed: boom");
    }
}
