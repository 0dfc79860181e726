use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ErrorResponse;
use crate::domain::service::FileFormatError;
use crate::usecase::{CancelImportJobError, PreviewImportError, StartImportError};

/// ImportError はインポートAPIのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import job not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid file: {0}")]
    FileFormat(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FileFormatError> for ImportError {
    fn from(e: FileFormatError) -> Self {
        match e {
            FileFormatError::TooLarge { .. } => ImportError::PayloadTooLarge(e.to_string()),
            _ => ImportError::FileFormat(e.to_string()),
        }
    }
}

impl From<PreviewImportError> for ImportError {
    fn from(e: PreviewImportError) -> Self {
        match e {
            PreviewImportError::FileFormat(fe) => fe.into(),
            PreviewImportError::Internal(_) => ImportError::Internal(e.to_string()),
        }
    }
}

impl From<StartImportError> for ImportError {
    fn from(e: StartImportError) -> Self {
        match e {
            StartImportError::FileFormat(fe) => fe.into(),
            StartImportError::Mapping(_) => ImportError::Validation(e.to_string()),
            StartImportError::Internal(_) => ImportError::Internal(e.to_string()),
        }
    }
}

impl From<CancelImportJobError> for ImportError {
    fn from(e: CancelImportJobError) -> Self {
        match e {
            CancelImportJobError::NotFound(_) => ImportError::NotFound(e.to_string()),
            CancelImportJobError::AlreadyTerminal(_) => ImportError::Conflict(e.to_string()),
            CancelImportJobError::Internal(_) => ImportError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ImportError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "SYS_CIMPORT_NOT_FOUND", msg.as_str())
            }
            ImportError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "SYS_CIMPORT_VALIDATION_ERROR",
                msg.as_str(),
            ),
            ImportError::FileFormat(msg) => (
                StatusCode::BAD_REQUEST,
                "SYS_CIMPORT_INVALID_FILE",
                msg.as_str(),
            ),
            ImportError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "SYS_CIMPORT_FILE_TOO_LARGE",
                msg.as_str(),
            ),
            ImportError::Conflict(msg) => {
                (StatusCode::CONFLICT, "SYS_CIMPORT_CONFLICT", msg.as_str())
            }
            ImportError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SYS_CIMPORT_INTERNAL_ERROR",
                msg.as_str(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code, message, "import request failed");
        }
        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}
