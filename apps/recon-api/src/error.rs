//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Handler → Result<T, ApiError>                                          │
//! │                                                                         │
//! │  ReconError::Validation ───────────► 400 VALIDATION_ERROR               │
//! │  ExportError::UnknownFormat ───────► 400 VALIDATION_ERROR               │
//! │  ExportError::EmptyDataset ────────► 422 EMPTY_EXPORT                   │
//! │  SourceError (outlet list) ────────► 502 UPSTREAM_ERROR                 │
//! │  ReconError::Cancelled ────────────► 504 TIMEOUT                        │
//! │  anything else ────────────────────► 500 INTERNAL (details logged)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Body
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Invalid request: startDate is after endDate"
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use etal_recon::{ExportError, ReconError};
use etal_source::SourceError;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad dates, period too long, unknown export format (400)
    ValidationError,

    /// Nothing to export for the period and filters (422)
    EmptyExport,

    /// Data API failed or refused the request (502)
    UpstreamError,

    /// Reconciliation took too long and was abandoned (504)
    Timeout,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::EmptyExport => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts data API errors to API errors.
impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        if err.is_config_error() {
            tracing::error!(error = %err, "Data API misconfigured");
        } else {
            tracing::warn!(error = %err, "Data API request failed");
        }
        ApiError::new(ErrorCode::UpstreamError, err.to_string())
    }
}

/// Converts reconciliation errors to API errors.
impl From<ReconError> for ApiError {
    fn from(err: ReconError) -> Self {
        match err {
            ReconError::Validation(e) => ApiError::validation(e.to_string()),
            ReconError::Export(ExportError::UnknownFormat(format)) => {
                ApiError::validation(format!("Unknown export format '{}'", format))
            }
            ReconError::Export(ExportError::EmptyDataset) => ApiError::new(
                ErrorCode::EmptyExport,
                ExportError::EmptyDataset.to_string(),
            ),
            ReconError::Source(e) => e.into(),
            ReconError::Cancelled => {
                ApiError::new(ErrorCode::Timeout, "Reconciliation took too long and was cancelled")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Reconciliation failed");
                ApiError::internal("Reconciliation failed")
            }
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ReconError::Export(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use etal_core::ValidationError;

    #[test]
    fn test_error_mapping() {
        let err: ApiError = ReconError::Validation(ValidationError::Required {
            field: "startDate".into(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = ExportError::EmptyDataset.into();
        assert_eq!(err.code.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = ReconError::Cancelled.into();
        assert_eq!(err.code.status(), StatusCode::GATEWAY_TIMEOUT);

        let err: ApiError = SourceError::Timeout(30).into();
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = ReconError::Internal("boom".into()).into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("boom"));
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(ApiError::validation("bad")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": "VALIDATION_ERROR", "message": "bad" })
        );
    }
}
