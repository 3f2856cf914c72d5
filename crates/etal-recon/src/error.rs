//! # Reconciliation Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reconciliation Error Categories                     │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Request        │  │   Source        │  │     Export              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Source (only   │  │  EmptyDataset           │ │
//! │  │  (bad dates,    │  │  outlet list;   │  │  Csv / Xlsx             │ │
//! │  │   long period)  │  │  per-date fetch │  │  UnknownFormat          │ │
//! │  │                 │  │  errors never   │  │                         │ │
//! │  │                 │  │  abort a run)   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Configuration  │  │   Run control   │                              │
//! │  │  InvalidConfig  │  │   Cancelled     │                              │
//! │  │  ConfigLoad/Save│  │   Internal      │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use etal_core::{CoreError, ValidationError};
use etal_source::SourceError;
use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type ReconResult<T> = Result<T, ReconError>;

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Run-level error type.
#[derive(Debug, Error)]
pub enum ReconError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// The request was rejected before any fetching.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Source Errors
    // =========================================================================
    #[error("Data API error: {0}")]
    Source(#[from] SourceError),

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Run Control
    // =========================================================================
    /// The caller gave up before the run finished.
    #[error("Reconciliation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Export error type. The computed rows are never affected by these.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There is nothing to export.
    #[error("No rows to export for the selected period and filters")]
    EmptyDataset,

    #[error("Unknown export format '{0}' (expected csv or xlsx)")]
    UnknownFormat(String),

    /// The configured date format cannot render a calendar date.
    #[error("Export date format '{0}' cannot render a calendar date")]
    InvalidDateFormat(String),

    #[error("CSV serialization failed: {0}")]
    Csv(String),

    #[error("XLSX serialization failed: {0}")]
    Xlsx(String),

    #[error("I/O error while exporting: {0}")]
    Io(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for ReconError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ReconError::Validation(v),
            other => ReconError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        ReconError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ReconError {
    fn from(err: toml::de::Error) -> Self {
        ReconError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ReconError {
    fn from(err: toml::ser::Error) -> Self {
        ReconError::ConfigSaveFailed(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ReconError {
    /// Returns true if the caller sent a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReconError::Validation(_) | ReconError::Export(ExportError::UnknownFormat(_))
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        match self {
            ReconError::InvalidConfig(_)
            | ReconError::ConfigLoadFailed(_)
            | ReconError::ConfigSaveFailed(_)
            | ReconError::Export(ExportError::InvalidDateFormat(_)) => true,
            ReconError::Source(err) => err.is_config_error(),
            _ => false,
        }
    }
}
