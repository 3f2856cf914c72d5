//! # Source Error Types
//!
//! Errors raised while talking to the external data API.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Source Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Response            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  InvalidResponse        │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Rejected (success:     │ │
//! │  │                 │  │  Upstream (5xx) │  │            false)       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Client-side HTTP: Unauthorized, Forbidden, NotFound, BadRequest│   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only transport errors are worth retrying; see [`SourceError::is_retryable`].

use thiserror::Error;

/// Result type alias for data API operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Data API error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid data API configuration: {0}")]
    InvalidConfig(String),

    /// Base URL does not parse or is not http(s).
    #[error("Invalid data API URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the data API.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The data API answered with a server-side error status.
    #[error("Data API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    // =========================================================================
    // Client-Side HTTP Errors
    // =========================================================================
    #[error("Unauthorized: check the data API token")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// Body could not be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The transfer endpoint answered `success: false`.
    #[error("Data API rejected the request: {0}")]
    Rejected(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::InvalidResponse(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SourceError {
    /// Returns true if the same request may succeed when retried.
    ///
    /// ## Retryable Errors
    /// - Connection failures
    /// - Timeouts
    /// - 5xx and 429 responses
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Auth failures and other 4xx
    /// - Malformed or rejected responses
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::ConnectionFailed(_) | SourceError::Timeout(_) => true,
            SourceError::Upstream { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SourceError::InvalidConfig(_) | SourceError::InvalidUrl(_) | SourceError::Unauthorized
        )
    }
}
