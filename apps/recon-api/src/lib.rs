//! # Étal Reconciliation API
//!
//! HTTP front for theoretical-sales reconciliation.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Back office ───► axum (8080) ───► ReconciliationService ───► Data API │
//! │                      │                    │                             │
//! │                      │                    ▼                             │
//! │                      │              OutletCache (TTL)                   │
//! │                      ▼                                                  │
//! │                 ApiError { code, message }                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `ETAL_BIND_ADDR` - Bind address (default: 0.0.0.0)
//! - `ETAL_PORT` - HTTP port (default: 8080)
//! - `ETAL_CONFIG_PATH` - Path to `reconcile.toml`
//! - `ETAL_REQUEST_TIMEOUT_SECS` - Reconciliation timeout (default: 120)
//! - `ETAL_API_URL`, `ETAL_API_TOKEN`, ... - Data API overrides, see `etal_recon::config`
//! - `RUST_LOG` - Log filter (default: `info,etal=debug`)

pub mod config;
pub mod error;
pub mod routes;

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use routes::{router, AppState};
