//! # etal-recon: Reconciliation Orchestration
//!
//! Runs theoretical-sales reconciliations end to end: request validation,
//! concurrent per-date fetching, the etal-core pipeline, outcome reporting
//! and export.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ReconRequest                                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   ReconciliationService                          │  │
//! │  │                                                                  │  │
//! │  │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐  │  │
//! │  │  │ PeriodFetcher│──►│ reconcile_records│──►│ ReconReport      │  │  │
//! │  │  │ (etal-source)│   │ (etal-core)      │   │ + ReconOutcome   │  │  │
//! │  │  └──────────────┘   └──────────────────┘   └────────┬─────────┘  │  │
//! │  │                                                     │            │  │
//! │  │  ┌──────────────┐                          ┌────────▼─────────┐  │  │
//! │  │  │ OutletCache  │                          │ export::render   │  │  │
//! │  │  └──────────────┘                          │ (CSV / XLSX)     │  │  │
//! │  │                                            └──────────────────┘  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - `ReconConfig` (defaults, TOML file, environment)
//! - [`fetch`] - Concurrent retrying fetcher
//! - [`service`] - `ReconciliationService` and report types
//! - [`export`] - CSV and XLSX rendering
//! - [`error`] - Run-level error types
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use etal_recon::{ReconConfig, ReconRequest, ReconciliationService};
//! use etal_source::HttpStockSource;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReconConfig::load_or_default(None);
//! let source = Arc::new(HttpStockSource::new(&config.api)?);
//! let service = ReconciliationService::new(source, &config);
//!
//! let report = service
//!     .reconcile(&ReconRequest::new("2025-01-01", "2025-01-07").with_outlet("Mbao"))
//!     .await?;
//! println!("{} rows, outcome {:?}", report.rows.len(), report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod service;

pub use config::{CacheSettings, ExportSettings, FetchSettings, ReconConfig};
pub use error::{ExportError, ExportResult, ReconError, ReconResult};
pub use export::{export_csv, export_xlsx, render, ExportFormat, ExportOptions};
pub use fetch::{FetchFailure, FetchPolicy, FetchedPeriod, PeriodFetcher};
pub use service::{
    DataQuality, ExportFile, ReconOutcome, ReconReport, ReconRequest, ReconciliationService,
};
