//! # etal-source: Data API Access Layer
//!
//! Everything that talks to the external data API.
//!
//! ## Modules
//!
//! - [`source`] - The `StockSource` trait and shared envelope parsing
//! - [`http`] - reqwest-backed production client
//! - [`memory`] - In-memory source with failure injection
//! - [`cache`] - TTL cache for the active-outlet list
//! - [`error`] - Source error types
//!
//! ## Usage
//! ```rust,no_run
//! use etal_source::{ClientConfig, HttpStockSource, StockSource};
//! use chrono::NaiveDate;
//!
//! # async fn run() -> etal_source::SourceResult<()> {
//! let source = HttpStockSource::new(&ClientConfig::with_base_url("https://stock.example.com"))?;
//! let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let morning = source.morning_stock(date).await?;
//! println!("{} morning records", morning.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod http;
pub mod memory;
pub mod source;

pub use cache::{Clock, ManualClock, OutletCache, SystemClock};
pub use error::{SourceError, SourceResult};
pub use http::{ClientConfig, Endpoints, HttpStockSource};
pub use memory::MemoryStockSource;
pub use source::StockSource;
