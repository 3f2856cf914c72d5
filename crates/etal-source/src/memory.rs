//! # In-Memory Source
//!
//! A [`StockSource`] that serves records from memory, with failure
//! injection per (date, record kind). Used by tests and local demos.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use etal_core::RecordKind;
//! use etal_source::{MemoryStockSource, SourceError};
//! use serde_json::json;
//!
//! let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let source = MemoryStockSource::new()
//!     .with_records(RecordKind::MorningStock, day, vec![json!({ "pointVente": "A", "produit": "Boeuf" })])
//!     .with_outlets(["A"]);
//! source.fail(day, RecordKind::Transfers, SourceError::Timeout(5));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use etal_core::RecordKind;
use serde_json::Value;

use crate::error::{SourceError, SourceResult};
use crate::source::StockSource;

/// An injected failure. `remaining: None` fails forever.
#[derive(Debug, Clone)]
struct Failure {
    error: SourceError,
    remaining: Option<usize>,
}

impl Failure {
    /// Returns the error to raise for this call, if any.
    fn trip(&mut self) -> Option<SourceError> {
        match &mut self.remaining {
            None => Some(self.error.clone()),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(self.error.clone())
            }
        }
    }
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<(NaiveDate, RecordKind), Vec<Value>>,
    failures: HashMap<(NaiveDate, RecordKind), Failure>,
    outlets: Vec<String>,
    outlet_failure: Option<SourceError>,
}

/// In-memory [`StockSource`].
#[derive(Debug, Default)]
pub struct MemoryStockSource {
    state: Mutex<State>,
    fetch_calls: AtomicUsize,
    outlet_calls: AtomicUsize,
}

impl MemoryStockSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds records for one date and kind (appended to any existing ones).
    pub fn with_records(self, kind: RecordKind, date: NaiveDate, records: Vec<Value>) -> Self {
        self.push_records(kind, date, records);
        self
    }

    pub fn with_outlets<I, S>(self, outlets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_outlets(outlets);
        self
    }

    pub fn push_records(&self, kind: RecordKind, date: NaiveDate, records: Vec<Value>) {
        self.state()
            .records
            .entry((date, kind))
            .or_default()
            .extend(records);
    }

    pub fn set_outlets<I, S>(&self, outlets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().outlets = outlets.into_iter().map(Into::into).collect();
    }

    /// Makes every fetch of (date, kind) fail with `error`.
    pub fn fail(&self, date: NaiveDate, kind: RecordKind, error: SourceError) {
        self.state().failures.insert(
            (date, kind),
            Failure {
                error,
                remaining: None,
            },
        );
    }

    /// Makes the next `times` fetches of (date, kind) fail, then recover.
    pub fn fail_times(&self, date: NaiveDate, kind: RecordKind, times: usize, error: SourceError) {
        self.state().failures.insert(
            (date, kind),
            Failure {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Makes every fetch of every kind fail for `date`.
    pub fn fail_date(&self, date: NaiveDate, error: SourceError) {
        for kind in RecordKind::ALL {
            self.fail(date, kind, error.clone());
        }
    }

    pub fn fail_outlets(&self, error: Option<SourceError>) {
        self.state().outlet_failure = error;
    }

    /// Removes every injected failure.
    pub fn heal(&self) {
        let mut state = self.state();
        state.failures.clear();
        state.outlet_failure = None;
    }

    /// Number of record fetches served or failed so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn outlet_calls(&self) -> usize {
        self.outlet_calls.load(Ordering::SeqCst)
    }

    fn serve(&self, kind: RecordKind, date: NaiveDate) -> SourceResult<Vec<Value>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();

        if let Some(err) = state.failures.get_mut(&(date, kind)).and_then(Failure::trip) {
            return Err(err);
        }

        Ok(state.records.get(&(date, kind)).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl StockSource for MemoryStockSource {
    async fn morning_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        self.serve(RecordKind::MorningStock, date)
    }

    async fn evening_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        self.serve(RecordKind::EveningStock, date)
    }

    async fn transfers(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        self.serve(RecordKind::Transfers, date)
    }

    async fn active_outlets(&self) -> SourceResult<Vec<String>> {
        self.outlet_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        match &state.outlet_failure {
            Some(err) => Err(err.clone()),
            None => Ok(state.outlets.clone()),
        }
    }
}
