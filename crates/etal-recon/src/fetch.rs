//! # Per-Date Record Fetcher
//!
//! Fetches morning stock, evening stock and transfers for every date of a
//! period.
//!
//! ## Fan-Out
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dates ──► buffer_unordered(max_concurrent_dates)                      │
//! │              │                                                          │
//! │              ├── 2025-01-01 ──► join3(morning, evening, transfers)      │
//! │              ├── 2025-01-02 ──► join3(morning, evening, transfers)      │
//! │              └── ...                                                    │
//! │                                                                         │
//! │  Each (date, kind) request:                                             │
//! │    ok                         → records appended to that kind          │
//! │    retryable err, retries left → exponential backoff, try again        │
//! │    otherwise                  → FetchFailure, contributes nothing      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every date resolves into its own [`DateFetch`] and the results are merged
//! only once all of them are in. Dropping the future midway leaves nothing
//! half-merged behind.

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::NaiveDate;
use futures_util::future::join3;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use ts_rs::TS;

use etal_core::{RawRecord, RecordKind};
use etal_source::{SourceResult, StockSource};

use crate::config::FetchSettings;

// =============================================================================
// Fetch Policy
// =============================================================================

/// Concurrency and retry limits for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_concurrent_dates: usize,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy::from(&FetchSettings::default())
    }
}

impl From<&FetchSettings> for FetchPolicy {
    fn from(settings: &FetchSettings) -> Self {
        FetchPolicy {
            max_concurrent_dates: settings.max_concurrent_dates.max(1),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
        }
    }
}

// =============================================================================
// Fetch Results
// =============================================================================

/// One (date, kind) request that gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: RecordKind,
    pub message: String,
}

/// All records fetched for a period, plus what could not be fetched.
#[derive(Debug, Clone, Default)]
pub struct FetchedPeriod {
    pub morning: Vec<RawRecord>,
    pub evening: Vec<RawRecord>,
    pub transfers: Vec<RawRecord>,
    pub failures: Vec<FetchFailure>,
    /// Number of (date, kind) requests issued.
    pub attempted: usize,
}

impl FetchedPeriod {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// True when requests were made and every one of them failed.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failures.len() == self.attempted
    }

    fn absorb(&mut self, fetch: DateFetch) {
        let DateFetch {
            date,
            morning,
            evening,
            transfers,
        } = fetch;

        for (kind, result) in [
            (RecordKind::MorningStock, morning),
            (RecordKind::EveningStock, evening),
            (RecordKind::Transfers, transfers),
        ] {
            self.attempted += 1;
            match result {
                Ok(values) => {
                    let target = match kind {
                        RecordKind::MorningStock => &mut self.morning,
                        RecordKind::EveningStock => &mut self.evening,
                        RecordKind::Transfers => &mut self.transfers,
                    };
                    target.extend(values.into_iter().map(|v| RawRecord::new(date, v)));
                }
                Err(err) => {
                    warn!(%date, %kind, error = %err, "Fetch failed, treating as empty");
                    self.failures.push(FetchFailure {
                        date,
                        kind,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

/// The three results for one date.
#[derive(Debug)]
struct DateFetch {
    date: NaiveDate,
    morning: SourceResult<Vec<Value>>,
    evening: SourceResult<Vec<Value>>,
    transfers: SourceResult<Vec<Value>>,
}

// =============================================================================
// Fetcher
// =============================================================================

/// Concurrent, retrying fetcher over a [`StockSource`].
pub struct PeriodFetcher<S> {
    source: Arc<S>,
    policy: FetchPolicy,
}

impl<S: StockSource> PeriodFetcher<S> {
    pub fn new(source: Arc<S>, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches every date. Never fails: per-request errors end up in
    /// [`FetchedPeriod::failures`].
    pub async fn fetch(&self, dates: &[NaiveDate]) -> FetchedPeriod {
        let mut fetches: Vec<DateFetch> = stream::iter(dates.iter().copied())
            .map(|date| self.fetch_date(date))
            .buffer_unordered(self.policy.max_concurrent_dates)
            .collect()
            .await;

        // Completion order is arbitrary; record order must not be
        fetches.sort_by_key(|f| f.date);

        let mut period = FetchedPeriod::default();
        for fetch in fetches {
            period.absorb(fetch);
        }

        debug!(
            attempted = period.attempted,
            failed = period.failures.len(),
            morning = period.morning.len(),
            evening = period.evening.len(),
            transfers = period.transfers.len(),
            "Period fetched"
        );
        period
    }

    async fn fetch_date(&self, date: NaiveDate) -> DateFetch {
        let (morning, evening, transfers) = join3(
            self.fetch_with_retry(RecordKind::MorningStock, date),
            self.fetch_with_retry(RecordKind::EveningStock, date),
            self.fetch_with_retry(RecordKind::Transfers, date),
        )
        .await;

        DateFetch {
            date,
            morning,
            evening,
            transfers,
        }
    }

    async fn fetch_with_retry(&self, kind: RecordKind, date: NaiveDate) -> SourceResult<Vec<Value>> {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            match self.source.fetch(kind, date).await {
                Ok(values) => return Ok(values),
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let Some(wait) = backoff.next_backoff() else {
                        return Err(err);
                    };
                    debug!(%date, %kind, attempt, ?wait, error = %err, "Retrying fetch");
                    tokio::time::sleep(wait).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.policy.initial_backoff,
            max_interval: self.policy.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use etal_source::{MemoryStockSource, SourceError};
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn fast_policy() -> FetchPolicy {
        FetchPolicy {
            max_concurrent_dates: 2,
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    fn record(outlet: &str) -> Value {
        json!({ "pointVente": outlet, "produit": "Boeuf", "quantite": 1 })
    }

    #[tokio::test]
    async fn test_fetches_every_date_and_kind() {
        let source = Arc::new(
            MemoryStockSource::new()
                .with_records(RecordKind::MorningStock, day(1), vec![record("A")])
                .with_records(RecordKind::EveningStock, day(2), vec![record("A"), record("B")])
                .with_records(RecordKind::Transfers, day(3), vec![record("C")]),
        );
        let fetcher = PeriodFetcher::new(source.clone(), fast_policy());

        let period = fetcher.fetch(&[day(1), day(2), day(3)]).await;
        assert_eq!(period.attempted, 9);
        assert!(period.failures.is_empty());
        assert_eq!(period.morning.len(), 1);
        assert_eq!(period.evening.len(), 2);
        assert_eq!(period.transfers.len(), 1);
        assert_eq!(period.transfers[0].fetched_for, day(3));
        assert_eq!(source.fetch_calls(), 9);
    }

    #[tokio::test]
    async fn test_failure_only_blanks_that_kind_and_date() {
        let source = Arc::new(
            MemoryStockSource::new()
                .with_records(RecordKind::MorningStock, day(1), vec![record("A")])
                .with_records(RecordKind::MorningStock, day(2), vec![record("B")])
                .with_records(RecordKind::EveningStock, day(2), vec![record("B")]),
        );
        source.fail(day(2), RecordKind::MorningStock, SourceError::Unauthorized);
        let fetcher = PeriodFetcher::new(source, fast_policy());

        let period = fetcher.fetch(&[day(1), day(2)]).await;
        assert_eq!(period.failures.len(), 1);
        assert_eq!(period.failures[0].date, day(2));
        assert_eq!(period.failures[0].kind, RecordKind::MorningStock);
        assert_eq!(period.morning.len(), 1);
        assert_eq!(period.evening.len(), 1);
        assert!(!period.all_failed());
        assert_eq!(period.succeeded(), 5);
    }

    #[tokio::test]
    async fn test_retryable_error_is_retried() {
        let source = Arc::new(
            MemoryStockSource::new()
                .with_records(RecordKind::Transfers, day(1), vec![record("A")]),
        );
        source.fail_times(day(1), RecordKind::Transfers, 2, SourceError::Timeout(1));
        let fetcher = PeriodFetcher::new(source.clone(), fast_policy());

        let period = fetcher.fetch(&[day(1)]).await;
        assert!(period.failures.is_empty());
        assert_eq!(period.transfers.len(), 1);
        // 2 plain kinds + 3 attempts for transfers
        assert_eq!(source.fetch_calls(), 5);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let source = Arc::new(MemoryStockSource::new());
        source.fail(day(1), RecordKind::EveningStock, SourceError::ConnectionFailed("reset".into()));
        let fetcher = PeriodFetcher::new(source.clone(), fast_policy());

        let period = fetcher.fetch(&[day(1)]).await;
        assert_eq!(period.failures.len(), 1);
        // 1 + 2 retries for evening, 1 each for the others
        assert_eq!(source.fetch_calls(), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let source = Arc::new(MemoryStockSource::new());
        source.fail(day(1), RecordKind::Transfers, SourceError::Rejected("locked".into()));
        let fetcher = PeriodFetcher::new(source.clone(), fast_policy());

        let period = fetcher.fetch(&[day(1)]).await;
        assert_eq!(period.failures.len(), 1);
        assert!(period.failures[0].message.contains("locked"));
        assert_eq!(source.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn test_everything_failing_is_reported() {
        let source = Arc::new(MemoryStockSource::new());
        source.fail_date(day(1), SourceError::Unauthorized);
        source.fail_date(day(2), SourceError::Unauthorized);
        let fetcher = PeriodFetcher::new(source, fast_policy());

        let period = fetcher.fetch(&[day(1), day(2)]).await;
        assert!(period.all_failed());
        assert_eq!(period.failures.len(), 6);
    }

    #[tokio::test]
    async fn test_record_order_follows_dates() {
        let source = Arc::new(
            MemoryStockSource::new()
                .with_records(RecordKind::MorningStock, day(1), vec![record("A")])
                .with_records(RecordKind::MorningStock, day(2), vec![record("B")])
                .with_records(RecordKind::MorningStock, day(3), vec![record("C")]),
        );
        let fetcher = PeriodFetcher::new(source, fast_policy());

        let period = fetcher.fetch(&[day(1), day(2), day(3)]).await;
        let dates: Vec<NaiveDate> = period.morning.iter().map(|r| r.fetched_for).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
    }

    #[tokio::test]
    async fn test_empty_date_list() {
        let fetcher = PeriodFetcher::new(Arc::new(MemoryStockSource::new()), fast_policy());
        let period = fetcher.fetch(&[]).await;
        assert_eq!(period.attempted, 0);
        assert!(!period.all_failed());
    }
}
