//! # Reconciliation Service
//!
//! Entry point for one reconciliation request.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ReconRequest { startDate, endDate, outlet?, product? }                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  1. parse + validate dates, period length, filters   (no fetch yet)    │
//! │        │           └── error → ReconError::Validation                  │
//! │        ▼                                                                │
//! │  2. PeriodFetcher: dates × {morning, evening, transfers}               │
//! │        │           └── per-request failures collected, never fatal     │
//! │        ▼                                                                │
//! │  3. etal-core: normalize → filter → aggregate → consolidate → sort     │
//! │        │           └── rejected records and duplicates logged          │
//! │        ▼                                                                │
//! │  4. ReconReport { rows, summary, outcome, failures, dataQuality }      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Outcomes
//! ```text
//! every request failed              → SourceUnreachable
//! some requests failed              → Partial { failedFetches }
//! all succeeded, no rows            → NoActivity
//! all succeeded, rows               → Complete
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};
use ts_rs::TS;
use uuid::Uuid;

use etal_core::validation::{validate_filter_value, validate_period};
use etal_core::{
    reconcile_records, AggregationStats, ConsolidatedRow, Period, RecordFilter, ReconSummary,
};
use etal_source::{Clock, OutletCache, SourceResult, StockSource, SystemClock};

use crate::config::ReconConfig;
use crate::error::{ReconError, ReconResult};
use crate::export::{render, ExportFormat, ExportOptions};
use crate::fetch::{FetchFailure, FetchPolicy, PeriodFetcher};

// =============================================================================
// Request
// =============================================================================

/// A reconciliation request, as sent by the reconciliation screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconRequest {
    /// `YYYY-MM-DD` or `DD/MM/YYYY`.
    pub start_date: String,
    pub end_date: String,
    #[serde(default, alias = "outletFilter")]
    pub outlet: Option<String>,
    #[serde(default, alias = "productFilter")]
    pub product: Option<String>,
}

impl ReconRequest {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
            outlet: None,
            product: None,
        }
    }

    pub fn with_outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Parses and validates everything that can be checked without fetching.
    pub fn validate(&self, max_period_days: i64) -> ReconResult<(Period, RecordFilter)> {
        let period = Period::parse(&self.start_date, &self.end_date)?;
        validate_period(&period, max_period_days)?;

        if let Some(outlet) = &self.outlet {
            validate_filter_value("outlet", outlet)?;
        }
        if let Some(product) = &self.product {
            validate_filter_value("product", product)?;
        }

        let filter = RecordFilter::new(self.outlet.as_deref(), self.product.as_deref());
        Ok((period, filter))
    }
}

// =============================================================================
// Report
// =============================================================================

/// How complete the data behind a report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ReconOutcome {
    /// Every fetch succeeded and rows were produced.
    Complete,
    /// Some fetches failed; rows cover what was reachable.
    #[serde(rename_all = "camelCase")]
    Partial { failed_fetches: usize },
    /// Every fetch succeeded but nothing happened in the period.
    NoActivity,
    /// Every fetch failed; an empty row set means nothing here.
    SourceUnreachable,
}

impl ReconOutcome {
    fn classify(attempted: usize, failed: usize, rows: usize) -> Self {
        if attempted > 0 && failed == attempted {
            ReconOutcome::SourceUnreachable
        } else if failed > 0 {
            ReconOutcome::Partial {
                failed_fetches: failed,
            }
        } else if rows == 0 {
            ReconOutcome::NoActivity
        } else {
            ReconOutcome::Complete
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            ReconOutcome::Partial { .. } | ReconOutcome::SourceUnreachable
        )
    }
}

/// Data-quality signals found during the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Records dropped for a missing outlet, product or date.
    pub rejected_records: usize,
    pub aggregation: AggregationStats,
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconReport {
    #[ts(type = "string")]
    pub run_id: Uuid,
    pub period: Period,
    pub filter: RecordFilter,
    /// Sorted by date, outlet, product.
    pub rows: Vec<ConsolidatedRow>,
    pub summary: ReconSummary,
    pub outcome: ReconOutcome,
    pub failures: Vec<FetchFailure>,
    pub data_quality: DataQuality,
    #[ts(type = "string")]
    pub generated_at: DateTime<Utc>,
}

/// A rendered export, ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub outcome: ReconOutcome,
}

impl ExportFile {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

// =============================================================================
// Service
// =============================================================================

/// Runs reconciliations against a [`StockSource`].
pub struct ReconciliationService<S, C: Clock = SystemClock> {
    source: Arc<S>,
    fetcher: PeriodFetcher<S>,
    outlets: OutletCache<C>,
    max_period_days: i64,
    export_options: ExportOptions,
}

impl<S: StockSource> ReconciliationService<S, SystemClock> {
    pub fn new(source: Arc<S>, config: &ReconConfig) -> Self {
        Self::with_clock(source, config, SystemClock)
    }
}

impl<S: StockSource, C: Clock> ReconciliationService<S, C> {
    /// Creates a service whose outlet cache reads time from `clock`.
    pub fn with_clock(source: Arc<S>, config: &ReconConfig, clock: C) -> Self {
        Self {
            fetcher: PeriodFetcher::new(source.clone(), FetchPolicy::from(&config.fetch)),
            outlets: OutletCache::with_clock(config.cache.outlets_ttl(), clock),
            source,
            max_period_days: config.fetch.max_period_days,
            export_options: ExportOptions::from(&config.export),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Runs one reconciliation.
    ///
    /// Only request validation or a quantity overflow fails the call. Fetch
    /// failures degrade the outcome instead.
    pub async fn reconcile(&self, request: &ReconRequest) -> ReconResult<ReconReport> {
        let (period, filter) = request.validate(self.max_period_days)?;
        let run_id = Uuid::new_v4();

        let span = info_span!(
            "reconcile",
            %run_id,
            start = %period.start(),
            end = %period.end(),
        );

        self.run(run_id, period, filter).instrument(span).await
    }

    /// Like [`reconcile`](Self::reconcile), abandoned as soon as `cancel`
    /// completes.
    pub async fn reconcile_until<F>(&self, request: &ReconRequest, cancel: F) -> ReconResult<ReconReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            report = self.reconcile(request) => report,
            _ = cancel => {
                warn!(start = %request.start_date, end = %request.end_date, "Reconciliation cancelled");
                Err(ReconError::Cancelled)
            }
        }
    }

    /// Reconciles, then renders the rows as a file.
    pub async fn export(&self, request: &ReconRequest, format: ExportFormat) -> ReconResult<ExportFile> {
        let report = self.reconcile(request).await?;
        let bytes = render(&report.rows, format, &self.export_options)?;

        info!(
            run_id = %report.run_id,
            %format,
            rows = report.rows.len(),
            bytes = bytes.len(),
            "Export rendered"
        );

        Ok(ExportFile {
            filename: format!(
                "ventes-theoriques_{}_{}.{}",
                report.period.start(),
                report.period.end(),
                format.extension()
            ),
            format,
            bytes,
            outcome: report.outcome,
        })
    }

    /// Active outlets, served from cache while fresh.
    pub async fn active_outlets(&self) -> SourceResult<Vec<String>> {
        self.outlets.get(self.source.as_ref()).await
    }

    /// Drops the cached outlet list and reloads it.
    pub async fn refresh_outlets(&self) -> SourceResult<Vec<String>> {
        self.outlets.invalidate().await;
        self.active_outlets().await
    }

    async fn run(
        &self,
        run_id: Uuid,
        period: Period,
        filter: RecordFilter,
    ) -> ReconResult<ReconReport> {
        info!(days = period.len_days(), ?filter, "Reconciliation started");

        let fetched = self.fetcher.fetch(&period.dates()).await;
        let result = reconcile_records(
            &fetched.morning,
            &fetched.evening,
            &fetched.transfers,
            &filter,
        )?;

        if !result.rejected.is_empty() {
            warn!(count = result.rejected.len(), "Records rejected during normalization");
            for reason in &result.rejected {
                debug!(%reason, "Rejected record");
            }
        }

        let stats = result.stats;
        if stats.stock_duplicates() > 0 {
            warn!(
                morning = stats.morning_duplicates,
                evening = stats.evening_duplicates,
                "Duplicate stock entries, last one kept"
            );
        }

        let outcome = ReconOutcome::classify(
            fetched.attempted,
            fetched.failures.len(),
            result.rows.len(),
        );
        let summary = ReconSummary::from_rows(&result.rows)?;

        info!(
            rows = summary.row_count,
            shortfalls = summary.shortfall_count,
            failed_fetches = fetched.failures.len(),
            ?outcome,
            "Reconciliation finished"
        );

        Ok(ReconReport {
            run_id,
            period,
            filter,
            rows: result.rows,
            summary,
            outcome,
            failures: fetched.failures,
            data_quality: DataQuality {
                rejected_records: result.rejected.len(),
                aggregation: stats,
            },
            generated_at: Utc::now(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
