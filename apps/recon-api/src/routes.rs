//! # HTTP Routes
//!
//! ```text
//! GET  /health                        → "OK"
//! GET  /api/reconciliation            → ReconReport (JSON)
//!        ?startDate&endDate[&outlet][&product]
//! GET  /api/reconciliation/export     → CSV / XLSX download
//!        ?startDate&endDate[&outlet][&product][&format=csv|xlsx]
//! GET  /api/outlets                   → { outlets: [...] } (cached)
//! POST /api/outlets/refresh           → { outlets: [...] } (cache dropped)
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use etal_recon::{ExportFormat, ReconError, ReconReport, ReconRequest, ReconciliationService};
use etal_source::StockSource;

use crate::error::ApiError;

// =============================================================================
// State
// =============================================================================

/// Shared application state.
pub struct AppState<S> {
    pub service: Arc<ReconciliationService<S>>,
    /// Reconciliations running longer than this are abandoned.
    pub request_timeout: Duration,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            service: self.service.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<S: StockSource> AppState<S> {
    pub fn new(service: ReconciliationService<S>, request_timeout: Duration) -> Self {
        AppState {
            service: Arc::new(service),
            request_timeout,
        }
    }
}

/// Builds the application router.
pub fn router<S: StockSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/reconciliation", get(reconcile_handler::<S>))
        .route("/api/reconciliation/export", get(export_handler::<S>))
        .route("/api/outlets", get(outlets_handler::<S>))
        .route("/api/outlets/refresh", post(refresh_outlets_handler::<S>))
        .with_state(state)
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(flatten)]
    request: ReconRequest,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutletsResponse {
    pub outlets: Vec<String>,
}

fn query_error(rejection: QueryRejection) -> ApiError {
    ApiError::validation(rejection.body_text())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn reconcile_handler<S: StockSource + 'static>(
    State(state): State<AppState<S>>,
    query: Result<Query<ReconRequest>, QueryRejection>,
) -> Result<Json<ReconReport>, ApiError> {
    let Query(request) = query.map_err(query_error)?;
    debug!(?request, "Reconciliation requested");

    let report = state
        .service
        .reconcile_until(&request, tokio::time::sleep(state.request_timeout))
        .await?;

    Ok(Json(report))
}

async fn export_handler<S: StockSource + 'static>(
    State(state): State<AppState<S>>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(ExportQuery { request, format }) = query.map_err(query_error)?;
    let format = match format.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<ExportFormat>()?,
        _ => ExportFormat::default(),
    };
    debug!(?request, %format, "Export requested");

    let file = tokio::time::timeout(state.request_timeout, state.service.export(&request, format))
        .await
        .map_err(|_| ReconError::Cancelled)??;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

async fn outlets_handler<S: StockSource + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<OutletsResponse>, ApiError> {
    let outlets = state.service.active_outlets().await?;
    Ok(Json(OutletsResponse { outlets }))
}

async fn refresh_outlets_handler<S: StockSource + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<OutletsResponse>, ApiError> {
    let outlets = state.service.refresh_outlets().await?;
    Ok(Json(OutletsResponse { outlets }))
}

// =============================================================================
// Unit Tests
// =============================================================================
