//! # HTTP Data API Client
//!
//! [`HttpStockSource`] talks to the data API over reqwest.
//!
//! ## Request Shape
//! ```text
//! GET {base_url}/{endpoint}?date=<date formatted with date_format>
//! Authorization: Bearer <token>        (only when a token is configured)
//! ```
//!
//! ## Status Mapping
//! ```text
//! 2xx        → body decoded as JSON
//! 400        → BadRequest
//! 401        → Unauthorized
//! 403        → Forbidden
//! 404        → NotFound
//! other      → Upstream { status, body }   (retryable when 5xx / 429)
//! timeout    → Timeout
//! connect    → ConnectionFailed
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use etal_core::{render_date, validate_date_format};

use crate::error::{SourceError, SourceResult};
use crate::source::{parse_outlets, parse_record_list, parse_transfer_envelope, StockSource};

// =============================================================================
// Configuration
// =============================================================================

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub morning_stock: String,
    pub evening_stock: String,
    pub transfers: String,
    pub outlets: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            morning_stock: "api/stock/matin".to_string(),
            evening_stock: "api/stock/soir".to_string(),
            transfers: "api/transferts".to_string(),
            outlets: "api/points-vente".to_string(),
        }
    }
}

/// Data API client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Bearer token; `None` sends no Authorization header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// chrono format used for the `date` query parameter.
    pub date_format: String,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
            token: None,
            date_format: "%Y-%m-%d".to_string(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Checks the base URL, timeout and date format.
    pub fn validate(&self) -> SourceResult<Url> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl(format!(
                "'{}' must use http or https",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(SourceError::InvalidConfig(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        validate_date_format("date_format", &self.date_format)
            .map_err(|e| SourceError::InvalidConfig(e.to_string()))?;

        Ok(url)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Production [`StockSource`] backed by the HTTP data API.
#[derive(Debug, Clone)]
pub struct HttpStockSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    date_format: String,
    endpoints: Endpoints,
}

impl HttpStockSource {
    /// Creates a client from validated configuration.
    pub fn new(config: &ClientConfig) -> SourceResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            timeout_secs: config.timeout_secs,
            date_format: config.date_format.clone(),
            endpoints: config.endpoints.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Renders a date for the `date` query parameter.
    ///
    /// The format is checked in [`ClientConfig::validate`]; ISO is the
    /// fallback should it still fail to render.
    pub fn format_date(&self, date: NaiveDate) -> String {
        render_date(date, &self.date_format).unwrap_or_else(|| date.to_string())
    }

    /// Makes a GET request and decodes the JSON body.
    async fn get(&self, endpoint: &str, date: Option<NaiveDate>) -> SourceResult<Value> {
        let url = self.url(endpoint);
        let mut request = self.client.get(&url);

        if let Some(date) = date {
            request = request.query(&[("date", self.format_date(date))]);
        }

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!(url = %url, date = ?date, "Data API request");

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        Self::handle_response(response).await
    }

    /// Maps the HTTP status onto a typed error, then decodes the body.
    async fn handle_response(response: reqwest::Response) -> SourceResult<Value> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED => Err(SourceError::Unauthorized),
                StatusCode::FORBIDDEN => Err(SourceError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(SourceError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(SourceError::BadRequest(text)),
                _ => Err(SourceError::Upstream {
                    status: status.as_u16(),
                    body: text,
                }),
            };
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout_secs)
        } else if err.is_connect() || err.is_request() {
            SourceError::ConnectionFailed(err.to_string())
        } else {
            SourceError::Internal(err.to_string())
        }
    }
}

#[async_trait]
impl StockSource for HttpStockSource {
    async fn morning_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        let body = self.get(&self.endpoints.morning_stock, Some(date)).await?;
        parse_record_list(body)
    }

    async fn evening_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        let body = self.get(&self.endpoints.evening_stock, Some(date)).await?;
        parse_record_list(body)
    }

    async fn transfers(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        let body = self.get(&self.endpoints.transfers, Some(date)).await?;
        parse_transfer_envelope(body)
    }

    async fn active_outlets(&self) -> SourceResult<Vec<String>> {
        let body = self.get(&self.endpoints.outlets, None).await?;
        parse_outlets(body)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn source_for(server: &MockServer) -> HttpStockSource {
        HttpStockSource::new(&ClientConfig::with_base_url(server.base_url())).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(matches!(
            ClientConfig::with_base_url("not a url").validate(),
            Err(SourceError::InvalidUrl(_))
        ));
        assert!(matches!(
            ClientConfig::with_base_url("ftp://example.com").validate(),
            Err(SourceError::InvalidUrl(_))
        ));

        let config = ClientConfig {
            timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(SourceError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_unrenderable_date_format() {
        for format in ["", "%H:%M", "%Q"] {
            let config = ClientConfig {
                date_format: format.to_string(),
                ..ClientConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(SourceError::InvalidConfig(_))),
                "format {:?} should be rejected",
                format
            );
            assert!(HttpStockSource::new(&config).is_err());
        }
    }

    #[test]
    fn test_config_deserializes_partial_toml_like_json() {
        let config: ClientConfig =
            serde_json::from_value(json!({ "base_url": "https://api.example.com" })).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_url_joining_and_date_format() {
        let mut config = ClientConfig::with_base_url("http://localhost:3000/");
        config.date_format = "%d/%m/%Y".to_string();
        let source = HttpStockSource::new(&config).unwrap();
        assert_eq!(source.url("/api/stock/matin"), "http://localhost:3000/api/stock/matin");
        assert_eq!(source.format_date(day(3)), "03/01/2025");
    }

    #[tokio::test]
    async fn test_morning_stock_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/stock/matin")
                    .query_param("date", "2025-01-03");
                then.status(200)
                    .json_body(json!([{ "pointVente": "Mbao", "produit": "Boeuf", "quantite": 4 }]));
            })
            .await;

        let records = source_for(&server).morning_stock(day(3)).await.unwrap();
        assert_eq!(records.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/stock/soir")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!([]));
            })
            .await;

        let config = ClientConfig {
            token: Some("secret".to_string()),
            ..ClientConfig::with_base_url(server.base_url())
        };
        let source = HttpStockSource::new(&config).unwrap();
        assert!(source.evening_stock(day(1)).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transfers_envelope_unwrapped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/transferts");
                then.status(200).json_body(json!({
                    "success": true,
                    "transfers": [{ "produit": "Boeuf", "impact": -1 }, { "produit": "Veau" }]
                }));
            })
            .await;

        let records = source_for(&server).transfers(day(1)).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_transfers_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/transferts");
                then.status(200)
                    .json_body(json!({ "success": false, "message": "maintenance" }));
            })
            .await;

        let err = source_for(&server).transfers(day(1)).await.unwrap_err();
        assert_eq!(err, SourceError::Rejected("maintenance".into()));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/stock/matin");
                then.status(401);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/stock/soir");
                then.status(503).body("down");
            })
            .await;

        let source = source_for(&server);
        assert_eq!(source.morning_stock(day(1)).await.unwrap_err(), SourceError::Unauthorized);

        let err = source.evening_stock(day(1)).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::Upstream {
                status: 503,
                body: "down".into()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/stock/matin");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let err = source_for(&server).morning_stock(day(1)).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_active_outlets() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/points-vente");
                then.status(200)
                    .json_body(json!([{ "nom": "Mbao" }, { "nom": "Keur Massar" }]));
            })
            .await;

        let outlets = source_for(&server).active_outlets().await.unwrap();
        assert_eq!(outlets, vec!["Mbao", "Keur Massar"]);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_failure() {
        // Port 9 (discard) is closed on any sane test host
        let source = HttpStockSource::new(&ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap();
        let err = source.morning_stock(day(1)).await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err:?}");
    }
}
