//! # StockSource Trait
//!
//! The seam between the reconciliation service and the data API.
//!
//! ## Consumed Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  morning_stock(date)  → [ record, ... ]                                 │
//! │  evening_stock(date)  → [ record, ... ]                                 │
//! │  transfers(date)      → { success, transfers: [ record, ... ] }        │
//! │  active_outlets()     → [ "Mbao", ... ] or [ { nom: "Mbao" }, ... ]    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations return records as raw JSON; the envelope helpers below
//! are shared so every implementation unwraps responses the same way.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use etal_core::RecordKind;
use serde_json::Value;

use crate::error::{SourceError, SourceResult};

// =============================================================================
// Trait
// =============================================================================

/// Read access to the external data API.
#[async_trait]
pub trait StockSource: Send + Sync {
    /// Morning stock records for one date.
    async fn morning_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>>;

    /// Evening stock records for one date.
    async fn evening_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>>;

    /// Transfer records for one date, already unwrapped from the envelope.
    async fn transfers(&self, date: NaiveDate) -> SourceResult<Vec<Value>>;

    /// Names of the currently active outlets.
    async fn active_outlets(&self) -> SourceResult<Vec<String>>;

    /// Dispatches on the record kind.
    async fn fetch(&self, kind: RecordKind, date: NaiveDate) -> SourceResult<Vec<Value>> {
        match kind {
            RecordKind::MorningStock => self.morning_stock(date).await,
            RecordKind::EveningStock => self.evening_stock(date).await,
            RecordKind::Transfers => self.transfers(date).await,
        }
    }
}

#[async_trait]
impl<S: StockSource + ?Sized> StockSource for Arc<S> {
    async fn morning_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        (**self).morning_stock(date).await
    }

    async fn evening_stock(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        (**self).evening_stock(date).await
    }

    async fn transfers(&self, date: NaiveDate) -> SourceResult<Vec<Value>> {
        (**self).transfers(date).await
    }

    async fn active_outlets(&self) -> SourceResult<Vec<String>> {
        (**self).active_outlets().await
    }
}

// =============================================================================
// Envelope Helpers
// =============================================================================

/// Unwraps a stock endpoint body.
///
/// Accepts a bare array, `null` (no records), or an object carrying the
/// array under `data`.
pub fn parse_record_list(body: Value) -> SourceResult<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(SourceError::InvalidResponse(format!(
                "expected a record list under 'data', got {}",
                json_type(&other)
            ))),
        },
        other => Err(SourceError::InvalidResponse(format!(
            "expected a record list, got {}",
            json_type(&other)
        ))),
    }
}

/// Unwraps the transfer endpoint's `{ success, transfers }` envelope.
///
/// `success: false` becomes [`SourceError::Rejected`] carrying the upstream
/// `message` (or `error`) text. A missing `transfers` field means no
/// transfers. A bare array is accepted as-is.
pub fn parse_transfer_envelope(body: Value) -> SourceResult<Vec<Value>> {
    let mut obj = match body {
        Value::Object(obj) => obj,
        Value::Array(records) => return Ok(records),
        other => {
            return Err(SourceError::InvalidResponse(format!(
                "expected a transfer envelope, got {}",
                json_type(&other)
            )))
        }
    };

    if obj.get("success").and_then(Value::as_bool) == Some(false) {
        let reason = ["message", "error"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .unwrap_or("no reason given")
            .to_string();
        return Err(SourceError::Rejected(reason));
    }

    match obj.remove("transfers") {
        Some(Value::Array(records)) => Ok(records),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(SourceError::InvalidResponse(format!(
            "expected 'transfers' to be a list, got {}",
            json_type(&other)
        ))),
    }
}

/// Reads the active-outlet list.
///
/// Entries may be plain strings or objects with a `nom` or `name` field.
/// Blank names are skipped and duplicates dropped, keeping upstream order.
pub fn parse_outlets(body: Value) -> SourceResult<Vec<String>> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => match ["outlets", "pointsVente", "data"]
            .iter()
            .find_map(|k| obj.remove(*k))
        {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(SourceError::InvalidResponse(
                    "outlet envelope has no outlet list".to_string(),
                ))
            }
        },
        other => {
            return Err(SourceError::InvalidResponse(format!(
                "expected an outlet list, got {}",
                json_type(&other)
            )))
        }
    };

    let mut outlets: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = match &entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => ["nom", "name"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str)),
            _ => None,
        };
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            if !outlets.iter().any(|o| o == name) {
                outlets.push(name.to_string());
            }
        }
    }
    Ok(outlets)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
