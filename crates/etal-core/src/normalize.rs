//! # Record Normalizer
//!
//! Maps heterogeneous upstream JSON onto the canonical record shapes.
//!
//! ## Ingestion Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  stock endpoint JSON ──► normalize_stock() ────► StockRecord            │
//! │  { "Point de Vente": "Mbao", "Produit": "Boeuf", "Nombre": "2,5" }     │
//! │                                                                         │
//! │  transfer endpoint JSON ──► normalize_transfer() ──► TransferRecord     │
//! │  { "pointVente": "Mbao", "produit": "Boeuf", "quantite": 3,             │
//! │    "impact": -1 }                                                       │
//! │                                                                         │
//! │  Missing outlet/product → rejected (CoreError), never coerced          │
//! │  Missing/garbage numbers → 0                                            │
//! │  Missing/garbage date   → date the record was fetched for               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each alias list is tried in order; the first present, non-blank field wins.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::period::parse_calendar_date;
use crate::quantity::{parse_decimal, Quantity};
use crate::types::{
    RawRecord, RecordKind, StockRecord, StockSnapshot, TransferDirection, TransferRecord,
};

// =============================================================================
// Field Aliases
// =============================================================================

const DATE_FIELDS: &[&str] = &["date", "Date"];
const OUTLET_FIELDS: &[&str] = &["pointVente", "point_vente", "Point de Vente", "pointDeVente"];
const PRODUCT_FIELDS: &[&str] = &["produit", "Produit", "product"];
const COMMENT_FIELDS: &[&str] = &["commentaire", "Commentaire", "comment"];

const STOCK_QUANTITY_FIELDS: &[&str] = &["quantite", "Nombre", "nombre", "quantity"];
const STOCK_PRICE_FIELDS: &[&str] = &["prix", "PU", "Prix", "prixUnitaire"];
const STOCK_AMOUNT_FIELDS: &[&str] = &["montant", "Montant", "total", "Total"];

const TRANSFER_QUANTITY_FIELDS: &[&str] = &["quantite", "quantity", "Nombre"];
const TRANSFER_PRICE_FIELDS: &[&str] = &["prixUnitaire", "prix_unitaire", "prix", "PU"];
const TRANSFER_TOTAL_FIELDS: &[&str] = &["total", "Total", "montant"];
const IMPACT_FIELDS: &[&str] = &["impact", "Impact"];

// =============================================================================
// Field Lookup Helpers
// =============================================================================

/// First alias whose value is present and not null.
fn first_value<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

/// First alias holding non-blank text. Numbers are accepted and rendered.
fn first_text(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().filter_map(|name| obj.get(*name)).find_map(|v| {
        let text = match v {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

fn decimal_field(obj: &Map<String, Value>, aliases: &[&str]) -> Decimal {
    Quantity::parse_lenient(first_value(obj, aliases)).decimal()
}

fn required_text(
    obj: &Map<String, Value>,
    aliases: &[&str],
    kind: RecordKind,
    field: &'static str,
) -> CoreResult<String> {
    first_text(obj, aliases).ok_or(CoreError::MissingField { kind, field })
}

/// Resolves the record date: the record's own date when readable, otherwise
/// the fallback.
fn resolve_date(
    obj: &Map<String, Value>,
    kind: RecordKind,
    fallback: Option<NaiveDate>,
) -> CoreResult<NaiveDate> {
    let raw = first_text(obj, DATE_FIELDS);

    if let Some(date) = raw
        .as_deref()
        .and_then(|s| parse_calendar_date("date", s).ok())
    {
        return Ok(date);
    }

    match (fallback, raw) {
        (Some(date), _) => Ok(date),
        (None, Some(value)) => Err(CoreError::InvalidRecordDate { kind, value }),
        (None, None) => Err(CoreError::MissingField {
            kind,
            field: "date",
        }),
    }
}

fn as_object(value: &Value, kind: RecordKind) -> CoreResult<&Map<String, Value>> {
    value.as_object().ok_or(CoreError::NotAnObject { kind })
}

// =============================================================================
// Adapters
// =============================================================================

/// Normalizes one morning or evening stock record.
pub fn normalize_stock(
    value: &Value,
    snapshot: StockSnapshot,
    fallback_date: Option<NaiveDate>,
) -> CoreResult<StockRecord> {
    let kind = RecordKind::from(snapshot);
    let obj = as_object(value, kind)?;

    Ok(StockRecord {
        date: resolve_date(obj, kind, fallback_date)?,
        outlet: required_text(obj, OUTLET_FIELDS, kind, "outlet")?,
        product: required_text(obj, PRODUCT_FIELDS, kind, "product")?,
        quantity: Quantity::parse_lenient(first_value(obj, STOCK_QUANTITY_FIELDS)),
        unit_price: decimal_field(obj, STOCK_PRICE_FIELDS),
        amount: decimal_field(obj, STOCK_AMOUNT_FIELDS),
        comment: first_text(obj, COMMENT_FIELDS).unwrap_or_default(),
    })
}

/// Normalizes one transfer record.
///
/// Direction comes from the signed `impact` field; a missing or unreadable
/// impact counts as inbound.
pub fn normalize_transfer(value: &Value, fallback_date: Option<NaiveDate>) -> CoreResult<TransferRecord> {
    let kind = RecordKind::Transfers;
    let obj = as_object(value, kind)?;

    let direction = transfer_direction(first_value(obj, IMPACT_FIELDS));

    Ok(TransferRecord {
        date: resolve_date(obj, kind, fallback_date)?,
        outlet: required_text(obj, OUTLET_FIELDS, kind, "outlet")?,
        product: required_text(obj, PRODUCT_FIELDS, kind, "product")?,
        direction,
        quantity: Quantity::parse_lenient(first_value(obj, TRANSFER_QUANTITY_FIELDS)),
        unit_price: decimal_field(obj, TRANSFER_PRICE_FIELDS),
        total: decimal_field(obj, TRANSFER_TOTAL_FIELDS),
        comment: first_text(obj, COMMENT_FIELDS).unwrap_or_default(),
    })
}

/// Reads the `impact` field: a signed number, a numeric string, or a bare
/// `"-"` / `"+"` sign.
fn transfer_direction(impact: Option<&Value>) -> TransferDirection {
    let decimal = match impact {
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) => match s.trim() {
            "-" => return TransferDirection::Out,
            "+" => return TransferDirection::In,
            other => parse_decimal(other),
        },
        _ => None,
    };
    decimal.map(TransferDirection::from_impact).unwrap_or_default()
}

// =============================================================================
// Batches
// =============================================================================

/// Outcome of normalizing one collection: accepted records plus the reason
/// each rejected record was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub rejected: Vec<CoreError>,
}

impl<T> Normalized<T> {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Normalized {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> FromIterator<CoreResult<T>> for Normalized<T> {
    fn from_iter<I: IntoIterator<Item = CoreResult<T>>>(iter: I) -> Self {
        let mut out = Normalized::default();
        for item in iter {
            match item {
                Ok(record) => out.records.push(record),
                Err(err) => out.rejected.push(err),
            }
        }
        out
    }
}

/// Normalizes a stock collection, using each record's fetch date as fallback.
pub fn normalize_stock_batch(raw: &[RawRecord], snapshot: StockSnapshot) -> Normalized<StockRecord> {
    raw.iter()
        .map(|r| normalize_stock(&r.value, snapshot, Some(r.fetched_for)))
        .collect()
}

/// Normalizes a transfer collection, using each record's fetch date as fallback.
pub fn normalize_transfer_batch(raw: &[RawRecord]) -> Normalized<TransferRecord> {
    raw.iter()
        .map(|r| normalize_transfer(&r.value, Some(r.fetched_for)))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
