//! # Export Adapter
//!
//! Writes reconciliation rows as CSV or XLSX.
//!
//! ## Column Layout
//! ```text
//! ┌────────────┬────────┬─────────┬───────────────┬───────────────┬───────────┬───────────────────┐
//! │ Date       │ Outlet │ Product │ Morning Stock │ Evening Stock │ Transfers │ Theoretical Sales │
//! ├────────────┼────────┼─────────┼───────────────┼───────────────┼───────────┼───────────────────┤
//! │ 01/01/2025 │ Mbao   │ Boeuf   │ 10            │ 4             │ 2         │ -8   ◄ highlighted│
//! └────────────┴────────┴─────────┴───────────────┴───────────────┴───────────┴───────────────────┘
//! ```
//!
//! Exporting reads the rows and never changes them; a failed export leaves
//! the computed report untouched.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use etal_core::{render_date, validate_date_format, ConsolidatedRow, Quantity};

use crate::config::ExportSettings;
use crate::error::{ExportError, ExportResult};

/// Fixed column order.
pub const COLUMNS: [&str; 7] = [
    "Date",
    "Outlet",
    "Product",
    "Morning Stock",
    "Evening Stock",
    "Transfers",
    "Theoretical Sales",
];

// =============================================================================
// Export Format
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

// =============================================================================
// Export Options
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub date_format: String,
    pub sheet_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for ExportOptions {
    fn from(settings: &ExportSettings) -> Self {
        ExportOptions {
            date_format: settings.date_format.clone(),
            sheet_name: settings.sheet_name.clone(),
        }
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Writes rows as CSV, header first.
pub fn export_csv<W: Write>(
    rows: &[ConsolidatedRow],
    writer: W,
    options: &ExportOptions,
) -> ExportResult<()> {
    check(rows, options)?;

    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(COLUMNS)?;

    for row in rows {
        wtr.write_record([
            date_cell(row, options)?,
            row.outlet.clone(),
            row.product.clone(),
            row.morning_qty.to_string(),
            row.evening_qty.to_string(),
            row.transfer_qty.to_string(),
            row.theoretical_sales.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

// =============================================================================
// XLSX
// =============================================================================

/// Renders rows as an XLSX workbook. Shortfall cells get a red fill.
pub fn export_xlsx(rows: &[ConsolidatedRow], options: &ExportOptions) -> ExportResult<Vec<u8>> {
    check(rows, options)?;

    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_align(FormatAlign::Center);
    let number = Format::new();
    let shortfall = Format::new()
        .set_background_color(Color::RGB(0xFFC7CE))
        .set_font_color(Color::RGB(0x9C0006));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&options.sheet_name)?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, date_cell(row, options)?)?;
        sheet.write_string(r, 1, &row.outlet)?;
        sheet.write_string(r, 2, &row.product)?;
        sheet.write_number_with_format(r, 3, to_f64(row.morning_qty), &number)?;
        sheet.write_number_with_format(r, 4, to_f64(row.evening_qty), &number)?;
        sheet.write_number_with_format(r, 5, to_f64(row.transfer_qty), &number)?;

        let sales_format = if row.is_shortfall() { &shortfall } else { &number };
        sheet.write_number_with_format(r, 6, to_f64(row.theoretical_sales), sales_format)?;
    }

    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 20)?;
    sheet.set_column_width(2, 20)?;
    for col in 3..COLUMNS.len() as u16 {
        sheet.set_column_width(col, 16)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

/// Rejects an empty dataset or an unusable date format before any output
/// is produced.
fn check(rows: &[ConsolidatedRow], options: &ExportOptions) -> ExportResult<()> {
    if rows.is_empty() {
        return Err(ExportError::EmptyDataset);
    }
    validate_date_format("date_format", &options.date_format)
        .map_err(|_| ExportError::InvalidDateFormat(options.date_format.clone()))
}

fn date_cell(row: &ConsolidatedRow, options: &ExportOptions) -> ExportResult<String> {
    render_date(row.date, &options.date_format)
        .ok_or_else(|| ExportError::InvalidDateFormat(options.date_format.clone()))
}

fn to_f64(quantity: Quantity) -> f64 {
    quantity.decimal().to_f64().unwrap_or_default()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Renders rows in the requested format.
pub fn render(
    rows: &[ConsolidatedRow],
    format: ExportFormat,
    options: &ExportOptions,
) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Csv => {
            let mut buf = Vec::new();
            export_csv(rows, &mut buf, options)?;
            Ok(buf)
        }
        ExportFormat::Xlsx => export_xlsx(rows, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows() -> Vec<ConsolidatedRow> {
        vec![
            ConsolidatedRow {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                outlet: "Mbao".into(),
                product: "Boeuf".into(),
                morning_qty: Quantity::from(10),
                evening_qty: Quantity::from(4),
                transfer_qty: Quantity::from(2),
                theoretical_sales: Quantity::from(-8),
            },
            ConsolidatedRow {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                outlet: "Keur Massar, Nord".into(),
                product: "Veau".into(),
                morning_qty: Quantity::from(1),
                evening_qty: Quantity::from(6),
                transfer_qty: Quantity::zero(),
                theoretical_sales: Quantity::from(5),
            },
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
        assert_eq!(ExportFormat::Xlsx.extension(), "xlsx");
        assert!(ExportFormat::Csv.content_type().starts_with("text/csv"));
    }

    #[test]
    fn test_csv_layout() {
        let mut buf = Vec::new();
        export_csv(&rows(), &mut buf, &ExportOptions::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Date,Outlet,Product,Morning Stock,Evening Stock,Transfers,Theoretical Sales"
        );
        assert_eq!(lines[1], "01/01/2025,Mbao,Boeuf,10,4,2,-8");
        assert_eq!(lines[2], "02/01/2025,\"Keur Massar, Nord\",Veau,1,6,0,5");
    }

    #[test]
    fn test_csv_custom_date_format() {
        let options = ExportOptions {
            date_format: "%Y-%m-%d".into(),
            ..ExportOptions::default()
        };
        let bytes = render(&rows(), ExportFormat::Csv, &options).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("2025-01-01,"));
    }

    #[test]
    fn test_xlsx_is_a_zip_archive() {
        let bytes = export_xlsx(&rows(), &ExportOptions::default()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let mut buf = Vec::new();
        assert!(matches!(
            export_csv(&[], &mut buf, &ExportOptions::default()),
            Err(ExportError::EmptyDataset)
        ));
        assert!(buf.is_empty());
        assert!(matches!(
            render(&[], ExportFormat::Xlsx, &ExportOptions::default()),
            Err(ExportError::EmptyDataset)
        ));
    }

    #[test]
    fn test_time_only_date_format_is_an_error() {
        let options = ExportOptions {
            date_format: "%H:%M".into(),
            ..ExportOptions::default()
        };

        let mut buf = Vec::new();
        assert!(matches!(
            export_csv(&rows(), &mut buf, &options),
            Err(ExportError::InvalidDateFormat(f)) if f == "%H:%M"
        ));
        assert!(buf.is_empty());
        assert!(matches!(
            render(&rows(), ExportFormat::Xlsx, &options),
            Err(ExportError::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn test_export_leaves_rows_untouched() {
        let original = rows();
        let copy = original.clone();
        let _ = render(&original, ExportFormat::Xlsx, &ExportOptions::default()).unwrap();
        assert_eq!(original, copy);
    }
}
