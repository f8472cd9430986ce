//! Spreadsheet export of batch results.
//!
//! The workbook has two sheets: one row per line item, and one row per
//! document preview. Codes are written as text cells so leading zeros and
//! apostrophes survive.

use std::path::Path;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::error::ExportError;
use crate::models::batch::{truncate_preview, BatchResult};
use crate::models::config::ExportConfig;

/// Column headers of the line item sheet.
pub const ITEM_HEADERS: [&str; 4] = ["item_code", "secondary_code", "quantity", "source_document"];

/// Column headers of the preview sheet.
pub const TEXT_HEADERS: [&str; 2] = ["source_document", "preview_text"];

/// Largest string a worksheet cell accepts.
const MAX_CELL_CHARS: usize = 32_000;

/// Build the workbook in memory and return the `.xlsx` bytes.
pub fn build_workbook(result: &BatchResult, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let text = Format::new().set_num_format("@");

    let items = workbook.add_worksheet();
    items.set_name(&config.items_sheet)?;
    write_headers(items, &ITEM_HEADERS, &header)?;
    let mut rows = 0u32;
    for (row, item) in (1u32..).zip(result.line_items()) {
        items.write_string_with_format(row, 0, &item.item_code, &text)?;
        items.write_string_with_format(row, 1, item.secondary_code.as_str(), &text)?;
        match item.quantity.to_f64() {
            Some(quantity) => items.write_number(row, 2, quantity)?,
            None => items.write_string(row, 2, item.quantity.to_string())?,
        };
        items.write_string(row, 3, &item.source_document)?;
        rows = row;
    }
    items.set_column_width(0, 18.0)?;
    items.set_column_width(1, 18.0)?;
    items.set_column_width(3, 32.0)?;
    items.set_freeze_panes(1, 0)?;

    let texts = workbook.add_worksheet();
    texts.set_name(&config.texts_sheet)?;
    write_headers(texts, &TEXT_HEADERS, &header)?;
    for (row, preview) in (1u32..).zip(result.previews()) {
        texts.write_string(row, 0, &preview.source_document)?;
        texts.write_string(row, 1, truncate_preview(&preview.text, MAX_CELL_CHARS))?;
    }
    texts.set_column_width(0, 32.0)?;
    texts.set_column_width(1, 100.0)?;

    let bytes = workbook.save_to_buffer()?;
    info!("Built workbook with {} item rows ({} bytes)", rows, bytes.len());
    Ok(bytes)
}

/// Build the workbook and write it to `path`.
pub fn write_workbook(
    result: &BatchResult,
    config: &ExportConfig,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let bytes = build_workbook(result, config)?;
    std::fs::write(path.as_ref(), bytes)?;
    info!("Wrote {}", path.as_ref().display());
    Ok(())
}

/// Timestamped default file name, e.g. `hasil_ekstraksi_faktur_20240131_142500.xlsx`.
pub fn default_file_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}_{}.xlsx", prefix, now.format("%Y%m%d_%H%M%S"))
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, name) in (0u16..).zip(headers) {
        sheet.write_string_with_format(0, col, *name, format)?;
    }
    Ok(())
}
