//! Sales file readers.
//!
//! One entry point, [`parse_sales_file`], dispatches on the file extension
//! and produces uniform [`RawSalesRow`]s regardless of source format. Rows
//! keep their raw field text; interpretation (numbers, timestamps, product
//! matching) happens downstream where row-level errors can be reported with
//! context.
//!
//! ## Header Aliasing
//! Different marketplaces export different header names for the same five
//! logical columns. Headers are matched case-insensitively against a fixed
//! alias table; a column none of whose aliases appear simply yields empty
//! fields, which downstream validation turns into per-row messages.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use crate::error::{IngestError, IngestResult};

// =============================================================================
// File Kind
// =============================================================================

/// Supported upload formats, detected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
}

impl FileKind {
    /// Detects the format from the file name.
    pub fn from_file_name(file_name: &str) -> IngestResult<FileKind> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileKind::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Ok(FileKind::Excel)
        } else {
            Err(IngestError::UnsupportedFormat {
                file_name: file_name.to_string(),
            })
        }
    }

    /// Stable text form for the upload-history record.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Excel => "excel",
        }
    }
}

// =============================================================================
// Raw Row
// =============================================================================

/// One data row from an upload, fields still as raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSalesRow {
    /// 2-based row number in the source file (row 1 is the header), used in
    /// every per-row message.
    pub row_number: i64,
    /// Marketplace order reference, kept for traceability only.
    pub order_ref: String,
    /// Payment timestamp as written in the file.
    pub paid_at_raw: String,
    /// The product variant label the matcher will work on.
    pub label: String,
    /// Discounted unit price, locale-formatted.
    pub price_raw: String,
    /// Quantity, locale-formatted.
    pub quantity_raw: String,
}

impl RawSalesRow {
    fn is_blank(&self) -> bool {
        self.order_ref.is_empty()
            && self.paid_at_raw.is_empty()
            && self.label.is_empty()
            && self.price_raw.is_empty()
            && self.quantity_raw.is_empty()
    }
}

// =============================================================================
// Header Aliases
// =============================================================================

// Alias order is priority order: the first alias present in the header row
// wins, mirroring how the exports themselves evolved.
const ORDER_REF_ALIASES: &[&str] = &["no. pesanan", "no pesanan", "order id"];
const PAID_AT_ALIASES: &[&str] = &[
    "waktu pembayaran dilakukan",
    "waktu pembayaran",
    "waktu",
    "time",
];
const LABEL_ALIASES: &[&str] = &["nama variasi", "nama produk", "product name", "productname"];
const PRICE_ALIASES: &[&str] = &["harga setelah diskon", "harga", "price"];
const QUANTITY_ALIASES: &[&str] = &["jumlah", "quantity", "qty"];

/// Resolved column positions for the five logical fields.
struct ColumnMap {
    order_ref: Option<usize>,
    paid_at: Option<usize>,
    label: Option<usize>,
    price: Option<usize>,
    quantity: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> ColumnMap {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        ColumnMap {
            order_ref: find(ORDER_REF_ALIASES),
            paid_at: find(PAID_AT_ALIASES),
            label: find(LABEL_ALIASES),
            price: find(PRICE_ALIASES),
            quantity: find(QUANTITY_ALIASES),
        }
    }

    fn pick<'a>(&self, fields: &'a [String], index: Option<usize>) -> &'a str {
        index
            .and_then(|i| fields.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn row(&self, row_number: i64, fields: &[String]) -> RawSalesRow {
        RawSalesRow {
            row_number,
            order_ref: self.pick(fields, self.order_ref).trim().to_string(),
            paid_at_raw: self.pick(fields, self.paid_at).trim().to_string(),
            label: self.pick(fields, self.label).trim().to_string(),
            price_raw: self.pick(fields, self.price).trim().to_string(),
            quantity_raw: self.pick(fields, self.quantity).trim().to_string(),
        }
    }
}

// =============================================================================
// Parsers
// =============================================================================

/// Parses an uploaded sales file into raw rows.
///
/// Blank rows are skipped; row numbers still count them, so messages always
/// point at the row the user sees in their spreadsheet.
pub fn parse_sales_file(file_name: &str, bytes: &[u8]) -> IngestResult<Vec<RawSalesRow>> {
    let kind = FileKind::from_file_name(file_name)?;
    let rows = match kind {
        FileKind::Csv => parse_csv(bytes)?,
        FileKind::Excel => parse_excel(bytes)?,
    };
    debug!(file_name, rows = rows.len(), format = kind.as_str(), "parsed sales file");
    Ok(rows)
}

fn parse_csv(bytes: &[u8]) -> IngestResult<Vec<RawSalesRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let columns = ColumnMap::resolve(&headers);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        let row = columns.row(index as i64 + 2, &fields);
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn parse_excel(bytes: &[u8]) -> IngestResult<Vec<RawSalesRow>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let sheet_names = workbook.sheet_names().to_vec();
    // Marketplace exports put the data on an "orders" sheet; fall back to
    // the first sheet when no name matches.
    let sheet_name = sheet_names
        .iter()
        .find(|name| name.to_lowercase().contains("order"))
        .or_else(|| sheet_names.first())
        .ok_or(IngestError::NoWorksheet)?
        .clone();

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut cells = range.rows();

    let headers: Vec<String> = match cells.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Ok(Vec::new()),
    };
    let columns = ColumnMap::resolve(&headers);

    let mut rows = Vec::new();
    for (index, cell_row) in cells.enumerate() {
        let fields: Vec<String> = cell_row.iter().map(cell_to_string).collect();
        let row = columns.row(index as i64 + 2, &fields);
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Renders one spreadsheet cell as the text a CSV export would have carried.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Quantities and prices come through as floats; render them the
            // way an Indonesian CSV export would carry them, since locale
            // parsing downstream treats a dot as a thousands separator. Whole
            // values drop the trailing ".0"; fractional values use a decimal
            // comma so "1.5" does not round-trip into 15.
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string().replace('.', ",")
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|naive| naive.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
