//! Payment-time parsing.
//!
//! Exports carry the payment instant in one of a handful of shapes:
//!
//! ```text
//! 2025-12-05 14:20        2025-12-05T14:20:00
//! 05/12/2025 14:20        05/12/2025
//! 2025-12-05
//! ```
//!
//! `DD/MM/YYYY` ordering throughout (Indonesian exports). An unparseable
//! value yields `None`; the import pipeline falls back to the upload instant
//! rather than rejecting the row, since the rest of the row is still usable.

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses a payment timestamp; date-only values resolve to midnight.
pub fn parse_payment_time(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    parse_flexible_date(trimmed).and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parses a bare calendar day in either `YYYY-MM-DD` or `DD/MM/YYYY` form.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

// =============================================================================
// Unit Tests
// =============================================================================
