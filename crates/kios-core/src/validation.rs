//! # Input Validation
//!
//! Small caller-facing checks shared by the service layer. Each helper
//! returns a `ValidationError` naming the offending field so the message can
//! be surfaced to the caller verbatim.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Rejects empty or whitespace-only required text.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Rejects zero or negative quantities and prices.
pub fn require_positive(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Canonical form for store-name uniqueness: trimmed, internal whitespace
/// collapsed, case-folded. Two stores whose names normalize identically are
/// duplicates.
pub fn normalize_store_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Rejects a backdated entry whose calendar day is after `today`.
///
/// `today` is passed in rather than read from the clock so the check is
/// deterministic under test.
pub fn reject_future_date(
    field: &str,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if date > today {
        return Err(ValidationError::FutureDate {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
