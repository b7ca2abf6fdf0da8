//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Service (SalesImporter / Inventory / AnalyticsService)                │
//! │       │                                                                 │
//! │       │  db.stock().quantity_at(product, place, store)                 │
//! │       ▼                                                                 │
//! │  StockRepository                                                       │
//! │  ├── quantity_at(...)                                                  │
//! │  ├── apply_addition(...)                                               │
//! │  └── apply_transfer(...)                                               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                        │
//! │  • Easy to test against an in-memory pool                              │
//! │  • Row↔domain conversion lives next to the queries                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Column Conventions
//! SQLite has no native decimal or timezone-aware timestamp type, so:
//! - decimals are TEXT, converted via [`parse_decimal`]
//! - timestamps are RFC 3339 TEXT, converted via [`parse_timestamp`]
//! - enums are TEXT in their `Display`/`FromStr` form
//! - the pooled store sentinel is `''` in the database, `None` in domain
//!   types ([`store_key`] / [`store_opt`])
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and the price timeline
//! - [`store::StoreRepository`] - Stores with normalized-name uniqueness
//! - [`stock::StockRepository`] - Stock locations and the three event logs
//! - [`sale::SaleRepository`] - Sale batch insert and scans
//! - [`upload::UploadRepository`] - Undetected products + upload history

pub mod product;
pub mod sale;
pub mod stock;
pub mod store;
pub mod upload;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Parses a decimal TEXT column.
pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::decode(column, value))
}

/// Parses an RFC 3339 timestamp TEXT column.
pub(crate) fn parse_timestamp(column: &str, value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbError::decode(column, value))
}

/// Parses a `YYYY-MM-DD` date TEXT column.
pub(crate) fn parse_date(column: &str, value: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DbError::decode(column, value))
}

/// Parses an enum TEXT column via its `FromStr` impl.
pub(crate) fn parse_enum<T: FromStr>(column: &str, value: &str) -> DbResult<T> {
    value.parse().map_err(|_| DbError::decode(column, value))
}

/// Maps the domain's optional store id to the stored compound-key sentinel.
pub(crate) fn store_key(store_id: Option<&str>) -> &str {
    store_id.unwrap_or("")
}

/// Maps the stored sentinel back to the domain's optional store id.
pub(crate) fn store_opt(stored: String) -> Option<String> {
    if stored.is_empty() {
        None
    } else {
        Some(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_sentinel_round_trip() {
        assert_eq!(store_key(None), "");
        assert_eq!(store_key(Some("st-1")), "st-1");
        assert_eq!(store_opt(String::new()), None);
        assert_eq!(store_opt("st-1".to_string()), Some("st-1".to_string()));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(parse_decimal("quantity", "3.5").is_ok());
        let err = parse_decimal("quantity", "three").unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("recorded_at", "2025-06-01T10:00:00+00:00").is_ok());
        assert!(parse_timestamp("recorded_at", "2025-06-01 10:00").is_err());
    }
}
