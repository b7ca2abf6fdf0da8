//! # kios-ingest: Sales File Parsing
//!
//! Reads uploaded marketplace exports (CSV and Excel) into raw rows for the
//! import pipeline in kios-db.
//!
//! ## Pipeline Position
//! ```text
//!  upload bytes ──► FileKind ──► csv / calamine ──► header aliasing
//!                                                       │
//!                                 Vec<RawSalesRow> ◄────┘
//!                                       │
//!              kios-db SalesImporter (match, validate, commit)
//! ```
//!
//! This crate deliberately stops at raw text fields. Number and timestamp
//! interpretation live in [`locale`] and [`timeparse`] as free functions the
//! importer calls per row, so a bad value in one row never aborts the parse.
//!
//! Errors here ([`IngestError`]) are fatal for the whole upload: the file
//! itself could not be read. Everything row-shaped is a normal result.

pub mod error;
pub mod locale;
pub mod reader;
pub mod timeparse;

pub use error::{IngestError, IngestResult};
pub use locale::parse_locale_number;
pub use reader::{parse_sales_file, FileKind, RawSalesRow};
pub use timeparse::{parse_flexible_date, parse_payment_time};
