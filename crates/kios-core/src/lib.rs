//! # kios-core: Pure Business Logic for Kios
//!
//! This crate is the **heart** of Kios. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kios Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Caller (HTTP handlers)                      │   │
//! │  │       upload file ──► stock ops ──► dashboards                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              kios-db (services + repositories)                  │   │
//! │  │    SalesImporter ── Inventory ── AnalyticsService ── sqlx       │   │
//! │  └──────────┬──────────────────────────────────────────┬──────────┘   │
//! │             │                                          │               │
//! │  ┌──────────▼──────────────────┐   ┌───────────────────▼──────────┐   │
//! │  │   kios-ingest (file I/O)    │   │  ★ kios-core (THIS CRATE) ★  │   │
//! │  │   CSV / XLSX ──► RawRow     │   │                              │   │
//! │  └─────────────────────────────┘   │  ┌────────┐  ┌────────────┐  │   │
//! │                                    │  │pricing │  │  matching  │  │   │
//! │                                    │  │ stock  │  │ analytics  │  │   │
//! │                                    │  └────────┘  └────────────┘  │   │
//! │                                    │                              │   │
//! │                                    │  NO I/O • PURE FUNCTIONS     │   │
//! │                                    └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Store, StockLocation, Sale, ...)
//! - [`money`] - The one currency rounding rule
//! - [`error`] - Domain error types
//! - [`pricing`] - Point-in-time cost lookup over the price timeline
//! - [`matching`] - Cascading fuzzy product matcher for upload rows
//! - [`stock`] - Backward stock reconstruction from the event logs
//! - [`analytics`] - Dashboard and per-product aggregates
//! - [`validation`] - Input validation helpers
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Decimal Money**: All amounts are `rust_decimal::Decimal`, never floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod matching;
pub mod money;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kios_core::Product` instead of
// `use kios_core::types::Product`

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;
