//! # kios-db: Persistence and Services for the Kios Inventory Ledger
//!
//! This crate provides database access and the service layer for the kios
//! inventory system. It uses SQLite for local storage with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kios Data Flow                                   │
//! │                                                                         │
//! │  Caller (HTTP handler / CLI)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kios-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   Services                    Repositories                      │   │
//! │  │   ┌───────────────┐          ┌───────────────┐                 │   │
//! │  │   │ SalesImporter │          │ ProductRepo   │                 │   │
//! │  │   │ Inventory     │─────────►│ StoreRepo     │                 │   │
//! │  │   │ Analytics     │          │ StockRepo     │                 │   │
//! │  │   └───────┬───────┘          │ SaleRepo      │                 │   │
//! │  │           │                  │ UploadRepo    │                 │   │
//! │  │           │                  └───────┬───────┘                 │   │
//! │  │           ▼                          ▼                          │   │
//! │  │   kios-core (pure rules)      SqlitePool (pool.rs)             │   │
//! │  │   kios-ingest (file parsing)  + embedded migrations            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - Repository implementations (product, store, stock, ...)
//! - [`import`] - The sales import pipeline
//! - [`inventory`] - Stock and pricing operations
//! - [`analytics`] - Read-side report loaders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kios_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/kios.db")).await?;
//!
//! let outcome = db.importer().import("Order.all.csv", &bytes, &store_id).await?;
//! let dashboard = db.analytics().dashboard(None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod import;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::{ReductionOutcome, StockRepository};
pub use repository::store::StoreRepository;
pub use repository::upload::UploadRepository;

// Service re-exports
pub use analytics::{AnalyticsService, DailyMovement};
pub use import::{ImportOutcome, SalesImporter};
pub use inventory::Inventory;
