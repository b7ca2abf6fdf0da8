//! # Sales Import Pipeline
//!
//! Turns an uploaded marketplace export into committed sales, stock
//! decrements, and diagnostics.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  import(file_name, bytes, store_id)                                     │
//! │                                                                         │
//! │  1. Parse      kios-ingest; unreadable file is fatal for the upload    │
//! │  2. Normalize  per row: locale numbers, payment time (fallback: now)   │
//! │  3. Match      fuzzy matcher vs full catalog; misses become            │
//! │                UndetectedProduct rows and are skipped                  │
//! │  4. Validate   Σ required qty per product vs the pooled location       │
//! │                (online store ⇒ warehouse, offline ⇒ shop floor);       │
//! │                ANY shortfall rejects the WHOLE batch                   │
//! │  5. Commit     one transaction: decrement quantities (floored),        │
//! │                batch-insert sales, refresh latest selling prices       │
//! │  6. Record     exactly one SalesUploadHistory row, success or not      │
//! │                                                                         │
//! │  Row-level problems accumulate into errors[]; they never abort the     │
//! │  batch. The stock gate is the only all-or-nothing failure, and it      │
//! │  fires only after every row is parsed and matched so the caller gets   │
//! │  the complete shortfall report in one pass.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Imports are not idempotent: resubmitting the same file double-counts.
//! Deduplication is the caller's concern.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, ServiceResult};
use crate::pool::Database;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;
use kios_core::matching::ProductMatcher;
use kios_core::money::round_currency;
use kios_core::{CoreError, Product, Sale, StockPlace, SalesUploadHistory, StoreType};
use kios_ingest::{parse_locale_number, parse_payment_time, parse_sales_file, FileKind, RawSalesRow};

// =============================================================================
// Outcome
// =============================================================================

/// What one upload attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Sales committed.
    pub imported: i64,
    /// Rows not committed (bad fields, unmatched names, or the whole batch
    /// when the stock gate rejects it).
    pub skipped: i64,
    /// Data rows seen in the file.
    pub total_rows: i64,
    /// Per-row messages plus any stock-gate shortfalls.
    pub errors: Vec<String>,
}

impl ImportOutcome {
    /// True when the stock gate or row errors prevented every commit.
    pub fn nothing_imported(&self) -> bool {
        self.imported == 0
    }
}

// =============================================================================
// Importer
// =============================================================================

/// The sales import service.
///
/// ## Usage
/// ```rust,ignore
/// let outcome = db.importer().import("Order.all.csv", &bytes, &store_id).await?;
/// println!("{} imported, {} skipped", outcome.imported, outcome.skipped);
/// ```
pub struct SalesImporter {
    db: Database,
    matcher: ProductMatcher,
}

/// One row that survived normalization and matching.
struct AcceptedRow {
    sale: Sale,
}

impl SalesImporter {
    /// Creates the importer with the standard matcher cascade.
    pub fn new(db: Database) -> Self {
        SalesImporter {
            db,
            matcher: ProductMatcher::new(),
        }
    }

    /// Runs the full pipeline for one uploaded file.
    ///
    /// ## Errors
    /// * unknown `store_id` - `NotFound`, nothing recorded
    /// * unreadable file - `IngestError`, after recording a history row
    ///
    /// A rejected batch (stock gate) is NOT an `Err`: the outcome comes back
    /// with `imported == 0` and the shortfall messages in `errors`.
    pub async fn import(
        &self,
        file_name: &str,
        bytes: &[u8],
        store_id: &str,
    ) -> ServiceResult<ImportOutcome> {
        let store = self.db.stores().get(store_id).await?;
        let file_type = FileKind::from_file_name(file_name)
            .map(|k| k.as_str())
            .unwrap_or("unknown");

        info!(file_name, store = %store.name, "Starting sales import");

        let rows = match parse_sales_file(file_name, bytes) {
            Ok(rows) => rows,
            Err(err) => {
                // The file itself was unreadable; the attempt is still
                // recorded before the error propagates.
                let outcome = ImportOutcome {
                    imported: 0,
                    skipped: 0,
                    total_rows: 0,
                    errors: vec![err.to_string()],
                };
                self.record_history(&store.id, &store.name, file_name, file_type, &outcome)
                    .await?;
                return Err(err.into());
            }
        };

        let catalog = self.db.products().list().await?;
        let total_rows = rows.len() as i64;
        let mut errors: Vec<String> = Vec::new();
        let mut accepted: Vec<AcceptedRow> = Vec::new();

        for row in &rows {
            match self.process_row(row, &catalog, &store.id, &store.name, &mut errors).await? {
                Some(sale) => accepted.push(AcceptedRow { sale }),
                None => {}
            }
        }

        // Online stores ship from the warehouse pool; offline stores sell off
        // the shared shop floor.
        let pooled_place = match store.store_type {
            StoreType::Online => StockPlace::Warehouse,
            StoreType::Offline => StockPlace::ShopFloor,
        };

        // All-or-nothing stock gate: every product's full shortfall is
        // reported, not just the first.
        let mut required: HashMap<String, (String, Decimal)> = HashMap::new();
        for row in &accepted {
            let entry = required
                .entry(row.sale.product_id.clone())
                .or_insert_with(|| (row.sale.product_name.clone(), Decimal::ZERO));
            entry.1 += row.sale.quantity;
        }

        let mut shortfalls: Vec<String> = Vec::new();
        for (product_id, (product_name, needed)) in &required {
            let available = self
                .db
                .stock()
                .quantity_at(product_id, pooled_place, None)
                .await?;
            if *needed > available {
                shortfalls.push(
                    CoreError::InsufficientStock {
                        product: product_name.clone(),
                        available,
                        requested: *needed,
                    }
                    .to_string(),
                );
            }
        }

        if !shortfalls.is_empty() {
            warn!(
                file_name,
                shortfalls = shortfalls.len(),
                "Import rejected at stock gate"
            );
            errors.extend(shortfalls);
            let outcome = ImportOutcome {
                imported: 0,
                skipped: total_rows,
                total_rows,
                errors,
            };
            self.record_history(&store.id, &store.name, file_name, file_type, &outcome)
                .await?;
            return Ok(outcome);
        }

        // Commit phase: quantities and sales move together or not at all.
        if !accepted.is_empty() {
            let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

            for (product_id, (_, needed)) in &required {
                let current =
                    StockRepository::quantity_in_tx(&mut tx, product_id, pooled_place, None)
                        .await?;
                StockRepository::set_quantity_in_tx(
                    &mut tx,
                    product_id,
                    pooled_place,
                    None,
                    (current - *needed).max(Decimal::ZERO),
                )
                .await?;
            }

            for row in &accepted {
                SaleRepository::insert_in_tx(&mut tx, &row.sale).await?;
            }

            // Refresh each product's latest observed selling price from the
            // newest sale in this batch.
            let mut latest: HashMap<&str, &Sale> = HashMap::new();
            for row in &accepted {
                let entry = latest.entry(row.sale.product_id.as_str()).or_insert(&row.sale);
                if row.sale.recorded_at > entry.recorded_at {
                    *entry = &row.sale;
                }
            }
            for (product_id, sale) in latest {
                sqlx::query("UPDATE products SET selling_price = ?2 WHERE id = ?1")
                    .bind(product_id)
                    .bind(sale.unit_price.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::from)?;
            }

            tx.commit().await.map_err(DbError::from)?;
        }

        let outcome = ImportOutcome {
            imported: accepted.len() as i64,
            skipped: total_rows - accepted.len() as i64,
            total_rows,
            errors,
        };

        info!(
            imported = outcome.imported,
            skipped = outcome.skipped,
            "Sales import committed"
        );

        self.record_history(&store.id, &store.name, file_name, file_type, &outcome)
            .await?;
        Ok(outcome)
    }

    /// Normalizes and matches one row. Returns the sale to commit, or None
    /// when the row is skipped (with its message already in `errors`).
    async fn process_row(
        &self,
        row: &RawSalesRow,
        catalog: &[Product],
        store_id: &str,
        store_name: &str,
        errors: &mut Vec<String>,
    ) -> ServiceResult<Option<Sale>> {
        if row.label.is_empty() || row.quantity_raw.is_empty() {
            errors.push(format!(
                "Baris {}: Nama produk atau jumlah tidak boleh kosong",
                row.row_number
            ));
            return Ok(None);
        }

        let product = match self.matcher.find_match(&row.label, catalog) {
            Some(product) => product,
            None => {
                errors.push(format!(
                    "Baris {}: Produk \"{}\" tidak ditemukan",
                    row.row_number, row.label
                ));
                // Persisted immediately, outside the commit transaction:
                // the diagnostic survives even if the batch is rejected.
                self.db
                    .uploads()
                    .add_undetected(&row.label, store_id, store_name, row.row_number, Utc::now())
                    .await?;
                return Ok(None);
            }
        };

        let quantity = parse_locale_number(&row.quantity_raw);
        if quantity <= Decimal::ZERO {
            errors.push(format!(
                "Baris {}: Jumlah harus lebih dari 0",
                row.row_number
            ));
            return Ok(None);
        }

        let unit_price = parse_locale_number(&row.price_raw);
        if unit_price <= Decimal::ZERO {
            errors.push(format!(
                "Baris {}: Harga penjualan tidak valid atau tidak ada",
                row.row_number
            ));
            return Ok(None);
        }

        // Unparseable payment time falls back to the upload instant.
        let recorded_at = parse_payment_time(&row.paid_at_raw)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);

        debug!(
            row = row.row_number,
            label = %row.label,
            product = %product.name,
            "Row matched"
        );

        Ok(Some(Sale {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            product_id: product.id.clone(),
            // Canonical catalog name, never the raw label.
            product_name: product.name.clone(),
            quantity,
            unit_price,
            total: round_currency(quantity * unit_price),
            sale_date: recorded_at.date_naive(),
            recorded_at,
        }))
    }

    async fn record_history(
        &self,
        store_id: &str,
        store_name: &str,
        file_name: &str,
        file_type: &str,
        outcome: &ImportOutcome,
    ) -> ServiceResult<()> {
        let history = SalesUploadHistory {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            store_name: store_name.to_string(),
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            imported: outcome.imported,
            skipped: outcome.skipped,
            total_rows: outcome.total_rows,
            errors: outcome.errors.clone(),
            recorded_at: Utc::now(),
        };
        self.db.uploads().add_history(&history).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::pool::{Database, DbConfig};
    use kios_core::PriceUpdateMode;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Catalog product P with warehouse stock, sold via an online store.
    async fn seed(db: &Database, stock: i64) -> (String, String) {
        let product = db
            .products()
            .insert("Kaos Polos Hitam", None, Decimal::from(1000), PriceUpdateMode::OnDate)
            .await
            .unwrap();
        db.stock()
            .apply_addition(&product.id, StockPlace::Warehouse, None, Decimal::from(stock), Utc::now())
            .await
            .unwrap();
        let store = db
            .stores()
            .insert("Shopee", kios_core::StoreType::Online, None)
            .await
            .unwrap();
        (product.id, store.id)
    }

    const TWO_ROW_CSV: &str = "\
No. Pesanan,Waktu Pembayaran Dilakukan,Nama Variasi,Harga Setelah Diskon,Jumlah
INV-1,2025-06-01 10:00,Kaos Polos Hitam,1500,3
INV-2,2025-06-01 11:00,Xyz123,900,1
";

    #[tokio::test]
    async fn test_end_to_end_two_row_import() {
        let db = db().await;
        let (product_id, store_id) = seed(&db, 10).await;

        let outcome = db
            .importer()
            .import("Order.all.csv", TWO_ROW_CSV.as_bytes(), &store_id)
            .await
            .unwrap();

        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.total_rows, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Xyz123"));

        // The matched sale committed with the canonical name and total.
        let sales = db.sales().list().await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].product_name, "Kaos Polos Hitam");
        assert_eq!(sales[0].quantity, Decimal::from(3));
        assert_eq!(sales[0].total, Decimal::from(4500));

        // Warehouse pool decremented 10 → 7.
        let qty = db
            .stock()
            .quantity_at(&product_id, StockPlace::Warehouse, None)
            .await
            .unwrap();
        assert_eq!(qty, Decimal::from(7));

        // The unmatched row is preserved for catalog fixes.
        let undetected = db.uploads().list_undetected().await.unwrap();
        assert_eq!(undetected.len(), 1);
        assert_eq!(undetected[0].product_name, "Xyz123");
        assert_eq!(undetected[0].row_number, 3);

        // Exactly one history record.
        let history = db.uploads().list_history(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].imported, 1);
        assert_eq!(history[0].skipped, 1);

        // Latest observed selling price captured on the product.
        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.selling_price, Some(Decimal::from(1500)));
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejects_whole_batch() {
        let db = db().await;
        let (product_id, store_id) = seed(&db, 2).await;

        let outcome = db
            .importer()
            .import("Order.all.csv", TWO_ROW_CSV.as_bytes(), &store_id)
            .await
            .unwrap();

        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.skipped, 2);
        let gate_error = outcome
            .errors
            .iter()
            .find(|e| e.contains("Insufficient stock"))
            .unwrap();
        assert!(gate_error.contains("available 2"));
        assert!(gate_error.contains("requested 3"));

        // Zero commits, stock untouched.
        assert!(db.sales().list().await.unwrap().is_empty());
        let qty = db
            .stock()
            .quantity_at(&product_id, StockPlace::Warehouse, None)
            .await
            .unwrap();
        assert_eq!(qty, Decimal::from(2));

        // The attempt is still on record.
        let history = db.uploads().list_history(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].imported, 0);
    }

    #[tokio::test]
    async fn test_shortfall_sums_across_rows() {
        let db = db().await;
        let (_, store_id) = seed(&db, 4).await;

        // Two matched rows requiring 3 + 2 = 5 against 4 available: the
        // gate compares the per-product SUM, not each row alone.
        let csv = "\
Nama Variasi,Harga,Jumlah,Waktu
Kaos Polos Hitam,1500,3,2025-06-01 10:00
kaos polos hitam,1500,2,2025-06-01 11:00
";
        let outcome = db
            .importer()
            .import("x.csv", csv.as_bytes(), &store_id)
            .await
            .unwrap();

        assert_eq!(outcome.imported, 0);
        assert!(outcome.errors[0].contains("available 4"));
        assert!(outcome.errors[0].contains("requested 5"));
    }

    #[tokio::test]
    async fn test_offline_store_draws_from_shop_floor() {
        let db = db().await;
        let product = db
            .products()
            .insert("Kaos", None, Decimal::from(1000), PriceUpdateMode::OnDate)
            .await
            .unwrap();
        db.stock()
            .apply_addition(&product.id, StockPlace::ShopFloor, None, Decimal::from(5), Utc::now())
            .await
            .unwrap();
        let store = db
            .stores()
            .insert("Toko Jaya", kios_core::StoreType::Offline, None)
            .await
            .unwrap();

        let csv = "\
Nama Variasi,Harga,Jumlah
Kaos,1500,2
";
        let outcome = db.importer().import("x.csv", csv.as_bytes(), &store.id).await.unwrap();
        assert_eq!(outcome.imported, 1);

        let floor = db
            .stock()
            .quantity_at(&product.id, StockPlace::ShopFloor, None)
            .await
            .unwrap();
        assert_eq!(floor, Decimal::from(3));
    }

    #[tokio::test]
    async fn test_bad_rows_accumulate_errors_without_aborting() {
        let db = db().await;
        let (_, store_id) = seed(&db, 10).await;

        let csv = "\
Nama Variasi,Harga,Jumlah
,1500,2
Kaos Polos Hitam,0,2
Kaos Polos Hitam,1500,0
Kaos Polos Hitam,1500,1
";
        let outcome = db.importer().import("x.csv", csv.as_bytes(), &store_id).await.unwrap();

        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(outcome.errors.len(), 3);
        assert!(outcome.errors[0].contains("tidak boleh kosong"));
        assert!(outcome.errors[1].contains("Harga"));
        assert!(outcome.errors[2].contains("Jumlah"));
    }

    #[tokio::test]
    async fn test_unknown_store_is_not_found() {
        let db = db().await;
        let err = db
            .importer()
            .import("x.csv", b"Nama Variasi,Jumlah\n", "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Db(_)));
    }

    #[tokio::test]
    async fn test_unreadable_file_still_records_history() {
        let db = db().await;
        let (_, store_id) = seed(&db, 10).await;

        let err = db
            .importer()
            .import("report.pdf", b"whatever", &store_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ingest(_)));

        let history = db.uploads().list_history(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_rows, 0);
        assert!(history[0].errors[0].contains("unsupported file format"));
    }
}
