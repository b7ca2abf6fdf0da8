//! # Product Repository
//!
//! Catalog CRUD and the append-only price timeline.
//!
//! ## The Price Timeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                price_history (append-only)                              │
//! │                                                                         │
//! │  record_cost(p, 1200, T)                                               │
//! │       │                                                                 │
//! │       ├── INSERT price_history (kind='cost', price=1200, at=T)         │
//! │       └── UPDATE products SET cost_price = 1200   ← unconditional      │
//! │                                                                         │
//! │  The "current" cost price is last-WRITE-wins, not last-timestamp-wins: │
//! │  a backdated entry still becomes the current price. Historical reads   │
//! │  (kios_core::pricing::cost_at) interpret the timeline chronologically  │
//! │  instead, so the two views can disagree on purpose.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_decimal, parse_enum, parse_timestamp};
use kios_core::{PriceEntry, PriceUpdateMode, Product};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    sku: Option<String>,
    cost_price: String,
    selling_price: Option<String>,
    price_update_mode: String,
    created_at: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Product> {
        Ok(Product {
            cost_price: parse_decimal("products.cost_price", &row.cost_price)?,
            selling_price: row
                .selling_price
                .as_deref()
                .map(|v| parse_decimal("products.selling_price", v))
                .transpose()?,
            price_update_mode: parse_enum("products.price_update_mode", &row.price_update_mode)?,
            created_at: parse_timestamp("products.created_at", &row.created_at)?,
            id: row.id,
            name: row.name,
            sku: row.sku,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PriceEntryRow {
    price: String,
    recorded_at: String,
}

impl TryFrom<PriceEntryRow> for PriceEntry {
    type Error = DbError;

    fn try_from(row: PriceEntryRow) -> DbResult<PriceEntry> {
        Ok(PriceEntry {
            price: parse_decimal("price_history.price", &row.price)?,
            recorded_at: parse_timestamp("price_history.recorded_at", &row.recorded_at)?,
        })
    }
}

const SELECT_PRODUCT: &str =
    "SELECT id, name, sku, cost_price, selling_price, price_update_mode, created_at
     FROM products";

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog products and their price timelines.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product with an initial cost price.
    ///
    /// The initial cost also opens the price timeline, so point-in-time
    /// lookups work from the very first sale.
    pub async fn insert(
        &self,
        name: &str,
        sku: Option<&str>,
        cost_price: Decimal,
        price_update_mode: PriceUpdateMode,
    ) -> DbResult<Product> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO products (id, name, sku, cost_price, selling_price, price_update_mode, created_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
        )
        .bind(&id)
        .bind(name)
        .bind(sku)
        .bind(cost_price.to_string())
        .bind(price_update_mode.to_string())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO price_history (product_id, kind, price, recorded_at)
             VALUES (?1, 'cost', ?2, ?3)",
        )
        .bind(&id)
        .bind(cost_price.to_string())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(product_id = %id, name, "Product created");
        self.get(&id).await
    }

    /// Fetches a product by id.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        row.try_into()
    }

    /// Lists the whole catalog in insertion order.
    ///
    /// Insertion order matters: the fuzzy matcher scans the catalog in
    /// stored order and takes the first hit.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} ORDER BY rowid"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    /// Updates a product's descriptive fields.
    pub async fn update_details(
        &self,
        id: &str,
        name: &str,
        sku: Option<&str>,
    ) -> DbResult<Product> {
        let result = sqlx::query("UPDATE products SET name = ?2, sku = ?3 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .bind(sku)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        self.get(id).await
    }

    /// Sets how the product's cost price is maintained.
    pub async fn set_price_update_mode(&self, id: &str, mode: PriceUpdateMode) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET price_update_mode = ?2 WHERE id = ?1")
            .bind(id)
            .bind(mode.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Appends a cost-price entry and sets the current cost price.
    ///
    /// The current price is set unconditionally even when `recorded_at` is
    /// backdated behind existing entries (last write wins). Existing stored
    /// data depends on this; chronological interpretation belongs to
    /// `kios_core::pricing::cost_at` alone.
    pub async fn record_cost(
        &self,
        product_id: &str,
        price: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE products SET cost_price = ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(price.to_string())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        sqlx::query(
            "INSERT INTO price_history (product_id, kind, price, recorded_at)
             VALUES (?1, 'cost', ?2, ?3)",
        )
        .bind(product_id)
        .bind(price.to_string())
        .bind(recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(product_id, %price, "Cost price recorded");
        Ok(())
    }

    /// Appends a selling-price entry and sets the current selling price.
    ///
    /// Same last-write-wins shape as [`record_cost`](Self::record_cost).
    pub async fn record_selling(
        &self,
        product_id: &str,
        price: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE products SET selling_price = ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(price.to_string())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        sqlx::query(
            "INSERT INTO price_history (product_id, kind, price, recorded_at)
             VALUES (?1, 'selling', ?2, ?3)",
        )
        .bind(product_id)
        .bind(price.to_string())
        .bind(recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The product's cost timeline, oldest first.
    pub async fn cost_history(&self, product_id: &str) -> DbResult<Vec<PriceEntry>> {
        let rows = sqlx::query_as::<_, PriceEntryRow>(
            "SELECT price, recorded_at FROM price_history
             WHERE product_id = ?1 AND kind = 'cost'
             ORDER BY recorded_at, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PriceEntry::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let repo = db.products();

        let product = repo
            .insert("Kaos Polos Hitam", Some("KPH-01"), Decimal::from(1000), PriceUpdateMode::OnDate)
            .await
            .unwrap();

        assert_eq!(product.name, "Kaos Polos Hitam");
        assert_eq!(product.cost_price, Decimal::from(1000));
        assert_eq!(product.selling_price, None);

        let fetched = repo.get(&product.id).await.unwrap();
        assert_eq!(fetched.id, product.id);

        // Insert opens the timeline with the initial cost.
        let history = repo.cost_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let db = db().await;
        let err = db.products().get("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let db = db().await;
        let repo = db.products();

        repo.insert("Zebra", None, Decimal::ZERO, PriceUpdateMode::OnDate)
            .await
            .unwrap();
        repo.insert("Apel", None, Decimal::ZERO, PriceUpdateMode::OnDate)
            .await
            .unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Zebra", "Apel"]);
    }

    #[tokio::test]
    async fn test_record_cost_backdated_still_becomes_current() {
        let db = db().await;
        let repo = db.products();
        let product = repo
            .insert("Kaos", None, Decimal::from(1000), PriceUpdateMode::OnDate)
            .await
            .unwrap();

        // Backfill an entry dated before the initial one: current price
        // still follows the latest WRITE, not the latest timestamp.
        let backdated = Utc::now() - Duration::days(30);
        repo.record_cost(&product.id, Decimal::from(800), backdated)
            .await
            .unwrap();

        let current = repo.get(&product.id).await.unwrap();
        assert_eq!(current.cost_price, Decimal::from(800));

        let history = repo.cost_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 2);
        // Oldest first.
        assert_eq!(history[0].price, Decimal::from(800));
    }

    #[tokio::test]
    async fn test_record_selling_updates_current() {
        let db = db().await;
        let repo = db.products();
        let product = repo
            .insert("Kaos", None, Decimal::from(1000), PriceUpdateMode::OnDate)
            .await
            .unwrap();

        repo.record_selling(&product.id, Decimal::from(1500), Utc::now())
            .await
            .unwrap();

        let current = repo.get(&product.id).await.unwrap();
        assert_eq!(current.selling_price, Some(Decimal::from(1500)));
    }
}
