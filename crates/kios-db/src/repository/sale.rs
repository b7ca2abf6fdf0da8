//! # Sale Repository
//!
//! Imported sales are append-only: rows are only ever written by the import
//! pipeline's commit phase, inside the importer's transaction, and read by
//! analytics and reconstruction. There is no update or delete.

use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};
use crate::repository::{parse_date, parse_decimal, parse_timestamp};
use kios_core::Sale;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct SaleRow {
    id: String,
    store_id: String,
    product_id: String,
    product_name: String,
    quantity: String,
    unit_price: String,
    total: String,
    sale_date: String,
    recorded_at: String,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Sale> {
        Ok(Sale {
            quantity: parse_decimal("sales.quantity", &row.quantity)?,
            unit_price: parse_decimal("sales.unit_price", &row.unit_price)?,
            total: parse_decimal("sales.total", &row.total)?,
            sale_date: parse_date("sales.sale_date", &row.sale_date)?,
            recorded_at: parse_timestamp("sales.recorded_at", &row.recorded_at)?,
            id: row.id,
            store_id: row.store_id,
            product_id: row.product_id,
            product_name: row.product_name,
        })
    }
}

pub(crate) const SELECT_SALE: &str =
    "SELECT id, store_id, product_id, product_name, quantity, unit_price, total, sale_date, recorded_at
     FROM sales";

// =============================================================================
// Repository
// =============================================================================

/// Repository for imported sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts one sale within the caller's transaction.
    ///
    /// The import pipeline owns the transaction so the whole batch commits
    /// or rolls back together with its stock decrements.
    pub async fn insert_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        sale: &Sale,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO sales (id, store_id, product_id, product_name, quantity, unit_price, total, sale_date, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&sale.id)
        .bind(&sale.store_id)
        .bind(&sale.product_id)
        .bind(&sale.product_name)
        .bind(sale.quantity.to_string())
        .bind(sale.unit_price.to_string())
        .bind(sale.total.to_string())
        .bind(sale.sale_date.format("%Y-%m-%d").to_string())
        .bind(sale.recorded_at.to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// All sales, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "{SELECT_SALE} ORDER BY recorded_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }

    /// One product's sales, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "{SELECT_SALE} WHERE product_id = ?1 ORDER BY recorded_at, rowid"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }

    /// One store's sales, oldest first.
    pub async fn list_for_store(&self, store_id: &str) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "{SELECT_SALE} WHERE store_id = ?1 ORDER BY recorded_at, rowid"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }

    /// Sales within an inclusive calendar-day range, oldest first.
    pub async fn list_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "{SELECT_SALE} WHERE sale_date >= ?1 AND sale_date <= ?2 ORDER BY recorded_at, rowid"
        ))
        .bind(from.format("%Y-%m-%d").to_string())
        .bind(to.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use kios_core::{PriceUpdateMode, StoreType};
    use rust_decimal::Decimal;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_sale(db: &Database, day: u32, qty: i64) -> Sale {
        let product = db
            .products()
            .insert("Kaos", None, Decimal::from(1000), PriceUpdateMode::OnDate)
            .await
            .unwrap();
        let store = db
            .stores()
            .insert(&format!("Store {day}-{qty}"), StoreType::Online, None)
            .await
            .unwrap();

        let recorded_at = Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap();
        let sale = Sale {
            id: uuid::Uuid::new_v4().to_string(),
            store_id: store.id,
            product_id: product.id,
            product_name: product.name,
            quantity: Decimal::from(qty),
            unit_price: Decimal::from(1500),
            total: Decimal::from(1500 * qty),
            sale_date: recorded_at.date_naive(),
            recorded_at,
        };

        let mut tx = db.pool().begin().await.unwrap();
        SaleRepository::insert_in_tx(&mut tx, &sale).await.unwrap();
        tx.commit().await.unwrap();
        sale
    }

    #[tokio::test]
    async fn test_insert_and_list_round_trip() {
        let db = db().await;
        let sale = seed_sale(&db, 1, 3).await;

        let listed = db.sales().list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, sale.id);
        assert_eq!(listed[0].quantity, Decimal::from(3));
        assert_eq!(listed[0].total, Decimal::from(4500));
        assert_eq!(listed[0].sale_date, sale.sale_date);
    }

    #[tokio::test]
    async fn test_date_range_filter() {
        let db = db().await;
        seed_sale(&db, 1, 1).await;
        let in_range = seed_sale(&db, 15, 2).await;

        let from = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let listed = db.sales().list_for_date_range(from, to).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, in_range.id);
    }
}
