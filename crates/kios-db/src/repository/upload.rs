//! # Upload Repository
//!
//! Import diagnostics: rows the matcher could not place, and the audit
//! record of every upload attempt.
//!
//! Undetected products are written as soon as matching fails, outside the
//! commit transaction: even when a batch is later rejected at the stock
//! gate, the owner keeps the list of names that need catalog fixes.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::parse_timestamp;
use kios_core::{SalesUploadHistory, UndetectedProduct};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct UndetectedRow {
    id: String,
    product_name: String,
    store_id: String,
    store_name: String,
    row_number: i64,
    recorded_at: String,
}

impl TryFrom<UndetectedRow> for UndetectedProduct {
    type Error = DbError;

    fn try_from(row: UndetectedRow) -> DbResult<UndetectedProduct> {
        Ok(UndetectedProduct {
            recorded_at: parse_timestamp("undetected_products.recorded_at", &row.recorded_at)?,
            id: row.id,
            product_name: row.product_name,
            store_id: row.store_id,
            store_name: row.store_name,
            row_number: row.row_number,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UploadHistoryRow {
    id: String,
    store_id: String,
    store_name: String,
    file_name: String,
    file_type: String,
    imported: i64,
    skipped: i64,
    total_rows: i64,
    errors: String,
    recorded_at: String,
}

impl TryFrom<UploadHistoryRow> for SalesUploadHistory {
    type Error = DbError;

    fn try_from(row: UploadHistoryRow) -> DbResult<SalesUploadHistory> {
        let errors: Vec<String> = serde_json::from_str(&row.errors)
            .map_err(|_| DbError::decode("sales_upload_history.errors", &row.errors))?;
        Ok(SalesUploadHistory {
            recorded_at: parse_timestamp("sales_upload_history.recorded_at", &row.recorded_at)?,
            errors,
            id: row.id,
            store_id: row.store_id,
            store_name: row.store_name,
            file_name: row.file_name,
            file_type: row.file_type,
            imported: row.imported,
            skipped: row.skipped,
            total_rows: row.total_rows,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for undetected products and upload history.
#[derive(Debug, Clone)]
pub struct UploadRepository {
    pool: SqlitePool,
}

impl UploadRepository {
    /// Creates a new UploadRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UploadRepository { pool }
    }

    /// Records one unmatched upload row.
    pub async fn add_undetected(
        &self,
        product_name: &str,
        store_id: &str,
        store_name: &str,
        row_number: i64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<UndetectedProduct> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO undetected_products (id, product_name, store_id, store_name, row_number, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(product_name)
        .bind(store_id)
        .bind(store_name)
        .bind(row_number)
        .bind(recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(UndetectedProduct {
            id,
            product_name: product_name.to_string(),
            store_id: store_id.to_string(),
            store_name: store_name.to_string(),
            row_number,
            recorded_at,
        })
    }

    /// Unmatched rows, newest first.
    pub async fn list_undetected(&self) -> DbResult<Vec<UndetectedProduct>> {
        let rows = sqlx::query_as::<_, UndetectedRow>(
            "SELECT id, product_name, store_id, store_name, row_number, recorded_at
             FROM undetected_products ORDER BY recorded_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UndetectedProduct::try_from).collect()
    }

    /// Appends one upload-history record.
    pub async fn add_history(&self, history: &SalesUploadHistory) -> DbResult<()> {
        let errors = serde_json::to_string(&history.errors)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            "INSERT INTO sales_upload_history (id, store_id, store_name, file_name, file_type, imported, skipped, total_rows, errors, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&history.id)
        .bind(&history.store_id)
        .bind(&history.store_name)
        .bind(&history.file_name)
        .bind(&history.file_type)
        .bind(history.imported)
        .bind(history.skipped)
        .bind(history.total_rows)
        .bind(errors)
        .bind(history.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upload history, newest first, optionally for one store.
    pub async fn list_history(
        &self,
        store_id: Option<&str>,
    ) -> DbResult<Vec<SalesUploadHistory>> {
        let rows = match store_id {
            Some(store_id) => {
                sqlx::query_as::<_, UploadHistoryRow>(
                    "SELECT id, store_id, store_name, file_name, file_type, imported, skipped, total_rows, errors, recorded_at
                     FROM sales_upload_history WHERE store_id = ?1
                     ORDER BY recorded_at DESC, rowid DESC",
                )
                .bind(store_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, UploadHistoryRow>(
                    "SELECT id, store_id, store_name, file_name, file_type, imported, skipped, total_rows, errors, recorded_at
                     FROM sales_upload_history
                     ORDER BY recorded_at DESC, rowid DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(SalesUploadHistory::try_from).collect()
    }

    /// Deletes one upload-history record.
    ///
    /// Administrative cleanup only: the sales and stock effects that upload
    /// produced are NOT reversed.
    pub async fn delete_history(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales_upload_history WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Upload history", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn history(id: &str, store_id: &str, imported: i64) -> SalesUploadHistory {
        SalesUploadHistory {
            id: id.to_string(),
            store_id: store_id.to_string(),
            store_name: "Shopee".to_string(),
            file_name: "Order.all.csv".to_string(),
            file_type: "csv".to_string(),
            imported,
            skipped: 1,
            total_rows: imported + 1,
            errors: vec!["Baris 3: Produk \"Xyz\" tidak ditemukan".to_string()],
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_undetected_round_trip_newest_first() {
        let db = db().await;
        let repo = db.uploads();

        repo.add_undetected("Xyz123", "st-1", "Shopee", 3, Utc::now())
            .await
            .unwrap();
        repo.add_undetected("Abc", "st-1", "Shopee", 7, Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let listed = repo.list_undetected().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].product_name, "Abc");
        assert_eq!(listed[1].row_number, 3);
    }

    #[tokio::test]
    async fn test_history_round_trip_and_errors_json() {
        let db = db().await;
        let repo = db.uploads();

        repo.add_history(&history("h1", "st-1", 5)).await.unwrap();

        let listed = repo.list_history(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].imported, 5);
        assert_eq!(listed[0].errors.len(), 1);
        assert!(listed[0].errors[0].contains("tidak ditemukan"));
    }

    #[tokio::test]
    async fn test_history_store_filter_and_delete() {
        let db = db().await;
        let repo = db.uploads();

        repo.add_history(&history("h1", "st-1", 5)).await.unwrap();
        repo.add_history(&history("h2", "st-2", 2)).await.unwrap();

        let filtered = repo.list_history(Some("st-2")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "h2");

        repo.delete_history("h2").await.unwrap();
        assert!(repo.list_history(Some("st-2")).await.unwrap().is_empty());

        let err = repo.delete_history("h2").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
