//! # Store Repository
//!
//! Stores are sales channels: physical shops (offline) or marketplace
//! presences (online). Names are unique after normalization (trim, collapse
//! whitespace, case-fold), so "Toko Jaya" and "  toko  JAYA " are the same
//! store.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_enum, parse_timestamp};
use kios_core::validation::normalize_store_name;
use kios_core::{Store, StoreType};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: String,
    name: String,
    store_type: String,
    address: Option<String>,
    created_at: String,
}

impl TryFrom<StoreRow> for Store {
    type Error = DbError;

    fn try_from(row: StoreRow) -> DbResult<Store> {
        Ok(Store {
            store_type: parse_enum("stores.store_type", &row.store_type)?,
            created_at: parse_timestamp("stores.created_at", &row.created_at)?,
            id: row.id,
            name: row.name,
            address: row.address,
        })
    }
}

const SELECT_STORE: &str = "SELECT id, name, store_type, address, created_at FROM stores";

// =============================================================================
// Repository
// =============================================================================

/// Repository for stores.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Inserts a new store, rejecting duplicate normalized names.
    ///
    /// The duplicate check runs before the insert so the error can carry the
    /// name the caller actually typed; the UNIQUE index on `normalized_name`
    /// still backstops concurrent inserts.
    pub async fn insert(
        &self,
        name: &str,
        store_type: StoreType,
        address: Option<&str>,
    ) -> DbResult<Store> {
        let normalized = normalize_store_name(name);

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM stores WHERE normalized_name = ?1)",
        )
        .bind(&normalized)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            return Err(DbError::duplicate("store name", name));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO stores (id, name, normalized_name, store_type, address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(name.trim())
        .bind(&normalized)
        .bind(store_type.to_string())
        .bind(address)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(store_id = %id, name, "Store created");
        self.get(&id).await
    }

    /// Fetches a store by id.
    pub async fn get(&self, id: &str) -> DbResult<Store> {
        let row = sqlx::query_as::<_, StoreRow>(&format!("{SELECT_STORE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Store", id))?;
        row.try_into()
    }

    /// Lists all stores in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Store>> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!("{SELECT_STORE} ORDER BY rowid"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Store::try_from).collect()
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

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let repo = db.stores();

        let store = repo
            .insert("Toko Jaya", StoreType::Offline, Some("Jl. Merdeka 1"))
            .await
            .unwrap();
        assert_eq!(store.name, "Toko Jaya");
        assert_eq!(store.store_type, StoreType::Offline);

        let fetched = repo.get(&store.id).await.unwrap();
        assert_eq!(fetched.address.as_deref(), Some("Jl. Merdeka 1"));
    }

    #[tokio::test]
    async fn test_duplicate_normalized_name_rejected() {
        let db = db().await;
        let repo = db.stores();

        repo.insert("Toko Jaya", StoreType::Offline, None).await.unwrap();
        let err = repo
            .insert("  toko   JAYA ", StoreType::Online, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(err.to_string().contains("toko   JAYA"));
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let db = db().await;
        let repo = db.stores();
        repo.insert("Shopee", StoreType::Online, None).await.unwrap();
        repo.insert("Toko Jaya", StoreType::Offline, None).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Shopee", "Toko Jaya"]);
    }
}
