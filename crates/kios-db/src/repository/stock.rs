//! # Stock Repository
//!
//! Resting quantities plus the three append-only event logs (additions,
//! transfers, sales) that explain them.
//!
//! ## Event + Quantity Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_addition / apply_transfer                                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT event row              ← the audit trail                      │
//! │    read + write stock_locations  ← the resting quantity                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A transfer's two-sided update is never observable half-applied; an    │
//! │  event row without its quantity effect (or vice versa) cannot exist.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity arithmetic happens in Rust (quantities are decimal TEXT in
//! SQLite), inside the same transaction as the event insert.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sale::{SaleRow, SELECT_SALE};
use crate::repository::{parse_decimal, parse_enum, parse_timestamp, store_key, store_opt};
use kios_core::stock::{reconstruct_at, LocationKey};
use kios_core::{ProductAddition, ProductTransfer, Sale, StockLocation, StockPlace};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct LocationRow {
    product_id: String,
    place: String,
    store_id: String,
    quantity: String,
}

impl TryFrom<LocationRow> for StockLocation {
    type Error = DbError;

    fn try_from(row: LocationRow) -> DbResult<StockLocation> {
        Ok(StockLocation {
            place: parse_enum("stock_locations.place", &row.place)?,
            quantity: parse_decimal("stock_locations.quantity", &row.quantity)?,
            store_id: store_opt(row.store_id),
            product_id: row.product_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdditionRow {
    id: String,
    product_id: String,
    place: String,
    store_id: String,
    quantity: String,
    recorded_at: String,
}

impl TryFrom<AdditionRow> for ProductAddition {
    type Error = DbError;

    fn try_from(row: AdditionRow) -> DbResult<ProductAddition> {
        Ok(ProductAddition {
            place: parse_enum("product_additions.place", &row.place)?,
            quantity: parse_decimal("product_additions.quantity", &row.quantity)?,
            recorded_at: parse_timestamp("product_additions.recorded_at", &row.recorded_at)?,
            store_id: store_opt(row.store_id),
            id: row.id,
            product_id: row.product_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: String,
    product_id: String,
    from_place: String,
    from_store_id: String,
    to_place: String,
    to_store_id: String,
    quantity: String,
    recorded_at: String,
}

impl TryFrom<TransferRow> for ProductTransfer {
    type Error = DbError;

    fn try_from(row: TransferRow) -> DbResult<ProductTransfer> {
        Ok(ProductTransfer {
            from_place: parse_enum("product_transfers.from_place", &row.from_place)?,
            to_place: parse_enum("product_transfers.to_place", &row.to_place)?,
            quantity: parse_decimal("product_transfers.quantity", &row.quantity)?,
            recorded_at: parse_timestamp("product_transfers.recorded_at", &row.recorded_at)?,
            from_store_id: store_opt(row.from_store_id),
            to_store_id: store_opt(row.to_store_id),
            id: row.id,
            product_id: row.product_id,
        })
    }
}

/// Outcome of a validated decrement.
#[derive(Debug, Clone, PartialEq)]
pub enum ReductionOutcome {
    /// Decrement applied; carries the new resting quantity.
    Applied(Decimal),
    /// Rejected: carries the quantity actually available.
    Insufficient { available: Decimal },
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock locations and stock events.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Quantities
    // -------------------------------------------------------------------------

    /// Current resting quantity at a location (0 when the row is absent).
    pub async fn quantity_at(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
    ) -> DbResult<Decimal> {
        let mut tx = self.pool.begin().await?;
        let quantity = Self::quantity_in_tx(&mut tx, product_id, place, store_id).await?;
        tx.commit().await?;
        Ok(quantity)
    }

    pub(crate) async fn quantity_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
    ) -> DbResult<Decimal> {
        let stored: Option<String> = sqlx::query_scalar(
            "SELECT quantity FROM stock_locations
             WHERE product_id = ?1 AND place = ?2 AND store_id = ?3",
        )
        .bind(product_id)
        .bind(place.to_string())
        .bind(store_key(store_id))
        .fetch_optional(&mut **tx)
        .await?;

        match stored {
            Some(value) => parse_decimal("stock_locations.quantity", &value),
            None => Ok(Decimal::ZERO),
        }
    }

    pub(crate) async fn set_quantity_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        quantity: Decimal,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO stock_locations (product_id, place, store_id, quantity)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (product_id, place, store_id) DO UPDATE SET quantity = excluded.quantity",
        )
        .bind(product_id)
        .bind(place.to_string())
        .bind(store_key(store_id))
        .bind(quantity.to_string())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Upserts a location's resting quantity. Callers clamp; this writes.
    pub async fn set_quantity(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        quantity: Decimal,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::set_quantity_in_tx(&mut tx, product_id, place, store_id, quantity).await?;
        tx.commit().await?;
        Ok(())
    }

    /// All of one product's stock locations.
    pub async fn locations_for(&self, product_id: &str) -> DbResult<Vec<StockLocation>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            "SELECT product_id, place, store_id, quantity FROM stock_locations
             WHERE product_id = ?1 ORDER BY place, store_id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StockLocation::try_from).collect()
    }

    /// Every stock location, for overview listings.
    pub async fn all_locations(&self) -> DbResult<Vec<StockLocation>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            "SELECT product_id, place, store_id, quantity FROM stock_locations
             ORDER BY product_id, place, store_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StockLocation::try_from).collect()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Records a stock-in event and increments the location, atomically.
    pub async fn apply_addition(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        quantity: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<ProductAddition> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product_additions (id, product_id, place, store_id, quantity, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(product_id)
        .bind(place.to_string())
        .bind(store_key(store_id))
        .bind(quantity.to_string())
        .bind(recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let current = Self::quantity_in_tx(&mut tx, product_id, place, store_id).await?;
        Self::set_quantity_in_tx(&mut tx, product_id, place, store_id, current + quantity).await?;

        tx.commit().await?;

        debug!(product_id, %quantity, place = %place, "Stock addition applied");
        Ok(ProductAddition {
            id,
            product_id: product_id.to_string(),
            place,
            store_id: store_id.map(str::to_string),
            quantity,
            recorded_at,
        })
    }

    /// Records a transfer event and moves quantity between two locations,
    /// atomically. The source is floored at zero, never rejected; callers
    /// that want rejection validate first (see `Inventory::transfer_stock`).
    pub async fn apply_transfer(
        &self,
        product_id: &str,
        from_place: StockPlace,
        from_store_id: Option<&str>,
        to_place: StockPlace,
        to_store_id: Option<&str>,
        quantity: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<ProductTransfer> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product_transfers (id, product_id, from_place, from_store_id, to_place, to_store_id, quantity, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(product_id)
        .bind(from_place.to_string())
        .bind(store_key(from_store_id))
        .bind(to_place.to_string())
        .bind(store_key(to_store_id))
        .bind(quantity.to_string())
        .bind(recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let source = Self::quantity_in_tx(&mut tx, product_id, from_place, from_store_id).await?;
        Self::set_quantity_in_tx(
            &mut tx,
            product_id,
            from_place,
            from_store_id,
            (source - quantity).max(Decimal::ZERO),
        )
        .await?;

        let dest = Self::quantity_in_tx(&mut tx, product_id, to_place, to_store_id).await?;
        Self::set_quantity_in_tx(&mut tx, product_id, to_place, to_store_id, dest + quantity)
            .await?;

        tx.commit().await?;

        debug!(product_id, %quantity, "Stock transfer applied");
        Ok(ProductTransfer {
            id,
            product_id: product_id.to_string(),
            from_place,
            from_store_id: from_store_id.map(str::to_string),
            to_place,
            to_store_id: to_store_id.map(str::to_string),
            quantity,
            recorded_at,
        })
    }

    /// Validated decrement (write-off). Unlike transfers this never floors:
    /// a reduction past the available quantity is refused with the amount
    /// that was actually there.
    pub async fn apply_reduction(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        quantity: Decimal,
    ) -> DbResult<ReductionOutcome> {
        let mut tx = self.pool.begin().await?;

        let available = Self::quantity_in_tx(&mut tx, product_id, place, store_id).await?;
        if quantity > available {
            return Ok(ReductionOutcome::Insufficient { available });
        }

        let remaining = available - quantity;
        Self::set_quantity_in_tx(&mut tx, product_id, place, store_id, remaining).await?;
        tx.commit().await?;

        debug!(product_id, %quantity, %remaining, "Stock reduction applied");
        Ok(ReductionOutcome::Applied(remaining))
    }

    /// One product's addition events, oldest first.
    pub async fn additions_for(&self, product_id: &str) -> DbResult<Vec<ProductAddition>> {
        let rows = sqlx::query_as::<_, AdditionRow>(
            "SELECT id, product_id, place, store_id, quantity, recorded_at
             FROM product_additions WHERE product_id = ?1 ORDER BY recorded_at, rowid",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProductAddition::try_from).collect()
    }

    /// One product's transfer events, oldest first.
    pub async fn transfers_for(&self, product_id: &str) -> DbResult<Vec<ProductTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            "SELECT id, product_id, from_place, from_store_id, to_place, to_store_id, quantity, recorded_at
             FROM product_transfers WHERE product_id = ?1 ORDER BY recorded_at, rowid",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProductTransfer::try_from).collect()
    }

    /// Addition events recorded on one calendar day (UTC), for the daily
    /// movement report.
    pub async fn additions_on(&self, day: NaiveDate) -> DbResult<Vec<ProductAddition>> {
        let rows = sqlx::query_as::<_, AdditionRow>(
            "SELECT id, product_id, place, store_id, quantity, recorded_at
             FROM product_additions WHERE substr(recorded_at, 1, 10) = ?1
             ORDER BY recorded_at, rowid",
        )
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProductAddition::try_from).collect()
    }

    /// Transfer events recorded on one calendar day (UTC).
    pub async fn transfers_on(&self, day: NaiveDate) -> DbResult<Vec<ProductTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            "SELECT id, product_id, from_place, from_store_id, to_place, to_store_id, quantity, recorded_at
             FROM product_transfers WHERE substr(recorded_at, 1, 10) = ?1
             ORDER BY recorded_at, rowid",
        )
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProductTransfer::try_from).collect()
    }

    // -------------------------------------------------------------------------
    // Reconstruction
    // -------------------------------------------------------------------------

    /// Reconstructs a location's quantity as of `cutoff` by gathering the
    /// product's event logs and replaying them backwards (see
    /// `kios_core::stock`).
    pub async fn reconstruct_at(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Decimal> {
        let current = self.quantity_at(product_id, place, store_id).await?;
        let additions = self.additions_for(product_id).await?;
        let transfers = self.transfers_for(product_id).await?;

        let sale_rows = sqlx::query_as::<_, SaleRow>(&format!(
            "{SELECT_SALE} WHERE product_id = ?1 ORDER BY recorded_at, rowid"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        let sales: Vec<Sale> = sale_rows
            .into_iter()
            .map(Sale::try_from)
            .collect::<DbResult<_>>()?;

        let key = LocationKey {
            place,
            store_id: store_id.map(str::to_string),
        };
        Ok(reconstruct_at(
            current, &key, &additions, &transfers, &sales, cutoff,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
