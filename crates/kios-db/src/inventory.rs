//! # Inventory Service
//!
//! Caller-facing stock and pricing operations. The repositories apply
//! events; this layer validates input, enforces the business rules that
//! span repositories, and decides which movements may go negative.
//!
//! ## Decrement Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transfer_stock   validate first, then apply    → rejected up front     │
//! │  reduce_stock     repository checks atomically  → rejected atomically   │
//! │  sales import     floors at zero after its gate → never rejected here   │
//! │                                                                         │
//! │  All three surface shortfalls as InsufficientStock with the product     │
//! │  name and the exact available/requested amounts.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::ServiceResult;
use crate::pool::Database;
use crate::repository::stock::ReductionOutcome;
use kios_core::validation::{reject_future_date, require_positive};
use kios_core::{CoreError, PriceUpdateMode, ProductAddition, ProductTransfer, StockPlace};

/// The inventory service.
///
/// ## Usage
/// ```rust,ignore
/// let inventory = db.inventory();
/// inventory
///     .add_stock(&product_id, StockPlace::Warehouse, None, Decimal::from(10), None, None)
///     .await?;
/// ```
pub struct Inventory {
    db: Database,
}

impl Inventory {
    /// Creates the inventory service.
    pub fn new(db: Database) -> Self {
        Inventory { db }
    }

    /// Records a stock-in at a location.
    ///
    /// ## Arguments
    /// * `backdated` - calendar day for a historical entry; recorded at
    ///   midnight UTC of that day. Future days are rejected. `None` means
    ///   now.
    /// * `purchase_cost` - unit cost paid for this batch. For a product in
    ///   `OnPurchase` mode this also appends to the cost timeline and
    ///   becomes the current cost price; in `OnDate` mode it is ignored.
    pub async fn add_stock(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        quantity: Decimal,
        backdated: Option<NaiveDate>,
        purchase_cost: Option<Decimal>,
    ) -> ServiceResult<ProductAddition> {
        require_positive("quantity", quantity)?;

        let recorded_at = match backdated {
            Some(day) => {
                reject_future_date("date", day, Utc::now().date_naive())?;
                day.and_time(NaiveTime::MIN).and_utc()
            }
            None => Utc::now(),
        };

        let product = self.db.products().get(product_id).await?;

        if product.price_update_mode == PriceUpdateMode::OnPurchase {
            if let Some(cost) = purchase_cost {
                require_positive("purchase cost", cost)?;
                self.db.products().record_cost(product_id, cost, recorded_at).await?;
            }
        }

        let addition = self
            .db
            .stock()
            .apply_addition(product_id, place, store_id, quantity, recorded_at)
            .await?;

        info!(product = %product.name, %quantity, place = %place, "Stock added");
        Ok(addition)
    }

    /// Moves quantity between two locations, rejecting shortfalls.
    ///
    /// Validated against the source's current quantity before the event is
    /// applied; a rejected transfer leaves both locations untouched and no
    /// event behind.
    pub async fn transfer_stock(
        &self,
        product_id: &str,
        from_place: StockPlace,
        from_store_id: Option<&str>,
        to_place: StockPlace,
        to_store_id: Option<&str>,
        quantity: Decimal,
    ) -> ServiceResult<ProductTransfer> {
        require_positive("quantity", quantity)?;
        let product = self.db.products().get(product_id).await?;

        let available = self
            .db
            .stock()
            .quantity_at(product_id, from_place, from_store_id)
            .await?;
        if quantity > available {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available,
                requested: quantity,
            }
            .into());
        }

        let transfer = self
            .db
            .stock()
            .apply_transfer(
                product_id,
                from_place,
                from_store_id,
                to_place,
                to_store_id,
                quantity,
                Utc::now(),
            )
            .await?;

        info!(product = %product.name, %quantity, "Stock transferred");
        Ok(transfer)
    }

    /// Writes off quantity at a location (damage, loss, correction).
    ///
    /// Returns the remaining quantity. Unlike transfers the check and the
    /// decrement are atomic in the repository, so concurrent reductions
    /// cannot both pass on the same units.
    pub async fn reduce_stock(
        &self,
        product_id: &str,
        place: StockPlace,
        store_id: Option<&str>,
        quantity: Decimal,
    ) -> ServiceResult<Decimal> {
        require_positive("quantity", quantity)?;
        let product = self.db.products().get(product_id).await?;

        match self
            .db
            .stock()
            .apply_reduction(product_id, place, store_id, quantity)
            .await?
        {
            ReductionOutcome::Applied(remaining) => {
                info!(product = %product.name, %quantity, %remaining, "Stock reduced");
                Ok(remaining)
            }
            ReductionOutcome::Insufficient { available } => Err(CoreError::InsufficientStock {
                product: product.name,
                available,
                requested: quantity,
            }
            .into()),
        }
    }

    /// Records a cost-price change on the product's timeline and sets its
    /// price-update mode.
    ///
    /// `effective` places the entry at a chosen instant (backdating allowed,
    /// future days rejected); `None` means now. The new price becomes the
    /// current cost regardless of where the entry lands on the timeline.
    pub async fn set_cost_price(
        &self,
        product_id: &str,
        price: Decimal,
        effective: Option<DateTime<Utc>>,
        mode: PriceUpdateMode,
    ) -> ServiceResult<()> {
        require_positive("cost price", price)?;

        let recorded_at = effective.unwrap_or_else(Utc::now);
        reject_future_date("date", recorded_at.date_naive(), Utc::now().date_naive())?;

        self.db.products().record_cost(product_id, price, recorded_at).await?;
        self.db.products().set_price_update_mode(product_id, mode).await?;
        Ok(())
    }

    /// Switches how a product's cost price is maintained.
    pub async fn set_price_mode(
        &self,
        product_id: &str,
        mode: PriceUpdateMode,
    ) -> ServiceResult<()> {
        self.db.products().set_price_update_mode(product_id, mode).await?;
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
    use chrono::Duration;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, mode: PriceUpdateMode) -> String {
        db.products()
            .insert("Kaos", None, Decimal::from(1000), mode)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_add_stock_rejects_non_positive_quantity() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;

        let err = db
            .inventory()
            .add_stock(&product_id, StockPlace::Warehouse, None, Decimal::ZERO, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[tokio::test]
    async fn test_add_stock_backdated_lands_at_midnight() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;
        let day = Utc::now().date_naive() - Duration::days(3);

        db.inventory()
            .add_stock(&product_id, StockPlace::Warehouse, None, Decimal::from(5), Some(day), None)
            .await
            .unwrap();

        let additions = db.stock().additions_for(&product_id).await.unwrap();
        assert_eq!(additions.len(), 1);
        assert_eq!(additions[0].recorded_at.date_naive(), day);
        assert_eq!(
            additions[0].recorded_at,
            day.and_hms_opt(0, 0, 0).unwrap().and_utc()
        );
    }

    #[tokio::test]
    async fn test_add_stock_rejects_future_date() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;
        let tomorrow = Utc::now().date_naive() + Duration::days(1);

        let err = db
            .inventory()
            .add_stock(&product_id, StockPlace::Warehouse, None, Decimal::from(5), Some(tomorrow), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("future"));
    }

    #[tokio::test]
    async fn test_on_purchase_mode_captures_cost() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnPurchase).await;

        db.inventory()
            .add_stock(
                &product_id,
                StockPlace::Warehouse,
                None,
                Decimal::from(10),
                None,
                Some(Decimal::from(1200)),
            )
            .await
            .unwrap();

        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.cost_price, Decimal::from(1200));
        assert_eq!(db.products().cost_history(&product_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_on_date_mode_ignores_purchase_cost() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;

        db.inventory()
            .add_stock(
                &product_id,
                StockPlace::Warehouse,
                None,
                Decimal::from(10),
                None,
                Some(Decimal::from(1200)),
            )
            .await
            .unwrap();

        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.cost_price, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_transfer_rejects_shortfall_without_side_effects() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;
        db.inventory()
            .add_stock(&product_id, StockPlace::Warehouse, None, Decimal::from(2), None, None)
            .await
            .unwrap();

        let err = db
            .inventory()
            .transfer_stock(
                &product_id,
                StockPlace::Warehouse,
                None,
                StockPlace::ShopFloor,
                None,
                Decimal::from(5),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("available 2"));
        assert!(err.to_string().contains("requested 5"));

        // Rejected transfer leaves no event behind.
        assert!(db.stock().transfers_for(&product_id).await.unwrap().is_empty());
        let warehouse = db
            .stock()
            .quantity_at(&product_id, StockPlace::Warehouse, None)
            .await
            .unwrap();
        assert_eq!(warehouse, Decimal::from(2));
    }

    #[tokio::test]
    async fn test_reduce_stock_returns_remaining() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;
        db.inventory()
            .add_stock(&product_id, StockPlace::ShopFloor, None, Decimal::from(5), None, None)
            .await
            .unwrap();

        let remaining = db
            .inventory()
            .reduce_stock(&product_id, StockPlace::ShopFloor, None, Decimal::from(3))
            .await
            .unwrap();
        assert_eq!(remaining, Decimal::from(2));

        let err = db
            .inventory()
            .reduce_stock(&product_id, StockPlace::ShopFloor, None, Decimal::from(3))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient stock"));
    }

    #[tokio::test]
    async fn test_set_cost_price_backdated_becomes_current() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;

        let last_month = Utc::now() - Duration::days(30);
        db.inventory()
            .set_cost_price(&product_id, Decimal::from(800), Some(last_month), PriceUpdateMode::OnDate)
            .await
            .unwrap();

        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.cost_price, Decimal::from(800));
    }

    #[tokio::test]
    async fn test_set_price_mode() {
        let db = db().await;
        let product_id = seed_product(&db, PriceUpdateMode::OnDate).await;

        db.inventory()
            .set_price_mode(&product_id, PriceUpdateMode::OnPurchase)
            .await
            .unwrap();

        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.price_update_mode, PriceUpdateMode::OnPurchase);
    }
}
