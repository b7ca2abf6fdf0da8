//! # Stock Reconstruction
//!
//! Answers "how much stock did this location hold at the end of day D?"
//! without storing snapshots. Only the *current* resting quantity is stored;
//! history questions are answered by replaying the event logs backwards from
//! now to the target day.
//!
//! ## Backward Replay
//! ```text
//!            now ────────────────────────► target day D
//!
//!  start from current quantity, then invert every event AFTER D,
//!  one category at a time:
//!
//!    1. additions into loc    ─► subtract their quantities
//!    2. transfers into loc    ─► subtract their quantities
//!    3. transfers out of loc  ─► add their quantities back
//!    4. sales (shop floor)    ─► add their quantities back
//! ```
//!
//! The running quantity is floored at zero after every step. Event logs can
//! be incomplete (the system predates some of them), so an inverse step can
//! push the replayed value negative; clamping keeps the estimate sane at the
//! cost of exactness. Because of the clamp the category order matters: all
//! subtractions land before any add-back. The result is an estimate, not an
//! audited balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{ProductAddition, ProductTransfer, Sale, StockPlace};

/// Identifies the location being reconstructed.
///
/// `store_id: None` is the pooled location. For sales, `None` matches every
/// sale of the product (pooled shop-floor stock serves all stores), while
/// `Some` matches only that store's sales.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationKey {
    pub place: StockPlace,
    pub store_id: Option<String>,
}

impl LocationKey {
    pub fn pooled(place: StockPlace) -> Self {
        LocationKey {
            place,
            store_id: None,
        }
    }

    fn matches(&self, place: StockPlace, store_id: &Option<String>) -> bool {
        self.place == place && self.store_id == *store_id
    }

    fn matches_sale(&self, sale_store_id: &str) -> bool {
        match &self.store_id {
            None => true,
            Some(id) => id == sale_store_id,
        }
    }
}

/// Reconstructs the quantity at `location` as of the end of instant `cutoff`.
///
/// ## Arguments
/// * `current` - the location's present resting quantity
/// * `location` - which location to reconstruct
/// * `additions`, `transfers`, `sales` - the product's full event logs, any order
/// * `cutoff` - events at or before this instant are considered already
///   reflected in the reconstructed value
///
/// Events strictly after `cutoff` are inverted category by category
/// (additions, transfers in, transfers out, sales); the running value is
/// clamped at zero after each step.
pub fn reconstruct_at(
    current: Decimal,
    location: &LocationKey,
    additions: &[ProductAddition],
    transfers: &[ProductTransfer],
    sales: &[Sale],
    cutoff: DateTime<Utc>,
) -> Decimal {
    let mut quantity = current.max(Decimal::ZERO);

    for addition in additions {
        if addition.recorded_at > cutoff
            && location.matches(addition.place, &addition.store_id)
        {
            quantity = (quantity - addition.quantity).max(Decimal::ZERO);
        }
    }

    for transfer in transfers {
        if transfer.recorded_at > cutoff
            && location.matches(transfer.to_place, &transfer.to_store_id)
        {
            quantity = (quantity - transfer.quantity).max(Decimal::ZERO);
        }
    }

    for transfer in transfers {
        if transfer.recorded_at > cutoff
            && location.matches(transfer.from_place, &transfer.from_store_id)
        {
            quantity += transfer.quantity;
        }
    }

    // Sales only ever draw from the shop floor.
    if location.place == StockPlace::ShopFloor {
        for sale in sales {
            if sale.recorded_at > cutoff && location.matches_sale(&sale.store_id) {
                quantity += sale.quantity;
            }
        }
    }

    quantity
}

// =============================================================================
// Unit Tests
// =============================================================================
