//! # Domain Types
//!
//! Core domain types for the inventory ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Product      │   │      Store      │   │  StockLocation  │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id, name, sku  │   │  id, name       │   │  product_id     │        │
//! │  │  cost_price     │   │  Offline/Online │   │  place          │        │
//! │  │  selling_price  │   │  address        │   │  store_id?      │        │
//! │  └─────────────────┘   └─────────────────┘   │  quantity       │        │
//! │                                              └─────────────────┘        │
//! │                                                                         │
//! │  Event logs (append-only, immutable):                                   │
//! │  ProductAddition ── ProductTransfer ── Sale ── UndetectedProduct        │
//! │                     SalesUploadHistory                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events never mutate `StockLocation` by themselves; the stock ledger in
//! kios-db applies the event and the quantity change in one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Enums
// =============================================================================

/// Where a product's stock physically rests.
///
/// `Warehouse` (gudang) is the single non-customer-facing pool; `ShopFloor`
/// (toko) is customer-facing and may optionally be subdivided per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPlace {
    Warehouse,
    ShopFloor,
}

/// Whether a store is a physical shop or an online marketplace presence.
///
/// The distinction decides which pooled location sales draw from: online
/// stores ship from the warehouse, offline stores sell off the shop floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Offline,
    Online,
}

/// When a product's cost price gets updated.
///
/// `OnDate`: the owner records price changes explicitly with a timestamp.
/// `OnPurchase`: the cost price follows each stock-in's purchase price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUpdateMode {
    OnDate,
    OnPurchase,
}

impl Default for PriceUpdateMode {
    fn default() -> Self {
        PriceUpdateMode::OnDate
    }
}

// The enums are persisted as TEXT, so they need stable string forms.

macro_rules! enum_text {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($ty::$variant => $text,)+
                };
                f.write_str(s)
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ValidationError::InvalidFormat {
                        field: stringify!($ty).to_string(),
                        reason: format!("unknown value '{other}'"),
                    }),
                }
            }
        }
    };
}

enum_text!(StockPlace {
    Warehouse => "warehouse",
    ShopFloor => "shop_floor",
});

enum_text!(StoreType {
    Offline => "offline",
    Online => "online",
});

enum_text!(PriceUpdateMode {
    OnDate => "on_date",
    OnPurchase => "on_purchase",
});

// =============================================================================
// Catalog
// =============================================================================

/// One entry in a product's price timeline.
///
/// Entries are immutable once written; new prices are appended, never edited
/// in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub price: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// A catalog product.
///
/// Invariant: `cost_price` always equals the most recently *applied* entry
/// in the product's cost history (see `pricing` for why "applied" and
/// "latest by timestamp" can differ).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name; the fuzzy matcher links upload rows against this.
    pub name: String,

    /// Optional stock keeping unit.
    pub sku: Option<String>,

    /// Current cost price (harga modal), the basis for profit.
    pub cost_price: Decimal,

    /// Latest observed selling price, if any sale has been imported.
    pub selling_price: Option<Decimal>,

    pub price_update_mode: PriceUpdateMode,

    pub created_at: DateTime<Utc>,
}

/// A sales channel: one physical shop or one online marketplace presence.
///
/// Store names are unique case- and whitespace-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub store_type: StoreType,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock
// =============================================================================

/// Resting quantity of one product at one location.
///
/// `store_id` is the pooled sentinel when `None`: warehouse stock is always
/// pooled, and in the simplified store model the shop floor is one pool
/// shared by every offline store. Callers must normalize "no store" to
/// `None` before any lookup; there is no distinction between omitted and
/// explicitly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLocation {
    pub product_id: String,
    pub place: StockPlace,
    pub store_id: Option<String>,
    /// Non-negative by construction: every writer clamps or validates first.
    pub quantity: Decimal,
}

/// Stock-in event (append-only).
///
/// Recording the event does not itself change the resting quantity; the
/// stock ledger applies both together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAddition {
    pub id: String,
    pub product_id: String,
    pub place: StockPlace,
    pub store_id: Option<String>,
    pub quantity: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Stock movement between two locations (append-only).
///
/// Both sides of the move update atomically with this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTransfer {
    pub id: String,
    pub product_id: String,
    pub from_place: StockPlace,
    pub from_store_id: Option<String>,
    pub to_place: StockPlace,
    pub to_store_id: Option<String>,
    pub quantity: Decimal,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Sales
// =============================================================================

/// One imported sale row (append-only).
///
/// `product_name` is a snapshot of the catalog name at import time, so the
/// sale history stays readable even if the product is later renamed.
/// `sale_date` is the calendar day (for filtering); `recorded_at` is the full
/// payment instant (for ordering and point-in-time cost lookups).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub store_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// quantity × unit_price, fixed at import time.
    pub total: Decimal,
    pub sale_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

/// An upload row the matcher could not link to any catalog product.
///
/// Kept as a diagnostic so the owner can fix the catalog and re-import;
/// the row itself is excluded from the sales batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndetectedProduct {
    pub id: String,
    /// The raw free-text label from the source row.
    pub product_name: String,
    pub store_id: String,
    pub store_name: String,
    /// 2-based row number in the source file (row 1 is the header).
    pub row_number: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Audit record for one upload attempt, successful or not.
///
/// Deletable by id for administrative cleanup; deleting it does not reverse
/// the sales or stock effects it recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesUploadHistory {
    pub id: String,
    pub store_id: String,
    pub store_name: String,
    pub file_name: String,
    pub file_type: String,
    pub imported: i64,
    pub skipped: i64,
    pub total_rows: i64,
    pub errors: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!(StockPlace::Warehouse.to_string(), "warehouse");
        assert_eq!("shop_floor".parse::<StockPlace>().unwrap(), StockPlace::ShopFloor);
        assert_eq!("online".parse::<StoreType>().unwrap(), StoreType::Online);
        assert_eq!(PriceUpdateMode::OnPurchase.to_string(), "on_purchase");
    }

    #[test]
    fn test_enum_text_rejects_unknown() {
        let err = "gudang".parse::<StockPlace>().unwrap_err();
        assert!(err.to_string().contains("unknown value"));
    }

    #[test]
    fn test_price_update_mode_default() {
        assert_eq!(PriceUpdateMode::default(), PriceUpdateMode::OnDate);
    }
}
