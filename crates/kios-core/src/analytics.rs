//! # Analytics Aggregation
//!
//! Pure read-side computation over sales and stock rows. Nothing here
//! mutates; kios-db's `AnalyticsService` loads the rows and delegates.
//!
//! ## Two Profit Formulas
//! The dashboard and the per-product view intentionally compute profit
//! differently, and both are product requirements:
//!
//! ```text
//! dashboard (per product):
//!     revenue = latest observed sale price × total quantity sold
//!     profit  = revenue − current cost price × total quantity sold
//!
//! per-product view (per sale):
//!     revenue = Σ each sale's recorded total
//!     profit  = Σ (sale.total − cost_at(sale.recorded_at) × sale.quantity)
//! ```
//!
//! The dashboard re-prices all historical units at the latest selling price
//! instead of summing recorded totals. That is the formula the owners read
//! their numbers from, so it is reproduced exactly rather than unified with
//! the per-product one.
//!
//! Currency is rounded to 2dp at each aggregation step (see `money`).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::money::round_currency;
use crate::pricing::cost_at;
use crate::types::{PriceEntry, Product, Sale, StockLocation, StockPlace, Store};

// =============================================================================
// Output Types
// =============================================================================

/// Optional calendar-day window for the dashboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateFilter {
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// One product's line on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSalesSummary {
    pub product_name: String,
    pub quantity: Decimal,
    pub revenue: Decimal,
}

/// One store's re-priced revenue on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StoreRevenue {
    pub store_name: String,
    pub revenue: Decimal,
}

/// The top-level dashboard aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    /// Number of sale records (each imported row is one transaction).
    pub sales_count: i64,
    /// Sum of all quantities sold.
    pub total_quantity: Decimal,
    pub sales_by_product: Vec<ProductSalesSummary>,
    pub sales_by_store: Vec<StoreRevenue>,
}

/// One calendar day in a product's sales timeline.
#[derive(Debug, Clone, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub revenue: Decimal,
    pub profit: Decimal,
}

/// One store's totals in a product's analytics view.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSales {
    pub store_name: String,
    pub quantity: Decimal,
    pub revenue: Decimal,
}

/// One stock location with its store name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct StockInfo {
    pub place: StockPlace,
    pub store_id: Option<String>,
    pub store_name: Option<String>,
    pub quantity: Decimal,
}

/// The per-product analytics aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ProductAnalytics {
    pub product: Product,
    pub has_stock: bool,
    pub total_stock: Decimal,
    pub stock_info: Vec<StockInfo>,
    /// Σ recorded sale totals (NOT the dashboard's re-priced revenue).
    pub total_revenue: Decimal,
    pub total_quantity_sold: Decimal,
    /// Point-in-time costed profit.
    pub total_profit: Decimal,
    pub sales_count: i64,
    pub sales_by_date: Vec<DailySales>,
    pub sales_by_store: Vec<StoreSales>,
}

/// One product's line in the stock overview listing.
#[derive(Debug, Clone, Serialize)]
pub struct StockOverviewEntry {
    pub product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub cost_price: Decimal,
    /// Latest observed sale price, if the product has sold at all.
    pub selling_price: Option<Decimal>,
    pub total_stock: Decimal,
    pub stock_locations: Vec<StockInfo>,
    pub sales_count: i64,
    /// Dashboard-formula revenue (latest price × quantity sold).
    pub total_revenue: Decimal,
    /// Dashboard-formula profit (current cost price).
    pub total_profit: Decimal,
    pub total_quantity_sold: Decimal,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Helpers
// =============================================================================

/// The unit price of the most recent sale in `sales`, if any.
fn latest_unit_price<'a, I>(sales: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a Sale>,
{
    sales
        .into_iter()
        .max_by_key(|sale| sale.recorded_at)
        .map(|sale| sale.unit_price)
}

/// revenue = latest price × quantity, or zero when either side is missing.
fn repriced_revenue(latest_price: Option<Decimal>, quantity: Decimal) -> Decimal {
    match latest_price {
        Some(price) if quantity > Decimal::ZERO => round_currency(price * quantity),
        _ => Decimal::ZERO,
    }
}

fn store_name(stores: &[Store], store_id: &str) -> String {
    stores
        .iter()
        .find(|store| store.id == store_id)
        .map(|store| store.name.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

// =============================================================================
// Dashboard
// =============================================================================

/// Computes the top-level dashboard aggregate.
///
/// Sales are grouped by product *name* in first-seen order; revenue and
/// profit use the re-pricing formula described in the module docs. Products
/// missing from the catalog still appear in `sales_by_product` (revenue 0)
/// but contribute nothing to the totals.
pub fn dashboard_summary(
    sales: &[Sale],
    products: &[Product],
    stores: &[Store],
    filter: Option<DateFilter>,
) -> DashboardData {
    let filtered: Vec<&Sale> = sales
        .iter()
        .filter(|sale| filter.map_or(true, |f| f.contains(sale.sale_date)))
        .collect();

    let by_id: HashMap<&str, &Product> =
        products.iter().map(|p| (p.id.as_str(), p)).collect();

    // Grouped by product name, first-seen order preserved.
    let mut groups: Vec<(String, Vec<&Sale>)> = Vec::new();
    for sale in &filtered {
        match groups.iter_mut().find(|(name, _)| *name == sale.product_name) {
            Some((_, group)) => group.push(sale),
            None => groups.push((sale.product_name.clone(), vec![sale])),
        }
    }

    let mut total_sales = Decimal::ZERO;
    let mut total_profit = Decimal::ZERO;
    let mut sales_by_product = Vec::with_capacity(groups.len());

    for (product_name, group) in &groups {
        let quantity: Decimal = group.iter().map(|s| s.quantity).sum();
        let latest = latest_unit_price(group.iter().copied());
        let revenue = repriced_revenue(latest, quantity);

        // The catalog link is by id; every sale in a name group carries the
        // same canonical product_id.
        let product = group.first().and_then(|s| by_id.get(s.product_id.as_str()));

        if let Some(product) = product {
            let cost = product.cost_price * quantity;
            let profit = round_currency(revenue - cost);
            total_sales = round_currency(total_sales + revenue);
            total_profit = round_currency(total_profit + profit);
            sales_by_product.push(ProductSalesSummary {
                product_name: product_name.clone(),
                quantity,
                revenue,
            });
        } else {
            sales_by_product.push(ProductSalesSummary {
                product_name: product_name.clone(),
                quantity,
                revenue: Decimal::ZERO,
            });
        }
    }

    // Per-store revenue uses the same re-pricing: each sale is valued at its
    // product's latest observed price, not its own recorded price.
    let mut latest_by_product: HashMap<&str, Option<Decimal>> = HashMap::new();
    for sale in &filtered {
        latest_by_product
            .entry(sale.product_id.as_str())
            .or_insert_with(|| {
                latest_unit_price(
                    filtered
                        .iter()
                        .filter(|s| s.product_id == sale.product_id)
                        .copied(),
                )
            });
    }

    let mut sales_by_store: Vec<StoreRevenue> = Vec::new();
    for sale in &filtered {
        if !by_id.contains_key(sale.product_id.as_str()) {
            continue;
        }
        let latest = latest_by_product
            .get(sale.product_id.as_str())
            .copied()
            .flatten();
        let revenue = repriced_revenue(latest, sale.quantity);
        let name = store_name(stores, &sale.store_id);

        match sales_by_store.iter_mut().find(|s| s.store_name == name) {
            Some(entry) => entry.revenue = round_currency(entry.revenue + revenue),
            None => sales_by_store.push(StoreRevenue {
                store_name: name,
                revenue,
            }),
        }
    }

    DashboardData {
        total_sales,
        total_profit,
        sales_count: filtered.len() as i64,
        total_quantity: filtered.iter().map(|s| s.quantity).sum(),
        sales_by_product,
        sales_by_store,
    }
}

// =============================================================================
// Per-Product View
// =============================================================================

/// Computes one product's analytics.
///
/// ## Arguments
/// * `product` - the catalog product
/// * `cost_history` - its cost timeline, for point-in-time costing
/// * `sales` - the product's sales only
/// * `locations` - the product's stock locations only
/// * `stores` - all stores, for name resolution
pub fn product_analytics(
    product: &Product,
    cost_history: &[PriceEntry],
    sales: &[Sale],
    locations: &[StockLocation],
    stores: &[Store],
) -> ProductAnalytics {
    let total_stock: Decimal = locations.iter().map(|loc| loc.quantity).sum();

    let stock_info = locations
        .iter()
        .map(|loc| StockInfo {
            place: loc.place,
            store_id: loc.store_id.clone(),
            store_name: loc
                .store_id
                .as_deref()
                .map(|id| store_name(stores, id)),
            quantity: loc.quantity,
        })
        .collect();

    let mut total_revenue = Decimal::ZERO;
    let mut total_profit = Decimal::ZERO;
    let mut total_quantity_sold = Decimal::ZERO;

    let mut by_date: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    let mut by_store: Vec<StoreSales> = Vec::new();

    for sale in sales {
        let cost = cost_at(cost_history, product.cost_price, sale.recorded_at);
        let profit = round_currency(sale.total - cost * sale.quantity);

        total_revenue = round_currency(total_revenue + sale.total);
        total_profit = round_currency(total_profit + profit);
        total_quantity_sold += sale.quantity;

        let day = by_date.entry(sale.sale_date).or_insert_with(|| DailySales {
            date: sale.sale_date,
            quantity: Decimal::ZERO,
            revenue: Decimal::ZERO,
            profit: Decimal::ZERO,
        });
        day.quantity += sale.quantity;
        day.revenue = round_currency(day.revenue + sale.total);
        day.profit = round_currency(day.profit + profit);

        let name = store_name(stores, &sale.store_id);
        match by_store.iter_mut().find(|s| s.store_name == name) {
            Some(entry) => {
                entry.quantity += sale.quantity;
                entry.revenue = round_currency(entry.revenue + sale.total);
            }
            None => by_store.push(StoreSales {
                store_name: name,
                quantity: sale.quantity,
                revenue: round_currency(sale.total),
            }),
        }
    }

    ProductAnalytics {
        product: product.clone(),
        has_stock: total_stock > Decimal::ZERO,
        total_stock,
        stock_info,
        total_revenue,
        total_quantity_sold,
        total_profit,
        sales_count: sales.len() as i64,
        sales_by_date: by_date.into_values().collect(),
        sales_by_store: by_store,
    }
}

// =============================================================================
// Stock Overview
// =============================================================================

/// Per-product stock and revenue listing, sorted by product name.
///
/// Uses the dashboard formulas (latest observed price, current cost price),
/// so this listing and the dashboard always agree with each other.
pub fn stock_overview(
    products: &[Product],
    locations: &[StockLocation],
    sales: &[Sale],
    stores: &[Store],
) -> Vec<StockOverviewEntry> {
    let mut entries: Vec<StockOverviewEntry> = products
        .iter()
        .map(|product| {
            let product_locations: Vec<&StockLocation> = locations
                .iter()
                .filter(|loc| loc.product_id == product.id)
                .collect();
            let total_stock: Decimal =
                product_locations.iter().map(|loc| loc.quantity).sum();

            let product_sales: Vec<&Sale> = sales
                .iter()
                .filter(|sale| sale.product_id == product.id)
                .collect();
            let total_quantity_sold: Decimal =
                product_sales.iter().map(|s| s.quantity).sum();

            let latest = latest_unit_price(product_sales.iter().copied());
            let total_revenue = repriced_revenue(latest, total_quantity_sold);
            let total_profit =
                round_currency(total_revenue - product.cost_price * total_quantity_sold);

            StockOverviewEntry {
                product_id: product.id.clone(),
                name: product.name.clone(),
                sku: product.sku.clone(),
                cost_price: product.cost_price,
                selling_price: latest,
                total_stock,
                stock_locations: product_locations
                    .iter()
                    .map(|loc| StockInfo {
                        place: loc.place,
                        store_id: loc.store_id.clone(),
                        store_name: loc
                            .store_id
                            .as_deref()
                            .map(|id| store_name(stores, id)),
                        quantity: loc.quantity,
                    })
                    .collect(),
                sales_count: product_sales.len() as i64,
                total_revenue,
                total_profit,
                total_quantity_sold,
                created_at: product.created_at,
            }
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceUpdateMode, StoreType};
    use chrono::NaiveDateTime;
    use std::str::FromStr;

    fn ts(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product(id: &str, name: &str, cost: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            sku: None,
            cost_price: Decimal::from(cost),
            selling_price: None,
            price_update_mode: PriceUpdateMode::OnDate,
            created_at: ts("2025-01-01 00:00"),
        }
    }

    fn store(id: &str, name: &str) -> Store {
        Store {
            id: id.to_string(),
            name: name.to_string(),
            store_type: StoreType::Online,
            address: None,
            created_at: ts("2025-01-01 00:00"),
        }
    }

    fn sale(product: &Product, store: &str, qty: i64, price: i64, at: &str) -> Sale {
        let quantity = Decimal::from(qty);
        let unit_price = Decimal::from(price);
        Sale {
            id: format!("s-{at}"),
            store_id: store.to_string(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price,
            total: quantity * unit_price,
            sale_date: ts(at).date_naive(),
            recorded_at: ts(at),
        }
    }

    #[test]
    fn test_dashboard_reprices_at_latest_observed_price() {
        let p = product("p1", "Kaos", 1000);
        let stores = vec![store("st1", "Shopee")];
        // 3 units at 1500 then 2 units at 2000: revenue re-prices all 5
        // units at 2000, not 3×1500 + 2×2000.
        let sales = vec![
            sale(&p, "st1", 3, 1500, "2025-02-01 10:00"),
            sale(&p, "st1", 2, 2000, "2025-03-01 10:00"),
        ];

        let data = dashboard_summary(&sales, &[p], &stores, None);
        assert_eq!(data.total_sales, Decimal::from(10000));
        // profit = 10000 - 1000×5
        assert_eq!(data.total_profit, Decimal::from(5000));
        assert_eq!(data.sales_count, 2);
        assert_eq!(data.total_quantity, Decimal::from(5));

        assert_eq!(data.sales_by_product.len(), 1);
        assert_eq!(data.sales_by_product[0].revenue, Decimal::from(10000));

        // Store revenue uses the same re-pricing per sale: 3×2000 + 2×2000.
        assert_eq!(data.sales_by_store.len(), 1);
        assert_eq!(data.sales_by_store[0].store_name, "Shopee");
        assert_eq!(data.sales_by_store[0].revenue, Decimal::from(10000));
    }

    #[test]
    fn test_dashboard_unknown_product_excluded_from_totals() {
        let p = product("p1", "Kaos", 1000);
        let mut orphan = sale(&p, "st1", 4, 999, "2025-02-01 10:00");
        orphan.product_id = "missing".to_string();
        orphan.product_name = "Ghost".to_string();

        let stores = vec![store("st1", "Shopee")];
        let sales = vec![sale(&p, "st1", 1, 1500, "2025-02-02 10:00"), orphan];

        let data = dashboard_summary(&sales, &[p], &stores, None);
        assert_eq!(data.total_sales, Decimal::from(1500));
        // The orphan still shows in the per-product listing with revenue 0.
        let ghost = data
            .sales_by_product
            .iter()
            .find(|s| s.product_name == "Ghost")
            .unwrap();
        assert_eq!(ghost.revenue, Decimal::ZERO);
        assert_eq!(ghost.quantity, Decimal::from(4));
    }

    #[test]
    fn test_dashboard_date_filter() {
        let p = product("p1", "Kaos", 1000);
        let stores = vec![store("st1", "Shopee")];
        let sales = vec![
            sale(&p, "st1", 3, 1500, "2025-02-01 10:00"),
            sale(&p, "st1", 2, 2000, "2025-03-01 10:00"),
        ];

        let filter = DateFilter {
            from: Some(ts("2025-02-01 00:00").date_naive()),
            to: Some(ts("2025-02-28 00:00").date_naive()),
        };
        let data = dashboard_summary(&sales, std::slice::from_ref(&p), &stores, Some(filter));
        // Only the February sale is in scope; its own price is the latest.
        assert_eq!(data.sales_count, 1);
        assert_eq!(data.total_sales, Decimal::from(4500));
    }

    #[test]
    fn test_product_analytics_uses_point_in_time_cost() {
        let p = product("p1", "Kaos", 1200);
        let history = vec![
            PriceEntry {
                price: Decimal::from(1000),
                recorded_at: ts("2025-01-01 00:00"),
            },
            PriceEntry {
                price: Decimal::from(1200),
                recorded_at: ts("2025-02-15 00:00"),
            },
        ];
        let stores = vec![store("st1", "Shopee")];
        // First sale costed at 1000 (before the raise), second at 1200.
        let sales = vec![
            sale(&p, "st1", 2, 1500, "2025-02-01 10:00"),
            sale(&p, "st1", 1, 1500, "2025-03-01 10:00"),
        ];
        let locations = vec![StockLocation {
            product_id: "p1".to_string(),
            place: StockPlace::Warehouse,
            store_id: None,
            quantity: Decimal::from(7),
        }];

        let analytics = product_analytics(&p, &history, &sales, &locations, &stores);
        // revenue: Σ recorded totals, not re-priced.
        assert_eq!(analytics.total_revenue, Decimal::from(4500));
        // profit: (3000 - 2×1000) + (1500 - 1×1200) = 1000 + 300.
        assert_eq!(analytics.total_profit, Decimal::from(1300));
        assert_eq!(analytics.total_quantity_sold, Decimal::from(3));
        assert!(analytics.has_stock);
        assert_eq!(analytics.total_stock, Decimal::from(7));

        assert_eq!(analytics.sales_by_date.len(), 2);
        assert_eq!(analytics.sales_by_date[0].profit, Decimal::from(1000));
        assert_eq!(analytics.sales_by_store.len(), 1);
        assert_eq!(analytics.sales_by_store[0].quantity, Decimal::from(3));
    }

    #[test]
    fn test_product_analytics_without_stock() {
        let p = product("p1", "Kaos", 1000);
        let analytics = product_analytics(&p, &[], &[], &[], &[]);
        assert!(!analytics.has_stock);
        assert_eq!(analytics.total_stock, Decimal::ZERO);
        assert_eq!(analytics.sales_count, 0);
    }

    #[test]
    fn test_stock_overview_sorted_and_repriced() {
        let a = product("p1", "Zebra", 500);
        let b = product("p2", "Apel", 100);
        let stores = vec![store("st1", "Shopee")];
        let sales = vec![sale(&a, "st1", 2, 800, "2025-02-01 10:00")];
        let locations = vec![StockLocation {
            product_id: "p1".to_string(),
            place: StockPlace::ShopFloor,
            store_id: None,
            quantity: Decimal::from(4),
        }];

        let overview = stock_overview(&[a, b], &locations, &sales, &stores);
        assert_eq!(overview.len(), 2);
        // Sorted by name: Apel before Zebra.
        assert_eq!(overview[0].name, "Apel");
        assert_eq!(overview[0].selling_price, None);
        assert_eq!(overview[0].total_revenue, Decimal::ZERO);

        assert_eq!(overview[1].name, "Zebra");
        assert_eq!(overview[1].selling_price, Some(Decimal::from(800)));
        assert_eq!(overview[1].total_revenue, Decimal::from(1600));
        assert_eq!(overview[1].total_profit, Decimal::from(600));
        assert_eq!(overview[1].total_stock, Decimal::from(4));
    }

    #[test]
    fn test_rounding_applied_per_aggregation_step() {
        let p = product("p1", "Kaos", 0);
        let stores = vec![store("st1", "Shopee")];
        let mut s = sale(&p, "st1", 1, 0, "2025-02-01 10:00");
        s.unit_price = dec("10.005");
        s.total = dec("10.005");

        let data = dashboard_summary(&[s], &[p], &stores, None);
        // 10.005 × 1 rounds half-away-from-zero to 10.01 at the product step.
        assert_eq!(data.total_sales, dec("10.01"));
    }
}
