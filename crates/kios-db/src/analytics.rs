//! # Analytics Service
//!
//! Read-side loader: gathers the rows each report needs and delegates the
//! arithmetic to `kios_core::analytics`, which is pure and unit-tested on
//! its own. Nothing in this module writes.

use chrono::NaiveDate;

use crate::error::ServiceResult;
use crate::pool::Database;
use kios_core::analytics::{
    dashboard_summary, product_analytics, stock_overview, DashboardData, DateFilter,
    ProductAnalytics, StockOverviewEntry,
};
use kios_core::{ProductAddition, ProductTransfer};

/// Stock events recorded on one calendar day (UTC).
#[derive(Debug, Clone)]
pub struct DailyMovement {
    pub additions: Vec<ProductAddition>,
    pub transfers: Vec<ProductTransfer>,
}

/// The analytics service.
///
/// ## Usage
/// ```rust,ignore
/// let data = db.analytics().dashboard(None).await?;
/// println!("total sales: {}", data.total_sales);
/// ```
pub struct AnalyticsService {
    db: Database,
}

impl AnalyticsService {
    /// Creates the analytics service.
    pub fn new(db: Database) -> Self {
        AnalyticsService { db }
    }

    /// The top-level dashboard, optionally windowed to a day range.
    pub async fn dashboard(&self, filter: Option<DateFilter>) -> ServiceResult<DashboardData> {
        let sales = self.db.sales().list().await?;
        let products = self.db.products().list().await?;
        let stores = self.db.stores().list().await?;
        Ok(dashboard_summary(&sales, &products, &stores, filter))
    }

    /// One product's analytics view (point-in-time costed).
    pub async fn product_analytics(&self, product_id: &str) -> ServiceResult<ProductAnalytics> {
        let product = self.db.products().get(product_id).await?;
        let cost_history = self.db.products().cost_history(product_id).await?;
        let sales = self.db.sales().list_for_product(product_id).await?;
        let locations = self.db.stock().locations_for(product_id).await?;
        let stores = self.db.stores().list().await?;
        Ok(product_analytics(
            &product,
            &cost_history,
            &sales,
            &locations,
            &stores,
        ))
    }

    /// Per-product stock and revenue listing, sorted by name.
    pub async fn stock_overview(&self) -> ServiceResult<Vec<StockOverviewEntry>> {
        let products = self.db.products().list().await?;
        let locations = self.db.stock().all_locations().await?;
        let sales = self.db.sales().list().await?;
        let stores = self.db.stores().list().await?;
        Ok(stock_overview(&products, &locations, &sales, &stores))
    }

    /// All stock events recorded on one calendar day.
    pub async fn daily_movement(&self, day: NaiveDate) -> ServiceResult<DailyMovement> {
        Ok(DailyMovement {
            additions: self.db.stock().additions_on(day).await?,
            transfers: self.db.stock().transfers_on(day).await?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
