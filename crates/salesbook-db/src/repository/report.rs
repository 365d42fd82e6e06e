//! # Report Repository
//!
//! Read-only aggregates over the other repositories. The arithmetic lives in
//! `salesbook_core::report`; this module only gathers the inputs.
//!
//! ## Dashboard Assembly
//! ```text
//! period ──► resolve_window(now) ──► DateRange
//!                                      │
//!      ┌───────────────┬───────────────┼───────────────┬──────────────┐
//!      ▼               ▼               ▼               ▼              ▼
//!  sales in range  top products    products      payment options  expenses
//!                  (all sales)                                    in range
//!      └───────────────┴───────────────┴───────────────┴──────────────┘
//!                                      │
//!                                      ▼
//!                           DashboardStats::build
//! ```

use chrono::Utc;
use tracing::debug;

use salesbook_core::report::{
    expense_days, resolve_window, DashboardInputs, DashboardPeriod, DashboardStats, SalesReport,
    StockReport,
};
use salesbook_core::validation::validate_range;
use salesbook_core::{DateRange, ExpenseFilters, ProductFilters, SaleFilters, TOP_PRODUCTS_LIMIT};

use super::{
    ExpenseRepository, PreferencesRepository, ProductRepository, SaleRepository, StatusRepository,
};
use crate::error::DbResult;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct ReportRepository<S> {
    products: ProductRepository<S>,
    statuses: StatusRepository<S>,
    sales: SaleRepository<S>,
    preferences: PreferencesRepository<S>,
    expenses: ExpenseRepository<S>,
}

impl<S: Store> ReportRepository<S> {
    pub fn new(
        products: ProductRepository<S>,
        statuses: StatusRepository<S>,
        sales: SaleRepository<S>,
        preferences: PreferencesRepository<S>,
        expenses: ExpenseRepository<S>,
    ) -> Self {
        ReportRepository {
            products,
            statuses,
            sales,
            preferences,
            expenses,
        }
    }

    /// Dashboard figures for a named period, or for `custom` when the
    /// period is `Custom`.
    ///
    /// ## Errors
    /// - `CoreError::CustomRangeRequired` when `Custom` comes without a range
    /// - Validation error when the custom range ends before it starts
    pub async fn dashboard_stats(
        &self,
        period: DashboardPeriod,
        custom: Option<DateRange>,
    ) -> DbResult<DashboardStats> {
        let window = resolve_window(period, custom, Utc::now())?;
        validate_range(&window)?;

        let sales = self.sales.list(&SaleFilters::in_range(window)).await?;
        let top_products = self.sales.top_products(TOP_PRODUCTS_LIMIT).await?;
        let products = self.products.list(&ProductFilters::default()).await?;
        let preferences = self.preferences.get().await?;
        let (first_day, last_day) = expense_days(period, &window);
        let expenses = self
            .expenses
            .list(&ExpenseFilters::between(first_day, last_day))
            .await?;

        debug!(
            ?period,
            sales = sales.len(),
            expenses = expenses.len(),
            "Building dashboard"
        );

        Ok(DashboardStats::build(DashboardInputs {
            window,
            sales,
            top_products,
            products: &products,
            payment_options: &preferences.payment_methods,
            expenses: &expenses,
        }))
    }

    /// Valuation of the whole catalog, with a per-status breakdown.
    pub async fn stock_report(&self) -> DbResult<StockReport> {
        let products = self.products.list(&ProductFilters::default()).await?;
        let statuses = self.statuses.list().await?;
        Ok(StockReport::build(products, &statuses, Utc::now()))
    }

    /// Sales inside `range` (inclusive) with their totals.
    pub async fn sales_report(&self, range: DateRange) -> DbResult<SalesReport> {
        validate_range(&range)?;
        let sales = self.sales.list(&SaleFilters::in_range(range)).await?;
        Ok(SalesReport::build(range, sales))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use salesbook_core::{
        CoreError, ExpenseCategory, ExpenseInput, Money, Product, ProductInput, SaleInput,
        SaleItemInput,
    };

    use crate::error::DbError;
    use crate::provider::DataProvider;
    use crate::store::LocalStore;

    async fn product(provider: &DataProvider<LocalStore>, sku: &str, status_id: &str, qty: i64) -> Product {
        provider
            .products()
            .create(ProductInput {
                sku: sku.into(),
                name: sku.into(),
                purchase_price: Money::from_cents(1_000),
                sale_price: Money::from_cents(2_500),
                quantity: Some(qty),
                status_id: status_id.into(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    async fn sell(provider: &DataProvider<LocalStore>, product: &Product, qty: i64, days_ago: i64, method: &str) {
        provider
            .sales()
            .create(SaleInput {
                date: Some(Utc::now() - Duration::days(days_ago)),
                payment_method: Some(method.into()),
                items: vec![SaleItemInput {
                    product_id: product.id.clone(),
                    qty,
                    unit_sale_price: product.sale_price,
                    unit_cost_price: product.purchase_price,
                }],
                ..Default::default()
            })
            .await
            .unwrap();
    }

    async fn expense(provider: &DataProvider<LocalStore>, cents: i64, days_ago: i64) {
        provider
            .expenses()
            .create(ExpenseInput {
                label: "Frais".into(),
                category: ExpenseCategory::Supplies,
                amount: Money::from_cents(cents),
                date: (Utc::now() - Duration::days(days_ago)).date_naive(),
                note: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dashboard_week() {
        let provider = DataProvider::new(LocalStore::in_memory());
        let statuses = provider.statuses().ensure_defaults().await.unwrap();
        let shirt = product(&provider, "TSH", &statuses[0].id, 20).await;

        sell(&provider, &shirt, 2, 1, "cash").await;
        sell(&provider, &shirt, 1, 3, "card").await;
        sell(&provider, &shirt, 4, 20, "cash").await;
        expense(&provider, 1_000, 2).await;
        expense(&provider, 9_000, 25).await;

        let stats = provider
            .reports()
            .dashboard_stats(DashboardPeriod::Week, None)
            .await
            .unwrap();

        assert_eq!(stats.sales_count, 2);
        assert_eq!(stats.totals.total_revenue, Money::from_cents(7_500));
        assert_eq!(stats.totals.total_profit, Money::from_cents(4_500));
        assert_eq!(stats.avg_order_value, Money::from_cents(3_750));
        assert_eq!(stats.expenses_total, Money::from_cents(1_000));
        assert_eq!(stats.net_profit, Money::from_cents(3_500));

        // Top products span every sale, not only the window
        assert_eq!(stats.top_products.len(), 1);
        assert_eq!(stats.top_products[0].qty, 7);

        assert_eq!(stats.stock.total_products, 1);
        assert_eq!(stats.recent_sales.len(), 2);
    }

    #[tokio::test]
    async fn test_day_dashboard_counts_only_todays_expenses() {
        let provider = DataProvider::new(LocalStore::in_memory());
        expense(&provider, 700, 0).await;
        expense(&provider, 5_000, 1).await;

        let stats = provider
            .reports()
            .dashboard_stats(DashboardPeriod::Day, None)
            .await
            .unwrap();
        assert_eq!(stats.expenses_total, Money::from_cents(700));
        assert_eq!(stats.net_profit, Money::from_cents(-700));
    }

    #[tokio::test]
    async fn test_dashboard_custom_requires_range() {
        let provider = DataProvider::new(LocalStore::in_memory());
        let err = provider
            .reports()
            .dashboard_stats(DashboardPeriod::Custom, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CustomRangeRequired)));

        let now = Utc::now();
        let backwards = DateRange::new(now, now - Duration::days(1));
        assert!(provider
            .reports()
            .dashboard_stats(DashboardPeriod::Custom, Some(backwards))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_stock_report_groups_by_status() {
        let provider = DataProvider::new(LocalStore::in_memory());
        let statuses = provider.statuses().ensure_defaults().await.unwrap();

        product(&provider, "A", &statuses[0].id, 3).await;
        product(&provider, "B", &statuses[0].id, 10).await;
        product(&provider, "C", "deleted-status", 1).await;

        let report = provider.reports().stock_report().await.unwrap();
        assert_eq!(report.products.len(), 3);
        assert_eq!(report.total_cost, Money::from_cents(14_000));
        assert_eq!(report.low_stock.len(), 2);

        assert_eq!(report.by_status.len(), 5);
        assert_eq!(report.by_status[0].product_count, 2);
        assert_eq!(report.by_status[0].units, 13);
        assert_eq!(report.by_status[4].status_id, None);
    }

    #[tokio::test]
    async fn test_sales_report_range() {
        let provider = DataProvider::new(LocalStore::in_memory());
        let item = product(&provider, "R", "st", 50).await;
        sell(&provider, &item, 1, 2, "cash").await;
        sell(&provider, &item, 1, 10, "cash").await;

        let now = Utc::now();
        let report = provider
            .reports()
            .sales_report(DateRange::new(now - Duration::days(5), now))
            .await
            .unwrap();
        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.totals.total_revenue, Money::from_cents(2_500));
    }
}
