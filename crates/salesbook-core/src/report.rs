//! # Report Module
//!
//! Pure aggregation behind the dashboard, stock and sales reports.
//!
//! ## Dashboard Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DashboardPeriod + now                                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  resolve_window ─────► DateRange                                        │
//! │                            │  (repository reads sales in window)        │
//! │                            ▼                                            │
//! │  ┌──────────────┬──────────────┬────────────────┬──────────────┐        │
//! │  │ totals       │ build_trend  │ payment_       │ recent (5)   │        │
//! │  │ avg order    │ (per day)    │ overview       │              │        │
//! │  └──────────────┴──────────────┴────────────────┴──────────────┘        │
//! │                                                                         │
//! │  rank_top_products runs over ALL sales, not just the window.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::query::DateRange;
use crate::totals::{calc_sale_totals, calc_stock_value, SaleTotals, StockSummary};
use crate::types::{Expense, ExpenseCategory, PaymentMethodOption, Preferences, Product, Sale, Status};
use crate::{
    DELETED_PRODUCT_LABEL, NO_STATUS_LABEL, OTHER_PAYMENT_LABEL, RECENT_SALES_LIMIT,
};

// =============================================================================
// Period Resolution
// =============================================================================

/// A named dashboard window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DashboardPeriod {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    #[default]
    Week,
    /// Last 30 days.
    Month,
    /// Caller-supplied range.
    Custom,
}

impl DashboardPeriod {
    /// Days covered by a named period. `None` for `Custom`.
    pub fn days_back(&self) -> Option<i64> {
        match self {
            DashboardPeriod::Day => Some(1),
            DashboardPeriod::Week => Some(7),
            DashboardPeriod::Month => Some(30),
            DashboardPeriod::Custom => None,
        }
    }
}

/// Resolves a period to a concrete window anchored at `now`.
///
/// `Custom` uses `custom` as given and fails without it. Named periods
/// ignore `custom`.
pub fn resolve_window(
    period: DashboardPeriod,
    custom: Option<DateRange>,
    now: DateTime<Utc>,
) -> CoreResult<DateRange> {
    match period.days_back() {
        Some(days) => Ok(DateRange::new(now - Duration::days(days), now)),
        None => custom.ok_or(CoreError::CustomRangeRequired),
    }
}

/// Calendar days whose expenses count against `window`, both inclusive.
///
/// Expenses carry a date only. A named period keeps the last N days ending
/// today, so `Day` counts today's expenses and none of yesterday's. `Custom`
/// keeps every day the range touches.
pub fn expense_days(period: DashboardPeriod, window: &DateRange) -> (NaiveDate, NaiveDate) {
    let end = window.end.date_naive();
    let start = match period.days_back() {
        Some(_) => (window.start + Duration::days(1)).date_naive().min(end),
        None => window.start.date_naive(),
    };
    (start, end)
}

// =============================================================================
// Trend
// =============================================================================

/// Revenue, cost and profit for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrendPoint {
    /// `YYYY-MM-DD` in UTC.
    pub date: String,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
}

/// Buckets sales by UTC calendar day, in chronological order.
pub fn build_trend(sales: &[Sale]) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, (Money, Money)> = BTreeMap::new();

    for sale in sales {
        let key = sale.date.date_naive().format("%Y-%m-%d").to_string();
        let entry = buckets.entry(key).or_default();
        entry.0 += sale.total_revenue;
        entry.1 += sale.total_cost;
    }

    buckets
        .into_iter()
        .map(|(date, (revenue, cost))| TrendPoint {
            date,
            revenue,
            cost,
            profit: revenue - cost,
        })
        .collect()
}

// =============================================================================
// Payment Overview
// =============================================================================

/// Revenue and sale count for one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentStat {
    /// Raw payment value. Empty for sales recorded without a method.
    pub method: String,
    pub label: String,
    pub sales_count: usize,
    pub revenue: Money,
    /// Percentage of total revenue across all buckets.
    pub share: f64,
}

/// Breaks revenue down by payment method.
///
/// Configured options come first, in configured order, even when unused.
/// Values seen in sales but not configured follow in first-seen order,
/// labeled by their raw value (or "Autres" when missing). An empty option
/// list falls back to the default options.
pub fn payment_overview(sales: &[Sale], options: &[PaymentMethodOption]) -> Vec<PaymentStat> {
    let fallback;
    let options = if options.is_empty() {
        fallback = Preferences::default_payment_methods();
        fallback.as_slice()
    } else {
        options
    };

    let mut stats: Vec<PaymentStat> = options
        .iter()
        .map(|o| PaymentStat {
            method: o.value.clone(),
            label: o.label.clone(),
            sales_count: 0,
            revenue: Money::zero(),
            share: 0.0,
        })
        .collect();
    let mut index: HashMap<String, usize> = stats
        .iter()
        .enumerate()
        .map(|(i, s)| (s.method.clone(), i))
        .collect();

    for sale in sales {
        let key = sale.payment_method.clone().unwrap_or_default();
        let slot = match index.get(&key) {
            Some(slot) => *slot,
            None => {
                let label = if key.is_empty() {
                    OTHER_PAYMENT_LABEL.to_string()
                } else {
                    key.clone()
                };
                stats.push(PaymentStat {
                    method: key.clone(),
                    label,
                    sales_count: 0,
                    revenue: Money::zero(),
                    share: 0.0,
                });
                index.insert(key, stats.len() - 1);
                stats.len() - 1
            }
        };
        stats[slot].sales_count += 1;
        stats[slot].revenue += sale.total_revenue;
    }

    let total: Money = stats.iter().map(|s| s.revenue).sum();
    for stat in &mut stats {
        stat.share = stat.revenue.percent_of(total);
    }

    stats
}

// =============================================================================
// Top Products
// =============================================================================

/// A product ranked by accumulated profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    /// Current product name, or "Produit supprimé" when it no longer exists.
    pub name: String,
    pub qty: i64,
    pub profit: Money,
}

/// Ranks products by summed line profit over the given sales.
///
/// Ties keep first-seen order. Lines pointing at deleted products are kept
/// under a placeholder name.
pub fn rank_top_products(sales: &[Sale], products: &[Product], limit: usize) -> Vec<TopProduct> {
    let names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let mut ranked: Vec<TopProduct> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for item in sales.iter().flat_map(|s| s.items.iter()) {
        let slot = *index.entry(item.product_id.as_str()).or_insert_with(|| {
            ranked.push(TopProduct {
                product_id: item.product_id.clone(),
                name: names
                    .get(item.product_id.as_str())
                    .copied()
                    .unwrap_or(DELETED_PRODUCT_LABEL)
                    .to_string(),
                qty: 0,
                profit: Money::zero(),
            });
            ranked.len() - 1
        });
        ranked[slot].qty += item.qty;
        ranked[slot].profit += item.profit_line;
    }

    ranked.sort_by(|a, b| b.profit.cmp(&a.profit));
    ranked.truncate(limit);
    ranked
}

// =============================================================================
// Status Breakdown
// =============================================================================

/// Product count and units held under one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusBreakdown {
    /// `None` for products whose status no longer exists.
    pub status_id: Option<String>,
    pub label: String,
    pub product_count: usize,
    pub units: i64,
}

/// Groups products by status, in status order.
///
/// Every status gets an entry. Products referencing a missing status are
/// grouped under a trailing "Sans statut" entry, present only when needed.
pub fn status_breakdown(products: &[Product], statuses: &[Status]) -> Vec<StatusBreakdown> {
    let mut ordered: Vec<&Status> = statuses.iter().collect();
    ordered.sort_by_key(|s| s.order);

    let mut rows: Vec<StatusBreakdown> = ordered
        .iter()
        .map(|s| StatusBreakdown {
            status_id: Some(s.id.clone()),
            label: s.label.clone(),
            product_count: 0,
            units: 0,
        })
        .collect();
    let index: HashMap<&str, usize> = ordered
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut orphaned = StatusBreakdown {
        status_id: None,
        label: NO_STATUS_LABEL.to_string(),
        product_count: 0,
        units: 0,
    };

    for product in products {
        let row = match index.get(product.status_id.as_str()) {
            Some(i) => &mut rows[*i],
            None => &mut orphaned,
        };
        row.product_count += 1;
        row.units += product.quantity;
    }

    if orphaned.product_count > 0 {
        rows.push(orphaned);
    }
    rows
}

// =============================================================================
// Expense Summary
// =============================================================================

/// Totals over a filtered set of expenses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseSummary {
    pub total: Money,
    /// Only categories that appear in the set.
    pub categories: BTreeMap<ExpenseCategory, Money>,
}

pub fn summarize_expenses(expenses: &[Expense]) -> ExpenseSummary {
    let mut summary = ExpenseSummary::default();
    for expense in expenses {
        summary.total += expense.amount;
        *summary.categories.entry(expense.category).or_default() += expense.amount;
    }
    summary
}

// =============================================================================
// Report Shapes
// =============================================================================

/// Everything the dashboard displays for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub totals: SaleTotals,
    pub top_products: Vec<TopProduct>,
    pub stock: StockSummary,
    pub period: DateRange,
    pub sales_count: usize,
    pub avg_order_value: Money,
    pub trend: Vec<TrendPoint>,
    pub payment_overview: Vec<PaymentStat>,
    pub recent_sales: Vec<Sale>,
    /// Expenses dated on the days from `expense_days`. For a named period
    /// that is the last N calendar days ending today.
    pub expenses_total: Money,
    /// total_profit − expenses_total
    pub net_profit: Money,
}

/// Inputs gathered by the reports repository for one dashboard.
#[derive(Debug, Clone)]
pub struct DashboardInputs<'a> {
    pub window: DateRange,
    /// Sales in the window, newest first.
    pub sales: Vec<Sale>,
    pub top_products: Vec<TopProduct>,
    pub products: &'a [Product],
    pub payment_options: &'a [PaymentMethodOption],
    pub expenses: &'a [Expense],
}

impl DashboardStats {
    pub fn build(inputs: DashboardInputs<'_>) -> Self {
        let totals = calc_sale_totals(inputs.sales.iter().flat_map(|s| s.items.iter()));
        let sales_count = inputs.sales.len();
        let expenses_total: Money = inputs.expenses.iter().map(|e| e.amount).sum();

        DashboardStats {
            top_products: inputs.top_products,
            stock: StockSummary::from_products(inputs.products),
            period: inputs.window,
            sales_count,
            avg_order_value: totals.total_revenue.average_over(sales_count),
            trend: build_trend(&inputs.sales),
            payment_overview: payment_overview(&inputs.sales, inputs.payment_options),
            recent_sales: inputs.sales.iter().take(RECENT_SALES_LIMIT).cloned().collect(),
            expenses_total,
            net_profit: totals.total_profit - expenses_total,
            totals,
        }
    }
}

/// Full stock snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockReport {
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub total_cost: Money,
    pub total_potential: Money,
    pub low_stock: Vec<Product>,
    pub products: Vec<Product>,
    pub by_status: Vec<StatusBreakdown>,
}

impl StockReport {
    pub fn build(products: Vec<Product>, statuses: &[Status], generated_at: DateTime<Utc>) -> Self {
        let value = calc_stock_value(&products);
        StockReport {
            generated_at,
            total_cost: value.total_cost,
            total_potential: value.potential_revenue,
            low_stock: value.low_stock,
            by_status: status_breakdown(&products, statuses),
            products,
        }
    }
}

/// Sales within an explicit range with their totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub range: DateRange,
    pub sales: Vec<Sale>,
    pub totals: SaleTotals,
}

impl SalesReport {
    pub fn build(range: DateRange, sales: Vec<Sale>) -> Self {
        let totals = calc_sale_totals(sales.iter().flat_map(|s| s.items.iter()));
        SalesReport {
            range,
            sales,
            totals,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleItem;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn sale(id: &str, date: DateTime<Utc>, method: Option<&str>, lines: &[(&str, i64, i64, i64)]) -> Sale {
        let items: Vec<SaleItem> = lines
            .iter()
            .enumerate()
            .map(|(i, (product, qty, sell, cost))| SaleItem {
                id: format!("{}-{}", id, i),
                sale_id: id.to_string(),
                product_id: product.to_string(),
                qty: *qty,
                unit_sale_price: Money::from_cents(*sell),
                unit_cost_price: Money::from_cents(*cost),
                profit_line: Money::from_cents((sell - cost) * qty),
            })
            .collect();
        let totals = calc_sale_totals(&items);
        Sale {
            id: id.to_string(),
            date,
            items,
            total_revenue: totals.total_revenue,
            total_cost: totals.total_cost,
            total_profit: totals.total_profit,
            payment_method: method.map(str::to_string),
            note: None,
            created_at: date,
            updated_at: date,
        }
    }

    fn product(id: &str, name: &str, status: &str, qty: i64) -> Product {
        let now = at(1, 0);
        Product {
            id: id.to_string(),
            sku: id.to_uppercase(),
            name: name.to_string(),
            category: "Général".into(),
            brand: None,
            purchase_price: Money::from_cents(100),
            sale_price: Money::from_cents(200),
            quantity: qty,
            status_id: status.to_string(),
            reorder_threshold: 5,
            initial_stock: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn status(id: &str, label: &str, order: i64) -> Status {
        let now = at(1, 0);
        Status {
            id: id.into(),
            label: label.into(),
            color: "#000".into(),
            is_default: false,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_named_windows() {
        let now = at(15, 12);
        let week = resolve_window(DashboardPeriod::Week, None, now).unwrap();
        assert_eq!(week.end, now);
        assert_eq!(week.start, at(8, 12));

        let day = resolve_window(DashboardPeriod::Day, None, now).unwrap();
        assert_eq!(day.start, at(14, 12));

        let month = resolve_window(DashboardPeriod::Month, None, now).unwrap();
        assert_eq!(month.start, now - Duration::days(30));
    }

    #[test]
    fn test_expense_days_match_named_periods() {
        let now = at(15, 12);
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();

        let day = resolve_window(DashboardPeriod::Day, None, now).unwrap();
        assert_eq!(expense_days(DashboardPeriod::Day, &day), (d(15), d(15)));

        let week = resolve_window(DashboardPeriod::Week, None, now).unwrap();
        assert_eq!(expense_days(DashboardPeriod::Week, &week), (d(9), d(15)));

        let custom = DateRange::new(at(3, 18), at(5, 6));
        assert_eq!(expense_days(DashboardPeriod::Custom, &custom), (d(3), d(5)));
    }

    #[test]
    fn test_custom_window_requires_range() {
        let now = at(15, 12);
        assert!(matches!(
            resolve_window(DashboardPeriod::Custom, None, now),
            Err(CoreError::CustomRangeRequired)
        ));
        let range = DateRange::new(at(1, 0), at(3, 0));
        assert_eq!(
            resolve_window(DashboardPeriod::Custom, Some(range), now).unwrap(),
            range
        );
    }

    #[test]
    fn test_trend_buckets_by_day_sorted() {
        let sales = vec![
            sale("c", at(3, 9), None, &[("p", 1, 500, 200)]),
            sale("a", at(1, 8), None, &[("p", 1, 1000, 600)]),
            sale("b", at(1, 20), None, &[("p", 2, 1000, 600)]),
        ];
        let trend = build_trend(&sales);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, "2024-06-01");
        assert_eq!(trend[0].revenue.cents(), 3000);
        assert_eq!(trend[0].profit.cents(), 1200);
        assert_eq!(trend[1].date, "2024-06-03");
    }

    #[test]
    fn test_payment_overview_order_and_unknown_buckets() {
        let options = vec![
            PaymentMethodOption::new("cash", "Espèces"),
            PaymentMethodOption::new("card", "Carte"),
        ];
        let sales = vec![
            sale("1", at(1, 8), Some("cheque"), &[("p", 1, 1000, 0)]),
            sale("2", at(1, 9), Some("cash"), &[("p", 1, 3000, 0)]),
            sale("3", at(1, 10), None, &[("p", 1, 1000, 0)]),
        ];
        let overview = payment_overview(&sales, &options);
        let methods: Vec<&str> = overview.iter().map(|s| s.method.as_str()).collect();
        assert_eq!(methods, vec!["cash", "card", "cheque", ""]);
        assert_eq!(overview[1].sales_count, 0);
        assert_eq!(overview[2].label, "cheque");
        assert_eq!(overview[3].label, "Autres");
        assert!((overview[0].share - 60.0).abs() < 1e-9);

        let share_sum: f64 = overview.iter().map(|s| s.share).sum();
        assert!((share_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_payment_overview_falls_back_to_defaults() {
        let overview = payment_overview(&[], &[]);
        assert_eq!(overview.len(), 4);
        assert!(overview.iter().all(|s| s.revenue.is_zero() && s.share == 0.0));
    }

    #[test]
    fn test_top_products_by_profit_with_deleted_placeholder() {
        let products = vec![product("p1", "Sac", "s1", 3)];
        let sales = vec![
            sale("1", at(1, 8), None, &[("p1", 1, 1000, 900), ("gone", 1, 1000, 500)]),
            sale("2", at(2, 8), None, &[("p1", 2, 1000, 900)]),
        ];
        let top = rank_top_products(&sales, &products, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, "gone");
        assert_eq!(top[0].name, DELETED_PRODUCT_LABEL);
        assert_eq!(top[1].qty, 3);
        assert_eq!(top[1].profit.cents(), 300);

        assert_eq!(rank_top_products(&sales, &products, 1).len(), 1);
    }

    #[test]
    fn test_status_breakdown_groups_orphans() {
        let statuses = vec![status("s2", "Réservé", 1), status("s1", "Disponible", 0)];
        let products = vec![
            product("a", "A", "s1", 4),
            product("b", "B", "s1", 6),
            product("c", "C", "deleted", 2),
        ];
        let rows = status_breakdown(&products, &statuses);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "Disponible");
        assert_eq!(rows[0].product_count, 2);
        assert_eq!(rows[0].units, 10);
        assert_eq!(rows[1].product_count, 0);
        assert_eq!(rows[2].status_id, None);
        assert_eq!(rows[2].label, NO_STATUS_LABEL);
    }

    #[test]
    fn test_expense_summary() {
        let now = at(1, 0);
        let expense = |amount: i64, category| Expense {
            id: format!("e{}", amount),
            label: "x".into(),
            category,
            amount: Money::from_cents(amount),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            note: None,
            created_at: now,
            updated_at: now,
        };
        let summary = summarize_expenses(&[
            expense(1000, ExpenseCategory::Rent),
            expense(250, ExpenseCategory::Transport),
            expense(750, ExpenseCategory::Rent),
        ]);
        assert_eq!(summary.total.cents(), 2000);
        assert_eq!(summary.categories[&ExpenseCategory::Rent].cents(), 1750);
        assert_eq!(summary.categories.len(), 2);
    }

    #[test]
    fn test_empty_dashboard() {
        let window = DateRange::new(at(1, 0), at(8, 0));
        let stats = DashboardStats::build(DashboardInputs {
            window,
            sales: Vec::new(),
            top_products: Vec::new(),
            products: &[],
            payment_options: &Preferences::default().payment_methods,
            expenses: &[],
        });
        assert_eq!(stats.sales_count, 0);
        assert!(stats.avg_order_value.is_zero());
        assert!(stats.trend.is_empty());
        assert!(stats.recent_sales.is_empty());
        assert!(stats
            .payment_overview
            .iter()
            .all(|s| s.revenue.is_zero() && s.share == 0.0));
    }

    #[test]
    fn test_dashboard_net_profit_and_recent_limit() {
        let sales: Vec<Sale> = (1..=7)
            .rev()
            .map(|d| sale(&format!("s{}", d), at(d, 10), Some("cash"), &[("p", 1, 1000, 400)]))
            .collect();
        let now = at(1, 0);
        let rent = Expense {
            id: "e".into(),
            label: "Loyer".into(),
            category: ExpenseCategory::Rent,
            amount: Money::from_cents(1000),
            date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            note: None,
            created_at: now,
            updated_at: now,
        };
        let stats = DashboardStats::build(DashboardInputs {
            window: DateRange::new(at(1, 0), at(8, 0)),
            sales,
            top_products: Vec::new(),
            products: &[],
            payment_options: &[],
            expenses: std::slice::from_ref(&rent),
        });
        assert_eq!(stats.sales_count, 7);
        assert_eq!(stats.recent_sales.len(), 5);
        assert_eq!(stats.recent_sales[0].id, "s7");
        assert_eq!(stats.avg_order_value.cents(), 1000);
        assert_eq!(stats.totals.total_profit.cents(), 4200);
        assert_eq!(stats.net_profit.cents(), 3200);
    }
}
