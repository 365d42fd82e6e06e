//! # Totals
//!
//! Shared aggregation math used by sale creation and every report.
//!
//! ```text
//! ┌───────────────────────────────┐      ┌───────────────────────────────┐
//! │ calc_sale_totals(items)       │      │ calc_stock_value(products)    │
//! │  revenue = Σ qty × sale       │      │  total_cost = Σ qty × buy     │
//! │  cost    = Σ qty × cost       │      │  potential  = Σ qty × sell    │
//! │  profit  = revenue − cost     │      │  low_stock  = qty ≤ threshold │
//! │  margin  = profit / revenue % │      └───────────────────────────────┘
//! └───────────────────────────────┘
//! ```
//!
//! Both are pure and total: an empty input yields zeros, never an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Product, SaleItem};

// =============================================================================
// Sale Totals
// =============================================================================

/// Aggregate totals over a set of sale lines.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    /// Profit as a percentage of revenue. 0.0 when revenue is zero.
    pub margin: f64,
}

/// Anything that contributes a quantity at a unit sale and cost price.
///
/// Implemented by stored `SaleItem`s and by `SaleItemInput`s so totals can be
/// computed before the items are materialized.
pub trait PricedLine {
    fn qty(&self) -> i64;
    fn unit_sale_price(&self) -> Money;
    fn unit_cost_price(&self) -> Money;
}

impl PricedLine for SaleItem {
    fn qty(&self) -> i64 {
        self.qty
    }
    fn unit_sale_price(&self) -> Money {
        self.unit_sale_price
    }
    fn unit_cost_price(&self) -> Money {
        self.unit_cost_price
    }
}

impl PricedLine for crate::types::SaleItemInput {
    fn qty(&self) -> i64 {
        self.qty
    }
    fn unit_sale_price(&self) -> Money {
        self.unit_sale_price
    }
    fn unit_cost_price(&self) -> Money {
        self.unit_cost_price
    }
}

/// Computes revenue, cost, profit and margin over sale lines.
///
/// ## Example
/// ```rust
/// use salesbook_core::money::Money;
/// use salesbook_core::types::SaleItemInput;
/// use salesbook_core::totals::calc_sale_totals;
///
/// let items = vec![SaleItemInput {
///     product_id: "p1".into(),
///     qty: 2,
///     unit_sale_price: Money::from_cents(1000),
///     unit_cost_price: Money::from_cents(600),
/// }];
/// let totals = calc_sale_totals(&items);
/// assert_eq!(totals.total_revenue.cents(), 2000);
/// assert_eq!(totals.total_cost.cents(), 1200);
/// assert_eq!(totals.total_profit.cents(), 800);
/// assert_eq!(totals.margin, 40.0);
/// ```
pub fn calc_sale_totals<'a, L, I>(items: I) -> SaleTotals
where
    L: PricedLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let mut total_revenue = Money::zero();
    let mut total_cost = Money::zero();

    for item in items {
        total_revenue += item.unit_sale_price().multiply_quantity(item.qty());
        total_cost += item.unit_cost_price().multiply_quantity(item.qty());
    }

    let total_profit = total_revenue - total_cost;

    SaleTotals {
        total_revenue,
        total_cost,
        total_profit,
        margin: total_profit.percent_of(total_revenue),
    }
}

/// Profit of one line: (unit sale − unit cost) × qty.
#[inline]
pub fn line_profit(line: &impl PricedLine) -> Money {
    (line.unit_sale_price() - line.unit_cost_price()).multiply_quantity(line.qty())
}

// =============================================================================
// Stock Valuation
// =============================================================================

/// Stock valuation over a product list.
#[derive(Debug, Clone, PartialEq)]
pub struct StockValue {
    pub total_cost: Money,
    pub potential_revenue: Money,
    /// Products at or below their reorder threshold, in input order.
    pub low_stock: Vec<Product>,
}

/// Values current stock at purchase and sale price.
pub fn calc_stock_value(products: &[Product]) -> StockValue {
    StockValue {
        total_cost: products.iter().map(Product::stock_cost).sum(),
        potential_revenue: products.iter().map(Product::stock_potential).sum(),
        low_stock: products
            .iter()
            .filter(|p| p.is_low_stock())
            .cloned()
            .collect(),
    }
}

/// Compact stock summary used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    pub total_cost: Money,
    pub total_potential: Money,
    pub low_stock_count: usize,
    pub total_products: usize,
}

impl StockSummary {
    pub fn from_products(products: &[Product]) -> Self {
        let value = calc_stock_value(products);
        StockSummary {
            total_cost: value.total_cost,
            total_potential: value.potential_revenue,
            low_stock_count: value.low_stock.len(),
            total_products: products.len(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleItemInput;
    use chrono::Utc;

    fn line(qty: i64, sale: i64, cost: i64) -> SaleItemInput {
        SaleItemInput {
            product_id: "p".into(),
            qty,
            unit_sale_price: Money::from_cents(sale),
            unit_cost_price: Money::from_cents(cost),
        }
    }

    fn product(qty: i64, buy: i64, sell: i64, threshold: i64) -> Product {
        let now = Utc::now();
        Product {
            id: format!("p{}", qty),
            sku: format!("SKU-{}", qty),
            name: "Produit".into(),
            category: "Général".into(),
            brand: None,
            purchase_price: Money::from_cents(buy),
            sale_price: Money::from_cents(sell),
            quantity: qty,
            status_id: "s".into(),
            reorder_threshold: threshold,
            initial_stock: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sale_totals_multiple_lines() {
        let items = vec![line(2, 1000, 600), line(1, 500, 500)];
        let totals = calc_sale_totals(&items);
        assert_eq!(totals.total_revenue.cents(), 2500);
        assert_eq!(totals.total_cost.cents(), 1700);
        assert_eq!(totals.total_profit.cents(), 800);
        assert!((totals.margin - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_sale_totals_empty_has_zero_margin() {
        let items: Vec<SaleItemInput> = Vec::new();
        let totals = calc_sale_totals(&items);
        assert_eq!(totals, SaleTotals::default());
        assert_eq!(totals.margin, 0.0);
    }

    #[test]
    fn test_free_items_do_not_divide_by_zero() {
        let items = vec![line(3, 0, 200)];
        let totals = calc_sale_totals(&items);
        assert_eq!(totals.total_profit.cents(), -600);
        assert_eq!(totals.margin, 0.0);
    }

    #[test]
    fn test_line_profit() {
        assert_eq!(line_profit(&line(3, 1000, 750)).cents(), 750);
        assert_eq!(line_profit(&line(1, 400, 500)).cents(), -100);
    }

    #[test]
    fn test_stock_summary() {
        let products = vec![product(5, 1000, 2000, 10)];
        let summary = StockSummary::from_products(&products);
        assert_eq!(summary.total_cost.cents(), 5000);
        assert_eq!(summary.total_potential.cents(), 10000);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.total_products, 1);
    }

    #[test]
    fn test_stock_value_low_stock_subset() {
        let products = vec![product(1, 100, 200, 5), product(50, 100, 200, 5)];
        let value = calc_stock_value(&products);
        assert_eq!(value.low_stock.len(), 1);
        assert_eq!(value.low_stock[0].quantity, 1);
        assert_eq!(value.total_cost.cents(), 5100);
    }
}
