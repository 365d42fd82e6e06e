//! # Query Module
//!
//! Filters and sort orders applied by repositories on top of raw store reads.
//!
//! The store only offers select-all and select-by-id, so every filter here
//! runs in memory over a fresh read.
//!
//! ```text
//! store.select_all() ──► filter (search, exact fields, ranges) ──► sort ──► caller
//! ```

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Expense, ExpenseCategory, Product, Sale};
use crate::validation::normalize_search;

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange { start, end }
    }

    /// Both bounds are inclusive.
    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

// =============================================================================
// Products
// =============================================================================

/// Fields a product list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    Name,
    PurchasePrice,
    SalePrice,
    Quantity,
    ReorderThreshold,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// An explicit sort order. Direction defaults to ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSort {
    pub key: ProductSortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

impl ProductSort {
    pub fn asc(key: ProductSortKey) -> Self {
        ProductSort {
            key,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: ProductSortKey) -> Self {
        ProductSort {
            key,
            direction: SortDirection::Desc,
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self.key {
            ProductSortKey::Name => compare_text(&a.name, &b.name),
            ProductSortKey::PurchasePrice => a.purchase_price.cmp(&b.purchase_price),
            ProductSortKey::SalePrice => a.sale_price.cmp(&b.sale_price),
            ProductSortKey::Quantity => a.quantity.cmp(&b.quantity),
            ProductSortKey::ReorderThreshold => a.reorder_threshold.cmp(&b.reorder_threshold),
            ProductSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Case-insensitive text order, falling back to the raw strings so the
/// order stays total.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Product list filters. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilters {
    /// Substring over name, SKU and category, case-insensitive.
    pub search: Option<String>,
    pub status_id: Option<String>,
    pub category: Option<String>,
    /// Only products with quantity ≤ reorder threshold.
    #[serde(default)]
    pub low_stock_only: bool,
    /// `None` means most recently updated first.
    pub sort: Option<ProductSort>,
}

impl ProductFilters {
    pub fn search(term: impl Into<String>) -> Self {
        ProductFilters {
            search: Some(term.into()),
            ..Default::default()
        }
    }

    /// Filters and sorts products.
    ///
    /// The sort is stable, so ties keep store order.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let needle = normalize_search(self.search.as_deref());

        let mut matched: Vec<Product> = products
            .into_iter()
            .filter(|p| needle.as_deref().map_or(true, |n| p.matches_search(n)))
            .filter(|p| self.status_id.as_ref().map_or(true, |s| &p.status_id == s))
            .filter(|p| self.category.as_ref().map_or(true, |c| &p.category == c))
            .filter(|p| !self.low_stock_only || p.is_low_stock())
            .collect();

        match self.sort {
            Some(sort) => matched.sort_by(|a, b| sort.compare(a, b)),
            None => matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }

        matched
    }
}

// =============================================================================
// Sales
// =============================================================================

/// Sale list filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilters {
    /// Inclusive on both ends.
    pub range: Option<DateRange>,
    /// Exact, case-sensitive.
    pub payment_method: Option<String>,
    /// Substring over the note. Sales without a note never match.
    pub search: Option<String>,
}

impl SaleFilters {
    pub fn in_range(range: DateRange) -> Self {
        SaleFilters {
            range: Some(range),
            ..Default::default()
        }
    }

    pub fn matches(&self, sale: &Sale, needle: Option<&str>) -> bool {
        if let Some(range) = &self.range {
            if !range.contains(sale.date) {
                return false;
            }
        }
        if let Some(method) = &self.payment_method {
            if sale.payment_method.as_ref() != Some(method) {
                return false;
            }
        }
        if let Some(needle) = needle {
            match &sale.note {
                Some(note) if note.to_lowercase().contains(needle) => {}
                _ => return false,
            }
        }
        true
    }

    /// Filters sales and orders them newest first.
    pub fn apply(&self, sales: Vec<Sale>) -> Vec<Sale> {
        let needle = normalize_search(self.search.as_deref());
        let mut matched: Vec<Sale> = sales
            .into_iter()
            .filter(|s| self.matches(s, needle.as_deref()))
            .collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date));
        matched
    }
}

// =============================================================================
// Expenses
// =============================================================================

/// Expense list filters. Date bounds are inclusive and independent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseFilters {
    pub search: Option<String>,
    pub category: Option<ExpenseCategory>,
    #[ts(as = "Option<String>")]
    pub start: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub end: Option<NaiveDate>,
}

impl ExpenseFilters {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        ExpenseFilters {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    /// Filters expenses and orders them by date, newest first.
    pub fn apply(&self, expenses: Vec<Expense>) -> Vec<Expense> {
        let needle = normalize_search(self.search.as_deref());
        let mut matched: Vec<Expense> = expenses
            .into_iter()
            .filter(|e| needle.as_deref().map_or(true, |n| e.matches_search(n)))
            .filter(|e| self.category.map_or(true, |c| e.category == c))
            .filter(|e| self.start.map_or(true, |start| e.date >= start))
            .filter(|e| self.end.map_or(true, |end| e.date <= end))
            .collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date));
        matched
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
