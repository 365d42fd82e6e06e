//! # Domain Types
//!
//! Core domain types used throughout Salesbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Status       │◄──│    Product      │◄ ─│    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  label, color   │   │  sku (unique)   │   │  product_id     │       │
//! │  │  is_default     │   │  quantity       │   │  (may dangle)   │       │
//! │  │  order          │   │  prices (Money) │   │  profit_line    │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ owned by        │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │  Preferences    │   │    Expense      │   │      Sale       │       │
//! │  │  (singleton)    │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  currency       │   │  category       │   │  date           │       │
//! │  │  payment opts   │   │  amount > 0     │   │  derived totals │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Records vs Inputs
//! Every entity has:
//! - a record type (`Product`) with id and timestamps, as persisted
//! - an input type (`ProductInput`) for creation, with defaults applied by
//!   the repository
//! - a patch type (`ProductPatch`) where every field is optional and merged
//!   over the existing record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::{APP_CURRENCY, DEFAULT_PAYMENT_METHODS};

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit, unique case-insensitively.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Free-form category ("Général" by default).
    pub category: String,

    pub brand: Option<String>,

    /// What one unit costs to acquire.
    pub purchase_price: Money,

    /// What one unit sells for.
    pub sale_price: Money,

    /// Units currently in stock.
    pub quantity: i64,

    /// Status label reference. May point at a deleted status.
    pub status_id: String,

    /// Stock at or below this level counts as low.
    pub reorder_threshold: i64,

    /// Quantity recorded when the product was first stocked.
    pub initial_stock: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether the product is at or below its reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_threshold
    }

    /// Value of the current stock at purchase price.
    #[inline]
    pub fn stock_cost(&self) -> Money {
        self.purchase_price.multiply_quantity(self.quantity)
    }

    /// Value of the current stock at sale price.
    #[inline]
    pub fn stock_potential(&self) -> Money {
        self.sale_price.multiply_quantity(self.quantity)
    }

    /// Case-insensitive substring match over name, SKU and category.
    ///
    /// `needle` must already be lower-cased.
    pub fn matches_search(&self, needle: &str) -> bool {
        let haystack = format!("{} {} {}", self.name, self.sku, self.category).to_lowercase();
        haystack.contains(needle)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub sku: String,
    pub name: String,
    /// Defaults to "Général".
    pub category: Option<String>,
    pub brand: Option<String>,
    pub purchase_price: Money,
    pub sale_price: Money,
    /// Defaults to 0.
    pub quantity: Option<i64>,
    pub status_id: String,
    /// Defaults to 5.
    pub reorder_threshold: Option<i64>,
    pub initial_stock: Option<i64>,
}

/// Partial update for a product. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub purchase_price: Option<Money>,
    pub sale_price: Option<Money>,
    pub quantity: Option<i64>,
    pub status_id: Option<String>,
    pub reorder_threshold: Option<i64>,
    pub initial_stock: Option<i64>,
}

/// A signed change to a product's quantity.
///
/// Negative when a sale is recorded, positive when a sale is removed and its
/// stock restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub product_id: String,
    pub delta: i64,
}

impl StockAdjustment {
    pub fn new(product_id: impl Into<String>, delta: i64) -> Self {
        StockAdjustment {
            product_id: product_id.into(),
            delta,
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// A user-defined product status label ("Disponible", "Réservé"...).
///
/// At most one status is the default at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Status {
    pub id: String,
    pub label: String,
    /// Display hint, opaque to the core.
    pub color: String,
    pub is_default: bool,
    /// Display and priority ordering.
    pub order: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusInput {
    pub label: String,
    pub color: String,
    #[serde(default)]
    pub is_default: bool,
    /// Defaults to the current number of statuses.
    pub order: Option<i64>,
}

/// Partial update for a status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusPatch {
    pub label: Option<String>,
    pub color: Option<String>,
    pub is_default: Option<bool>,
    pub order: Option<i64>,
}

// =============================================================================
// Sale
// =============================================================================

/// A line of a sale.
///
/// Prices are frozen at the time of sale, so the line keeps its monetary
/// meaning after the product is edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    /// Owning sale.
    pub sale_id: String,
    /// Product sold. Not cascaded on product deletion.
    pub product_id: String,
    pub qty: i64,
    pub unit_sale_price: Money,
    pub unit_cost_price: Money,
    /// (unit_sale_price − unit_cost_price) × qty, stored at creation.
    pub profit_line: Money,
}

impl SaleItem {
    /// qty × unit_sale_price
    #[inline]
    pub fn line_revenue(&self) -> Money {
        self.unit_sale_price.multiply_quantity(self.qty)
    }

    /// qty × unit_cost_price
    #[inline]
    pub fn line_cost(&self) -> Money {
        self.unit_cost_price.multiply_quantity(self.qty)
    }
}

/// Input for one sale line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemInput {
    pub product_id: String,
    pub qty: i64,
    pub unit_sale_price: Money,
    pub unit_cost_price: Money,
}

/// A recorded sale with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Lines owned by this sale.
    #[serde(default)]
    pub items: Vec<SaleItem>,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    /// Matched against the configured payment options.
    pub payment_method: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Stock adjustments that undo this sale (positive deltas).
    pub fn restock_adjustments(&self) -> Vec<StockAdjustment> {
        self.items
            .iter()
            .map(|item| StockAdjustment::new(item.product_id.clone(), item.qty))
            .collect()
    }

    /// Stock adjustments that record this sale (negative deltas).
    pub fn destock_adjustments(&self) -> Vec<StockAdjustment> {
        self.items
            .iter()
            .map(|item| StockAdjustment::new(item.product_id.clone(), -item.qty))
            .collect()
    }
}

/// Input for creating (or re-creating) a sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleInput {
    /// Reused when a sale is re-created during an update.
    pub id: Option<String>,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub note: Option<String>,
    pub items: Vec<SaleItemInput>,
}

// =============================================================================
// Expense
// =============================================================================

/// Fixed set of expense categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Rent,
    Salaries,
    Utilities,
    Supplies,
    Transport,
    Marketing,
    Taxes,
    Other,
}

impl ExpenseCategory {
    /// Every category, in display order.
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::Rent,
        ExpenseCategory::Salaries,
        ExpenseCategory::Utilities,
        ExpenseCategory::Supplies,
        ExpenseCategory::Transport,
        ExpenseCategory::Marketing,
        ExpenseCategory::Taxes,
        ExpenseCategory::Other,
    ];

    /// Stable machine value, as stored and exported.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "rent",
            ExpenseCategory::Salaries => "salaries",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Supplies => "supplies",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Marketing => "marketing",
            ExpenseCategory::Taxes => "taxes",
            ExpenseCategory::Other => "other",
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "Loyer",
            ExpenseCategory::Salaries => "Salaires",
            ExpenseCategory::Utilities => "Charges",
            ExpenseCategory::Supplies => "Fournitures",
            ExpenseCategory::Transport => "Transport",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Taxes => "Impôts et taxes",
            ExpenseCategory::Other => "Autres",
        }
    }
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Other
    }
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExpenseCategory {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| crate::error::ValidationError::InvalidFormat {
                field: "category".to_string(),
                reason: format!("unknown expense category '{}'", s),
            })
    }
}

/// A business expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub label: String,
    pub category: ExpenseCategory,
    /// Always positive.
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Case-insensitive substring match over label, note and category.
    ///
    /// `needle` must already be lower-cased.
    pub fn matches_search(&self, needle: &str) -> bool {
        let haystack = format!(
            "{} {} {}",
            self.label,
            self.note.as_deref().unwrap_or(""),
            self.category
        )
        .to_lowercase();
        haystack.contains(needle)
    }
}

/// Input for creating an expense.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseInput {
    pub label: String,
    pub category: ExpenseCategory,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Partial update for an expense.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpensePatch {
    pub label: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Money>,
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

// =============================================================================
// Preferences
// =============================================================================

/// A payment method the business accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodOption {
    /// Unique key, matched case-sensitively against `Sale::payment_method`.
    pub value: String,
    pub label: String,
}

impl PaymentMethodOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        PaymentMethodOption {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Per-owner singleton holding display currency and payment options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Preferences {
    /// ISO 4217-style currency code.
    pub currency: String,
    /// Ordered as displayed.
    pub payment_methods: Vec<PaymentMethodOption>,
}

impl Preferences {
    /// The default payment options.
    pub fn default_payment_methods() -> Vec<PaymentMethodOption> {
        DEFAULT_PAYMENT_METHODS
            .iter()
            .map(|(value, label)| PaymentMethodOption::new(*value, *label))
            .collect()
    }

    /// Checks whether a payment option with this exact value exists.
    pub fn has_payment_method(&self, value: &str) -> bool {
        self.payment_methods.iter().any(|m| m.value == value)
    }
}

impl Default for Preferences {
    /// Preferences seeded on first read.
    fn default() -> Self {
        Preferences {
            currency: APP_CURRENCY.to_string(),
            payment_methods: Preferences::default_payment_methods(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64, threshold: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            sku: "TSHIRT-01".to_string(),
            name: "T-shirt blanc".to_string(),
            category: "Vêtements".to_string(),
            brand: None,
            purchase_price: Money::from_cents(1000),
            sale_price: Money::from_cents(2000),
            quantity,
            status_id: "s1".to_string(),
            reorder_threshold: threshold,
            initial_stock: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(4, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn test_stock_values() {
        let p = product(5, 10);
        assert_eq!(p.stock_cost().cents(), 5000);
        assert_eq!(p.stock_potential().cents(), 10000);
    }

    #[test]
    fn test_product_search_covers_name_sku_category() {
        let p = product(1, 0);
        assert!(p.matches_search("blanc"));
        assert!(p.matches_search("tshirt-01"));
        assert!(p.matches_search("vêtements"));
        assert!(!p.matches_search("pantalon"));
    }

    #[test]
    fn test_expense_category_round_trip_str() {
        for category in ExpenseCategory::ALL {
            assert_eq!(category.as_str().parse::<ExpenseCategory>().unwrap(), category);
        }
        assert!("groceries".parse::<ExpenseCategory>().is_err());
        assert_eq!(ExpenseCategory::default(), ExpenseCategory::Other);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(ExpenseCategory::Salaries).unwrap();
        assert_eq!(json, serde_json::json!("salaries"));

        let item: SaleItemInput = serde_json::from_value(serde_json::json!({
            "product_id": "p1",
            "qty": 2,
            "unit_sale_price": 1000,
            "unit_cost_price": 600
        }))
        .unwrap();
        assert_eq!(item.unit_sale_price.cents(), 1000);
    }

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.currency, "MAD");
        let values: Vec<&str> = prefs.payment_methods.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["cash", "card", "transfer", "mobile-money"]);
        assert!(prefs.has_payment_method("cash"));
        assert!(!prefs.has_payment_method("Cash"));
    }

    #[test]
    fn test_sale_adjustments_mirror_items() {
        let now = Utc::now();
        let sale = Sale {
            id: "s".into(),
            date: now,
            items: vec![SaleItem {
                id: "i".into(),
                sale_id: "s".into(),
                product_id: "p".into(),
                qty: 2,
                unit_sale_price: Money::from_cents(1000),
                unit_cost_price: Money::from_cents(600),
                profit_line: Money::from_cents(800),
            }],
            total_revenue: Money::from_cents(2000),
            total_cost: Money::from_cents(1200),
            total_profit: Money::from_cents(800),
            payment_method: None,
            note: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(sale.destock_adjustments(), vec![StockAdjustment::new("p", -2)]);
        assert_eq!(sale.restock_adjustments(), vec![StockAdjustment::new("p", 2)]);
    }
}
