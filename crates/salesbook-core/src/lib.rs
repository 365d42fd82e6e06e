//! # salesbook-core: Pure Business Logic for Salesbook
//!
//! Domain types, integer money and every piece of aggregation math behind
//! the Salesbook repositories. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salesbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Presentation layer (external)                  │   │
//! │  │     Catalog ──► Sales ──► Expenses ──► Dashboard ──► Export     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            salesbook-db: repositories + DataProvider            │   │
//! │  │      Products, Statuses, Sales, Preferences, Expenses, Reports  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ salesbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │ types   │ │ money   │ │ totals  │ │ report  │ │ query   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌────────────┐ ┌──────────────┐ ┌─────────┐                  │   │
//! │  │   │ validation │ │ subscription │ │ error   │                  │   │
//! │  │   └────────────┘ └──────────────┘ └─────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records, inputs and patches
//! - [`money`] - Money type with integer arithmetic
//! - [`query`] - Product, sale and expense filters and sort orders
//! - [`totals`] - Sale totals and stock valuation
//! - [`report`] - Dashboard, stock and sales report aggregation
//! - [`subscription`] - Trial and plan gating
//! - [`validation`] - Field rules checked before any write
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use salesbook_core::money::Money;
//! use salesbook_core::types::SaleItemInput;
//! use salesbook_core::totals::calc_sale_totals;
//!
//! let items = vec![SaleItemInput {
//!     product_id: "p1".into(),
//!     qty: 2,
//!     unit_sale_price: Money::from_cents(1000),
//!     unit_cost_price: Money::from_cents(600),
//! }];
//!
//! let totals = calc_sale_totals(&items);
//! assert_eq!(totals.total_profit.cents(), 800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod query;
pub mod report;
pub mod subscription;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use query::{
    DateRange, ExpenseFilters, ProductFilters, ProductSort, ProductSortKey, SaleFilters,
    SortDirection,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency used until the owner picks another one.
pub const APP_CURRENCY: &str = "MAD";

/// Currencies offered by the currency picker.
pub const SUPPORTED_CURRENCIES: [&str; 5] = ["MAD", "EUR", "USD", "XOF", "GBP"];

/// Payment options seeded with the preferences, as (value, label).
pub const DEFAULT_PAYMENT_METHODS: [(&str, &str); 4] = [
    ("cash", "Espèces"),
    ("card", "Carte"),
    ("transfer", "Virement"),
    ("mobile-money", "Mobile Money"),
];

/// Statuses seeded into an empty store, as (label, color). The first is the default.
pub const DEFAULT_STATUSES: [(&str, &str); 4] = [
    ("Disponible", "#16a34a"),
    ("Réservé", "#f59e0b"),
    ("En livraison", "#3b82f6"),
    ("Rupture", "#dc2626"),
];

/// Category given to products created without one.
pub const DEFAULT_CATEGORY: &str = "Général";

/// Reorder threshold given to products created without one.
pub const DEFAULT_REORDER_THRESHOLD: i64 = 5;

/// Name shown for sale lines whose product was deleted.
pub const DELETED_PRODUCT_LABEL: &str = "Produit supprimé";

/// Label for sales recorded without a payment method.
pub const OTHER_PAYMENT_LABEL: &str = "Autres";

/// Label for products whose status no longer exists.
pub const NO_STATUS_LABEL: &str = "Sans statut";

/// Fixed key of the per-owner preferences record.
pub const PREFERENCES_KEY: &str = "default";

/// Number of products on the dashboard leaderboard.
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Number of sales shown under "recent sales".
pub const RECENT_SALES_LIMIT: usize = 5;

/// Length of a new trial.
pub const TRIAL_DAYS: i64 = 14;

pub const MAX_SKU_LENGTH: usize = 64;
pub const MAX_LABEL_LENGTH: usize = 200;
pub const MAX_NOTE_LENGTH: usize = 2000;

/// Largest stock count or sale line quantity accepted from input.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest unit price or expense amount accepted from input, in cents.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
