//! # Persistent Store Boundary
//!
//! Per-entity storage traits consumed by the repositories.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repositories (filtering, validation, derived values, joins)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────┬──────────────┬────────────┬──────────────┬────────┐ │
//! │  │ ProductStore  │ StatusStore  │ SaleStore  │ ExpenseStore │ Prefs  │ │
//! │  └───────────────┴──────────────┴────────────┴──────────────┴────────┘ │
//! │       │                 combined as `Store`                             │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────┐     ┌──────────────────────────┐         │
//! │  │ SqliteStore (sqlx)        │     │ LocalStore (legacy)      │         │
//! │  │ owner-scoped rows         │     │ in-memory tables         │         │
//! │  │ transactions per unit     │     │ JSON snapshot file       │         │
//! │  └──────────────────────────┘     └──────────────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Units of Work
//! A few operations bundle several writes. The SQLite backend runs each in
//! one transaction; the local backend applies them in sequence under one
//! write lock.
//!
//! | Operation               | Writes                                        |
//! |-------------------------|-----------------------------------------------|
//! | `insert_sale`           | header + items + negative stock deltas        |
//! | `delete_sale`           | header + items + positive stock deltas        |
//! | `write_default_status`  | clear other defaults + insert/update status   |
//! | `reorder_statuses`      | order = position for every id                 |
//!
//! Joins (sale + items, item + product name) are left to the repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesbook_core::{Expense, Preferences, Product, Sale, SaleItem, Status, StockAdjustment};

use crate::error::DbResult;

pub mod local;
pub mod sqlite;

pub use local::{LocalSnapshot, LocalStore};
pub use sqlite::SqliteStore;

// =============================================================================
// Per-Entity Traits
// =============================================================================

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> DbResult<()>;

    /// Replaces an existing product. `NotFound` when the id is unknown.
    async fn update_product(&self, product: &Product) -> DbResult<()>;

    /// Returns false when no such product existed.
    async fn delete_product(&self, id: &str) -> DbResult<bool>;

    async fn select_products(&self) -> DbResult<Vec<Product>>;

    async fn select_product(&self, id: &str) -> DbResult<Option<Product>>;

    /// Adds `delta` to the stored quantity in place and stamps `updated_at`.
    /// Returns false when the product does not exist.
    ///
    /// Concurrent deltas on one product never lose each other: both stores
    /// apply the increment atomically. A product update that writes an
    /// absolute quantity can still overwrite a delta read before it.
    async fn add_to_quantity(&self, id: &str, delta: i64, at: DateTime<Utc>) -> DbResult<bool>;
}

/// How `write_default_status` persists the new default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
    Insert,
    Update,
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn insert_status(&self, status: &Status) -> DbResult<()>;

    /// `NotFound` when the id is unknown.
    async fn update_status(&self, status: &Status) -> DbResult<()>;

    async fn delete_status(&self, id: &str) -> DbResult<bool>;

    /// Ordered by `order` ascending.
    async fn select_statuses(&self) -> DbResult<Vec<Status>>;

    async fn select_status(&self, id: &str) -> DbResult<Option<Status>>;

    /// Clears `is_default` on every status, then writes `status`.
    async fn write_default_status(&self, status: &Status, write: StatusWrite) -> DbResult<()>;

    /// Sets each status's order to its position in `ids`. Unknown ids are skipped.
    async fn reorder_statuses(&self, ids: &[String], at: DateTime<Utc>) -> DbResult<()>;
}

#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Persists the header, its items and the stock deltas.
    async fn insert_sale(&self, sale: &Sale, stock: &[StockAdjustment]) -> DbResult<()>;

    /// Deletes the header and its items and applies the stock deltas.
    /// Returns false (and writes nothing) when the sale does not exist.
    async fn delete_sale(&self, id: &str, stock: &[StockAdjustment]) -> DbResult<bool>;

    /// Sale headers. `items` is always empty.
    async fn select_sales(&self) -> DbResult<Vec<Sale>>;

    /// One sale header. `items` is empty.
    async fn select_sale(&self, id: &str) -> DbResult<Option<Sale>>;

    /// Every sale item, in sale then line order.
    async fn select_sale_items(&self) -> DbResult<Vec<SaleItem>>;

    async fn select_items_of_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn insert_expense(&self, expense: &Expense) -> DbResult<()>;

    /// `NotFound` when the id is unknown.
    async fn update_expense(&self, expense: &Expense) -> DbResult<()>;

    async fn delete_expense(&self, id: &str) -> DbResult<bool>;

    async fn select_expenses(&self) -> DbResult<Vec<Expense>>;

    async fn select_expense(&self, id: &str) -> DbResult<Option<Expense>>;
}

/// The per-owner preferences record, stored under `PREFERENCES_KEY`.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn select_preferences(&self) -> DbResult<Option<Preferences>>;

    /// Inserts or replaces the record.
    async fn save_preferences(&self, preferences: &Preferences) -> DbResult<()>;
}

// =============================================================================
// Combined Store
// =============================================================================

/// A complete backend. Chosen once, at the composition root.
pub trait Store:
    ProductStore + StatusStore + SaleStore + ExpenseStore + PreferencesStore + Clone + std::fmt::Debug + 'static
{
}

impl<T> Store for T where
    T: ProductStore
        + StatusStore
        + SaleStore
        + ExpenseStore
        + PreferencesStore
        + Clone
        + std::fmt::Debug
        + 'static
{
}

/// Attaches items to their sale headers, keeping item order.
///
/// Items whose sale is not in `sales` are dropped.
pub fn attach_items(mut sales: Vec<Sale>, items: Vec<SaleItem>) -> Vec<Sale> {
    let index: std::collections::HashMap<String, usize> = sales
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();
    for item in items {
        if let Some(&i) = index.get(&item.sale_id) {
            sales[i].items.push(item);
        }
    }
    sales
}
