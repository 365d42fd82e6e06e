//! # Local Store
//!
//! The legacy single-user document store: plain in-memory tables, optionally
//! written through to a JSON snapshot file after every mutation.
//!
//! ```text
//! ┌───────────────────────────┐   write lock   ┌──────────────────────┐
//! │ Arc<RwLock<LocalSnapshot>>│ ─────────────► │ salesbook.json (tmp  │
//! │ statuses, products, ...   │    apply()     │ file, then rename)   │
//! └───────────────────────────┘                └──────────────────────┘
//! ```
//!
//! Units of work hold the write lock from the first change to the last, so
//! readers never observe a sale without its stock deltas. With a snapshot
//! file, a change becomes visible only after the file write succeeds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salesbook_core::{Expense, Preferences, Product, Sale, SaleItem, Status, StockAdjustment};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{ExpenseStore, PreferencesStore, ProductStore, SaleStore, StatusStore, StatusWrite};
use crate::error::{DbError, DbResult};

/// Serialized form of the local store.
///
/// Sale headers and sale items are separate tables, as in the legacy
/// browser storage. Every field defaults to empty so partial snapshots load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub sale_items: Vec<SaleItem>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

impl LocalSnapshot {
    /// True when there is nothing worth migrating.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.products.is_empty() && self.sales.is_empty()
    }

    fn apply_stock(&mut self, stock: &[StockAdjustment], at: DateTime<Utc>) {
        for adjustment in stock {
            match self.products.iter_mut().find(|p| p.id == adjustment.product_id) {
                Some(product) => {
                    product.quantity = product.quantity.saturating_add(adjustment.delta);
                    product.updated_at = at;
                }
                None => warn!(
                    product_id = %adjustment.product_id,
                    delta = adjustment.delta,
                    "Stock adjustment skipped: product not found"
                ),
            }
        }
    }
}

/// In-memory store with optional JSON write-through.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    tables: Arc<RwLock<LocalSnapshot>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Empty store that never touches disk.
    pub fn in_memory() -> Self {
        LocalStore::default()
    }

    /// In-memory store seeded from a snapshot.
    pub fn from_snapshot(snapshot: LocalSnapshot) -> Self {
        LocalStore {
            tables: Arc::new(RwLock::new(snapshot)),
            path: None,
        }
    }

    /// Opens a snapshot file, starting empty when it does not exist yet.
    /// Later mutations are written back to the same file.
    pub async fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();

        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot found, starting empty");
                LocalSnapshot::default()
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            path = %path.display(),
            statuses = snapshot.statuses.len(),
            products = snapshot.products.len(),
            sales = snapshot.sales.len(),
            "Loaded local snapshot"
        );

        Ok(LocalStore {
            tables: Arc::new(RwLock::new(snapshot)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current tables.
    pub async fn snapshot(&self) -> LocalSnapshot {
        self.tables.read().await.clone()
    }

    /// Writes the current tables to `path`.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let tables = self.tables.read().await;
        write_snapshot(path.as_ref(), &tables).await
    }

    /// Runs `change` under the write lock.
    ///
    /// With a snapshot file, the change is applied to a copy that replaces
    /// the live tables only once the file is written. A failed change or a
    /// failed write leaves the tables as they were.
    async fn apply<T, F>(&self, change: F) -> DbResult<T>
    where
        T: Send,
        F: FnOnce(&mut LocalSnapshot) -> DbResult<T> + Send,
    {
        let mut tables = self.tables.write().await;
        let Some(path) = &self.path else {
            return change(&mut *tables);
        };

        let mut staged = tables.clone();
        let out = change(&mut staged)?;
        write_snapshot(path, &staged).await?;
        *tables = staged;
        Ok(out)
    }
}

async fn write_snapshot(path: &Path, tables: &LocalSnapshot) -> DbResult<()> {
    let json = serde_json::to_vec_pretty(tables)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductStore for LocalStore {
    async fn insert_product(&self, product: &Product) -> DbResult<()> {
        self.apply(|tables| {
            let wanted = product.sku.to_lowercase();
            if tables.products.iter().any(|p| p.sku.to_lowercase() == wanted) {
                return Err(DbError::duplicate("sku", &product.sku));
            }
            tables.products.push(product.clone());
            Ok(())
        })
        .await
    }

    async fn update_product(&self, product: &Product) -> DbResult<()> {
        self.apply(|tables| {
            let slot = tables
                .products
                .iter_mut()
                .find(|p| p.id == product.id)
                .ok_or_else(|| DbError::not_found("Product", &product.id))?;
            *slot = product.clone();
            Ok(())
        })
        .await
    }

    async fn delete_product(&self, id: &str) -> DbResult<bool> {
        if self.select_product(id).await?.is_none() {
            return Ok(false);
        }
        self.apply(|tables| {
            let before = tables.products.len();
            tables.products.retain(|p| p.id != id);
            Ok(tables.products.len() < before)
        })
        .await
    }

    async fn select_products(&self) -> DbResult<Vec<Product>> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn select_product(&self, id: &str) -> DbResult<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn add_to_quantity(&self, id: &str, delta: i64, at: DateTime<Utc>) -> DbResult<bool> {
        if self.select_product(id).await?.is_none() {
            return Ok(false);
        }
        self.apply(|tables| {
            let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
                return Ok(false);
            };
            product.quantity = product.quantity.saturating_add(delta);
            product.updated_at = at;
            Ok(true)
        })
        .await
    }
}

// =============================================================================
// Statuses
// =============================================================================

#[async_trait]
impl StatusStore for LocalStore {
    async fn insert_status(&self, status: &Status) -> DbResult<()> {
        self.apply(|tables| {
            tables.statuses.push(status.clone());
            Ok(())
        })
        .await
    }

    async fn update_status(&self, status: &Status) -> DbResult<()> {
        self.apply(|tables| {
            let slot = tables
                .statuses
                .iter_mut()
                .find(|s| s.id == status.id)
                .ok_or_else(|| DbError::not_found("Status", &status.id))?;
            *slot = status.clone();
            Ok(())
        })
        .await
    }

    async fn delete_status(&self, id: &str) -> DbResult<bool> {
        if self.select_status(id).await?.is_none() {
            return Ok(false);
        }
        self.apply(|tables| {
            let before = tables.statuses.len();
            tables.statuses.retain(|s| s.id != id);
            Ok(tables.statuses.len() < before)
        })
        .await
    }

    async fn select_statuses(&self) -> DbResult<Vec<Status>> {
        let mut statuses = self.tables.read().await.statuses.clone();
        statuses.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
        Ok(statuses)
    }

    async fn select_status(&self, id: &str) -> DbResult<Option<Status>> {
        let tables = self.tables.read().await;
        Ok(tables.statuses.iter().find(|s| s.id == id).cloned())
    }

    async fn write_default_status(&self, status: &Status, write: StatusWrite) -> DbResult<()> {
        self.apply(|tables| {
            if write == StatusWrite::Update && !tables.statuses.iter().any(|s| s.id == status.id) {
                return Err(DbError::not_found("Status", &status.id));
            }

            for other in tables.statuses.iter_mut().filter(|s| s.is_default) {
                other.is_default = false;
                other.updated_at = status.updated_at;
            }

            match write {
                StatusWrite::Insert => tables.statuses.push(status.clone()),
                StatusWrite::Update => {
                    if let Some(slot) = tables.statuses.iter_mut().find(|s| s.id == status.id) {
                        *slot = status.clone();
                    }
                }
            }
            Ok(())
        })
        .await
    }

    async fn reorder_statuses(&self, ids: &[String], at: DateTime<Utc>) -> DbResult<()> {
        self.apply(|tables| {
            for (position, id) in ids.iter().enumerate() {
                if let Some(status) = tables.statuses.iter_mut().find(|s| &s.id == id) {
                    status.order = position as i64;
                    status.updated_at = at;
                }
            }
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Sales
// =============================================================================

#[async_trait]
impl SaleStore for LocalStore {
    async fn insert_sale(&self, sale: &Sale, stock: &[StockAdjustment]) -> DbResult<()> {
        self.apply(|tables| {
            if tables.sales.iter().any(|s| s.id == sale.id) {
                return Err(DbError::duplicate("sale id", &sale.id));
            }

            let mut header = sale.clone();
            let items = std::mem::take(&mut header.items);
            tables.sales.push(header);
            tables.sale_items.extend(items);
            tables.apply_stock(stock, sale.updated_at);
            Ok(())
        })
        .await
    }

    async fn delete_sale(&self, id: &str, stock: &[StockAdjustment]) -> DbResult<bool> {
        if self.select_sale(id).await?.is_none() {
            return Ok(false);
        }
        self.apply(|tables| {
            let before = tables.sales.len();
            tables.sales.retain(|s| s.id != id);
            if tables.sales.len() == before {
                return Ok(false);
            }

            tables.sale_items.retain(|item| item.sale_id != id);
            tables.apply_stock(stock, Utc::now());
            Ok(true)
        })
        .await
    }

    async fn select_sales(&self) -> DbResult<Vec<Sale>> {
        let mut sales = self.tables.read().await.sales.clone();
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sales)
    }

    async fn select_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let tables = self.tables.read().await;
        Ok(tables.sales.iter().find(|s| s.id == id).cloned())
    }

    async fn select_sale_items(&self) -> DbResult<Vec<SaleItem>> {
        Ok(self.tables.read().await.sale_items.clone())
    }

    async fn select_items_of_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sale_items
            .iter()
            .filter(|item| item.sale_id == sale_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[async_trait]
impl ExpenseStore for LocalStore {
    async fn insert_expense(&self, expense: &Expense) -> DbResult<()> {
        self.apply(|tables| {
            tables.expenses.push(expense.clone());
            Ok(())
        })
        .await
    }

    async fn update_expense(&self, expense: &Expense) -> DbResult<()> {
        self.apply(|tables| {
            let slot = tables
                .expenses
                .iter_mut()
                .find(|e| e.id == expense.id)
                .ok_or_else(|| DbError::not_found("Expense", &expense.id))?;
            *slot = expense.clone();
            Ok(())
        })
        .await
    }

    async fn delete_expense(&self, id: &str) -> DbResult<bool> {
        if self.select_expense(id).await?.is_none() {
            return Ok(false);
        }
        self.apply(|tables| {
            let before = tables.expenses.len();
            tables.expenses.retain(|e| e.id != id);
            Ok(tables.expenses.len() < before)
        })
        .await
    }

    async fn select_expenses(&self) -> DbResult<Vec<Expense>> {
        Ok(self.tables.read().await.expenses.clone())
    }

    async fn select_expense(&self, id: &str) -> DbResult<Option<Expense>> {
        let tables = self.tables.read().await;
        Ok(tables.expenses.iter().find(|e| e.id == id).cloned())
    }
}

// =============================================================================
// Preferences
// =============================================================================

#[async_trait]
impl PreferencesStore for LocalStore {
    async fn select_preferences(&self) -> DbResult<Option<Preferences>> {
        Ok(self.tables.read().await.preferences.clone())
    }

    async fn save_preferences(&self, preferences: &Preferences) -> DbResult<()> {
        self.apply(|tables| {
            tables.preferences = Some(preferences.clone());
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
