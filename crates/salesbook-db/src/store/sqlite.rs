//! # SQLite Store
//!
//! Relational backend over a `SqlitePool`.
//!
//! ## Owner Scoping
//! ```text
//! repository call
//!      │
//!      ▼
//! identity.current_owner() ──(none)──► DbError::Unauthenticated
//!      │
//!      ▼
//! every statement carries `AND owner_id = ?`
//! ```
//!
//! Multi-statement units run inside one transaction; dropping the
//! transaction on an early `?` rolls everything back.
//!
//! Queries are plain `sqlx::query`/`query_as` with `FromRow` row structs and
//! are checked at runtime, so the crate builds without a prepared database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use salesbook_core::{
    Expense, ExpenseCategory, Money, PaymentMethodOption, Preferences, Product, Sale, SaleItem,
    Status, StockAdjustment, PREFERENCES_KEY,
};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use super::{ExpenseStore, PreferencesStore, ProductStore, SaleStore, StatusStore, StatusWrite};
use crate::error::{DbError, DbResult};
use crate::identity::IdentityProvider;

/// Owner-scoped SQLite backend.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    identity: Arc<dyn IdentityProvider>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, identity: Arc<dyn IdentityProvider>) -> Self {
        SqliteStore { pool, identity }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn owner(&self) -> DbResult<String> {
        self.identity.current_owner().await
    }

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

/// Applies stock deltas in place, skipping products that no longer exist.
///
/// The increment runs inside the UPDATE statement, so two sales touching the
/// same product are serialized by SQLite and neither delta is lost.
async fn apply_stock(
    conn: &mut SqliteConnection,
    owner: &str,
    stock: &[StockAdjustment],
    at: DateTime<Utc>,
) -> DbResult<()> {
    for adjustment in stock {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE id = ?3 AND owner_id = ?4
            "#,
        )
        .bind(adjustment.delta)
        .bind(at)
        .bind(&adjustment.product_id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            warn!(
                product_id = %adjustment.product_id,
                delta = adjustment.delta,
                "Stock adjustment skipped: product not found"
            );
        }
    }
    Ok(())
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    category: String,
    brand: Option<String>,
    purchase_price_cents: i64,
    sale_price_cents: i64,
    quantity: i64,
    status_id: String,
    reorder_threshold: i64,
    initial_stock: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            category: row.category,
            brand: row.brand,
            purchase_price: Money::from_cents(row.purchase_price_cents),
            sale_price: Money::from_cents(row.sale_price_cents),
            quantity: row.quantity,
            status_id: row.status_id,
            reorder_threshold: row.reorder_threshold,
            initial_stock: row.initial_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatusRow {
    id: String,
    label: String,
    color: String,
    is_default: bool,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StatusRow> for Status {
    fn from(row: StatusRow) -> Self {
        Status {
            id: row.id,
            label: row.label,
            color: row.color,
            is_default: row.is_default,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    date: DateTime<Utc>,
    total_revenue_cents: i64,
    total_cost_cents: i64,
    total_profit_cents: i64,
    payment_method: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            date: row.date,
            items: Vec::new(),
            total_revenue: Money::from_cents(row.total_revenue_cents),
            total_cost: Money::from_cents(row.total_cost_cents),
            total_profit: Money::from_cents(row.total_profit_cents),
            payment_method: row.payment_method,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    product_id: String,
    qty: i64,
    unit_sale_price_cents: i64,
    unit_cost_price_cents: i64,
    profit_line_cents: i64,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            qty: row.qty,
            unit_sale_price: Money::from_cents(row.unit_sale_price_cents),
            unit_cost_price: Money::from_cents(row.unit_cost_price_cents),
            profit_line: Money::from_cents(row.profit_line_cents),
        }
    }
}

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: String,
    label: String,
    category: ExpenseCategory,
    amount_cents: i64,
    date: NaiveDate,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            label: row.label,
            category: row.category,
            amount: Money::from_cents(row.amount_cents),
            date: row.date,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PreferencesRow {
    currency: String,
    payment_methods: String,
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductStore for SqliteStore {
    async fn insert_product(&self, product: &Product) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, owner_id, sku, name, category, brand,
                purchase_price_cents, sale_price_cents, quantity,
                status_id, reorder_threshold, initial_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&owner)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(product.purchase_price.cents())
        .bind(product.sale_price.cents())
        .bind(product.quantity)
        .bind(&product.status_id)
        .bind(product.reorder_threshold)
        .bind(product.initial_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?3,
                name = ?4,
                category = ?5,
                brand = ?6,
                purchase_price_cents = ?7,
                sale_price_cents = ?8,
                quantity = ?9,
                status_id = ?10,
                reorder_threshold = ?11,
                initial_stock = ?12,
                updated_at = ?13
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(&product.id)
        .bind(&owner)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(product.purchase_price.cents())
        .bind(product.sale_price.cents())
        .bind(product.quantity)
        .bind(&product.status_id)
        .bind(product.reorder_threshold)
        .bind(product.initial_stock)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> DbResult<bool> {
        let owner = self.owner().await?;
        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_products(&self) -> DbResult<Vec<Product>> {
        let owner = self.owner().await?;
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, sku, name, category, brand,
                   purchase_price_cents, sale_price_cents, quantity,
                   status_id, reorder_threshold, initial_stock,
                   created_at, updated_at
            FROM products
            WHERE owner_id = ?1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(&owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn select_product(&self, id: &str) -> DbResult<Option<Product>> {
        let owner = self.owner().await?;
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, sku, name, category, brand,
                   purchase_price_cents, sale_price_cents, quantity,
                   status_id, reorder_threshold, initial_stock,
                   created_at, updated_at
            FROM products
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(&owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn add_to_quantity(&self, id: &str, delta: i64, at: DateTime<Utc>) -> DbResult<bool> {
        let owner = self.owner().await?;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE id = ?3 AND owner_id = ?4
            "#,
        )
        .bind(delta)
        .bind(at)
        .bind(id)
        .bind(&owner)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Statuses
// =============================================================================

async fn insert_status_row(conn: &mut SqliteConnection, owner: &str, status: &Status) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO statuses (id, owner_id, label, color, is_default, sort_order, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&status.id)
    .bind(owner)
    .bind(&status.label)
    .bind(&status.color)
    .bind(status.is_default)
    .bind(status.order)
    .bind(status.created_at)
    .bind(status.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_status_row(conn: &mut SqliteConnection, owner: &str, status: &Status) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE statuses SET
            label = ?3, color = ?4, is_default = ?5, sort_order = ?6, updated_at = ?7
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(&status.id)
    .bind(owner)
    .bind(&status.label)
    .bind(&status.color)
    .bind(status.is_default)
    .bind(status.order)
    .bind(status.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Status", &status.id));
    }
    Ok(())
}

#[async_trait]
impl StatusStore for SqliteStore {
    async fn insert_status(&self, status: &Status) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %status.id, label = %status.label, "Inserting status");
        let mut conn = self.pool.acquire().await?;
        insert_status_row(&mut conn, &owner, status).await
    }

    async fn update_status(&self, status: &Status) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %status.id, "Updating status");
        let mut conn = self.pool.acquire().await?;
        update_status_row(&mut conn, &owner, status).await
    }

    async fn delete_status(&self, id: &str) -> DbResult<bool> {
        let owner = self.owner().await?;
        let result = sqlx::query("DELETE FROM statuses WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_statuses(&self) -> DbResult<Vec<Status>> {
        let owner = self.owner().await?;
        let rows: Vec<StatusRow> = sqlx::query_as(
            r#"
            SELECT id, label, color, is_default, sort_order, created_at, updated_at
            FROM statuses
            WHERE owner_id = ?1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(&owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Status::from).collect())
    }

    async fn select_status(&self, id: &str) -> DbResult<Option<Status>> {
        let owner = self.owner().await?;
        let row: Option<StatusRow> = sqlx::query_as(
            r#"
            SELECT id, label, color, is_default, sort_order, created_at, updated_at
            FROM statuses
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(&owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Status::from))
    }

    async fn write_default_status(&self, status: &Status, write: StatusWrite) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %status.id, ?write, "Switching default status");

        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            UPDATE statuses SET is_default = 0, updated_at = ?1
            WHERE owner_id = ?2 AND is_default = 1
            "#,
        )
        .bind(status.updated_at)
        .bind(&owner)
        .execute(&mut *tx)
        .await?;

        match write {
            StatusWrite::Insert => insert_status_row(&mut tx, &owner, status).await?,
            StatusWrite::Update => update_status_row(&mut tx, &owner, status).await?,
        }

        commit(tx).await
    }

    async fn reorder_statuses(&self, ids: &[String], at: DateTime<Utc>) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(count = ids.len(), "Reordering statuses");

        let mut tx = self.begin().await?;
        for (position, id) in ids.iter().enumerate() {
            sqlx::query(
                r#"
                UPDATE statuses SET sort_order = ?1, updated_at = ?2
                WHERE id = ?3 AND owner_id = ?4
                "#,
            )
            .bind(position as i64)
            .bind(at)
            .bind(id)
            .bind(&owner)
            .execute(&mut *tx)
            .await?;
        }
        commit(tx).await
    }
}

// =============================================================================
// Sales
// =============================================================================

#[async_trait]
impl SaleStore for SqliteStore {
    async fn insert_sale(&self, sale: &Sale, stock: &[StockAdjustment]) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %sale.id, items = sale.items.len(), "Inserting sale");

        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, owner_id, date,
                total_revenue_cents, total_cost_cents, total_profit_cents,
                payment_method, note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&owner)
        .bind(sale.date)
        .bind(sale.total_revenue.cents())
        .bind(sale.total_cost.cents())
        .bind(sale.total_profit.cents())
        .bind(&sale.payment_method)
        .bind(&sale.note)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in sale.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, owner_id, sale_id, product_id, position, qty,
                    unit_sale_price_cents, unit_cost_price_cents, profit_line_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&owner)
            .bind(&sale.id)
            .bind(&item.product_id)
            .bind(position as i64)
            .bind(item.qty)
            .bind(item.unit_sale_price.cents())
            .bind(item.unit_cost_price.cents())
            .bind(item.profit_line.cents())
            .execute(&mut *tx)
            .await?;
        }

        apply_stock(&mut tx, &owner, stock, sale.updated_at).await?;

        commit(tx).await
    }

    async fn delete_sale(&self, id: &str, stock: &[StockAdjustment]) -> DbResult<bool> {
        let owner = self.owner().await?;
        debug!(id = %id, restock = stock.len(), "Deleting sale");

        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&owner)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&owner)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // nothing to delete; dropping the transaction rolls back
            return Ok(false);
        }

        apply_stock(&mut tx, &owner, stock, Utc::now()).await?;

        commit(tx).await?;
        Ok(true)
    }

    async fn select_sales(&self) -> DbResult<Vec<Sale>> {
        let owner = self.owner().await?;
        let rows: Vec<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, date, total_revenue_cents, total_cost_cents, total_profit_cents,
                   payment_method, note, created_at, updated_at
            FROM sales
            WHERE owner_id = ?1
            ORDER BY date DESC
            "#,
        )
        .bind(&owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    async fn select_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let owner = self.owner().await?;
        let row: Option<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, date, total_revenue_cents, total_cost_cents, total_profit_cents,
                   payment_method, note, created_at, updated_at
            FROM sales
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(&owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Sale::from))
    }

    async fn select_sale_items(&self) -> DbResult<Vec<SaleItem>> {
        let owner = self.owner().await?;
        let rows: Vec<SaleItemRow> = sqlx::query_as(
            r#"
            SELECT id, sale_id, product_id, qty,
                   unit_sale_price_cents, unit_cost_price_cents, profit_line_cents
            FROM sale_items
            WHERE owner_id = ?1
            ORDER BY sale_id, position
            "#,
        )
        .bind(&owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SaleItem::from).collect())
    }

    async fn select_items_of_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let owner = self.owner().await?;
        let rows: Vec<SaleItemRow> = sqlx::query_as(
            r#"
            SELECT id, sale_id, product_id, qty,
                   unit_sale_price_cents, unit_cost_price_cents, profit_line_cents
            FROM sale_items
            WHERE sale_id = ?1 AND owner_id = ?2
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .bind(&owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SaleItem::from).collect())
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[async_trait]
impl ExpenseStore for SqliteStore {
    async fn insert_expense(&self, expense: &Expense) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %expense.id, category = %expense.category, "Inserting expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, owner_id, label, category, amount_cents, date, note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&expense.id)
        .bind(&owner)
        .bind(&expense.label)
        .bind(expense.category)
        .bind(expense.amount.cents())
        .bind(expense.date)
        .bind(&expense.note)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_expense(&self, expense: &Expense) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(id = %expense.id, "Updating expense");

        let result = sqlx::query(
            r#"
            UPDATE expenses SET
                label = ?3, category = ?4, amount_cents = ?5, date = ?6, note = ?7, updated_at = ?8
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(&expense.id)
        .bind(&owner)
        .bind(&expense.label)
        .bind(expense.category)
        .bind(expense.amount.cents())
        .bind(expense.date)
        .bind(&expense.note)
        .bind(expense.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", &expense.id));
        }
        Ok(())
    }

    async fn delete_expense(&self, id: &str) -> DbResult<bool> {
        let owner = self.owner().await?;
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_expenses(&self) -> DbResult<Vec<Expense>> {
        let owner = self.owner().await?;
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, label, category, amount_cents, date, note, created_at, updated_at
            FROM expenses
            WHERE owner_id = ?1
            ORDER BY date DESC
            "#,
        )
        .bind(&owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn select_expense(&self, id: &str) -> DbResult<Option<Expense>> {
        let owner = self.owner().await?;
        let row: Option<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, label, category, amount_cents, date, note, created_at, updated_at
            FROM expenses
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(&owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Expense::from))
    }
}

// =============================================================================
// Preferences
// =============================================================================

#[async_trait]
impl PreferencesStore for SqliteStore {
    async fn select_preferences(&self) -> DbResult<Option<Preferences>> {
        let owner = self.owner().await?;
        let row: Option<PreferencesRow> = sqlx::query_as(
            "SELECT currency, payment_methods FROM preferences WHERE owner_id = ?1 AND key = ?2",
        )
        .bind(&owner)
        .bind(PREFERENCES_KEY)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let payment_methods: Vec<PaymentMethodOption> =
                serde_json::from_str(&row.payment_methods)?;
            Ok::<_, DbError>(Preferences {
                currency: row.currency,
                payment_methods,
            })
        })
        .transpose()
    }

    async fn save_preferences(&self, preferences: &Preferences) -> DbResult<()> {
        let owner = self.owner().await?;
        debug!(currency = %preferences.currency, "Saving preferences");

        let payment_methods = serde_json::to_string(&preferences.payment_methods)?;
        sqlx::query(
            r#"
            INSERT INTO preferences (owner_id, key, currency, payment_methods, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (owner_id, key) DO UPDATE SET
                currency = excluded.currency,
                payment_methods = excluded.payment_methods,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&owner)
        .bind(PREFERENCES_KEY)
        .bind(&preferences.currency)
        .bind(payment_methods)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::pool::{Database, DbConfig};
    use crate::provider::DataProvider;
    use salesbook_core::{
        ExpenseInput, ProductInput, SaleFilters, SaleInput, SaleItemInput, StatusInput,
        StatusPatch,
    };

    async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn provider_for(db: &Database, owner: &str) -> DataProvider<SqliteStore> {
        db.provider(Arc::new(StaticIdentity::new(owner)))
    }

    fn product_input(sku: &str, qty: i64) -> ProductInput {
        ProductInput {
            sku: sku.to_string(),
            name: format!("Produit {}", sku),
            purchase_price: Money::from_cents(4_000),
            sale_price: Money::from_cents(10_000),
            quantity: Some(qty),
            status_id: "st-1".to_string(),
            ..Default::default()
        }
    }

    fn sale_of(product: &Product, qty: i64) -> SaleInput {
        SaleInput {
            payment_method: Some("cash".to_string()),
            items: vec![SaleItemInput {
                product_id: product.id.clone(),
                qty,
                unit_sale_price: product.sale_price,
                unit_cost_price: product.purchase_price,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_product_roundtrip_through_rows() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");

        let created = provider
            .products()
            .create(ProductInput {
                brand: Some("Atlas".into()),
                initial_stock: Some(7),
                ..product_input("CAF-001", 7)
            })
            .await
            .unwrap();

        let loaded = provider.products().get(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.sku, "CAF-001");
        assert_eq!(loaded.brand.as_deref(), Some("Atlas"));
        assert_eq!(loaded.purchase_price, Money::from_cents(4_000));
        assert_eq!(loaded.sale_price, Money::from_cents(10_000));
        assert_eq!(loaded.quantity, 7);
        assert_eq!(loaded.initial_stock, Some(7));
        assert_eq!(loaded.category, salesbook_core::DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let db = database().await;
        let alice = provider_for(&db, "alice");
        let bob = provider_for(&db, "bob");

        let product = alice.products().create(product_input("SKU-1", 3)).await.unwrap();

        assert!(bob.products().get(&product.id).await.unwrap().is_none());
        assert_eq!(bob.products().stock_summary().await.unwrap().total_products, 0);

        // Same SKU is free for another owner
        bob.products().create(product_input("sku-1", 1)).await.unwrap();

        // Bob cannot delete Alice's product
        assert!(bob.products().remove(&product.id).await.is_err());
        assert!(alice.products().get(&product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unauthenticated_store_refuses_everything() {
        let db = database().await;
        let store = db.store(Arc::new(StaticIdentity::anonymous()));

        assert!(matches!(store.select_products().await, Err(DbError::Unauthenticated)));
        assert!(matches!(store.select_preferences().await, Err(DbError::Unauthenticated)));
        assert!(matches!(
            store.delete_sale("missing", &[]).await,
            Err(DbError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_unique_sku_index_backstop() {
        let db = database().await;
        let store = db.store(Arc::new(StaticIdentity::new("owner-a")));
        let provider = DataProvider::new(store.clone());

        let product = provider.products().create(product_input("DUP-1", 1)).await.unwrap();
        let clone = Product {
            id: "other-id".into(),
            sku: "dup-1".into(),
            ..product
        };

        let err = store.insert_product(&clone).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_sale_create_and_remove_move_stock() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");
        let product = provider.products().create(product_input("S-1", 10)).await.unwrap();

        let sale = provider.sales().create(sale_of(&product, 3)).await.unwrap();
        assert_eq!(sale.total_revenue, Money::from_cents(30_000));
        assert_eq!(sale.total_profit, Money::from_cents(18_000));

        let after_sale = provider.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after_sale.quantity, 7);

        let loaded = provider.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].profit_line, Money::from_cents(18_000));

        provider.sales().remove(&sale.id, true).await.unwrap();
        let restored = provider.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(restored.quantity, 10);
        assert!(provider.sales().get(&sale.id).await.unwrap().is_none());
        assert!(provider.store().select_sale_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_sales_both_destock() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");
        let product = provider.products().create(product_input("C-1", 10)).await.unwrap();

        let sales = provider.sales();
        let (first, second) = tokio::join!(
            sales.create(sale_of(&product, 2)),
            sales.create(sale_of(&product, 3)),
        );
        first.unwrap();
        second.unwrap();

        let after = provider.products().get(&product.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 5);
    }

    #[tokio::test]
    async fn test_sale_insert_rolls_back_on_item_failure() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");
        let store = provider.store().clone();
        let product = provider.products().create(product_input("RB-1", 5)).await.unwrap();

        let now = Utc::now();
        let item = SaleItem {
            id: "item-1".into(),
            sale_id: "sale-1".into(),
            product_id: product.id.clone(),
            qty: 1,
            unit_sale_price: product.sale_price,
            unit_cost_price: product.purchase_price,
            profit_line: Money::from_cents(6_000),
        };
        let sale = Sale {
            id: "sale-1".into(),
            date: now,
            // same item id twice: second insert violates the primary key
            items: vec![item.clone(), item],
            total_revenue: Money::from_cents(20_000),
            total_cost: Money::from_cents(8_000),
            total_profit: Money::from_cents(12_000),
            payment_method: None,
            note: None,
            created_at: now,
            updated_at: now,
        };

        let stock = sale.destock_adjustments();
        assert!(store.insert_sale(&sale, &stock).await.is_err());

        assert!(store.select_sale("sale-1").await.unwrap().is_none());
        assert!(store.select_sale_items().await.unwrap().is_empty());
        let untouched = store.select_product(&product.id).await.unwrap().unwrap();
        assert_eq!(untouched.quantity, 5);
    }

    #[tokio::test]
    async fn test_delete_missing_sale_is_false() {
        let db = database().await;
        let store = db.store(Arc::new(StaticIdentity::new("owner-a")));
        assert!(!store.delete_sale("nope", &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_sale_filters_by_payment_method() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");
        let product = provider.products().create(product_input("PM-1", 10)).await.unwrap();

        provider.sales().create(sale_of(&product, 1)).await.unwrap();
        provider
            .sales()
            .create(SaleInput {
                payment_method: Some("card".into()),
                ..sale_of(&product, 2)
            })
            .await
            .unwrap();

        let filters = SaleFilters {
            payment_method: Some("card".into()),
            ..Default::default()
        };
        let card = provider.sales().list(&filters).await.unwrap();
        assert_eq!(card.len(), 1);
        assert_eq!(card[0].items[0].qty, 2);
    }

    #[tokio::test]
    async fn test_single_default_status() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");

        let seeded = provider.statuses().ensure_defaults().await.unwrap();
        assert_eq!(seeded.len(), 4);
        assert!(seeded[0].is_default);

        let custom = provider
            .statuses()
            .create(StatusInput {
                label: "Soldé".into(),
                color: "#000000".into(),
                is_default: true,
                order: None,
            })
            .await
            .unwrap();
        assert_eq!(custom.order, 4);

        let statuses = provider.statuses().list().await.unwrap();
        let defaults: Vec<_> = statuses.iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, custom.id);

        provider
            .statuses()
            .update(
                &seeded[2].id,
                StatusPatch {
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let default = provider.statuses().get_default().await.unwrap().unwrap();
        assert_eq!(default.id, seeded[2].id);
        assert_eq!(
            provider
                .statuses()
                .list()
                .await
                .unwrap()
                .iter()
                .filter(|s| s.is_default)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_reorder_statuses() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");
        let seeded = provider.statuses().ensure_defaults().await.unwrap();

        let reversed: Vec<String> = seeded.iter().rev().map(|s| s.id.clone()).collect();
        provider.statuses().reorder(&reversed).await.unwrap();

        let listed: Vec<String> = provider
            .statuses()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, reversed);
    }

    #[tokio::test]
    async fn test_preferences_upsert() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");

        let seeded = provider.preferences().get().await.unwrap();
        assert_eq!(seeded.currency, salesbook_core::APP_CURRENCY);
        assert_eq!(seeded.payment_methods.len(), 4);

        provider.preferences().update_currency("EUR").await.unwrap();
        provider
            .preferences()
            .add_payment_method(PaymentMethodOption::new("cheque", "Chèque"))
            .await
            .unwrap();

        let stored = provider.store().select_preferences().await.unwrap().unwrap();
        assert_eq!(stored.currency, "EUR");
        assert!(stored.has_payment_method("cheque"));
    }

    #[tokio::test]
    async fn test_expense_rows() {
        let db = database().await;
        let provider = provider_for(&db, "owner-a");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let expense = provider
            .expenses()
            .create(ExpenseInput {
                label: "Loyer".into(),
                category: ExpenseCategory::Rent,
                amount: Money::from_cents(300_000),
                date,
                note: Some("Mars".into()),
            })
            .await
            .unwrap();

        let loaded = provider.expenses().get(&expense.id).await.unwrap().unwrap();
        assert_eq!(loaded.category, ExpenseCategory::Rent);
        assert_eq!(loaded.date, date);
        assert_eq!(loaded.amount, Money::from_cents(300_000));

        provider.expenses().remove(&expense.id).await.unwrap();
        assert!(provider.expenses().remove(&expense.id).await.is_err());
    }
}
