//! # Sale Repository
//!
//! Recording, listing and undoing sales, with stock kept in step.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(input)                                                          │
//! │    validate ── at least one item, qty ≥ 1, prices ≥ 0                   │
//! │    materialize items (profit_line frozen here)                          │
//! │    calc_sale_totals                                                     │
//! │    store.insert_sale(header + items, −qty per item)   ← one unit        │
//! │                                                                         │
//! │  remove(id, restore_stock)                                              │
//! │    load sale + items (absent → no-op)                                   │
//! │    store.delete_sale(header + items, +qty per item)   ← one unit        │
//! │                                                                         │
//! │  update(id, input)                                                      │
//! │    remove(id, true)          ← unit 1                                   │
//! │    create({ ..input, id })   ← unit 2                                   │
//! │    A failure in unit 2 leaves the sale deleted with stock restored.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use salesbook_core::report::{rank_top_products, TopProduct};
use salesbook_core::totals::{calc_sale_totals, line_profit};
use salesbook_core::validation::validate_sale_input;
use salesbook_core::{ProductFilters, Sale, SaleFilters, SaleInput, SaleItem};

use super::ProductRepository;
use crate::error::DbResult;
use crate::store::{attach_items, ProductStore, SaleStore};

/// Repository for sale operations.
///
/// ## Usage
/// ```rust,ignore
/// let sales = SaleRepository::new(store.clone(), ProductRepository::new(store));
///
/// let sale = sales.create(SaleInput { items, ..Default::default() }).await?;
/// sales.remove(&sale.id, true).await?; // stock restored
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository<S> {
    store: S,
    products: ProductRepository<S>,
}

impl<S: SaleStore + ProductStore> SaleRepository<S> {
    pub fn new(store: S, products: ProductRepository<S>) -> Self {
        SaleRepository { store, products }
    }

    /// Sales with their items, filtered, newest first.
    pub async fn list(&self, filters: &SaleFilters) -> DbResult<Vec<Sale>> {
        let headers = self.store.select_sales().await?;
        let items = self.store.select_sale_items().await?;
        let sales = filters.apply(attach_items(headers, items));
        debug!(matched = sales.len(), "Listed sales");
        Ok(sales)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let Some(mut sale) = self.store.select_sale(id).await? else {
            return Ok(None);
        };
        sale.items = self.store.select_items_of_sale(id).await?;
        Ok(Some(sale))
    }

    /// Records a sale and takes its quantities out of stock.
    ///
    /// `input.id` is reused when present.
    pub async fn create(&self, input: SaleInput) -> DbResult<Sale> {
        validate_sale_input(&input)?;

        let now = Utc::now();
        let sale_id = input
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let items: Vec<SaleItem> = input
            .items
            .iter()
            .map(|line| SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.trim().to_string(),
                qty: line.qty,
                unit_sale_price: line.unit_sale_price,
                unit_cost_price: line.unit_cost_price,
                profit_line: line_profit(line),
            })
            .collect();

        let totals = calc_sale_totals(&items);

        let sale = Sale {
            id: sale_id,
            date: input.date.unwrap_or(now),
            items,
            total_revenue: totals.total_revenue,
            total_cost: totals.total_cost,
            total_profit: totals.total_profit,
            payment_method: clean_optional(input.payment_method),
            note: clean_optional(input.note),
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_sale(&sale, &sale.destock_adjustments())
            .await?;

        info!(
            id = %sale.id,
            items = sale.items.len(),
            revenue = %sale.total_revenue,
            "Sale recorded"
        );
        Ok(sale)
    }

    /// Deletes a sale and its items, optionally putting the stock back.
    ///
    /// Does nothing when the sale does not exist.
    pub async fn remove(&self, id: &str, restore_stock: bool) -> DbResult<()> {
        let Some(sale) = self.get(id).await? else {
            debug!(id = %id, "Sale already absent");
            return Ok(());
        };

        let stock = if restore_stock {
            sale.restock_adjustments()
        } else {
            Vec::new()
        };

        if self.store.delete_sale(id, &stock).await? {
            info!(id = %id, restore_stock = restore_stock, "Sale removed");
        }
        Ok(())
    }

    /// Replaces a sale: remove with stock restored, then create under the
    /// same id.
    ///
    /// The two steps are separate units. If the second fails (invalid input
    /// included), the original sale stays deleted and its stock restored.
    pub async fn update(&self, id: &str, input: SaleInput) -> DbResult<Sale> {
        self.remove(id, true).await?;
        self.create(SaleInput {
            id: Some(id.to_string()),
            ..input
        })
        .await
    }

    /// Best-selling products by profit, over every recorded sale.
    pub async fn top_products(&self, limit: usize) -> DbResult<Vec<TopProduct>> {
        let sales = self.list(&SaleFilters::default()).await?;
        let products = self.products.list(&ProductFilters::default()).await?;
        Ok(rank_top_products(&sales, &products, limit))
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
