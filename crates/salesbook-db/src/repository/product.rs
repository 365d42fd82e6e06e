//! # Product Repository
//!
//! Catalog operations: filtering, CRUD with SKU uniqueness, stock deltas.
//!
//! ## SKU Uniqueness
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create({ sku: "tee-01", ... })                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate fields ──(bad)──► ValidationError, nothing written            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fresh read of every product                                            │
//! │  "TEE-01" already there? ──(yes)──► CoreError::DuplicateSku            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_product                                                         │
//! │  (SQLite keeps a NOCASE unique index as a backstop)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use salesbook_core::totals::StockSummary;
use salesbook_core::validation::{validate_product_input, validate_product_patch};
use salesbook_core::{
    CoreError, Product, ProductFilters, ProductInput, ProductPatch, StockAdjustment,
    DEFAULT_CATEGORY, DEFAULT_REORDER_THRESHOLD,
};

use crate::error::DbResult;
use crate::store::ProductStore;

/// Repository for product operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = ProductRepository::new(store);
///
/// let low = products
///     .list(&ProductFilters { low_stock_only: true, ..Default::default() })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository<S> {
    store: S,
}

impl<S: ProductStore> ProductRepository<S> {
    pub fn new(store: S) -> Self {
        ProductRepository { store }
    }

    /// Lists products matching `filters`.
    ///
    /// Without an explicit sort, the most recently updated come first.
    pub async fn list(&self, filters: &ProductFilters) -> DbResult<Vec<Product>> {
        let products = self.store.select_products().await?;
        let total = products.len();
        let products = filters.apply(products);
        debug!(total = total, matched = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        self.store.select_product(id).await
    }

    /// Creates a product.
    ///
    /// ## Defaults
    /// - category: "Général"
    /// - quantity: 0
    /// - reorder_threshold: 5
    pub async fn create(&self, input: ProductInput) -> DbResult<Product> {
        validate_product_input(&input)?;

        let sku = input.sku.trim().to_string();
        self.ensure_sku_available(&sku, None).await?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku,
            name: input.name.trim().to_string(),
            category: input
                .category
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            brand: clean_optional(input.brand),
            purchase_price: input.purchase_price,
            sale_price: input.sale_price,
            quantity: input.quantity.unwrap_or(0),
            status_id: input.status_id.trim().to_string(),
            reorder_threshold: input.reorder_threshold.unwrap_or(DEFAULT_REORDER_THRESHOLD),
            initial_stock: input.initial_stock,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_product(&product).await?;
        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Applies a partial update.
    ///
    /// A changed SKU is re-checked against every other product.
    pub async fn update(&self, id: &str, patch: ProductPatch) -> DbResult<Product> {
        validate_product_patch(&patch)?;

        let mut product = self
            .store
            .select_product(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if let Some(sku) = patch.sku {
            let sku = sku.trim().to_string();
            if sku != product.sku {
                self.ensure_sku_available(&sku, Some(id)).await?;
            }
            product.sku = sku;
        }
        if let Some(name) = patch.name {
            product.name = name.trim().to_string();
        }
        if let Some(category) = patch.category {
            product.category = category.trim().to_string();
        }
        if patch.brand.is_some() {
            product.brand = clean_optional(patch.brand);
        }
        if let Some(price) = patch.purchase_price {
            product.purchase_price = price;
        }
        if let Some(price) = patch.sale_price {
            product.sale_price = price;
        }
        if let Some(quantity) = patch.quantity {
            product.quantity = quantity;
        }
        if let Some(status_id) = patch.status_id {
            product.status_id = status_id.trim().to_string();
        }
        if let Some(threshold) = patch.reorder_threshold {
            product.reorder_threshold = threshold;
        }
        if patch.initial_stock.is_some() {
            product.initial_stock = patch.initial_stock;
        }
        product.updated_at = Utc::now();

        self.store.update_product(&product).await?;
        debug!(id = %id, "Product updated");
        Ok(product)
    }

    /// Deletes a product. Sale items referencing it are kept.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        if !self.store.delete_product(id).await? {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }
        info!(id = %id, "Product removed");
        Ok(())
    }

    /// Applies signed quantity deltas one after another.
    ///
    /// Missing products are skipped. The batch is not atomic: a store
    /// failure part-way leaves earlier deltas applied.
    ///
    /// Each delta is an in-place increment in the store, so concurrent sales
    /// on one product both land. Only `update` with an absolute `quantity`
    /// races with a delta (last writer wins).
    pub async fn adjust_stock(&self, adjustments: &[StockAdjustment]) -> DbResult<()> {
        let now = Utc::now();
        for adjustment in adjustments {
            let applied = self
                .store
                .add_to_quantity(&adjustment.product_id, adjustment.delta, now)
                .await?;
            if !applied {
                warn!(
                    product_id = %adjustment.product_id,
                    delta = adjustment.delta,
                    "Stock adjustment skipped: product not found"
                );
            }
        }
        Ok(())
    }

    pub async fn stock_summary(&self) -> DbResult<StockSummary> {
        let products = self.store.select_products().await?;
        Ok(StockSummary::from_products(&products))
    }

    /// Distinct categories in use, sorted.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let products = self.store.select_products().await?;
        let categories: BTreeSet<String> = products.into_iter().map(|p| p.category).collect();
        Ok(categories.into_iter().collect())
    }

    async fn ensure_sku_available(&self, sku: &str, exclude_id: Option<&str>) -> DbResult<()> {
        let wanted = sku.to_lowercase();
        let taken = self
            .store
            .select_products()
            .await?
            .iter()
            .filter(|p| Some(p.id.as_str()) != exclude_id)
            .any(|p| p.sku.to_lowercase() == wanted);

        if taken {
            return Err(CoreError::DuplicateSku {
                sku: sku.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Trims an optional text field, mapping blank to `None`.
fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use salesbook_core::{Money, ProductSort, ProductSortKey};

    fn input(sku: &str, name: &str, quantity: i64) -> ProductInput {
        ProductInput {
            sku: sku.to_string(),
            name: name.to_string(),
            purchase_price: Money::from_cents(800),
            sale_price: Money::from_cents(1_200),
            quantity: Some(quantity),
            status_id: "st-default".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        let product = repo
            .create(ProductInput {
                sku: " MUG-01 ".to_string(),
                name: "Mug".to_string(),
                status_id: "st-default".to_string(),
                brand: Some("  ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(product.sku, "MUG-01");
        assert_eq!(product.category, "Général");
        assert_eq!(product.quantity, 0);
        assert_eq!(product.reorder_threshold, 5);
        assert_eq!(product.brand, None);
        assert_eq!(product.created_at, product.updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected_before_write() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        repo.create(input("TSHIRT-01", "T-shirt", 3)).await.unwrap();

        let err = repo.create(input("tshirt-01", "Other", 1)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.list(&ProductFilters::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_checks_sku_excluding_self() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        let a = repo.create(input("A-1", "Alpha", 1)).await.unwrap();
        repo.create(input("B-1", "Beta", 1)).await.unwrap();

        // Same SKU in a different case is the record itself.
        let renamed = repo
            .update(&a.id, ProductPatch { sku: Some("a-1".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.sku, "a-1");
        assert!(renamed.updated_at >= a.updated_at);

        let err = repo
            .update(&a.id, ProductPatch { sku: Some("b-1".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = repo.update("missing", ProductPatch::default()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        let product = repo.create(input("A-1", "Alpha", 1)).await.unwrap();
        repo.remove(&product.id).await.unwrap();
        assert!(repo.remove(&product.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_adjust_stock_skips_missing_products() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        let product = repo.create(input("A-1", "Alpha", 10)).await.unwrap();

        repo.adjust_stock(&[
            StockAdjustment::new(product.id.clone(), -3),
            StockAdjustment::new("ghost", 5),
            StockAdjustment::new(product.id.clone(), 1),
        ])
        .await
        .unwrap();

        assert_eq!(repo.get(&product.id).await.unwrap().unwrap().quantity, 8);
    }

    #[tokio::test]
    async fn test_list_filters_and_sort() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        repo.create(input("Z-1", "zèbre", 2)).await.unwrap();
        repo.create(input("A-1", "Abricot", 50)).await.unwrap();
        repo.create(input("M-1", "mangue", 1)).await.unwrap();

        let low = repo
            .list(&ProductFilters { low_stock_only: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(low.len(), 2);

        let by_name = repo
            .list(&ProductFilters {
                sort: Some(ProductSort::asc(ProductSortKey::Name)),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = by_name.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Abricot", "mangue", "zèbre"]);

        let found = repo.list(&ProductFilters::search("MANG")).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_stock_summary_and_categories() {
        let repo = ProductRepository::new(LocalStore::in_memory());
        repo.create(ProductInput { category: Some("Boissons".into()), ..input("A-1", "Thé", 10) })
            .await
            .unwrap();
        repo.create(input("B-1", "Savon", 2)).await.unwrap();

        let summary = repo.stock_summary().await.unwrap();
        assert_eq!(summary.total_products, 2);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.total_cost, Money::from_cents(800 * 12));
        assert_eq!(summary.total_potential, Money::from_cents(1_200 * 12));

        assert_eq!(repo.categories().await.unwrap(), vec!["Boissons", "Général"]);
    }
}
