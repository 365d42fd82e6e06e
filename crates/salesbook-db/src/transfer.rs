//! # Export, Import and Legacy Migration
//!
//! Moves whole datasets between stores.
//!
//! ## Legacy Migration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LocalStore (snapshot file)              SqliteStore (owner-scoped)     │
//! │        │                                        ▲                       │
//! │        ▼                                        │                       │
//! │  export_all ──► ExportedData ──► statuses ──────┤                       │
//! │                                  products ──────┤   ids preserved,      │
//! │                                  sales + items ─┤   no stock deltas     │
//! │                                  expenses ──────┤                       │
//! │                                  preferences ───┘                       │
//! │                                                                         │
//! │  Per collection: the first failure stops that collection and is         │
//! │  recorded; the next collection still runs.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use salesbook_core::{Expense, Preferences, Product, Sale, Status};

use crate::error::{DbError, DbResult};
use crate::store::{attach_items, Store};

/// A full dataset, as exported from one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExportedData {
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub products: Vec<Product>,
    /// Sales with their items attached.
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

impl ExportedData {
    /// True when there are no statuses, products or sales.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.products.is_empty() && self.sales.is_empty()
    }
}

/// Records written per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferCounts {
    pub statuses: usize,
    pub products: usize,
    pub sales: usize,
    pub sale_items: usize,
    pub expenses: usize,
    /// 1 when preferences were written or already present.
    pub preferences: usize,
}

impl TransferCounts {
    pub fn total(&self) -> usize {
        self.statuses + self.products + self.sales + self.sale_items + self.expenses + self.preferences
    }
}

/// Outcome of a legacy migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MigrationReport {
    /// No errors and at least one record migrated.
    pub success: bool,
    pub message: String,
    pub migrated: TransferCounts,
    pub errors: Vec<String>,
}

impl MigrationReport {
    fn finish(migrated: TransferCounts, errors: Vec<String>) -> Self {
        let total = migrated.total();
        let (success, message) = if errors.is_empty() && total > 0 {
            (true, "Migration réussie!".to_string())
        } else if total > 0 {
            (
                false,
                format!(
                    "Migration partielle: {} éléments migrés avec {} erreurs",
                    total,
                    errors.len()
                ),
            )
        } else {
            (false, "Échec de la migration".to_string())
        };

        MigrationReport {
            success,
            message,
            migrated,
            errors,
        }
    }
}

// =============================================================================
// Export / Import
// =============================================================================

/// Reads every collection of `store`.
pub async fn export_all<S: Store>(store: &S) -> DbResult<ExportedData> {
    let headers = store.select_sales().await?;
    let items = store.select_sale_items().await?;

    Ok(ExportedData {
        statuses: store.select_statuses().await?,
        products: store.select_products().await?,
        sales: attach_items(headers, items),
        expenses: store.select_expenses().await?,
        preferences: store.select_preferences().await?,
    })
}

/// Writes `data` into `store`, keeping ids and stock levels as they are.
///
/// Order: statuses, products, sales with items, expenses, preferences.
/// Stops at the first failure; records written before it stay written.
pub async fn import_all<S: Store>(store: &S, data: &ExportedData) -> DbResult<TransferCounts> {
    let mut counts = TransferCounts::default();

    for status in &data.statuses {
        store.insert_status(status).await?;
        counts.statuses += 1;
    }
    for product in &data.products {
        store.insert_product(product).await?;
        counts.products += 1;
    }
    for sale in &data.sales {
        store.insert_sale(sale, &[]).await?;
        counts.sales += 1;
        counts.sale_items += sale.items.len();
    }
    for expense in &data.expenses {
        store.insert_expense(expense).await?;
        counts.expenses += 1;
    }
    if let Some(preferences) = &data.preferences {
        store.save_preferences(preferences).await?;
        counts.preferences = 1;
    }

    info!(records = counts.total(), "Import complete");
    Ok(counts)
}

// =============================================================================
// Legacy Migration
// =============================================================================

/// True when `target` holds no statuses, products or sales and `source` does.
pub async fn migration_needed<A: Store, B: Store>(source: &A, target: &B) -> DbResult<bool> {
    let target_has_data = !target.select_products().await?.is_empty()
        || !target.select_statuses().await?.is_empty()
        || !target.select_sales().await?.is_empty();
    if target_has_data {
        return Ok(false);
    }

    let source_has_data = !source.select_products().await?.is_empty()
        || !source.select_statuses().await?.is_empty()
        || !source.select_sales().await?.is_empty();
    Ok(source_has_data)
}

/// Copies everything from the legacy `source` into `target`.
///
/// Collection failures are collected in the report rather than returned.
/// An unauthenticated target yields a failed report; other failures to read
/// the source are returned as errors.
pub async fn migrate_legacy<A: Store, B: Store>(source: &A, target: &B) -> DbResult<MigrationReport> {
    if let Err(err) = target.select_preferences().await {
        if !matches!(err, DbError::Unauthenticated) {
            return Err(err);
        }
        return Ok(MigrationReport {
            success: false,
            message: "Utilisateur non authentifié. Veuillez vous connecter pour migrer les données."
                .to_string(),
            migrated: TransferCounts::default(),
            errors: vec![err.to_string()],
        });
    }

    let data = export_all(source).await?;
    let mut migrated = TransferCounts::default();
    let mut errors = Vec::new();

    for status in &data.statuses {
        if let Err(e) = target.insert_status(status).await {
            errors.push(format!("Erreur lors de la migration des statuts: {e}"));
            break;
        }
        migrated.statuses += 1;
    }

    for product in &data.products {
        if let Err(e) = target.insert_product(product).await {
            errors.push(format!("Erreur lors de la migration des produits: {e}"));
            break;
        }
        migrated.products += 1;
    }

    for sale in &data.sales {
        if let Err(e) = target.insert_sale(sale, &[]).await {
            errors.push(format!("Erreur lors de la migration des ventes: {e}"));
            break;
        }
        migrated.sales += 1;
        migrated.sale_items += sale.items.len();
    }

    for expense in &data.expenses {
        if let Err(e) = target.insert_expense(expense).await {
            errors.push(format!("Erreur lors de la migration des dépenses: {e}"));
            break;
        }
        migrated.expenses += 1;
    }

    match migrate_preferences(&data, target).await {
        Ok(count) => migrated.preferences = count,
        Err(e) => errors.push(format!("Erreur lors de la migration des préférences: {e}")),
    }

    let report = MigrationReport::finish(migrated, errors);
    if report.success {
        info!(records = report.migrated.total(), "Legacy migration complete");
    } else {
        warn!(
            records = report.migrated.total(),
            errors = report.errors.len(),
            message = %report.message,
            "Legacy migration incomplete"
        );
    }
    Ok(report)
}

/// Existing target preferences win; otherwise the source's are copied.
async fn migrate_preferences<B: Store>(data: &ExportedData, target: &B) -> DbResult<usize> {
    if target.select_preferences().await?.is_some() {
        return Ok(1);
    }
    match &data.preferences {
        Some(preferences) => {
            target.save_preferences(preferences).await?;
            Ok(1)
        }
        None => Ok(0),
    }
}

/// Deletes every sale, product, status and expense in `store`.
///
/// Stock is not restored. Preferences are kept.
pub async fn clear_all<S: Store>(store: &S) -> DbResult<()> {
    for sale in store.select_sales().await? {
        store.delete_sale(&sale.id, &[]).await?;
    }
    for product in store.select_products().await? {
        store.delete_product(&product.id).await?;
    }
    for status in store.select_statuses().await? {
        store.delete_status(&status.id).await?;
    }
    for expense in store.select_expenses().await? {
        store.delete_expense(&expense.id).await?;
    }
    info!("Store cleared");
    Ok(())
}
