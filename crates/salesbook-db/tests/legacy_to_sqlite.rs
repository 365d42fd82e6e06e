//! End to end: a legacy snapshot file is written, reopened, migrated into a
//! file-backed SQLite database, and read back through the SQLite provider.

use std::sync::Arc;

use salesbook_core::report::DashboardPeriod;
use salesbook_core::{
    ExpenseCategory, ExpenseInput, Money, ProductFilters, ProductInput, ProductSort,
    ProductSortKey, SaleInput, SaleItemInput,
};
use salesbook_db::{
    migrate_legacy, migration_needed, DataProvider, Database, DbConfig, LocalStore,
    StaticIdentity,
};

#[tokio::test]
async fn legacy_snapshot_migrates_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("legacy").join("snapshot.json");
    let db_path = dir.path().join("salesbook.db");

    // Build the legacy data through the local backend, persisted on every write
    {
        let legacy = DataProvider::new(LocalStore::load(&snapshot_path).await.unwrap());
        let statuses = legacy.statuses().ensure_defaults().await.unwrap();

        let caftan = legacy
            .products()
            .create(ProductInput {
                sku: "VET-CAF-001".into(),
                name: "Caftan".into(),
                category: Some("Vêtements".into()),
                purchase_price: Money::from_cents(30_000),
                sale_price: Money::from_cents(55_000),
                quantity: Some(6),
                status_id: statuses[0].id.clone(),
                ..Default::default()
            })
            .await
            .unwrap();

        legacy
            .sales()
            .create(SaleInput {
                payment_method: Some("cash".into()),
                items: vec![SaleItemInput {
                    product_id: caftan.id.clone(),
                    qty: 2,
                    unit_sale_price: caftan.sale_price,
                    unit_cost_price: caftan.purchase_price,
                }],
                ..Default::default()
            })
            .await
            .unwrap();

        legacy
            .expenses()
            .create(ExpenseInput {
                label: "Transport".into(),
                category: ExpenseCategory::Transport,
                amount: Money::from_cents(5_000),
                date: chrono::Utc::now().date_naive(),
                note: None,
            })
            .await
            .unwrap();
    }
    assert!(snapshot_path.exists());

    let source = LocalStore::load(&snapshot_path).await.unwrap();
    assert_eq!(source.snapshot().await.products.len(), 1);

    let db = Database::new(DbConfig::new(&db_path)).await.unwrap();
    let target = db.store(Arc::new(StaticIdentity::new("boutique-1")));

    assert!(migration_needed(&source, &target).await.unwrap());
    let report = migrate_legacy(&source, &target).await.unwrap();
    assert!(report.success, "{:?}", report.errors);
    assert_eq!(report.migrated.expenses, 1);

    let provider = db.provider(Arc::new(StaticIdentity::new("boutique-1")));
    let products = provider
        .products()
        .list(&ProductFilters {
            sort: Some(ProductSort::asc(ProductSortKey::Name)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].quantity, 4);

    let stats = provider
        .reports()
        .dashboard_stats(DashboardPeriod::Day, None)
        .await
        .unwrap();
    assert_eq!(stats.sales_count, 1);
    assert_eq!(stats.totals.total_revenue, Money::from_cents(110_000));
    assert_eq!(stats.expenses_total, Money::from_cents(5_000));
    assert_eq!(stats.net_profit, Money::from_cents(45_000));
    assert_eq!(stats.payment_overview[0].method, "cash");

    // Another owner sees nothing
    let stranger = db.provider(Arc::new(StaticIdentity::new("boutique-2")));
    assert!(stranger
        .products()
        .list(&ProductFilters::default())
        .await
        .unwrap()
        .is_empty());

    db.close().await;
}
