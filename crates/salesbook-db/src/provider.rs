//! # Data Provider
//!
//! Composition root: every repository wired over one store.
//!
//! ```text
//! DataProvider<S>
//! ├── products()      ProductRepository<S>
//! ├── statuses()      StatusRepository<S>
//! ├── sales()         SaleRepository<S>        (holds products)
//! ├── preferences()   PreferencesRepository<S>
//! ├── expenses()      ExpenseRepository<S>
//! └── reports()       ReportRepository<S>      (holds all of the above)
//! ```
//!
//! The backend is picked once, when the provider is built:
//! `Database::provider(identity)` for SQLite, `DataProvider::new(local)` for
//! the legacy snapshot store.

use crate::repository::{
    ExpenseRepository, PreferencesRepository, ProductRepository, ReportRepository,
    SaleRepository, StatusRepository,
};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct DataProvider<S> {
    store: S,
    products: ProductRepository<S>,
    statuses: StatusRepository<S>,
    sales: SaleRepository<S>,
    preferences: PreferencesRepository<S>,
    expenses: ExpenseRepository<S>,
    reports: ReportRepository<S>,
}

impl<S: Store> DataProvider<S> {
    pub fn new(store: S) -> Self {
        let products = ProductRepository::new(store.clone());
        let statuses = StatusRepository::new(store.clone());
        let sales = SaleRepository::new(store.clone(), products.clone());
        let preferences = PreferencesRepository::new(store.clone());
        let expenses = ExpenseRepository::new(store.clone());
        let reports = ReportRepository::new(
            products.clone(),
            statuses.clone(),
            sales.clone(),
            preferences.clone(),
            expenses.clone(),
        );

        DataProvider {
            store,
            products,
            statuses,
            sales,
            preferences,
            expenses,
            reports,
        }
    }

    /// The underlying backend, for export and migration.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn products(&self) -> &ProductRepository<S> {
        &self.products
    }

    pub fn statuses(&self) -> &StatusRepository<S> {
        &self.statuses
    }

    pub fn sales(&self) -> &SaleRepository<S> {
        &self.sales
    }

    pub fn preferences(&self) -> &PreferencesRepository<S> {
        &self.preferences
    }

    pub fn expenses(&self) -> &ExpenseRepository<S> {
        &self.expenses
    }

    pub fn reports(&self) -> &ReportRepository<S> {
        &self.reports
    }
}
