//! # Repository Module
//!
//! Domain-level operations over a [`Store`](crate::store::Store) backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Presentation layer                                                     │
//! │       │                                                                 │
//! │       │  provider.sales().create(input)                                 │
//! │       ▼                                                                 │
//! │  SaleRepository<S>                                                      │
//! │  ├── validate input                                                     │
//! │  ├── derive totals and stock deltas                                     │
//! │  └── hand one unit of work to the store                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  S: Store  (SqliteStore | LocalStore)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Filtering, sorting and joins happen here, in memory, after a full
//! owner-scoped read.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog CRUD, SKU uniqueness, stock deltas
//! - [`StatusRepository`] - Status labels and the single default
//! - [`SaleRepository`] - Sales with items, stock kept in step
//! - [`PreferencesRepository`] - Currency and payment methods
//! - [`ExpenseRepository`] - Expenses and category summaries
//! - [`ReportRepository`] - Dashboard, stock and sales reports

pub mod expense;
pub mod preferences;
pub mod product;
pub mod report;
pub mod sale;
pub mod status;

pub use expense::ExpenseRepository;
pub use preferences::PreferencesRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use sale::SaleRepository;
pub use status::StatusRepository;
