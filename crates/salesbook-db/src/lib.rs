//! # salesbook-db: Persistence Layer for Salesbook
//!
//! Repositories over two interchangeable store backends, plus the
//! configuration and migration tooling around them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salesbook Data Flow                              │
//! │                                                                         │
//! │  Presentation layer (screens, forms, dashboard)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  salesbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │ DataProvider  │───►│ Repositories  │───►│ Store trait  │   │   │
//! │  │   │ (provider.rs) │    │ products,     │    │              │   │   │
//! │  │   │               │    │ statuses,     │    │ SqliteStore  │   │   │
//! │  │   │               │    │ sales, ...    │    │ LocalStore   │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  SQLite (owner-scoped rows)           JSON snapshot (legacy)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`store`] - Store traits and the SQLite / local backends
//! - [`repository`] - Domain repositories
//! - [`provider`] - Composition root
//! - [`transfer`] - Export, import and legacy migration
//! - [`identity`] - Acting owner
//! - [`config`] - TOML + environment configuration, logging setup
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use salesbook_db::{Database, DbConfig, StaticIdentity};
//!
//! let db = Database::new(DbConfig::new("salesbook.db")).await?;
//! let provider = db.provider(Arc::new(StaticIdentity::new("owner-1")));
//!
//! provider.statuses().ensure_defaults().await?;
//! let stats = provider.reports().dashboard_stats(DashboardPeriod::Week, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod identity;
pub mod migrations;
pub mod pool;
pub mod provider;
pub mod repository;
pub mod store;
pub mod transfer;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{init_tracing, AppConfig};
pub use error::{DbError, DbResult, ErrorKind, ErrorPayload};
pub use identity::{IdentityProvider, StaticIdentity};
pub use pool::{Database, DbConfig};
pub use provider::DataProvider;
pub use store::{LocalSnapshot, LocalStore, SqliteStore, Store};
pub use transfer::{
    clear_all, export_all, import_all, migrate_legacy, migration_needed, ExportedData,
    MigrationReport, TransferCounts,
};

pub use repository::{
    ExpenseRepository, PreferencesRepository, ProductRepository, ReportRepository,
    SaleRepository, StatusRepository,
};
