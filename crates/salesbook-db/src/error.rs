//! # Database Error Types
//!
//! Error types for store and repository operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / io::Error / serde_json::Error     CoreError             │
//! │       │                                               │                 │
//! │       ▼                                               ▼                 │
//! │  DbError (this module) ◄──────────── DbError::Domain(CoreError)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → ErrorKind  (constraint / connectivity / permission) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorPayload { code, message } ← Serialized for the presentation layer│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories never retry and never swallow a store failure.

use salesbook_core::CoreError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Store and repository errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in the store.
    ///
    /// ## When This Occurs
    /// - Updating a record whose id does not exist
    /// - The row belongs to another owner
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation raised by the store itself.
    ///
    /// The SKU index is a backstop: the product repository reports
    /// duplicates as `CoreError::DuplicateSku` before writing.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key or check constraint violation.
    #[error("Constraint violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Store unreachable.
    ///
    /// ## When This Occurs
    /// - Database file can't be opened or created
    /// - Pool closed
    /// - I/O failure talking to the store
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The store refused the operation.
    ///
    /// ## When This Occurs
    /// - Read-only database file
    /// - Row-level access denied by the hosted backend
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No acting identity is available to scope the operation.
    #[error("No authenticated owner")]
    Unauthenticated,

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed for a reason not classified above.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction begin/commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Snapshot, export or stored JSON could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// File I/O on a snapshot or export file.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Business rule violation raised by a repository.
    #[error(transparent)]
    Domain(#[from] CoreError),
}

/// Coarse classification used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Entity missing.
    NotFound,
    /// Bad input or a uniqueness conflict caught before writing.
    Validation,
    /// The store rejected the write on a constraint.
    Constraint,
    /// Store unreachable or overloaded.
    Connectivity,
    /// Identity missing or access refused.
    Permission,
    Internal,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ErrorKind::Constraint
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => ErrorKind::Connectivity,
            DbError::PermissionDenied(_) | DbError::Unauthenticated => ErrorKind::Permission,
            DbError::Domain(core) if core.is_not_found() => ErrorKind::NotFound,
            DbError::Domain(_) | DbError::Config(_) => ErrorKind::Validation,
            DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::Serialization(_)
            | DbError::Io(_)
            | DbError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for any flavour of "entity missing", including domain ones.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True for uniqueness conflicts, whether caught by a repository or the store.
    pub fn is_conflict(&self) -> bool {
        match self {
            DbError::UniqueViolation { .. } => true,
            DbError::Domain(core) => core.is_conflict(),
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound     → DbError::NotFound
/// sqlx::Error::Database        → constraint kind, else permission codes,
///                                else QueryFailed
/// sqlx::Error::PoolTimedOut    → DbError::PoolExhausted
/// sqlx::Error::PoolClosed / Io → DbError::ConnectionFailed
/// Other                        → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if db_err.is_unique_violation() {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if is_permission_code(db_err.code().as_deref()) {
                    DbError::PermissionDenied(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// SQLITE_PERM (3), SQLITE_READONLY (8) and SQLITE_AUTH (23), including
/// their extended codes.
fn is_permission_code(code: Option<&str>) -> bool {
    let Some(code) = code.and_then(|c| c.parse::<i32>().ok()) else {
        return false;
    };
    matches!(code & 0xff, 3 | 8 | 23)
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => DbError::PermissionDenied(err.to_string()),
            _ => DbError::Io(err.to_string()),
        }
    }
}

impl From<salesbook_core::ValidationError> for DbError {
    fn from(err: salesbook_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Presentation Payload
// =============================================================================

/// What the presentation layer receives when an operation fails.
///
/// ```json
/// { "code": "VALIDATION", "message": "SKU 'TSHIRT-01' is already in use" }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ErrorPayload {
    pub code: ErrorKind,
    pub message: String,
}

impl From<&DbError> for ErrorPayload {
    fn from(err: &DbError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %err, "Store operation failed");
                "Database operation failed".to_string()
            }
            _ => err.to_string(),
        };
        ErrorPayload {
            code: kind,
            message,
        }
    }
}

impl From<DbError> for ErrorPayload {
    fn from(err: DbError) -> Self {
        ErrorPayload::from(&err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
