//! # Error Types
//!
//! Domain-specific error types for salesbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salesbook-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  salesbook-db errors (separate crate)                                  │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ErrorPayload → UI       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. Conflicts are raised before anything is written

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Status id does not exist.
    #[error("Status not found: {0}")]
    StatusNotFound(String),

    /// Sale id does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Expense id does not exist.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    /// Another product already uses this SKU (compared case-insensitively).
    ///
    /// ## User Workflow
    /// ```text
    /// Create product (sku: "tshirt-01")
    ///      │
    ///      ▼
    /// Fresh read of all products: "TSHIRT-01" exists
    ///      │
    ///      ▼
    /// DuplicateSku { sku: "tshirt-01" }   (nothing persisted)
    /// ```
    #[error("SKU '{sku}' is already in use")]
    DuplicateSku { sku: String },

    /// A payment method with this value is already configured.
    #[error("Payment method '{value}' already exists")]
    DuplicatePaymentMethod { value: String },

    /// The custom dashboard period was selected without a date range.
    #[error("A custom period requires a date range")]
    CustomRangeRequired,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::StatusNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::ExpenseNotFound(_)
        )
    }

    /// Returns true for uniqueness conflicts detected before a write.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::DuplicateSku { .. } | CoreError::DuplicatePaymentMethod { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid currency code, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that must not be empty is empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
