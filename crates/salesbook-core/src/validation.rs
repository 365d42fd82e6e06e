//! # Validation Module
//!
//! Input validation for Salesbook records.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation layer                                           │
//! │  └── Form checks and immediate feedback                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (salesbook-db)                                  │
//! │  ├── THIS MODULE: field rules (run first, no I/O)                      │
//! │  └── Uniqueness checks against a fresh read (SKU, payment method)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store (SQLite)                                               │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys (sale_items → sales only)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salesbook_core::validation::{validate_sku, normalize_currency};
//!
//! validate_sku("TSHIRT-01").unwrap();
//! assert_eq!(normalize_currency(" eur ").unwrap(), "EUR");
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::money::Money;
use crate::query::DateRange;
use crate::types::{
    ExpenseInput, ExpensePatch, PaymentMethodOption, ProductInput, ProductPatch, SaleInput,
    StatusInput, StatusPatch,
};
use crate::{MAX_LABEL_LENGTH, MAX_NOTE_LENGTH, MAX_PRICE_CENTS, MAX_QUANTITY, MAX_SKU_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty once trimmed
/// - At most 64 characters
/// - No whitespace inside
///
/// ```rust
/// use salesbook_core::validation::validate_sku;
///
/// assert!(validate_sku("TSHIRT-01").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("T SHIRT").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.chars().count() > MAX_SKU_LENGTH {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LENGTH,
        });
    }

    if sku.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display text (product name, status label, expense
/// label...).
pub fn validate_label(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_LABEL_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_LABEL_LENGTH,
        });
    }

    Ok(())
}

/// Validates an optional free-text note.
pub fn validate_note(note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(note) if note.chars().count() > MAX_NOTE_LENGTH => Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Normalizes a search term: trimmed and lower-cased.
///
/// Returns `None` for an empty term, which means "no search filter".
pub fn normalize_search(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Validates and normalizes a currency code.
///
/// ## Rules
/// - Exactly 3 ASCII letters after trimming
/// - Returned upper-cased
///
/// ```rust
/// use salesbook_core::validation::normalize_currency;
///
/// assert_eq!(normalize_currency("mad").unwrap(), "MAD");
/// assert!(normalize_currency("EURO").is_err());
/// assert!(normalize_currency("E1R").is_err());
/// ```
pub fn normalize_currency(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a 3-letter code".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a payment method option before it is appended.
pub fn validate_payment_method(option: &PaymentMethodOption) -> ValidationResult<()> {
    if option.value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payment method value".to_string(),
        });
    }
    validate_label("payment method label", &option.label)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a unit price. Zero is allowed, at most `MAX_PRICE_CENTS`.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if price.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a stock count or threshold. Zero is allowed.
pub fn validate_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a stock quantity: a count no larger than `MAX_QUANTITY`.
pub fn validate_stock_quantity(field: &str, value: i64) -> ValidationResult<()> {
    validate_count(field, value)?;
    if value > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a sale line quantity, from 1 to `MAX_QUANTITY`.
pub fn validate_sale_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }
    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

/// Validates an expense amount (strictly positive, at most `MAX_PRICE_CENTS`).
pub fn validate_expense_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    if amount.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates that a date range does not end before it starts.
pub fn validate_range(range: &DateRange) -> ValidationResult<()> {
    if range.end < range.start {
        return Err(ValidationError::InvalidFormat {
            field: "range".to_string(),
            reason: "end is before start".to_string(),
        });
    }
    Ok(())
}

/// Validates an optional timestamp against the unix epoch.
///
/// Dates before 1970 are rejected; they only appear through malformed imports.
pub fn validate_timestamp(field: &str, value: Option<DateTime<Utc>>) -> ValidationResult<()> {
    match value {
        Some(ts) if ts.timestamp() < 0 => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not be before 1970".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a new product's fields. SKU uniqueness is checked separately.
pub fn validate_product_input(input: &ProductInput) -> ValidationResult<()> {
    validate_sku(&input.sku)?;
    validate_label("name", &input.name)?;
    if let Some(category) = input.category.as_deref() {
        validate_label("category", category)?;
    }
    validate_price("purchase_price", input.purchase_price)?;
    validate_price("sale_price", input.sale_price)?;
    if let Some(quantity) = input.quantity {
        validate_stock_quantity("quantity", quantity)?;
    }
    if let Some(threshold) = input.reorder_threshold {
        validate_count("reorder_threshold", threshold)?;
    }
    if let Some(initial) = input.initial_stock {
        validate_stock_quantity("initial_stock", initial)?;
    }
    if input.status_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "status_id".to_string(),
        });
    }
    Ok(())
}

/// Validates the fields present in a product patch.
pub fn validate_product_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if let Some(sku) = patch.sku.as_deref() {
        validate_sku(sku)?;
    }
    if let Some(name) = patch.name.as_deref() {
        validate_label("name", name)?;
    }
    if let Some(category) = patch.category.as_deref() {
        validate_label("category", category)?;
    }
    if let Some(price) = patch.purchase_price {
        validate_price("purchase_price", price)?;
    }
    if let Some(price) = patch.sale_price {
        validate_price("sale_price", price)?;
    }
    if let Some(quantity) = patch.quantity {
        validate_stock_quantity("quantity", quantity)?;
    }
    if let Some(threshold) = patch.reorder_threshold {
        validate_count("reorder_threshold", threshold)?;
    }
    if let Some(initial) = patch.initial_stock {
        validate_stock_quantity("initial_stock", initial)?;
    }
    Ok(())
}

pub fn validate_status_input(input: &StatusInput) -> ValidationResult<()> {
    validate_label("label", &input.label)?;
    if let Some(order) = input.order {
        validate_count("order", order)?;
    }
    Ok(())
}

pub fn validate_status_patch(patch: &StatusPatch) -> ValidationResult<()> {
    if let Some(label) = patch.label.as_deref() {
        validate_label("label", label)?;
    }
    if let Some(order) = patch.order {
        validate_count("order", order)?;
    }
    Ok(())
}

/// Validates a sale before anything is written.
///
/// ## Rules
/// - At least one item
/// - Every item: product id present, 1 ≤ qty ≤ `MAX_QUANTITY`,
///   both prices between 0 and `MAX_PRICE_CENTS`
pub fn validate_sale_input(input: &SaleInput) -> ValidationResult<()> {
    if input.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for item in &input.items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            });
        }
        validate_sale_quantity(item.qty)?;
        validate_price("unit_sale_price", item.unit_sale_price)?;
        validate_price("unit_cost_price", item.unit_cost_price)?;
    }

    validate_timestamp("date", input.date)?;
    validate_note(input.note.as_deref())
}

pub fn validate_expense_input(input: &ExpenseInput) -> ValidationResult<()> {
    validate_label("label", &input.label)?;
    validate_expense_amount(input.amount)?;
    validate_note(input.note.as_deref())
}

pub fn validate_expense_patch(patch: &ExpensePatch) -> ValidationResult<()> {
    if let Some(label) = patch.label.as_deref() {
        validate_label("label", label)?;
    }
    if let Some(amount) = patch.amount {
        validate_expense_amount(amount)?;
    }
    validate_note(patch.note.as_deref())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleItemInput;
    use chrono::TimeZone;

    fn sale_item(qty: i64, sale: i64, cost: i64) -> SaleItemInput {
        SaleItemInput {
            product_id: "p1".to_string(),
            qty,
            unit_sale_price: Money::from_cents(sale),
            unit_cost_price: Money::from_cents(cost),
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("TSHIRT-01").is_ok());
        assert!(validate_sku("ref/42").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("name", "Sac à main").is_ok());
        assert!(matches!(
            validate_label("name", "  "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_label("name", &"x".repeat(300)).is_err());
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search(Some("  Sac ")), Some("sac".to_string()));
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(None), None);
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency("usd").unwrap(), "USD");
        assert_eq!(normalize_currency(" Xof ").unwrap(), "XOF");
        assert!(normalize_currency("").is_err());
        assert!(normalize_currency("DH").is_err());
        assert!(normalize_currency("€UR").is_err());
    }

    #[test]
    fn test_numeric_rules() {
        assert!(validate_price("sale_price", Money::zero()).is_ok());
        assert!(validate_price("sale_price", Money::from_cents(-1)).is_err());
        assert!(validate_count("quantity", 0).is_ok());
        assert!(validate_count("quantity", -1).is_err());
        assert!(validate_sale_quantity(1).is_ok());
        assert!(validate_sale_quantity(0).is_err());
        assert!(validate_expense_amount(Money::from_cents(1)).is_ok());
        assert!(validate_expense_amount(Money::zero()).is_err());
    }

    #[test]
    fn test_numeric_upper_bounds() {
        assert!(validate_sale_quantity(MAX_QUANTITY).is_ok());
        assert!(matches!(
            validate_sale_quantity(MAX_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_sale_quantity(i64::MAX).is_err());

        assert!(validate_price("sale_price", Money::from_cents(MAX_PRICE_CENTS)).is_ok());
        assert!(matches!(
            validate_price("sale_price", Money::from_cents(MAX_PRICE_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_expense_amount(Money::from_cents(i64::MAX)).is_err());

        assert!(validate_stock_quantity("quantity", MAX_QUANTITY).is_ok());
        assert!(validate_stock_quantity("quantity", MAX_QUANTITY + 1).is_err());
        assert!(validate_stock_quantity("quantity", -1).is_err());
    }

    #[test]
    fn test_validate_sale_input() {
        let mut input = SaleInput {
            items: vec![sale_item(2, 1000, 600)],
            ..Default::default()
        };
        assert!(validate_sale_input(&input).is_ok());

        input.items.clear();
        assert!(matches!(
            validate_sale_input(&input),
            Err(ValidationError::Empty { .. })
        ));

        input.items.push(sale_item(0, 1000, 600));
        assert!(validate_sale_input(&input).is_err());

        input.items = vec![sale_item(1, -5, 600)];
        assert!(validate_sale_input(&input).is_err());

        input.items = vec![sale_item(1, 1000, 600)];
        input.date = Some(Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap());
        assert!(validate_sale_input(&input).is_err());
    }

    #[test]
    fn test_validate_product_input() {
        let input = ProductInput {
            sku: "SAC-01".into(),
            name: "Sac".into(),
            status_id: "s1".into(),
            ..Default::default()
        };
        assert!(validate_product_input(&input).is_ok());

        let missing_status = ProductInput {
            status_id: String::new(),
            ..input.clone()
        };
        assert!(validate_product_input(&missing_status).is_err());

        let negative_stock = ProductInput {
            quantity: Some(-3),
            ..input.clone()
        };
        assert!(validate_product_input(&negative_stock).is_err());

        let huge_stock = ProductInput {
            quantity: Some(i64::MAX),
            ..input
        };
        assert!(validate_product_input(&huge_stock).is_err());
    }

    #[test]
    fn test_validate_range() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        assert!(validate_range(&DateRange::new(start, end)).is_ok());
        assert!(validate_range(&DateRange::new(start, start)).is_ok());
        assert!(validate_range(&DateRange::new(end, start)).is_err());
    }
}
