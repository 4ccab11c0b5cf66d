//! # Validation Module
//!
//! Input validation utilities for the ledger services.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP handler / desktop command)                       │
//! │  ├── Type validation (deserialization)                                  │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - pure business-rule validation                   │
//! │  ├── Positive quantities and amounts                                    │
//! │  ├── Removal never exceeds on-hand stock                                │
//! │  └── Repayment never exceeds outstanding debt                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL constraints                                               │
//! │  ├── UNIQUE constraints (sku, barcode, phone)                           │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All checks here are pure and run before a ledger transaction opens, so a
//! failed validation never leaves partial state behind.

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Quantity / Amount Validators
// =============================================================================

/// Validates that a quantity is strictly positive.
///
/// Used by purchase items, refund quantities and manual adjustments.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates that a monetary amount (in cents) is strictly positive.
pub fn validate_amount(amount_cents: i64) -> ValidationResult<()> {
    if amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a tendered payment amount: zero means nothing paid yet and is
/// fine; a negative amount would understate debt or overstate credit.
pub fn validate_paid_amount(amount_cents: i64) -> ValidationResult<()> {
    if amount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "paid amount".to_string(),
        });
    }
    Ok(())
}

/// Validates that a stock removal does not exceed the quantity on hand.
pub fn validate_removal(available: i64, requested: i64) -> ValidationResult<()> {
    validate_quantity(requested)?;
    if requested > available {
        return Err(ValidationError::InsufficientStock {
            available,
            requested,
        });
    }
    Ok(())
}

/// Validates a debt repayment against the customer's outstanding balance.
pub fn validate_repayment(amount_cents: i64, debt_cents: i64) -> ValidationResult<()> {
    validate_amount(amount_cents)?;
    if amount_cents > debt_cents {
        return Err(ValidationError::RepaymentExceedsDebt {
            amount: amount_cents,
            debt: debt_cents,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, customer, supplier).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a refund selection: at least one sale item id.
pub fn validate_refund_selection(item_ids: &[String]) -> ValidationResult<()> {
    if item_ids.is_empty() {
        return Err(ValidationError::EmptyRefundSelection);
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_paid_amount() {
        assert!(validate_paid_amount(0).is_ok());
        assert!(validate_paid_amount(500).is_ok());
        assert!(matches!(
            validate_paid_amount(-1),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_validate_removal() {
        assert!(validate_removal(10, 10).is_ok());
        assert!(validate_removal(10, 3).is_ok());

        let err = validate_removal(3, 5).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientStock {
                available: 3,
                requested: 5
            }
        );
    }

    #[test]
    fn test_validate_repayment() {
        assert!(validate_repayment(250, 450).is_ok());
        assert!(validate_repayment(450, 450).is_ok());
        assert!(validate_repayment(0, 450).is_err());
        assert!(matches!(
            validate_repayment(500, 450),
            Err(ValidationError::RepaymentExceedsDebt { .. })
        ));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Coca-Cola 330ml").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_refund_selection() {
        assert!(validate_refund_selection(&["item-1".to_string()]).is_ok());
        assert_eq!(
            validate_refund_selection(&[]).unwrap_err(),
            ValidationError::EmptyRefundSelection
        );
    }
}
