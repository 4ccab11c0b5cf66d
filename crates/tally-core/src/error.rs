//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                          │
//! │  └── ValidationError  - Input / business-rule validation failures       │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── LedgerError      - Structured result surfaced to callers           │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError → caller                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, quantity, amount)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when an input fails a pure business rule, before any
/// transaction opens. The ledger services wrap them into the structured
/// `LedgerError::Validation` result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative (zero is allowed).
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A stock removal would exceed the quantity on hand.
    #[error("cannot remove {requested} from stock: only {available} on hand")]
    InsufficientStock { available: i64, requested: i64 },

    /// A repayment exceeds the customer's outstanding debt.
    #[error("repayment {amount} exceeds outstanding debt {debt}")]
    RepaymentExceedsDebt { amount: i64, debt: i64 },

    /// A refund was requested with no items selected.
    #[error("refund requires at least one sale item")]
    EmptyRefundSelection,

    /// A purchase or sale was submitted without line items.
    #[error("{entity} requires at least one line item")]
    NoLineItems { entity: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
