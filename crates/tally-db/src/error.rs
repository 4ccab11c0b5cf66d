//! # Error Types
//!
//! Database and ledger error types.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and constraint classification     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError (this module) ← The structured taxonomy callers see        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller maps to transport (HTTP status, IPC payload, CLI message)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error raised inside a ledger transaction propagates with `?`; the
//! transaction guard is dropped unclosed and SQLite rolls the whole unit of
//! work back, so callers only ever observe the final structured error, never
//! partially-applied state.

use thiserror::Error;
use tracing::error;

use tally_core::ValidationError;

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (sku, barcode, phone, invoice_no).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
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

                // SQLite constraint messages:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// The structured error taxonomy surfaced by every ledger operation.
///
/// ## Categories
/// ```text
/// Authentication  - no active session; nothing was attempted
/// Authorization   - missing capability; nothing was attempted
/// NotFound        - referenced product/customer/supplier/sale/purchase missing
/// Validation      - bad quantity/amount/selection (tally-core rules)
/// Conflict        - duplicate unique field (sku, barcode, phone)
/// State           - operation invalid for the current lifecycle state
/// Storage         - unexpected persistence failure (source logged,
///                   generic message surfaced)
/// ```
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No authenticated actor. Checked before any transaction opens.
    #[error("authentication required")]
    Authentication,

    /// The actor lacks the required capability.
    #[error("not authorized for {module}:{action}")]
    Authorization { module: String, action: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A pure business rule was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A unique field collided with an existing row.
    #[error("duplicate {field}")]
    Conflict { field: String },

    /// The operation is invalid for the entity's current lifecycle state.
    #[error("{entity} {id} is {state}: cannot {operation}")]
    State {
        entity: String,
        id: String,
        state: String,
        operation: String,
    },

    /// Unexpected persistence failure. The underlying cause has been logged;
    /// callers get a generic message.
    #[error("internal storage error")]
    Storage,
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn state(
        entity: impl Into<String>,
        id: impl Into<String>,
        state: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        LedgerError::State {
            entity: entity.into(),
            id: id.into(),
            state: state.into(),
            operation: operation.into(),
        }
    }
}

/// Classify database failures into the caller-facing taxonomy.
///
/// Constraint violations carry actionable messages (duplicate barcode,
/// duplicate phone); anything unexpected is logged at error level and
/// collapsed into the generic `Storage` variant.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DbError::UniqueViolation { field, .. } => LedgerError::Conflict { field },
            other => {
                error!(cause = %other, "ledger storage failure");
                LedgerError::Storage
            }
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::from(DbError::from(err))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let db_err = DbError::UniqueViolation {
            field: "customers.phone".to_string(),
            value: "unknown".to_string(),
        };
        let ledger_err = LedgerError::from(db_err);
        assert!(matches!(
            ledger_err,
            LedgerError::Conflict { ref field } if field == "customers.phone"
        ));
    }

    #[test]
    fn test_unexpected_db_error_maps_to_generic_storage() {
        let ledger_err = LedgerError::from(DbError::QueryFailed("boom".to_string()));
        assert!(matches!(ledger_err, LedgerError::Storage));
        // The surfaced message stays generic.
        assert_eq!(ledger_err.to_string(), "internal storage error");
    }

    #[test]
    fn test_state_error_message() {
        let err = LedgerError::state("Sale", "s1", "void", "void");
        assert_eq!(err.to_string(), "Sale s1 is void: cannot void");
    }
}
