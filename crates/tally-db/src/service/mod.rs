//! # Ledger Services
//!
//! The transactional heart of the back-office: every multi-step mutation
//! lives here, one module per component.
//!
//! ## Transaction Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               One Operation = One Transaction                           │
//! │                                                                         │
//! │  session.require_actor()          ← fails before anything opens        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  let mut tx = db.pool().begin()                                         │
//! │       │                                                                 │
//! │       ├── stock delta              (apply_movement)                     │
//! │       ├── movement row             (apply_movement)                     │
//! │       ├── cost history row                                              │
//! │       ├── balance update                                                │
//! │       └── payment / record creation                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()  ── or any `?` drops tx and SQLite rolls everything back   │
//! │                                                                         │
//! │  Multi-item loops run sequentially inside the same transaction;         │
//! │  there is no batching, no app-level locking, and no retry policy.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`stock`] - the ledger primitive every mutation writes through
//! - [`purchase`] - purchase order lifecycle (create/edit/void/mark-paid)
//! - [`sale`] - sale lifecycle (record/void/refund/metadata)
//! - [`settlement`] - FIFO debt settlement
//! - [`adjustment`] - audited manual stock corrections
//! - [`backup`] - snapshot export/restore and bulk import

pub mod adjustment;
pub mod backup;
pub mod purchase;
pub mod sale;
pub mod settlement;
pub mod stock;

use sqlx::SqliteConnection;

use crate::error::{LedgerError, LedgerResult};
use tally_core::{Customer, Product, Purchase, Sale, Supplier};

// =============================================================================
// In-Transaction Fetch Helpers
// =============================================================================
// Services re-read entities on their own transaction so decisions are made
// against the isolated snapshot, not a stale pool read.

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> LedgerResult<Product> {
    sqlx::query_as::<_, Product>(
        "SELECT id, sku, barcode, name, unit, selling_price_cents, min_stock_level, \
                stock, expiry_date, is_active, created_at, updated_at \
         FROM products WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Product", id))
}

pub(crate) async fn fetch_customer(
    conn: &mut SqliteConnection,
    id: &str,
) -> LedgerResult<Customer> {
    sqlx::query_as::<_, Customer>(
        "SELECT id, name, phone, total_spent_cents, visit_count, credit_balance_cents, \
                credit_limit_cents, is_walk_in, created_at, updated_at \
         FROM customers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Customer", id))
}

pub(crate) async fn fetch_supplier(
    conn: &mut SqliteConnection,
    id: &str,
) -> LedgerResult<Supplier> {
    sqlx::query_as::<_, Supplier>(
        "SELECT id, name, phone, credit_balance_cents, created_at, updated_at \
         FROM suppliers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Supplier", id))
}

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> LedgerResult<Sale> {
    sqlx::query_as::<_, Sale>(
        "SELECT id, invoice_no, customer_id, kind, status, payment_status, payment_method, \
                total_cents, notes, created_by, created_at, updated_at \
         FROM sales WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Sale", id))
}

pub(crate) async fn fetch_purchase(
    conn: &mut SqliteConnection,
    id: &str,
) -> LedgerResult<Purchase> {
    sqlx::query_as::<_, Purchase>(
        "SELECT id, supplier_id, status, subtotal_cents, discount_cents, tax_cents, \
                total_cents, expiry_date, notes, created_by, created_at, updated_at \
         FROM purchases WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Purchase", id))
}

// =============================================================================
// Shared Sequence
// =============================================================================

/// Claims the next invoice number from the shared global sequence.
///
/// Bumped inside the caller's transaction, so a rolled-back operation
/// releases its number and the committed sequence stays gap-free. Real
/// sales and synthetic debt-collection sales draw from the same counter.
pub(crate) async fn next_invoice_no(conn: &mut SqliteConnection) -> LedgerResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "UPDATE sequences SET value = value + 1 WHERE name = 'invoice_no' RETURNING value",
    )
    .fetch_one(conn)
    .await?;

    Ok(value)
}

// =============================================================================
// Balance Updates
// =============================================================================

/// Adjusts a customer's outstanding debt by a signed delta (cents).
pub(crate) async fn adjust_customer_credit(
    conn: &mut SqliteConnection,
    customer_id: &str,
    delta_cents: i64,
) -> LedgerResult<()> {
    let result = sqlx::query(
        "UPDATE customers SET \
             credit_balance_cents = credit_balance_cents + ?2, \
             updated_at = ?3 \
         WHERE id = ?1",
    )
    .bind(customer_id)
    .bind(delta_cents)
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::not_found("Customer", customer_id));
    }

    Ok(())
}

/// Adjusts what the business owes a supplier by a signed delta (cents).
pub(crate) async fn adjust_supplier_credit(
    conn: &mut SqliteConnection,
    supplier_id: &str,
    delta_cents: i64,
) -> LedgerResult<()> {
    let result = sqlx::query(
        "UPDATE suppliers SET \
             credit_balance_cents = credit_balance_cents + ?2, \
             updated_at = ?3 \
         WHERE id = ?1",
    )
    .bind(supplier_id)
    .bind(delta_cents)
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::not_found("Supplier", supplier_id));
    }

    Ok(())
}
