//! # Stock Ledger Primitive
//!
//! Every quantity change in the system funnels through [`apply_movement`]:
//! it updates the materialized `products.stock` column and appends exactly
//! one `stock_movements` row in the same breath. Callers never touch the
//! stock column directly, which keeps the reconciliation invariant alive:
//!
//! ```text
//! products.stock  ==  SUM(stock_movements.delta)   for every product
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::new_id;
use tally_core::{MovementKind, ReferenceKind};

/// A movement about to enter the ledger.
///
/// `delta` is signed: positive for receipts and returns-in, negative for
/// sales and removals.
pub(crate) struct MovementEntry<'a> {
    pub product_id: &'a str,
    pub kind: MovementKind,
    pub delta: i64,
    pub reference_kind: ReferenceKind,
    pub reference_id: &'a str,
    pub note: Option<&'a str>,
    pub actor: &'a str,
}

/// Applies a signed delta to a product's stock and records the movement.
///
/// Returns the stock level after the change. Fails with
/// [`LedgerError::NotFound`] if the product does not exist; the caller's
/// transaction makes the two writes atomic.
pub(crate) async fn apply_movement(
    conn: &mut SqliteConnection,
    entry: MovementEntry<'_>,
) -> LedgerResult<i64> {
    let now = Utc::now();

    let stock_before: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(entry.product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| LedgerError::not_found("Product", entry.product_id))?;

    let stock_after = stock_before + entry.delta;

    sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(entry.product_id)
        .bind(stock_after)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO stock_movements \
             (id, product_id, delta, kind, reference_kind, reference_id, \
              actor, note, occurred_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(new_id())
    .bind(entry.product_id)
    .bind(entry.delta)
    .bind(entry.kind)
    .bind(entry.reference_kind)
    .bind(entry.reference_id)
    .bind(entry.actor)
    .bind(entry.note)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(stock_after)
}

/// Appends a cost history row for a product whose recorded unit cost changed.
///
/// The previous cost, if any, comes from the latest history row; the new
/// row becomes the product's current cost. Costs are never edited in place,
/// so two purchases of the same product can never lose each other's update.
pub(crate) async fn record_cost_change(
    conn: &mut SqliteConnection,
    product_id: &str,
    new_cost_cents: i64,
    reason: &str,
    reference_id: Option<&str>,
    actor: &str,
) -> LedgerResult<()> {
    let old_cost: Option<i64> = current_cost(&mut *conn, product_id).await?;

    sqlx::query(
        "INSERT INTO cost_history \
             (id, product_id, actor, old_cost_cents, new_cost_cents, \
              reason, reference_id, changed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(new_id())
    .bind(product_id)
    .bind(actor)
    .bind(old_cost)
    .bind(new_cost_cents)
    .bind(reason)
    .bind(reference_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// The product's current unit cost: the latest cost history entry, if any.
pub(crate) async fn current_cost(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> LedgerResult<Option<i64>> {
    let cost = sqlx::query_scalar(
        "SELECT new_cost_cents FROM cost_history \
         WHERE product_id = ?1 ORDER BY changed_at DESC, rowid DESC LIMIT 1",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(cost)
}
