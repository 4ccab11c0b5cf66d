//! # Purchase Lifecycle
//!
//! State machine over purchase orders, with all side effects flowing through
//! the stock ledger primitive:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Purchase Lifecycle                                      │
//! │                                                                         │
//! │   create ──► PENDING ──mark_paid──► RECEIVED                            │
//! │                 │                      │                                │
//! │                 │ edit (revert+reapply, any non-cancelled state)        │
//! │                 │                      │                                │
//! │                 └────────── void ──────┴──► CANCELLED (terminal)        │
//! │                                                                         │
//! │   Side effects per item on create/reapply:                              │
//! │     stock += qty, one PURCHASE movement,                                │
//! │     cost history row when unit cost differs from current,               │
//! │     expiry date propagated to the product when given.                   │
//! │                                                                         │
//! │   Supplier credit reconciliation (always against `total`):              │
//! │     create, no payment, RECEIVED   → credit += total                    │
//! │     create, partial payment        → credit += shortfall                │
//! │     edit                           → credit follows the new total       │
//! │     mark_paid                      → credit -= remainder                │
//! │     void with outstanding balance  → credit -= outstanding              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;

use crate::error::{LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::new_id;
use crate::service::{
    adjust_supplier_credit, fetch_purchase, fetch_supplier, stock,
};
use crate::session::Session;
use tally_core::{
    validation, MovementKind, PaymentMethod, Purchase, PurchaseItem, PurchaseStatus,
    ReferenceKind,
};

// =============================================================================
// Inputs
// =============================================================================

/// One line of a purchase order as supplied by the caller.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PurchaseItemInput {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Input for creating a purchase order.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreatePurchaseInput {
    pub supplier_id: String,
    pub items: Vec<PurchaseItemInput>,
    pub status: PurchaseStatus,
    /// Modeled but zero in all current flows.
    #[serde(default)]
    pub discount_cents: i64,
    /// Modeled but zero in all current flows.
    #[serde(default)]
    pub tax_cents: i64,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Amount paid up front, if any.
    pub paid_amount_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
}

/// Input for editing a purchase order.
///
/// `items: None` keeps the order item-less after the revert; `Some` replaces
/// the full item set.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EditPurchaseInput {
    pub purchase_id: String,
    pub items: Option<Vec<PurchaseItemInput>>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

// =============================================================================
// Create
// =============================================================================

/// Creates a purchase order and applies its stock and credit effects.
pub async fn create_purchase(
    db: &Database,
    session: &Session,
    input: CreatePurchaseInput,
) -> LedgerResult<Purchase> {
    let actor = session.require_actor()?;

    if input.items.is_empty() {
        return Err(tally_core::ValidationError::NoLineItems {
            entity: "purchase".to_string(),
        }
        .into());
    }
    for item in &input.items {
        validation::validate_quantity(item.quantity)?;
        validation::validate_amount(item.unit_cost_cents)?;
    }
    if let Some(paid) = input.paid_amount_cents {
        validation::validate_paid_amount(paid)?;
    }

    let mut tx = db.pool().begin().await?;

    let supplier = fetch_supplier(&mut tx, &input.supplier_id).await?;

    let now = Utc::now();
    let purchase_id = new_id();

    // Header first so item rows have a parent to reference.
    sqlx::query(
        "INSERT INTO purchases \
             (id, supplier_id, status, subtotal_cents, discount_cents, tax_cents, \
              total_cents, expiry_date, notes, created_by, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 0, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind(&purchase_id)
    .bind(&supplier.id)
    .bind(input.status)
    .bind(input.discount_cents)
    .bind(input.tax_cents)
    .bind(input.expiry_date)
    .bind(&input.notes)
    .bind(actor)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let subtotal =
        apply_items(&mut tx, &purchase_id, &input.items, input.expiry_date, actor).await?;
    let total = subtotal - input.discount_cents + input.tax_cents;

    sqlx::query(
        "UPDATE purchases SET subtotal_cents = ?2, total_cents = ?3, updated_at = ?4 \
         WHERE id = ?1",
    )
    .bind(&purchase_id)
    .bind(subtotal)
    .bind(total)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    // Payment reconciliation: whatever is not paid now becomes supplier
    // credit, so payments + credit contribution always sum to `total`.
    match input.paid_amount_cents {
        Some(paid) if paid > 0 => {
            insert_payment(
                &mut tx,
                &purchase_id,
                paid,
                input.payment_method.unwrap_or(PaymentMethod::Cash),
                actor,
            )
            .await?;
            if paid < total {
                adjust_supplier_credit(&mut tx, &supplier.id, total - paid).await?;
            }
        }
        _ => {
            if input.status == PurchaseStatus::Received {
                adjust_supplier_credit(&mut tx, &supplier.id, total).await?;
            }
        }
    }

    let purchase = fetch_purchase(&mut tx, &purchase_id).await?;
    tx.commit().await?;

    tracing::info!(
        purchase_id = %purchase.id,
        supplier_id = %purchase.supplier_id,
        total_cents = purchase.total_cents,
        "purchase created"
    );

    Ok(purchase)
}

// =============================================================================
// Edit
// =============================================================================

/// Edits a purchase by fully reversing and reapplying its items.
///
/// Revert-then-reapply is intentionally non-minimal: every existing item is
/// reversed and the new set applied from scratch, so stock reflects only the
/// latest version no matter how many times the order was edited. Rejected on
/// a cancelled purchase. The supplier's credited (unpaid) portion is moved to
/// follow the new total, so payments plus credit still reconcile against it.
pub async fn edit_purchase(
    db: &Database,
    session: &Session,
    input: EditPurchaseInput,
) -> LedgerResult<Purchase> {
    let actor = session.require_actor()?;

    if let Some(items) = &input.items {
        for item in items {
            validation::validate_quantity(item.quantity)?;
            validation::validate_amount(item.unit_cost_cents)?;
        }
    }

    let mut tx = db.pool().begin().await?;

    let purchase = fetch_purchase(&mut tx, &input.purchase_id).await?;
    if purchase.status == PurchaseStatus::Cancelled {
        return Err(LedgerError::state(
            "Purchase",
            &purchase.id,
            "cancelled",
            "edit",
        ));
    }

    // 1. Reverse the stock effect of every existing item.
    reverse_items(&mut tx, &purchase.id, actor, "purchase edit reversal").await?;

    // 2. Drop the old item rows.
    sqlx::query("DELETE FROM purchase_items WHERE purchase_id = ?1")
        .bind(&purchase.id)
        .execute(&mut *tx)
        .await?;

    // 3. Reapply the new set exactly as on create.
    let subtotal = match &input.items {
        Some(items) => apply_items(&mut tx, &purchase.id, items, input.expiry_date, actor).await?,
        None => 0,
    };
    let total = subtotal - input.discount_cents + input.tax_cents;

    // 4. Re-reconcile supplier credit: the unpaid, credited portion follows
    //    the new total, mirroring the stock revert above. PENDING orders with
    //    no payment were never credited, so they stay untouched.
    let paid = total_paid(&mut tx, &purchase.id).await?;
    if paid > 0 || purchase.status == PurchaseStatus::Received {
        let credit_delta = (total - paid).max(0) - (purchase.total_cents - paid).max(0);
        if credit_delta != 0 {
            adjust_supplier_credit(&mut tx, &purchase.supplier_id, credit_delta).await?;
        }
    }

    // 5. Persist updated metadata and totals.
    sqlx::query(
        "UPDATE purchases SET \
             subtotal_cents = ?2, discount_cents = ?3, tax_cents = ?4, total_cents = ?5, \
             expiry_date = ?6, notes = ?7, updated_at = ?8 \
         WHERE id = ?1",
    )
    .bind(&purchase.id)
    .bind(subtotal)
    .bind(input.discount_cents)
    .bind(input.tax_cents)
    .bind(total)
    .bind(input.expiry_date)
    .bind(&input.notes)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let updated = fetch_purchase(&mut tx, &purchase.id).await?;
    tx.commit().await?;

    tracing::info!(purchase_id = %updated.id, total_cents = updated.total_cents, "purchase edited");

    Ok(updated)
}

// =============================================================================
// Void
// =============================================================================

/// Cancels a purchase, reversing its stock and outstanding credit.
///
/// One-shot terminal transition: a second void is a state error. Amounts
/// already paid to the supplier are not clawed back; only the outstanding
/// balance (total minus payments) is removed from the supplier's credit.
pub async fn void_purchase(
    db: &Database,
    session: &Session,
    purchase_id: &str,
) -> LedgerResult<Purchase> {
    let actor = session.require_actor()?;

    let mut tx = db.pool().begin().await?;

    let purchase = fetch_purchase(&mut tx, purchase_id).await?;
    if purchase.status == PurchaseStatus::Cancelled {
        return Err(LedgerError::state(
            "Purchase",
            &purchase.id,
            "cancelled",
            "void",
        ));
    }

    reverse_items(&mut tx, &purchase.id, actor, "purchase void reversal").await?;

    let outstanding = purchase.total_cents - total_paid(&mut tx, &purchase.id).await?;
    if outstanding > 0 {
        adjust_supplier_credit(&mut tx, &purchase.supplier_id, -outstanding).await?;
    }

    sqlx::query("UPDATE purchases SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&purchase.id)
        .bind(PurchaseStatus::Cancelled)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    let voided = fetch_purchase(&mut tx, &purchase.id).await?;
    tx.commit().await?;

    tracing::info!(purchase_id = %voided.id, outstanding, "purchase voided");

    Ok(voided)
}

// =============================================================================
// Mark as Paid
// =============================================================================

/// Settles the remaining balance of a purchase in one payment.
///
/// Creates a payment for `total - Σ(payments)`, marks the purchase
/// RECEIVED, and removes the remainder from the supplier's credit. Rejected
/// when the purchase is cancelled or nothing remains to pay.
pub async fn mark_purchase_paid(
    db: &Database,
    session: &Session,
    purchase_id: &str,
    method: PaymentMethod,
) -> LedgerResult<Purchase> {
    let actor = session.require_actor()?;

    let mut tx = db.pool().begin().await?;

    let purchase = fetch_purchase(&mut tx, purchase_id).await?;
    if purchase.status == PurchaseStatus::Cancelled {
        return Err(LedgerError::state(
            "Purchase",
            &purchase.id,
            "cancelled",
            "mark paid",
        ));
    }

    let remaining = purchase.total_cents - total_paid(&mut tx, &purchase.id).await?;
    if remaining <= 0 {
        return Err(LedgerError::state(
            "Purchase",
            &purchase.id,
            "fully paid",
            "mark paid",
        ));
    }

    insert_payment(&mut tx, &purchase.id, remaining, method, actor).await?;
    adjust_supplier_credit(&mut tx, &purchase.supplier_id, -remaining).await?;

    sqlx::query("UPDATE purchases SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&purchase.id)
        .bind(PurchaseStatus::Received)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    let updated = fetch_purchase(&mut tx, &purchase.id).await?;
    tx.commit().await?;

    tracing::info!(purchase_id = %updated.id, amount_cents = remaining, "purchase marked paid");

    Ok(updated)
}

// =============================================================================
// Shared Item Application
// =============================================================================

/// Applies a purchase's items: rows, stock receipts, cost history, expiry.
///
/// Returns the subtotal. Used by create and by the reapply half of edit.
async fn apply_items(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    items: &[PurchaseItemInput],
    expiry_date: Option<NaiveDate>,
    actor: &str,
) -> LedgerResult<i64> {
    let mut subtotal = 0;

    for item in items {
        let line_total = item.unit_cost_cents * item.quantity;
        subtotal += line_total;

        sqlx::query(
            "INSERT INTO purchase_items \
                 (id, purchase_id, product_id, quantity, unit_cost_cents, line_total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(new_id())
        .bind(purchase_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_cost_cents)
        .bind(line_total)
        .execute(&mut *conn)
        .await?;

        stock::apply_movement(
            &mut *conn,
            stock::MovementEntry {
                product_id: &item.product_id,
                kind: MovementKind::Purchase,
                delta: item.quantity,
                reference_kind: ReferenceKind::Purchase,
                reference_id: purchase_id,
                note: None,
                actor,
            },
        )
        .await?;

        // A differing unit cost appends a history row; the latest row is the
        // product's current cost.
        let current = stock::current_cost(&mut *conn, &item.product_id).await?;
        if current != Some(item.unit_cost_cents) {
            stock::record_cost_change(
                &mut *conn,
                &item.product_id,
                item.unit_cost_cents,
                "purchase",
                Some(purchase_id),
                actor,
            )
            .await?;
        }

        if let Some(expiry) = expiry_date {
            sqlx::query("UPDATE products SET expiry_date = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(&item.product_id)
                .bind(expiry)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(subtotal)
}

/// Reverses the stock effect of every item on a purchase.
///
/// Reversal deltas are recorded as ADJUSTMENT movements referencing the
/// purchase, so the audit trail distinguishes a receipt from its undo. No
/// negative-stock check is made here; reversal must always succeed so the
/// order can be corrected or cancelled.
async fn reverse_items(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    actor: &str,
    note: &str,
) -> LedgerResult<()> {
    let items = sqlx::query_as::<_, PurchaseItem>(
        "SELECT id, purchase_id, product_id, quantity, unit_cost_cents, line_total_cents \
         FROM purchase_items WHERE purchase_id = ?1",
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;

    for item in &items {
        stock::apply_movement(
            &mut *conn,
            stock::MovementEntry {
                product_id: &item.product_id,
                kind: MovementKind::Adjustment,
                delta: -item.quantity,
                reference_kind: ReferenceKind::Purchase,
                reference_id: purchase_id,
                note: Some(note),
                actor,
            },
        )
        .await?;
    }

    Ok(())
}

/// Sum of payments recorded against a purchase, in cents.
async fn total_paid(conn: &mut SqliteConnection, purchase_id: &str) -> LedgerResult<i64> {
    let paid: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM purchase_payments WHERE purchase_id = ?1",
    )
    .bind(purchase_id)
    .fetch_one(conn)
    .await?;

    Ok(paid)
}

async fn insert_payment(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    amount_cents: i64,
    method: PaymentMethod,
    actor: &str,
) -> LedgerResult<()> {
    sqlx::query(
        "INSERT INTO purchase_payments (id, purchase_id, amount_cents, method, paid_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(new_id())
    .bind(purchase_id)
    .bind(amount_cents)
    .bind(method)
    .bind(actor)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_product, seed_supplier, setup, stock_and_delta_sum};

    fn one_item(product_id: &str, quantity: i64, unit_cost_cents: i64) -> Vec<PurchaseItemInput> {
        vec![PurchaseItemInput {
            product_id: product_id.to_string(),
            quantity,
            unit_cost_cents,
        }]
    }

    fn create_input(
        supplier_id: &str,
        items: Vec<PurchaseItemInput>,
        status: PurchaseStatus,
    ) -> CreatePurchaseInput {
        CreatePurchaseInput {
            supplier_id: supplier_id.to_string(),
            items,
            status,
            discount_cents: 0,
            tax_cents: 0,
            expiry_date: None,
            notes: None,
            paid_amount_cents: None,
            payment_method: None,
        }
    }

    async fn supplier_credit(db: &crate::pool::Database, supplier_id: &str) -> i64 {
        db.parties()
            .get_supplier(supplier_id)
            .await
            .unwrap()
            .unwrap()
            .credit_balance_cents
    }

    #[tokio::test]
    async fn test_received_purchase_without_payment_goes_to_supplier_credit() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        // qty 10 @ cost 100, received, nothing paid.
        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();

        assert_eq!(purchase.total_cents, 1000);

        let (stock, delta_sum) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 10);
        assert_eq!(stock, delta_sum);

        assert_eq!(supplier_credit(&db, &supplier_id).await, 1000);

        // First recorded cost for this product.
        assert_eq!(db.products().current_cost(&product_id).await.unwrap(), Some(100));
        assert_eq!(db.products().cost_history(&product_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_cost_appends_no_history_row() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        for _ in 0..2 {
            create_purchase(
                &db,
                &session,
                create_input(&supplier_id, one_item(&product_id, 5, 100), PurchaseStatus::Received),
            )
            .await
            .unwrap();
        }

        assert_eq!(db.products().cost_history(&product_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_payment_splits_between_payment_and_credit() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let mut input =
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received);
        input.paid_amount_cents = Some(400);
        input.payment_method = Some(PaymentMethod::Cash);

        let purchase = create_purchase(&db, &session, input).await.unwrap();

        // payments + credit contribution reconcile to total
        assert_eq!(db.purchases().total_paid(&purchase.id).await.unwrap(), 400);
        assert_eq!(supplier_credit(&db, &supplier_id).await, 600);
    }

    #[tokio::test]
    async fn test_void_nets_stock_and_credit_to_baseline() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 7).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();

        let voided = void_purchase(&db, &session, &purchase.id).await.unwrap();
        assert_eq!(voided.status, PurchaseStatus::Cancelled);

        let (stock, delta_sum) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 7);
        assert_eq!(stock, delta_sum);
        assert_eq!(supplier_credit(&db, &supplier_id).await, 0);
    }

    #[tokio::test]
    async fn test_void_does_not_claw_back_paid_amounts() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let mut input =
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received);
        input.paid_amount_cents = Some(400);

        let purchase = create_purchase(&db, &session, input).await.unwrap();
        void_purchase(&db, &session, &purchase.id).await.unwrap();

        // Only the outstanding 600 is reversed; the 400 paid stays paid.
        assert_eq!(supplier_credit(&db, &supplier_id).await, 0);
        assert_eq!(db.purchases().total_paid(&purchase.id).await.unwrap(), 400);
    }

    #[tokio::test]
    async fn test_double_void_is_a_state_error() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();

        void_purchase(&db, &session, &purchase.id).await.unwrap();
        let before = db.movements().history_for_product(&product_id, 100).await.unwrap().len();

        let err = void_purchase(&db, &session, &purchase.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::State { .. }));

        let after = db.movements().history_for_product(&product_id, 100).await.unwrap().len();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_edit_with_same_items_nets_to_zero_stock_change() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();

        let edited = edit_purchase(
            &db,
            &session,
            EditPurchaseInput {
                purchase_id: purchase.id.clone(),
                items: Some(one_item(&product_id, 10, 100)),
                discount_cents: 0,
                tax_cents: 0,
                expiry_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(edited.total_cents, 1000);

        let (stock, delta_sum) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 10);
        assert_eq!(stock, delta_sum);
    }

    #[tokio::test]
    async fn test_edit_replaces_items_and_stock_reflects_latest_version() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();

        let edited = edit_purchase(
            &db,
            &session,
            EditPurchaseInput {
                purchase_id: purchase.id.clone(),
                items: Some(one_item(&product_id, 4, 120)),
                discount_cents: 0,
                tax_cents: 0,
                expiry_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(edited.total_cents, 480);
        assert_eq!(db.purchases().get_items(&purchase.id).await.unwrap().len(), 1);

        let (stock, delta_sum) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 4);
        assert_eq!(stock, delta_sum);
    }

    #[tokio::test]
    async fn test_edit_moves_supplier_credit_to_the_new_total() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        // Received, nothing paid: the full 1000 sits on supplier credit.
        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();
        assert_eq!(supplier_credit(&db, &supplier_id).await, 1000);

        // Shrink the order to 4 @ 120; credit must follow the new total.
        let edited = edit_purchase(
            &db,
            &session,
            EditPurchaseInput {
                purchase_id: purchase.id.clone(),
                items: Some(one_item(&product_id, 4, 120)),
                discount_cents: 0,
                tax_cents: 0,
                expiry_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.total_cents, 480);
        assert_eq!(supplier_credit(&db, &supplier_id).await, 480);

        // Edit-then-void nets back to baseline.
        void_purchase(&db, &session, &purchase.id).await.unwrap();
        assert_eq!(supplier_credit(&db, &supplier_id).await, 0);
    }

    #[tokio::test]
    async fn test_edit_of_partially_paid_purchase_keeps_reconciliation() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let mut input =
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received);
        input.paid_amount_cents = Some(400);

        let purchase = create_purchase(&db, &session, input).await.unwrap();
        assert_eq!(supplier_credit(&db, &supplier_id).await, 600);

        // New total 1200: payments (400) + credit (800) reconcile against it.
        edit_purchase(
            &db,
            &session,
            EditPurchaseInput {
                purchase_id: purchase.id.clone(),
                items: Some(one_item(&product_id, 10, 120)),
                discount_cents: 0,
                tax_cents: 0,
                expiry_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(supplier_credit(&db, &supplier_id).await, 800);
    }

    #[tokio::test]
    async fn test_edit_cancelled_purchase_is_rejected() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let purchase = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, one_item(&product_id, 2, 100), PurchaseStatus::Received),
        )
        .await
        .unwrap();
        void_purchase(&db, &session, &purchase.id).await.unwrap();

        let err = edit_purchase(
            &db,
            &session,
            EditPurchaseInput {
                purchase_id: purchase.id.clone(),
                items: None,
                discount_cents: 0,
                tax_cents: 0,
                expiry_date: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::State { .. }));
    }

    #[tokio::test]
    async fn test_mark_paid_settles_remainder_once() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let mut input =
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Pending);
        input.paid_amount_cents = Some(400);

        let purchase = create_purchase(&db, &session, input).await.unwrap();
        assert_eq!(supplier_credit(&db, &supplier_id).await, 600);

        let updated = mark_purchase_paid(&db, &session, &purchase.id, PaymentMethod::Transfer)
            .await
            .unwrap();
        assert_eq!(updated.status, PurchaseStatus::Received);
        assert_eq!(db.purchases().total_paid(&purchase.id).await.unwrap(), 1000);
        assert_eq!(supplier_credit(&db, &supplier_id).await, 0);

        // Nothing left to pay: a second call is a state error.
        let err = mark_purchase_paid(&db, &session, &purchase.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::State { .. }));
    }

    #[tokio::test]
    async fn test_negative_paid_amount_is_rejected() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 150, 0).await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let mut input =
            create_input(&supplier_id, one_item(&product_id, 10, 100), PurchaseStatus::Received);
        input.paid_amount_cents = Some(-400);

        let err = create_purchase(&db, &session, input).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(supplier_credit(&db, &supplier_id).await, 0);
    }

    #[tokio::test]
    async fn test_purchase_without_items_is_rejected() {
        let (db, session) = setup().await;
        let supplier_id = seed_supplier(&db, "Acme Wholesale").await;

        let err = create_purchase(
            &db,
            &session,
            create_input(&supplier_id, vec![], PurchaseStatus::Pending),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
