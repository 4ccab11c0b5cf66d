//! # Sale Lifecycle
//!
//! Recording, voiding and refunding sales.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Lifecycle                                       │
//! │                                                                         │
//! │   record ──► COMPLETED ──refund (all items)──► RETURNED                 │
//! │                  │                                                      │
//! │                  │ refund (subset)  → stays COMPLETED                   │
//! │                  │                                                      │
//! │                  └──────── void ──────► VOID (terminal)                 │
//! │                                                                         │
//! │   void:    restock every item (RETURN_IN), stats reversed;              │
//! │            debt-collection sales are not voidable                       │
//! │   refund:  restock selected items, totalSpent down by refund total,     │
//! │            visitCount untouched (the visit still happened)              │
//! │                                                                         │
//! │   The walk-in customer is exempt from stats and credit in every path.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::{LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::new_id;
use crate::service::{
    adjust_customer_credit, fetch_customer, fetch_product, fetch_sale, next_invoice_no, stock,
};
use crate::session::Session;
use tally_core::{
    validation, Customer, MovementKind, PaymentMethod, PaymentStatus, ReferenceKind, Sale,
    SaleItem, SaleKind, SaleStatus, ValidationError,
};

// =============================================================================
// Inputs
// =============================================================================

/// One line of a sale as supplied by the caller.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SaleItemInput {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for recording a sale.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RecordSaleInput {
    /// `None` attributes the sale to the walk-in customer.
    pub customer_id: Option<String>,
    pub items: Vec<SaleItemInput>,
    /// Amount received at the counter. Anything short of the total becomes
    /// customer debt (non-walk-in only).
    pub paid_amount_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

/// Input for an item-level refund.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RefundInput {
    pub sale_id: String,
    /// Non-empty subset of the sale's item ids.
    pub item_ids: Vec<String>,
    pub reason: String,
}

/// Metadata fields editable after the fact. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SaleMetadataInput {
    pub customer_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

// =============================================================================
// Record
// =============================================================================

/// Records a sale: items, stock decrements, payment status, customer stats.
///
/// Each line decrements stock with a SALE movement; selling more than is on
/// hand is rejected. Payment shortfall against a named customer becomes
/// debt on their credit balance; the walk-in customer carries no debt and
/// no stats.
pub async fn record_sale(
    db: &Database,
    session: &Session,
    input: RecordSaleInput,
) -> LedgerResult<Sale> {
    let actor = session.require_actor()?;

    if input.items.is_empty() {
        return Err(ValidationError::NoLineItems {
            entity: "sale".to_string(),
        }
        .into());
    }
    for item in &input.items {
        validation::validate_quantity(item.quantity)?;
    }
    if let Some(paid) = input.paid_amount_cents {
        validation::validate_paid_amount(paid)?;
    }

    let mut tx = db.pool().begin().await?;

    let customer = match &input.customer_id {
        Some(id) => fetch_customer(&mut tx, id).await?,
        None => walk_in(&mut tx).await?,
    };

    let invoice_no = next_invoice_no(&mut tx).await?;
    let now = Utc::now();
    let sale_id = new_id();

    // Header first; totals and payment status follow once lines are priced.
    sqlx::query(
        "INSERT INTO sales \
             (id, invoice_no, customer_id, kind, status, payment_status, payment_method, \
              total_cents, notes, created_by, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, ?10)",
    )
    .bind(&sale_id)
    .bind(invoice_no)
    .bind(&customer.id)
    .bind(SaleKind::Sale)
    .bind(SaleStatus::Completed)
    .bind(PaymentStatus::Unpaid)
    .bind(input.payment_method)
    .bind(&input.notes)
    .bind(actor)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let mut total = 0;
    for item in &input.items {
        let product = fetch_product(&mut tx, &item.product_id).await?;
        validation::validate_removal(product.stock, item.quantity)?;

        let line_total = product.selling_price_cents * item.quantity;
        total += line_total;

        sqlx::query(
            "INSERT INTO sale_items \
                 (id, sale_id, product_id, name_snapshot, quantity, \
                  unit_price_cents, line_total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(new_id())
        .bind(&sale_id)
        .bind(&product.id)
        .bind(&product.name)
        .bind(item.quantity)
        .bind(product.selling_price_cents)
        .bind(line_total)
        .execute(&mut *tx)
        .await?;

        stock::apply_movement(
            &mut tx,
            stock::MovementEntry {
                product_id: &product.id,
                kind: MovementKind::Sale,
                delta: -item.quantity,
                reference_kind: ReferenceKind::Sale,
                reference_id: &sale_id,
                note: None,
                actor,
            },
        )
        .await?;
    }

    let paid = input.paid_amount_cents.unwrap_or(0);
    let payment_status = if paid >= total {
        PaymentStatus::Paid
    } else if paid > 0 {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    };

    sqlx::query(
        "UPDATE sales SET total_cents = ?2, payment_status = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(&sale_id)
    .bind(total)
    .bind(payment_status)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    if paid > 0 {
        sqlx::query(
            "INSERT INTO customer_payments \
                 (id, customer_id, sale_id, amount_cents, method, received_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(new_id())
        .bind(&customer.id)
        .bind(&sale_id)
        .bind(paid.min(total))
        .bind(input.payment_method.unwrap_or(PaymentMethod::Cash))
        .bind(actor)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }

    if !customer.is_walk_in {
        let shortfall = (total - paid).max(0);
        if shortfall > 0 {
            adjust_customer_credit(&mut tx, &customer.id, shortfall).await?;
        }
        bump_customer_stats(&mut tx, &customer.id, total, 1).await?;
    }

    let sale = fetch_sale(&mut tx, &sale_id).await?;
    tx.commit().await?;

    tracing::info!(
        sale_id = %sale.id,
        invoice_no = sale.invoice_no,
        total_cents = sale.total_cents,
        "sale recorded"
    );

    Ok(sale)
}

// =============================================================================
// Void
// =============================================================================

/// Voids a sale, restocking every item and reversing customer stats.
///
/// Terminal: voiding an already-void sale is a state error and writes
/// nothing. Debt-collection sales cannot be voided at all: they carry no
/// items or stats of their own, only settled invoices and a reduced credit
/// balance, and reversing those is not an undo this operation can express.
pub async fn void_sale(db: &Database, session: &Session, sale_id: &str) -> LedgerResult<Sale> {
    let actor = session.require_actor()?;

    let mut tx = db.pool().begin().await?;

    let sale = fetch_sale(&mut tx, sale_id).await?;
    if sale.status == SaleStatus::Void {
        return Err(LedgerError::state("Sale", &sale.id, "void", "void"));
    }
    if !sale.expects_line_items() {
        return Err(LedgerError::state(
            "Sale",
            &sale.id,
            "debt collection",
            "void",
        ));
    }

    let customer = fetch_customer(&mut tx, &sale.customer_id).await?;
    if !customer.is_walk_in {
        bump_customer_stats(&mut tx, &customer.id, -sale.total_cents, -1).await?;
    }

    for item in sale_items(&mut tx, &sale.id).await? {
        stock::apply_movement(
            &mut tx,
            stock::MovementEntry {
                product_id: &item.product_id,
                kind: MovementKind::ReturnIn,
                delta: item.quantity,
                reference_kind: ReferenceKind::Sale,
                reference_id: &sale.id,
                note: Some("sale void"),
                actor,
            },
        )
        .await?;
    }

    sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&sale.id)
        .bind(SaleStatus::Void)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    let voided = fetch_sale(&mut tx, &sale.id).await?;
    tx.commit().await?;

    tracing::info!(sale_id = %voided.id, "sale voided");

    Ok(voided)
}

// =============================================================================
// Refund
// =============================================================================

/// Refunds a subset of a sale's items.
///
/// Creates one return header plus one return-item per selection, restocks
/// each item with a RETURN_IN movement, and reduces the customer's lifetime
/// spend by the refund total. The visit count is untouched: a partial refund
/// does not erase the visit. When no un-refunded items remain the sale
/// transitions to RETURNED.
pub async fn refund_sale_items(
    db: &Database,
    session: &Session,
    input: RefundInput,
) -> LedgerResult<Sale> {
    let actor = session.require_actor()?;
    validation::validate_refund_selection(&input.item_ids)?;

    let mut tx = db.pool().begin().await?;

    let sale = fetch_sale(&mut tx, &input.sale_id).await?;
    if sale.status == SaleStatus::Void {
        return Err(LedgerError::state("Sale", &sale.id, "void", "refund"));
    }
    if !sale.expects_line_items() {
        return Err(LedgerError::state(
            "Sale",
            &sale.id,
            "debt collection",
            "refund",
        ));
    }

    let items = sale_items(&mut tx, &sale.id).await?;

    let mut selected = Vec::with_capacity(input.item_ids.len());
    for item_id in &input.item_ids {
        let item = items
            .iter()
            .find(|i| &i.id == item_id)
            .ok_or_else(|| LedgerError::not_found("SaleItem", item_id))?;
        if is_refunded(&mut tx, &item.id).await? {
            return Err(LedgerError::state("SaleItem", &item.id, "refunded", "refund"));
        }
        selected.push(item.clone());
    }

    let refund_total: i64 = selected.iter().map(|i| i.line_total_cents).sum();
    let now = Utc::now();
    let return_id = new_id();

    sqlx::query(
        "INSERT INTO sales_returns (id, sale_id, reason, total_cents, refunded_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&return_id)
    .bind(&sale.id)
    .bind(&input.reason)
    .bind(refund_total)
    .bind(actor)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for item in &selected {
        sqlx::query(
            "INSERT INTO sales_return_items \
                 (id, return_id, sale_item_id, product_id, quantity, line_total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(new_id())
        .bind(&return_id)
        .bind(&item.id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.line_total_cents)
        .execute(&mut *tx)
        .await?;

        stock::apply_movement(
            &mut tx,
            stock::MovementEntry {
                product_id: &item.product_id,
                kind: MovementKind::ReturnIn,
                delta: item.quantity,
                reference_kind: ReferenceKind::SalesReturn,
                reference_id: &return_id,
                note: None,
                actor,
            },
        )
        .await?;
    }

    let customer = fetch_customer(&mut tx, &sale.customer_id).await?;
    if !customer.is_walk_in {
        // Spend drops, the visit stays counted.
        bump_customer_stats(&mut tx, &customer.id, -refund_total, 0).await?;
    }

    let remaining: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sale_items si \
         WHERE si.sale_id = ?1 \
           AND NOT EXISTS (SELECT 1 FROM sales_return_items sri WHERE sri.sale_item_id = si.id)",
    )
    .bind(&sale.id)
    .fetch_one(&mut *tx)
    .await?;

    if remaining == 0 {
        sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&sale.id)
            .bind(SaleStatus::Returned)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
    }

    let updated = fetch_sale(&mut tx, &sale.id).await?;
    tx.commit().await?;

    tracing::info!(
        sale_id = %updated.id,
        refund_total_cents = refund_total,
        items = selected.len(),
        "sale items refunded"
    );

    Ok(updated)
}

// =============================================================================
// Metadata Edit
// =============================================================================

/// Edits a sale's customer, payment method or notes.
///
/// Allowed on any non-void sale. Never touches stock, prices or balances.
pub async fn update_sale_metadata(
    db: &Database,
    session: &Session,
    sale_id: &str,
    input: SaleMetadataInput,
) -> LedgerResult<Sale> {
    session.require_actor()?;

    let mut tx = db.pool().begin().await?;

    let sale = fetch_sale(&mut tx, sale_id).await?;
    if sale.status == SaleStatus::Void {
        return Err(LedgerError::state("Sale", &sale.id, "void", "edit"));
    }

    let customer_id = match input.customer_id {
        Some(id) => fetch_customer(&mut tx, &id).await?.id,
        None => sale.customer_id,
    };

    sqlx::query(
        "UPDATE sales SET customer_id = ?2, payment_method = ?3, notes = ?4, updated_at = ?5 \
         WHERE id = ?1",
    )
    .bind(&sale.id)
    .bind(&customer_id)
    .bind(input.payment_method.or(sale.payment_method))
    .bind(input.notes.or(sale.notes))
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let updated = fetch_sale(&mut tx, &sale.id).await?;
    tx.commit().await?;

    Ok(updated)
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) async fn walk_in(conn: &mut SqliteConnection) -> LedgerResult<Customer> {
    sqlx::query_as::<_, Customer>(
        "SELECT id, name, phone, total_spent_cents, visit_count, credit_balance_cents, \
                credit_limit_cents, is_walk_in, created_at, updated_at \
         FROM customers WHERE is_walk_in = 1",
    )
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Customer", "walk-in"))
}

async fn sale_items(conn: &mut SqliteConnection, sale_id: &str) -> LedgerResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        "SELECT id, sale_id, product_id, name_snapshot, quantity, \
                unit_price_cents, line_total_cents \
         FROM sale_items WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

async fn is_refunded(conn: &mut SqliteConnection, sale_item_id: &str) -> LedgerResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sales_return_items WHERE sale_item_id = ?1",
    )
    .bind(sale_item_id)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Applies signed deltas to a customer's lifetime stats.
async fn bump_customer_stats(
    conn: &mut SqliteConnection,
    customer_id: &str,
    spent_delta_cents: i64,
    visit_delta: i64,
) -> LedgerResult<()> {
    sqlx::query(
        "UPDATE customers SET \
             total_spent_cents = total_spent_cents + ?2, \
             visit_count = visit_count + ?3, \
             updated_at = ?4 \
         WHERE id = ?1",
    )
    .bind(customer_id)
    .bind(spent_delta_cents)
    .bind(visit_delta)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
