//! # Backup, Restore and Bulk Import
//!
//! Full-database snapshot export and delete-and-recreate restore, plus bulk
//! product import. These paths move the whole ledger at once, so they are
//! the only operations gated by an [`AccessPolicy`](crate::session::AccessPolicy)
//! capability on top of the usual session check.
//!
//! Restore discipline:
//! - deletes run children-before-parents, inserts parents-before-children,
//!   all inside one transaction;
//! - the walk-in customer row is never deleted (the store-level trigger
//!   would abort); it is updated in place from the snapshot;
//! - restored sales get fresh invoice numbers assigned oldest-first from 1,
//!   rather than trusting stored values, and the shared sequence counter is
//!   reset to match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::error::LedgerResult;
use crate::pool::Database;
use crate::repository::new_id;
use crate::service::stock;
use crate::session::{require_capability, AccessPolicy, Session};
use tally_core::{
    validation, AdjustmentDirection, AdjustmentReason, CostChange, Customer, CustomerPayment,
    Product, Purchase, PurchaseItem, PurchasePayment, ReferenceKind, Sale, SaleItem,
    SalesReturn, SalesReturnItem, StockAdjustment, StockMovement, Supplier,
};

// =============================================================================
// Snapshot Format
// =============================================================================

/// A complete, self-contained snapshot of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Snapshot format version, for forward-compatible readers.
    pub version: u32,
    pub exported_at: DateTime<Utc>,

    pub products: Vec<Product>,
    pub stock_movements: Vec<StockMovement>,
    pub cost_history: Vec<CostChange>,
    pub customers: Vec<Customer>,
    pub suppliers: Vec<Supplier>,
    pub purchases: Vec<Purchase>,
    pub purchase_items: Vec<PurchaseItem>,
    pub purchase_payments: Vec<PurchasePayment>,
    pub sales: Vec<Sale>,
    pub sale_items: Vec<SaleItem>,
    pub sales_returns: Vec<SalesReturn>,
    pub sales_return_items: Vec<SalesReturnItem>,
    pub customer_payments: Vec<CustomerPayment>,
    pub stock_adjustments: Vec<StockAdjustment>,
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

// =============================================================================
// Export
// =============================================================================

/// Exports the full ledger as a snapshot. Requires the `backup:export`
/// capability.
pub async fn export_snapshot(
    db: &Database,
    session: &Session,
    policy: &dyn AccessPolicy,
) -> LedgerResult<BackupSnapshot> {
    session.require_actor()?;
    require_capability(policy, "backup", "export")?;

    let mut tx = db.pool().begin().await?;

    let snapshot = BackupSnapshot {
        version: SNAPSHOT_VERSION,
        exported_at: Utc::now(),
        products: sqlx::query_as(
            "SELECT id, sku, barcode, name, unit, selling_price_cents, min_stock_level, \
                    stock, expiry_date, is_active, created_at, updated_at \
             FROM products ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        stock_movements: sqlx::query_as(
            "SELECT id, product_id, delta, kind, reference_kind, reference_id, \
                    actor, note, occurred_at \
             FROM stock_movements ORDER BY occurred_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        cost_history: sqlx::query_as(
            "SELECT id, product_id, actor, old_cost_cents, new_cost_cents, \
                    reason, reference_id, changed_at \
             FROM cost_history ORDER BY changed_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        customers: sqlx::query_as(
            "SELECT id, name, phone, total_spent_cents, visit_count, credit_balance_cents, \
                    credit_limit_cents, is_walk_in, created_at, updated_at \
             FROM customers ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        suppliers: sqlx::query_as(
            "SELECT id, name, phone, credit_balance_cents, created_at, updated_at \
             FROM suppliers ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        purchases: sqlx::query_as(
            "SELECT id, supplier_id, status, subtotal_cents, discount_cents, tax_cents, \
                    total_cents, expiry_date, notes, created_by, created_at, updated_at \
             FROM purchases ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        purchase_items: sqlx::query_as(
            "SELECT id, purchase_id, product_id, quantity, unit_cost_cents, line_total_cents \
             FROM purchase_items",
        )
        .fetch_all(&mut *tx)
        .await?,
        purchase_payments: sqlx::query_as(
            "SELECT id, purchase_id, amount_cents, method, paid_by, created_at \
             FROM purchase_payments ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        sales: sqlx::query_as(
            "SELECT id, invoice_no, customer_id, kind, status, payment_status, payment_method, \
                    total_cents, notes, created_by, created_at, updated_at \
             FROM sales ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        sale_items: sqlx::query_as(
            "SELECT id, sale_id, product_id, name_snapshot, quantity, \
                    unit_price_cents, line_total_cents \
             FROM sale_items",
        )
        .fetch_all(&mut *tx)
        .await?,
        sales_returns: sqlx::query_as(
            "SELECT id, sale_id, reason, total_cents, refunded_by, created_at \
             FROM sales_returns ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        sales_return_items: sqlx::query_as(
            "SELECT id, return_id, sale_item_id, product_id, quantity, line_total_cents \
             FROM sales_return_items",
        )
        .fetch_all(&mut *tx)
        .await?,
        customer_payments: sqlx::query_as(
            "SELECT id, customer_id, sale_id, amount_cents, method, received_by, created_at \
             FROM customer_payments ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
        stock_adjustments: sqlx::query_as(
            "SELECT id, product_id, direction, quantity, reason, note, \
                    stock_before, stock_after, adjusted_by, created_at \
             FROM stock_adjustments ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?,
    };

    tx.commit().await?;

    tracing::info!(
        products = snapshot.products.len(),
        sales = snapshot.sales.len(),
        purchases = snapshot.purchases.len(),
        "snapshot exported"
    );

    Ok(snapshot)
}

// =============================================================================
// Restore
// =============================================================================

/// Replaces the entire ledger with a snapshot. Requires the
/// `backup:restore` capability.
pub async fn restore_snapshot(
    db: &Database,
    session: &Session,
    policy: &dyn AccessPolicy,
    snapshot: &BackupSnapshot,
) -> LedgerResult<()> {
    session.require_actor()?;
    require_capability(policy, "backup", "restore")?;

    let mut tx = db.pool().begin().await?;

    delete_all(&mut tx).await?;

    // Parents before children.
    for c in &snapshot.customers {
        if c.is_walk_in {
            // The seeded walk-in row survives the delete; refresh it in place.
            sqlx::query(
                "UPDATE customers SET id = ?1, name = ?2, phone = ?3, total_spent_cents = ?4, \
                     visit_count = ?5, credit_balance_cents = ?6, credit_limit_cents = ?7, \
                     created_at = ?8, updated_at = ?9 \
                 WHERE is_walk_in = 1",
            )
            .bind(&c.id)
            .bind(&c.name)
            .bind(&c.phone)
            .bind(c.total_spent_cents)
            .bind(c.visit_count)
            .bind(c.credit_balance_cents)
            .bind(c.credit_limit_cents)
            .bind(c.created_at)
            .bind(c.updated_at)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO customers \
                     (id, name, phone, total_spent_cents, visit_count, credit_balance_cents, \
                      credit_limit_cents, is_walk_in, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
            )
            .bind(&c.id)
            .bind(&c.name)
            .bind(&c.phone)
            .bind(c.total_spent_cents)
            .bind(c.visit_count)
            .bind(c.credit_balance_cents)
            .bind(c.credit_limit_cents)
            .bind(c.created_at)
            .bind(c.updated_at)
            .execute(&mut *tx)
            .await?;
        }
    }

    for s in &snapshot.suppliers {
        sqlx::query(
            "INSERT INTO suppliers (id, name, phone, credit_balance_cents, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.phone)
        .bind(s.credit_balance_cents)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&mut *tx)
        .await?;
    }

    for p in &snapshot.products {
        sqlx::query(
            "INSERT INTO products \
                 (id, sku, barcode, name, unit, selling_price_cents, min_stock_level, \
                  stock, expiry_date, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&p.id)
        .bind(&p.sku)
        .bind(&p.barcode)
        .bind(&p.name)
        .bind(&p.unit)
        .bind(p.selling_price_cents)
        .bind(p.min_stock_level)
        .bind(p.stock)
        .bind(p.expiry_date)
        .bind(p.is_active)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *tx)
        .await?;
    }

    for m in &snapshot.stock_movements {
        sqlx::query(
            "INSERT INTO stock_movements \
                 (id, product_id, delta, kind, reference_kind, reference_id, \
                  actor, note, occurred_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&m.id)
        .bind(&m.product_id)
        .bind(m.delta)
        .bind(m.kind)
        .bind(m.reference_kind)
        .bind(&m.reference_id)
        .bind(&m.actor)
        .bind(&m.note)
        .bind(m.occurred_at)
        .execute(&mut *tx)
        .await?;
    }

    for h in &snapshot.cost_history {
        sqlx::query(
            "INSERT INTO cost_history \
                 (id, product_id, actor, old_cost_cents, new_cost_cents, \
                  reason, reference_id, changed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&h.id)
        .bind(&h.product_id)
        .bind(&h.actor)
        .bind(h.old_cost_cents)
        .bind(h.new_cost_cents)
        .bind(&h.reason)
        .bind(&h.reference_id)
        .bind(h.changed_at)
        .execute(&mut *tx)
        .await?;
    }

    for p in &snapshot.purchases {
        sqlx::query(
            "INSERT INTO purchases \
                 (id, supplier_id, status, subtotal_cents, discount_cents, tax_cents, \
                  total_cents, expiry_date, notes, created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&p.id)
        .bind(&p.supplier_id)
        .bind(p.status)
        .bind(p.subtotal_cents)
        .bind(p.discount_cents)
        .bind(p.tax_cents)
        .bind(p.total_cents)
        .bind(p.expiry_date)
        .bind(&p.notes)
        .bind(&p.created_by)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *tx)
        .await?;
    }

    for i in &snapshot.purchase_items {
        sqlx::query(
            "INSERT INTO purchase_items \
                 (id, purchase_id, product_id, quantity, unit_cost_cents, line_total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&i.id)
        .bind(&i.purchase_id)
        .bind(&i.product_id)
        .bind(i.quantity)
        .bind(i.unit_cost_cents)
        .bind(i.line_total_cents)
        .execute(&mut *tx)
        .await?;
    }

    for p in &snapshot.purchase_payments {
        sqlx::query(
            "INSERT INTO purchase_payments \
                 (id, purchase_id, amount_cents, method, paid_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&p.id)
        .bind(&p.purchase_id)
        .bind(p.amount_cents)
        .bind(p.method)
        .bind(&p.paid_by)
        .bind(p.created_at)
        .execute(&mut *tx)
        .await?;
    }

    // Stored invoice numbers are not trusted: restored sales are renumbered
    // oldest-first from 1 and the shared sequence is reset to match.
    let mut sales = snapshot.sales.clone();
    sales.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    for (idx, s) in sales.iter().enumerate() {
        sqlx::query(
            "INSERT INTO sales \
                 (id, invoice_no, customer_id, kind, status, payment_status, payment_method, \
                  total_cents, notes, created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&s.id)
        .bind(idx as i64 + 1)
        .bind(&s.customer_id)
        .bind(s.kind)
        .bind(s.status)
        .bind(s.payment_status)
        .bind(s.payment_method)
        .bind(s.total_cents)
        .bind(&s.notes)
        .bind(&s.created_by)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE sequences SET value = ?1 WHERE name = 'invoice_no'")
        .bind(sales.len() as i64)
        .execute(&mut *tx)
        .await?;

    for i in &snapshot.sale_items {
        sqlx::query(
            "INSERT INTO sale_items \
                 (id, sale_id, product_id, name_snapshot, quantity, \
                  unit_price_cents, line_total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&i.id)
        .bind(&i.sale_id)
        .bind(&i.product_id)
        .bind(&i.name_snapshot)
        .bind(i.quantity)
        .bind(i.unit_price_cents)
        .bind(i.line_total_cents)
        .execute(&mut *tx)
        .await?;
    }

    for r in &snapshot.sales_returns {
        sqlx::query(
            "INSERT INTO sales_returns (id, sale_id, reason, total_cents, refunded_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&r.id)
        .bind(&r.sale_id)
        .bind(&r.reason)
        .bind(r.total_cents)
        .bind(&r.refunded_by)
        .bind(r.created_at)
        .execute(&mut *tx)
        .await?;
    }

    for i in &snapshot.sales_return_items {
        sqlx::query(
            "INSERT INTO sales_return_items \
                 (id, return_id, sale_item_id, product_id, quantity, line_total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&i.id)
        .bind(&i.return_id)
        .bind(&i.sale_item_id)
        .bind(&i.product_id)
        .bind(i.quantity)
        .bind(i.line_total_cents)
        .execute(&mut *tx)
        .await?;
    }

    for p in &snapshot.customer_payments {
        sqlx::query(
            "INSERT INTO customer_payments \
                 (id, customer_id, sale_id, amount_cents, method, received_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&p.id)
        .bind(&p.customer_id)
        .bind(&p.sale_id)
        .bind(p.amount_cents)
        .bind(p.method)
        .bind(&p.received_by)
        .bind(p.created_at)
        .execute(&mut *tx)
        .await?;
    }

    for a in &snapshot.stock_adjustments {
        sqlx::query(
            "INSERT INTO stock_adjustments \
                 (id, product_id, direction, quantity, reason, note, \
                  stock_before, stock_after, adjusted_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&a.id)
        .bind(&a.product_id)
        .bind(a.direction)
        .bind(a.quantity)
        .bind(a.reason)
        .bind(&a.note)
        .bind(a.stock_before)
        .bind(a.stock_after)
        .bind(&a.adjusted_by)
        .bind(a.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        products = snapshot.products.len(),
        sales = snapshot.sales.len(),
        "snapshot restored"
    );

    Ok(())
}

/// Deletes every row, children before parents so no FK is ever dangling.
/// The walk-in customer row is excluded; the store trigger protects it and
/// restore refreshes it in place.
async fn delete_all(conn: &mut SqliteConnection) -> LedgerResult<()> {
    for table in [
        "stock_movements",
        "cost_history",
        "sales_return_items",
        "sales_returns",
        "sale_items",
        "customer_payments",
        "stock_adjustments",
        "sales",
        "purchase_items",
        "purchase_payments",
        "purchases",
        "products",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("DELETE FROM customers WHERE is_walk_in = 0")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM suppliers")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Bulk Import
// =============================================================================

/// One product row in a bulk import file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImport {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    /// Opening stock, entered into the ledger as an audited adjustment.
    #[serde(default)]
    pub initial_stock: i64,
}

fn default_unit() -> String {
    "pcs".to_string()
}

/// Bulk-creates products. Requires the `inventory:import` capability.
///
/// Opening stock goes through the ledger like any other quantity: one
/// adjustment record plus one movement per product, so imported stock is
/// still covered by the reconciliation invariant. Returns the number of
/// products created; a duplicate sku or barcode rolls the whole batch back.
pub async fn import_products(
    db: &Database,
    session: &Session,
    policy: &dyn AccessPolicy,
    rows: Vec<ProductImport>,
) -> LedgerResult<usize> {
    let actor = session.require_actor()?;
    require_capability(policy, "inventory", "import")?;

    for row in &rows {
        validation::validate_name(&row.name)?;
        if row.initial_stock < 0 {
            return Err(tally_core::ValidationError::MustNotBeNegative {
                field: "initial_stock".to_string(),
            }
            .into());
        }
    }

    let mut tx = db.pool().begin().await?;
    let now = Utc::now();

    for row in &rows {
        let product_id = new_id();

        sqlx::query(
            "INSERT INTO products \
                 (id, sku, barcode, name, unit, selling_price_cents, min_stock_level, \
                  stock, expiry_date, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, 1, ?8, ?8)",
        )
        .bind(&product_id)
        .bind(&row.sku)
        .bind(&row.barcode)
        .bind(&row.name)
        .bind(&row.unit)
        .bind(row.selling_price_cents)
        .bind(row.min_stock_level)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if row.initial_stock > 0 {
            let adjustment_id = new_id();

            stock::apply_movement(
                &mut tx,
                stock::MovementEntry {
                    product_id: &product_id,
                    kind: AdjustmentReason::Other.movement_kind(),
                    delta: row.initial_stock,
                    reference_kind: ReferenceKind::Adjustment,
                    reference_id: &adjustment_id,
                    note: Some("bulk import opening stock"),
                    actor,
                },
            )
            .await?;

            sqlx::query(
                "INSERT INTO stock_adjustments \
                     (id, product_id, direction, quantity, reason, note, \
                      stock_before, stock_after, adjusted_by, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9)",
            )
            .bind(&adjustment_id)
            .bind(&product_id)
            .bind(AdjustmentDirection::Add)
            .bind(row.initial_stock)
            .bind(AdjustmentReason::Other)
            .bind("bulk import opening stock")
            .bind(row.initial_stock)
            .bind(actor)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
    }

    let count = rows.len();
    tx.commit().await?;

    tracing::info!(count, "products imported");

    Ok(count)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use crate::service::sale::{record_sale, RecordSaleInput, SaleItemInput};
    use crate::session::{AllowAll, DenyAll};
    use crate::testutil::{seed_customer, seed_product, setup, stock_and_delta_sum};

    async fn seed_some_sales(db: &Database, session: &Session) -> String {
        let product_id = seed_product(db, 100, 20).await;
        let customer_id = seed_customer(db, "Ayesha").await;

        for _ in 0..3 {
            record_sale(
                db,
                session,
                RecordSaleInput {
                    customer_id: Some(customer_id.clone()),
                    items: vec![SaleItemInput {
                        product_id: product_id.clone(),
                        quantity: 2,
                    }],
                    paid_amount_cents: Some(200),
                    payment_method: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        }

        product_id
    }

    #[tokio::test]
    async fn test_backup_paths_require_capability() {
        let (db, session) = setup().await;

        let err = export_snapshot(&db, &session, &DenyAll).await.unwrap_err();
        assert!(matches!(err, LedgerError::Authorization { .. }));

        let err = import_products(&db, &session, &DenyAll, vec![]).await.unwrap_err();
        assert!(matches!(err, LedgerError::Authorization { .. }));
    }

    #[tokio::test]
    async fn test_export_restore_round_trip_preserves_the_ledger() {
        let (db, session) = setup().await;
        let product_id = seed_some_sales(&db, &session).await;

        let snapshot = export_snapshot(&db, &session, &AllowAll).await.unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.sales.len(), 3);

        // Restore into a fresh database.
        let fresh = Database::new(DbConfig::in_memory()).await.unwrap();
        restore_snapshot(&fresh, &session, &AllowAll, &snapshot)
            .await
            .unwrap();

        let (stock, delta_sum) = stock_and_delta_sum(&fresh, &product_id).await;
        assert_eq!(stock, 14);
        assert_eq!(stock, delta_sum);

        let walk_in = fresh.parties().walk_in_customer().await.unwrap();
        assert!(walk_in.is_some());
    }

    #[tokio::test]
    async fn test_snapshot_survives_a_json_round_trip() {
        let (db, session) = setup().await;
        let product_id = seed_some_sales(&db, &session).await;

        let snapshot = export_snapshot(&db, &session, &AllowAll).await.unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: BackupSnapshot = serde_json::from_str(&json).unwrap();

        // Restoring the decoded snapshot yields the same reconciled ledger.
        let fresh = Database::new(DbConfig::in_memory()).await.unwrap();
        restore_snapshot(&fresh, &session, &AllowAll, &decoded)
            .await
            .unwrap();

        let (stock, delta_sum) = stock_and_delta_sum(&fresh, &product_id).await;
        assert_eq!(stock, 14);
        assert_eq!(stock, delta_sum);
        assert_eq!(decoded.sales.len(), snapshot.sales.len());
    }

    #[tokio::test]
    async fn test_restore_reassigns_invoice_numbers_oldest_first() {
        let (db, session) = setup().await;
        seed_some_sales(&db, &session).await;

        let mut snapshot = export_snapshot(&db, &session, &AllowAll).await.unwrap();
        // Stored invoice numbers are not trusted on restore.
        for sale in &mut snapshot.sales {
            sale.invoice_no += 1000;
        }

        let fresh = Database::new(DbConfig::in_memory()).await.unwrap();
        restore_snapshot(&fresh, &session, &AllowAll, &snapshot)
            .await
            .unwrap();

        for expected in 1..=3 {
            assert!(fresh
                .sales()
                .get_by_invoice_no(expected)
                .await
                .unwrap()
                .is_some());
        }

        // The shared sequence continues after the restored sales.
        let product_id = seed_product(&fresh, 100, 5).await;
        let next = record_sale(
            &fresh,
            &session,
            RecordSaleInput {
                customer_id: None,
                items: vec![SaleItemInput {
                    product_id,
                    quantity: 1,
                }],
                paid_amount_cents: Some(100),
                payment_method: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(next.invoice_no, 4);
    }

    #[tokio::test]
    async fn test_import_products_enters_opening_stock_through_the_ledger() {
        let (db, session) = setup().await;

        let count = import_products(
            &db,
            &session,
            &AllowAll,
            vec![
                ProductImport {
                    sku: "SKU-001".to_string(),
                    barcode: None,
                    name: "Green Tea".to_string(),
                    unit: "box".to_string(),
                    selling_price_cents: 450,
                    min_stock_level: 5,
                    initial_stock: 12,
                },
                ProductImport {
                    sku: "SKU-002".to_string(),
                    barcode: Some("8964000000017".to_string()),
                    name: "Sugar 1kg".to_string(),
                    unit: "pcs".to_string(),
                    selling_price_cents: 180,
                    min_stock_level: 10,
                    initial_stock: 0,
                },
            ],
        )
        .await
        .unwrap();
        assert_eq!(count, 2);

        let product = db.products().get_by_sku("SKU-001").await.unwrap().unwrap();
        assert_eq!(product.stock, 12);
        let (stock, delta_sum) = stock_and_delta_sum(&db, &product.id).await;
        assert_eq!(stock, delta_sum);
    }

    #[tokio::test]
    async fn test_import_rolls_back_wholesale_on_duplicate_sku() {
        let (db, session) = setup().await;

        let row = |sku: &str| ProductImport {
            sku: sku.to_string(),
            barcode: None,
            name: format!("Product {sku}"),
            unit: "pcs".to_string(),
            selling_price_cents: 100,
            min_stock_level: 0,
            initial_stock: 1,
        };

        let err = import_products(
            &db,
            &session,
            &AllowAll,
            vec![row("DUP-1"), row("DUP-2"), row("DUP-1")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));

        assert_eq!(db.products().count().await.unwrap(), 0);
    }
}
