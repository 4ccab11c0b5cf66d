//! # Purchase Repository
//!
//! Read access for purchase orders, their items and supplier payments.

use sqlx::SqlitePool;

use crate::error::DbResult;
use tally_core::{Purchase, PurchaseItem, PurchasePayment};

const PURCHASE_COLUMNS: &str = "id, supplier_id, status, subtotal_cents, discount_cents, \
     tax_cents, total_cents, expiry_date, notes, created_by, created_at, updated_at";

/// Repository for purchase reads.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Gets a purchase by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1");
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// All line items for a purchase.
    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT id, purchase_id, product_id, quantity, unit_cost_cents, line_total_cents \
             FROM purchase_items \
             WHERE purchase_id = ?1 \
             ORDER BY id",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Purchases for a supplier, newest first.
    pub async fn list_for_supplier(&self, supplier_id: &str) -> DbResult<Vec<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             WHERE supplier_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        );
        let purchases = sqlx::query_as::<_, Purchase>(&sql)
            .bind(supplier_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(purchases)
    }

    /// All payments recorded against a purchase, oldest first.
    pub async fn get_payments(&self, purchase_id: &str) -> DbResult<Vec<PurchasePayment>> {
        let payments = sqlx::query_as::<_, PurchasePayment>(
            "SELECT id, purchase_id, amount_cents, method, paid_by, created_at \
             FROM purchase_payments \
             WHERE purchase_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Gets total amount paid against a purchase.
    pub async fn total_paid(&self, purchase_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount_cents) FROM purchase_payments WHERE purchase_id = ?1",
        )
        .bind(purchase_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}
