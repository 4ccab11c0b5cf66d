//! # Sale Repository
//!
//! Read access for sales, sale items, returns and payments.
//!
//! ## The Item-less Case
//! Debt-collection sales never have line items. Per-item projections must
//! branch on `Sale::expects_line_items` (see [`SaleRepository::get_items`])
//! rather than assuming every sale owns rows in `sale_items`.

use sqlx::SqlitePool;

use crate::error::DbResult;
use tally_core::{Sale, SaleItem, SalesReturn, SalesReturnItem};

const SALE_COLUMNS: &str = "id, invoice_no, customer_id, kind, status, payment_status, \
     payment_method, total_cents, notes, created_by, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str =
    "id, sale_id, product_id, name_snapshot, quantity, unit_price_cents, line_total_cents";

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by invoice number.
    pub async fn get_by_invoice_no(&self, invoice_no: i64) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE invoice_no = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(invoice_no)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// All line items for a sale.
    ///
    /// For a debt-collection sale this returns the empty vec; callers that
    /// care should check `Sale::expects_line_items` first and handle the
    /// item-less case explicitly.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY id"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Sales for a customer, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE customer_id = ?1 \
             ORDER BY created_at DESC, invoice_no DESC"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Return headers recorded against a sale, oldest first.
    pub async fn get_returns(&self, sale_id: &str) -> DbResult<Vec<SalesReturn>> {
        let returns = sqlx::query_as::<_, SalesReturn>(
            "SELECT id, sale_id, reason, total_cents, refunded_by, created_at \
             FROM sales_returns \
             WHERE sale_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    /// Items of one return event.
    pub async fn get_return_items(&self, return_id: &str) -> DbResult<Vec<SalesReturnItem>> {
        let items = sqlx::query_as::<_, SalesReturnItem>(
            "SELECT id, return_id, sale_item_id, product_id, quantity, line_total_cents \
             FROM sales_return_items \
             WHERE return_id = ?1 \
             ORDER BY id",
        )
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
