//! # Stock Movement Repository
//!
//! Read access for the append-only movement log. Movements are only ever
//! written by the stock ledger primitive inside a service transaction;
//! this repository exposes the audit-trail projections.

use sqlx::SqlitePool;

use crate::error::DbResult;
use tally_core::StockMovement;

const MOVEMENT_COLUMNS: &str = "id, product_id, delta, kind, reference_kind, reference_id, \
     actor, note, occurred_at";

/// Repository for stock movement reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Movement history for one product, newest first.
    pub async fn history_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = ?1 \
             ORDER BY occurred_at DESC, id DESC \
             LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Most recent movements across all products.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             ORDER BY occurred_at DESC, id DESC \
             LIMIT ?1"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements caused by one entity (purchase, sale, return, adjustment).
    pub async fn for_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE reference_id = ?1 \
             ORDER BY occurred_at, id"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Sum of signed deltas for one product.
    ///
    /// By the ledger invariant this always equals `products.stock`; the
    /// reconciliation check in tests relies on it.
    pub async fn delta_sum(&self, product_id: &str) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(delta) FROM stock_movements WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }
}
