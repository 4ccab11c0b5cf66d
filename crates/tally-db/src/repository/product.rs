//! # Product Repository
//!
//! Read access for products and their cost history.
//!
//! ## Current Cost
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             Why there is no products.cost column                        │
//! │                                                                         │
//! │  cost_history (append-only):                                            │
//! │    #1  old: NULL  new: 90   reason: purchase                            │
//! │    #2  old: 90    new: 100  reason: purchase   ← current cost = 100     │
//! │                                                                         │
//! │  Two purchases of the same product can commit in either order without   │
//! │  losing an update, and the full pricing history stays auditable.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CostChange, Product};

const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, unit, selling_price_cents, \
     min_stock_level, stock, expiry_date, is_active, created_at, updated_at";

/// Repository for product reads.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Stock overview: all active products ordered by name.
    ///
    /// Pure projection; never mutates.
    pub async fn stock_overview(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Products at or below their reorder threshold.
    ///
    /// Low-stock predicate: `stock <= min_stock_level`.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        debug!("Listing low-stock products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock <= min_stock_level \
             ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// The product's current purchase cost: latest cost-history entry.
    ///
    /// Returns `None` for a product that has never been purchased or
    /// cost-adjusted.
    pub async fn current_cost(&self, product_id: &str) -> DbResult<Option<i64>> {
        let cost: Option<i64> = sqlx::query_scalar(
            "SELECT new_cost_cents FROM cost_history \
             WHERE product_id = ?1 \
             ORDER BY changed_at DESC, rowid DESC \
             LIMIT 1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cost)
    }

    /// Full cost history for a product, newest first.
    pub async fn cost_history(&self, product_id: &str) -> DbResult<Vec<CostChange>> {
        let changes = sqlx::query_as::<_, CostChange>(
            "SELECT id, product_id, actor, old_cost_cents, new_cost_cents, \
                    reason, reference_id, changed_at \
             FROM cost_history \
             WHERE product_id = ?1 \
             ORDER BY changed_at DESC, rowid DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testutil::{seed_product, setup};

    #[tokio::test]
    async fn test_current_cost_breaks_timestamp_ties_by_insertion_order() {
        let (db, _session) = setup().await;
        let product_id = seed_product(&db, 100, 0).await;

        // Two rows sharing one timestamp, with ids whose lexical order runs
        // against insertion order. The later insertion must win.
        let ts = chrono::Utc::now();
        for (id, cost) in [("zz-first", 90_i64), ("aa-second", 100)] {
            sqlx::query(
                "INSERT INTO cost_history \
                     (id, product_id, actor, old_cost_cents, new_cost_cents, \
                      reason, reference_id, changed_at) \
                 VALUES (?1, ?2, 'tester', NULL, ?3, 'purchase', NULL, ?4)",
            )
            .bind(id)
            .bind(&product_id)
            .bind(cost)
            .bind(ts)
            .execute(db.pool())
            .await
            .unwrap();
        }

        assert_eq!(
            db.products().current_cost(&product_id).await.unwrap(),
            Some(100)
        );
        let history = db.products().cost_history(&product_id).await.unwrap();
        assert_eq!(history[0].new_cost_cents, 100);
        assert_eq!(history[1].new_cost_cents, 90);
    }
}
