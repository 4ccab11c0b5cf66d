//! Shared fixtures for service tests: an in-memory database, an
//! authenticated session, and raw-insert helpers for seed entities.

use chrono::Utc;

use crate::pool::{Database, DbConfig};
use crate::repository::new_id;
use crate::session::Session;

pub(crate) async fn setup() -> (Database, Session) {
    // First caller wins; later tests reuse the same subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    (db, Session::authenticated("tester"))
}

/// Inserts a product with the given selling price and opening stock.
///
/// Opening stock is seeded with a matching movement row so the
/// reconciliation invariant holds from the start.
pub(crate) async fn seed_product(db: &Database, price_cents: i64, stock: i64) -> String {
    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO products \
             (id, sku, barcode, name, unit, selling_price_cents, min_stock_level, \
              stock, expiry_date, is_active, created_at, updated_at) \
         VALUES (?1, ?2, NULL, ?3, 'pcs', ?4, 0, ?5, NULL, 1, ?6, ?6)",
    )
    .bind(&id)
    .bind(format!("SKU-{id}"))
    .bind(format!("Product {id}"))
    .bind(price_cents)
    .bind(stock)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    if stock != 0 {
        sqlx::query(
            "INSERT INTO stock_movements \
                 (id, product_id, delta, kind, reference_kind, reference_id, \
                  actor, note, occurred_at) \
             VALUES (?1, ?2, ?3, 'adjustment', NULL, NULL, 'seed', NULL, ?4)",
        )
        .bind(new_id())
        .bind(&id)
        .bind(stock)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();
    }

    id
}

pub(crate) async fn seed_customer(db: &Database, name: &str) -> String {
    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO customers \
             (id, name, phone, total_spent_cents, visit_count, credit_balance_cents, \
              credit_limit_cents, is_walk_in, created_at, updated_at) \
         VALUES (?1, ?2, NULL, 0, 0, 0, 0, 0, ?3, ?3)",
    )
    .bind(&id)
    .bind(name)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    id
}

pub(crate) async fn seed_supplier(db: &Database, name: &str) -> String {
    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO suppliers (id, name, phone, credit_balance_cents, created_at, updated_at) \
         VALUES (?1, ?2, NULL, 0, ?3, ?3)",
    )
    .bind(&id)
    .bind(name)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    id
}

/// The product's stock column next to the sum of its movement deltas.
pub(crate) async fn stock_and_delta_sum(db: &Database, product_id: &str) -> (i64, i64) {
    let stock = db
        .products()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .stock;
    let delta_sum = db.movements().delta_sum(product_id).await.unwrap();
    (stock, delta_sum)
}
