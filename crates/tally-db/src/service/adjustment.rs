//! # Manual Stock Adjustment
//!
//! Direct, audited stock corrections: physical recounts, damage, expiry,
//! loss. Each adjustment writes one `stock_adjustments` record plus one
//! movement through the ledger primitive, all in one transaction.

use chrono::Utc;

use crate::error::LedgerResult;
use crate::pool::Database;
use crate::repository::new_id;
use crate::service::{fetch_product, stock};
use crate::session::Session;
use tally_core::{
    validation, AdjustmentDirection, AdjustmentReason, ReferenceKind, StockAdjustment,
};

/// Input for a manual stock adjustment.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AdjustStockInput {
    pub product_id: String,
    pub direction: AdjustmentDirection,
    pub quantity: i64,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
}

/// Applies a manual stock correction.
///
/// A `Remove` that exceeds the current stock is rejected before anything is
/// written. The movement kind is derived from the reason, so damage/expiry/
/// loss write-offs stay distinguishable in the audit trail.
pub async fn adjust_stock(
    db: &Database,
    session: &Session,
    input: AdjustStockInput,
) -> LedgerResult<StockAdjustment> {
    let actor = session.require_actor()?;
    validation::validate_quantity(input.quantity)?;

    let mut tx = db.pool().begin().await?;

    let product = fetch_product(&mut tx, &input.product_id).await?;

    let delta = match input.direction {
        AdjustmentDirection::Add => input.quantity,
        AdjustmentDirection::Remove => {
            validation::validate_removal(product.stock, input.quantity)?;
            -input.quantity
        }
    };

    let adjustment = StockAdjustment {
        id: new_id(),
        product_id: product.id.clone(),
        direction: input.direction,
        quantity: input.quantity,
        reason: input.reason,
        note: input.note,
        stock_before: product.stock,
        stock_after: product.stock + delta,
        adjusted_by: actor.to_string(),
        created_at: Utc::now(),
    };

    stock::apply_movement(
        &mut tx,
        stock::MovementEntry {
            product_id: &adjustment.product_id,
            kind: input.reason.movement_kind(),
            delta,
            reference_kind: ReferenceKind::Adjustment,
            reference_id: &adjustment.id,
            note: adjustment.note.as_deref(),
            actor,
        },
    )
    .await?;

    sqlx::query(
        "INSERT INTO stock_adjustments \
             (id, product_id, direction, quantity, reason, note, \
              stock_before, stock_after, adjusted_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(&adjustment.id)
    .bind(&adjustment.product_id)
    .bind(adjustment.direction)
    .bind(adjustment.quantity)
    .bind(adjustment.reason)
    .bind(&adjustment.note)
    .bind(adjustment.stock_before)
    .bind(adjustment.stock_after)
    .bind(&adjustment.adjusted_by)
    .bind(adjustment.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        product_id = %adjustment.product_id,
        delta,
        reason = ?input.reason,
        "stock adjusted"
    );

    Ok(adjustment)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::testutil::{seed_product, setup, stock_and_delta_sum};
    use tally_core::MovementKind;

    fn input(
        product_id: &str,
        direction: AdjustmentDirection,
        quantity: i64,
        reason: AdjustmentReason,
    ) -> AdjustStockInput {
        AdjustStockInput {
            product_id: product_id.to_string(),
            direction,
            quantity,
            reason,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_remove_keep_ledger_reconciled() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 100, 10).await;

        let added = adjust_stock(
            &db,
            &session,
            input(&product_id, AdjustmentDirection::Add, 5, AdjustmentReason::Recount),
        )
        .await
        .unwrap();
        assert_eq!(added.stock_before, 10);
        assert_eq!(added.stock_after, 15);

        let removed = adjust_stock(
            &db,
            &session,
            input(&product_id, AdjustmentDirection::Remove, 3, AdjustmentReason::Damage),
        )
        .await
        .unwrap();
        assert_eq!(removed.stock_after, 12);

        let (stock, delta_sum) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 12);
        assert_eq!(stock, delta_sum);
    }

    #[tokio::test]
    async fn test_remove_exceeding_stock_is_rejected_and_stock_unchanged() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 100, 3).await;

        let err = adjust_stock(
            &db,
            &session,
            input(&product_id, AdjustmentDirection::Remove, 5, AdjustmentReason::Lost),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let (stock, delta_sum) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 3);
        assert_eq!(delta_sum, 3);
    }

    #[tokio::test]
    async fn test_movement_kind_derived_from_reason() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 100, 10).await;

        let adjustment = adjust_stock(
            &db,
            &session,
            input(&product_id, AdjustmentDirection::Remove, 2, AdjustmentReason::Expired),
        )
        .await
        .unwrap();

        let movements = db.movements().for_reference(&adjustment.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Expired);
        assert_eq!(movements[0].delta, -2);
    }

    #[tokio::test]
    async fn test_anonymous_session_is_rejected_before_any_write() {
        let (db, _) = setup().await;
        let product_id = seed_product(&db, 100, 10).await;

        let err = adjust_stock(
            &db,
            &Session::anonymous(),
            input(&product_id, AdjustmentDirection::Add, 1, AdjustmentReason::Other),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Authentication));

        let (stock, _) = stock_and_delta_sum(&db, &product_id).await;
        assert_eq!(stock, 10);
    }
}
