//! # Debt Settlement
//!
//! Applies a customer repayment across their unpaid invoices, oldest first.
//! The allocation decisions come from the pure planner in `tally-core`;
//! this module fetches the open invoices, applies the plan, decrements the
//! customer's debt, and records the synthetic debt-collection sale plus its
//! payment, all in one transaction.

use chrono::Utc;

use crate::error::LedgerResult;
use crate::pool::Database;
use crate::repository::new_id;
use crate::service::{adjust_customer_credit, fetch_customer, fetch_sale, next_invoice_no};
use crate::session::Session;
use tally_core::{
    plan_fifo_settlement, validation, AllocationOutcome, OpenInvoice, PaymentMethod,
    PaymentStatus, Sale, SaleKind, SaleStatus,
};

/// Input for settling part of a customer's outstanding debt.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SettleDebtInput {
    pub customer_id: String,
    /// Must be positive and at most the customer's credit balance.
    pub amount_cents: i64,
    pub method: PaymentMethod,
}

/// Settles `amount_cents` of a customer's debt FIFO across unpaid invoices.
///
/// Fully covered invoices flip to PAID; the first invoice the amount cannot
/// cover flips to PARTIAL and allocation stops, leaving newer invoices
/// untouched. The repayment itself is recorded as a synthetic item-less
/// debt-collection sale with the next invoice number, plus one payment row.
/// Returns that synthetic sale.
pub async fn settle_customer_debt(
    db: &Database,
    session: &Session,
    input: SettleDebtInput,
) -> LedgerResult<Sale> {
    let actor = session.require_actor()?;

    let mut tx = db.pool().begin().await?;

    let customer = fetch_customer(&mut tx, &input.customer_id).await?;
    validation::validate_repayment(input.amount_cents, customer.credit_balance_cents)?;

    // Open invoices oldest-first; the planner relies on this ordering.
    let invoices = sqlx::query_as::<_, (String, i64)>(
        "SELECT id, total_cents FROM sales \
         WHERE customer_id = ?1 AND payment_status = 'unpaid' AND status != 'void' \
         ORDER BY created_at ASC, invoice_no ASC",
    )
    .bind(&customer.id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|(sale_id, total_cents)| OpenInvoice {
        sale_id,
        total_cents,
    })
    .collect::<Vec<_>>();

    let plan = plan_fifo_settlement(&invoices, input.amount_cents);

    for allocation in &plan.allocations {
        let status = match allocation.outcome {
            AllocationOutcome::Paid => PaymentStatus::Paid,
            AllocationOutcome::Partial => PaymentStatus::Partial,
        };
        sqlx::query("UPDATE sales SET payment_status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&allocation.sale_id)
            .bind(status)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
    }

    adjust_customer_credit(&mut tx, &customer.id, -input.amount_cents).await?;

    // The repayment enters the books as an item-less debt-collection sale
    // drawing from the same invoice sequence as real sales.
    let sale_id = new_id();
    let invoice_no = next_invoice_no(&mut tx).await?;
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO sales \
             (id, invoice_no, customer_id, kind, status, payment_status, payment_method, \
              total_cents, notes, created_by, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10, ?10)",
    )
    .bind(&sale_id)
    .bind(invoice_no)
    .bind(&customer.id)
    .bind(SaleKind::DebtCollection)
    .bind(SaleStatus::Completed)
    .bind(PaymentStatus::Paid)
    .bind(input.method)
    .bind(input.amount_cents)
    .bind(actor)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO customer_payments \
             (id, customer_id, sale_id, amount_cents, method, received_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(new_id())
    .bind(&customer.id)
    .bind(&sale_id)
    .bind(input.amount_cents)
    .bind(input.method)
    .bind(actor)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let sale = fetch_sale(&mut tx, &sale_id).await?;
    tx.commit().await?;

    tracing::info!(
        customer_id = %customer.id,
        amount_cents = input.amount_cents,
        invoices_touched = plan.allocations.len(),
        "customer debt settled"
    );

    Ok(sale)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::service::sale::{record_sale, RecordSaleInput, SaleItemInput};
    use crate::testutil::{seed_customer, seed_product, setup};

    /// Records an unpaid credit sale of `quantity` units at 50 cents each.
    async fn unpaid_sale(
        db: &crate::pool::Database,
        session: &Session,
        product_id: &str,
        customer_id: &str,
        quantity: i64,
    ) -> Sale {
        record_sale(
            db,
            session,
            RecordSaleInput {
                customer_id: Some(customer_id.to_string()),
                items: vec![SaleItemInput {
                    product_id: product_id.to_string(),
                    quantity,
                }],
                paid_amount_cents: None,
                payment_method: None,
                notes: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_fifo_settles_oldest_invoices_first() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 50, 100).await;
        let customer_id = seed_customer(&db, "Ayesha").await;

        // Unpaid invoices totaling [100, 200, 150], oldest first.
        let s1 = unpaid_sale(&db, &session, &product_id, &customer_id, 2).await;
        let s2 = unpaid_sale(&db, &session, &product_id, &customer_id, 4).await;
        let s3 = unpaid_sale(&db, &session, &product_id, &customer_id, 3).await;

        let synthetic = settle_customer_debt(
            &db,
            &session,
            SettleDebtInput {
                customer_id: customer_id.clone(),
                amount_cents: 250,
                method: PaymentMethod::Cash,
            },
        )
        .await
        .unwrap();

        let sales = db.sales();
        assert_eq!(
            sales.get_by_id(&s1.id).await.unwrap().unwrap().payment_status,
            PaymentStatus::Paid
        );
        assert_eq!(
            sales.get_by_id(&s2.id).await.unwrap().unwrap().payment_status,
            PaymentStatus::Partial
        );
        // The repayment never reached the newest invoice.
        assert_eq!(
            sales.get_by_id(&s3.id).await.unwrap().unwrap().payment_status,
            PaymentStatus::Unpaid
        );

        let customer = db.parties().get_customer(&customer_id).await.unwrap().unwrap();
        assert_eq!(customer.credit_balance_cents, 450 - 250);

        // The synthetic sale: item-less, paid, next invoice number.
        assert_eq!(synthetic.kind, SaleKind::DebtCollection);
        assert_eq!(synthetic.payment_status, PaymentStatus::Paid);
        assert_eq!(synthetic.total_cents, 250);
        assert_eq!(synthetic.invoice_no, 4);
        assert!(!synthetic.expects_line_items());
        assert!(sales.get_items(&synthetic.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repayment_exceeding_debt_is_rejected() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 50, 100).await;
        let customer_id = seed_customer(&db, "Bilal").await;

        unpaid_sale(&db, &session, &product_id, &customer_id, 2).await;

        let err = settle_customer_debt(
            &db,
            &session,
            SettleDebtInput {
                customer_id: customer_id.clone(),
                amount_cents: 500,
                method: PaymentMethod::Cash,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let customer = db.parties().get_customer(&customer_id).await.unwrap().unwrap();
        assert_eq!(customer.credit_balance_cents, 100);
    }

    #[tokio::test]
    async fn test_settlement_records_one_payment() {
        let (db, session) = setup().await;
        let product_id = seed_product(&db, 50, 100).await;
        let customer_id = seed_customer(&db, "Chen").await;

        unpaid_sale(&db, &session, &product_id, &customer_id, 2).await;

        let synthetic = settle_customer_debt(
            &db,
            &session,
            SettleDebtInput {
                customer_id: customer_id.clone(),
                amount_cents: 100,
                method: PaymentMethod::Transfer,
            },
        )
        .await
        .unwrap();

        let payments = db.parties().customer_payments(&customer_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 100);
        assert_eq!(payments[0].sale_id.as_deref(), Some(synthetic.id.as_str()));
    }
}
