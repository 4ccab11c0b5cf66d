//! # Debt Settlement Planner
//!
//! Pure FIFO allocation of a repayment across a customer's unpaid invoices.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    FIFO Settlement                                      │
//! │                                                                         │
//! │  Unpaid invoices, oldest first:  [100]  [200]  [150]                    │
//! │  Repayment: 250                                                         │
//! │                                                                         │
//! │  remaining = 250                                                        │
//! │    invoice 1 (100): remaining ≥ 100 → PAID,    remaining = 150          │
//! │    invoice 2 (200): remaining < 200 → PARTIAL, remaining = 0, stop      │
//! │    invoice 3 (150): untouched                                           │
//! │                                                                         │
//! │  Exactly one invoice can end up PARTIAL, and it is always the           │
//! │  newest one the payment reached.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The planner is pure: it takes the ordered invoice list and the amount and
//! returns the allocation decisions. The database service fetches the
//! invoices, applies the plan inside one transaction, decrements the
//! customer's credit balance, and records the synthetic debt-collection sale.

use serde::{Deserialize, Serialize};

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// An unpaid invoice as seen by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInvoice {
    pub sale_id: String,
    pub total_cents: i64,
}

/// How an invoice is settled by a repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// The repayment covered the invoice in full.
    Paid,
    /// The repayment covered part of the invoice; allocation stops here.
    Partial,
}

/// One allocation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub sale_id: String,
    pub outcome: AllocationOutcome,
}

/// The full plan for a repayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub allocations: Vec<Allocation>,
    /// Amount left over after walking every invoice. Non-zero only when the
    /// repayment exceeds the sum of open invoices.
    pub unallocated_cents: i64,
}

// =============================================================================
// Planner
// =============================================================================

/// Plans a FIFO settlement of `amount_cents` across `invoices`.
///
/// `invoices` must already be ordered oldest-first; the caller's query is
/// responsible for the ordering. The amount must already be validated as
/// positive and within the customer's outstanding debt.
///
/// While the remaining amount covers the current invoice it is marked
/// `Paid`; the first invoice it cannot cover is marked `Partial` and no
/// further invoices are touched.
pub fn plan_fifo_settlement(invoices: &[OpenInvoice], amount_cents: i64) -> SettlementPlan {
    let mut allocations = Vec::new();
    let mut remaining = amount_cents;

    for invoice in invoices {
        if remaining == 0 {
            break;
        }

        if remaining >= invoice.total_cents {
            allocations.push(Allocation {
                sale_id: invoice.sale_id.clone(),
                outcome: AllocationOutcome::Paid,
            });
            remaining -= invoice.total_cents;
        } else {
            allocations.push(Allocation {
                sale_id: invoice.sale_id.clone(),
                outcome: AllocationOutcome::Partial,
            });
            remaining = 0;
            break;
        }
    }

    SettlementPlan {
        allocations,
        unallocated_cents: remaining,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn invoices(totals: &[i64]) -> Vec<OpenInvoice> {
        totals
            .iter()
            .enumerate()
            .map(|(i, &total_cents)| OpenInvoice {
                sale_id: format!("sale-{}", i + 1),
                total_cents,
            })
            .collect()
    }

    #[test]
    fn test_fifo_paid_then_partial_then_untouched() {
        // Invoices [100, 200, 150], repayment 250:
        // sale-1 PAID, sale-2 PARTIAL, sale-3 untouched.
        let plan = plan_fifo_settlement(&invoices(&[100, 200, 150]), 250);

        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].sale_id, "sale-1");
        assert_eq!(plan.allocations[0].outcome, AllocationOutcome::Paid);
        assert_eq!(plan.allocations[1].sale_id, "sale-2");
        assert_eq!(plan.allocations[1].outcome, AllocationOutcome::Partial);
        assert_eq!(plan.unallocated_cents, 0);
    }

    #[test]
    fn test_exact_cover_marks_paid_without_partial() {
        let plan = plan_fifo_settlement(&invoices(&[100, 200]), 300);

        assert_eq!(plan.allocations.len(), 2);
        assert!(plan
            .allocations
            .iter()
            .all(|a| a.outcome == AllocationOutcome::Paid));
        assert_eq!(plan.unallocated_cents, 0);
    }

    #[test]
    fn test_repayment_smaller_than_first_invoice() {
        let plan = plan_fifo_settlement(&invoices(&[500, 200]), 100);

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].outcome, AllocationOutcome::Partial);
    }

    #[test]
    fn test_no_open_invoices_leaves_amount_unallocated() {
        let plan = plan_fifo_settlement(&[], 250);
        assert!(plan.allocations.is_empty());
        assert_eq!(plan.unallocated_cents, 250);
    }

    #[test]
    fn test_repayment_exceeding_all_invoices() {
        let plan = plan_fifo_settlement(&invoices(&[100, 200]), 400);

        assert_eq!(plan.allocations.len(), 2);
        assert!(plan
            .allocations
            .iter()
            .all(|a| a.outcome == AllocationOutcome::Paid));
        assert_eq!(plan.unallocated_cents, 100);
    }
}
